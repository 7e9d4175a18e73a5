//! Bounded Wi-Fi credentials.

use std::{borrow::Cow, fmt::Debug};

/// Largest network name the radio accepts (32-byte buffer, NUL terminated).
pub const MAX_SSID_LEN: usize = 31;
/// Largest secret the radio accepts (64-byte buffer, NUL terminated).
pub const MAX_PASSWORD_LEN: usize = 63;

/// A (network name, secret) pair. An empty secret means an open network.
///
/// Both fields are raw bytes, cut to exactly [`MAX_SSID_LEN`] /
/// [`MAX_PASSWORD_LEN`] bytes on construction, so every value of this type
/// fits the radio configuration. Nothing requires them to be UTF-8.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    ssid: Vec<u8>,
    password: Vec<u8>,
}

impl Credentials {
    pub fn new(ssid: impl AsRef<[u8]>, password: impl AsRef<[u8]>) -> Self {
        Self {
            ssid: truncate(ssid.as_ref(), MAX_SSID_LEN).to_vec(),
            password: truncate(password.as_ref(), MAX_PASSWORD_LEN).to_vec(),
        }
    }

    pub fn ssid(&self) -> &[u8] {
        &self.ssid
    }

    pub fn password(&self) -> &[u8] {
        &self.password
    }

    /// Network name for display; invalid UTF-8 is replaced.
    pub fn ssid_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.ssid)
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Credentials(ssid={:?}, password=<{} bytes>)",
            self.ssid_lossy(),
            self.password.len()
        )
    }
}

/// First `max` bytes of `bytes`.
pub fn truncate(bytes: &[u8], max: usize) -> &[u8] {
    &bytes[..bytes.len().min(max)]
}

/// `bytes` as text no longer than `bytes`: invalid sequences are replaced
/// and the result is cut back to a char boundary.
pub fn text_within(bytes: &[u8]) -> Cow<'_, str> {
    match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(text) => Cow::Borrowed(text),
        Cow::Owned(mut text) => {
            let mut end = text.len().min(bytes.len());
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            text.truncate(end);
            Cow::Owned(text)
        }
    }
}
