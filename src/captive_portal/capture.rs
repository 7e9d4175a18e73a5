//! `POST /wifi` form handling and the captured-credentials slot.

use std::{
    fmt::Debug,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use percent_encoding::percent_decode;

use crate::credentials::Credentials;

/// Reply sent once a submission has been captured.
pub const ACK_MESSAGE: &str = "WiFi credentials received. Device will connect.";

/// Largest form body accepted.
pub const MAX_FORM_BODY: usize = 1024;

/// Bytes requested from the connection per read.
const RECV_CHUNK: usize = 127;

/// Single-slot holder shared by the request handler (writer) and the
/// provisioning loop (reader).
///
/// Once present it stays present for the life of the process; later
/// submissions overwrite the value.
#[derive(Clone, Default)]
pub struct CaptureSlot {
    inner: Arc<SlotInner>,
}

#[derive(Default)]
struct SlotInner {
    present: AtomicBool,
    credentials: Mutex<Credentials>,
}

impl CaptureSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, credentials: Credentials) {
        *self
            .inner
            .credentials
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = credentials;
        // flag goes up only after both fields are in place
        self.inner.present.store(true, Ordering::Release);
    }

    pub fn is_present(&self) -> bool {
        self.inner.present.load(Ordering::Acquire)
    }

    /// Copy of the captured value, if any. Does not clear the slot.
    pub fn get(&self) -> Option<Credentials> {
        if !self.is_present() {
            return None;
        }
        Some(
            self.inner
                .credentials
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The connection ended or failed before `Content-Length` bytes arrived.
    ReceiveTruncated { expected: usize, received: usize },
    BodyTooLarge(usize),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::ReceiveTruncated { expected, received } => {
                write!(f, "request body truncated: got {received} of {expected} bytes")
            }
            CaptureError::BodyTooLarge(len) => {
                write!(f, "request body of {len} bytes exceeds {MAX_FORM_BODY}")
            }
        }
    }
}

impl std::error::Error for CaptureError {}

/// Body length to read for a declared `Content-Length`.
///
/// A missing header is an empty body; a length that does not fit `usize`
/// saturates so it is rejected as too large.
pub fn content_len(declared: Option<u64>) -> usize {
    usize::try_from(declared.unwrap_or(0)).unwrap_or(usize::MAX)
}

/// Read exactly `content_len` bytes through `recv`.
///
/// `recv` fills the buffer it is given and returns the byte count; `Ok(0)` or
/// an error before the body is complete is a truncated receive.
pub fn read_body<E: Debug>(
    content_len: usize,
    mut recv: impl FnMut(&mut [u8]) -> Result<usize, E>,
) -> Result<Vec<u8>, CaptureError> {
    if content_len > MAX_FORM_BODY {
        return Err(CaptureError::BodyTooLarge(content_len));
    }

    let mut body = Vec::with_capacity(content_len);
    let mut chunk = [0u8; RECV_CHUNK];
    while body.len() < content_len {
        let want = (content_len - body.len()).min(RECV_CHUNK);
        let n = match recv(&mut chunk[..want]) {
            Ok(0) => 0,
            Ok(n) => n.min(want),
            Err(e) => {
                log::warn!("Receive failed: {:?}", e);
                0
            }
        };
        if n == 0 {
            return Err(CaptureError::ReceiveTruncated {
                expected: content_len,
                received: body.len(),
            });
        }
        body.extend_from_slice(&chunk[..n]);
    }
    Ok(body)
}

/// Decode an `application/x-www-form-urlencoded` body into bounded credentials.
///
/// Values are decoded to raw bytes. Missing fields are empty, the first
/// occurrence of a repeated key wins, unknown keys are ignored and long
/// fields are cut to their bound.
pub fn parse_form(body: &[u8]) -> Credentials {
    let mut ssid = None;
    let mut password = None;

    for pair in body.split(|&b| b == b'&') {
        let (key, value) = match pair.iter().position(|&b| b == b'=') {
            Some(eq) => (&pair[..eq], &pair[eq + 1..]),
            None => (pair, &[][..]),
        };
        let field = match form_decode(key).as_slice() {
            b"ssid" => &mut ssid,
            b"password" => &mut password,
            _ => continue,
        };
        if field.is_none() {
            *field = Some(form_decode(value));
        }
    }

    Credentials::new(ssid.unwrap_or_default(), password.unwrap_or_default())
}

/// `+` is a space, then `%XX` escapes.
fn form_decode(raw: &[u8]) -> Vec<u8> {
    let spaced: Vec<u8> = raw
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    percent_decode(&spaced).collect()
}

/// Read, decode and publish one submission. The slot is untouched on error.
pub fn accept_submission<E: Debug>(
    slot: &CaptureSlot,
    content_len: usize,
    recv: impl FnMut(&mut [u8]) -> Result<usize, E>,
) -> Result<Credentials, CaptureError> {
    let body = read_body(content_len, recv)?;
    let credentials = parse_form(&body);
    log::info!(
        "Received SSID: {}, password: {} bytes",
        credentials.ssid_lossy(),
        credentials.password().len()
    );
    slot.publish(credentials.clone());
    Ok(credentials)
}
