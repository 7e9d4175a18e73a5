//! Durable storage of the single credentials record.

use crate::credentials::Credentials;

#[cfg(target_os = "espidf")]
mod nvs;
#[cfg(target_os = "espidf")]
pub use nvs::NvsStore;

/// Key of the network name inside the namespace.
pub const SSID_KEY: &str = "ssid";
/// Key of the secret inside the namespace.
pub const PASSWORD_KEY: &str = "password";

pub trait CredentialStore {
    /// Returns the stored pair, or `None` if the namespace or either field is
    /// missing or unreadable.
    fn load(&self) -> Option<Credentials>;

    /// Writes both fields, then commits. A failure before the commit leaves
    /// the previous record as the one `load` sees.
    fn save(&mut self, credentials: &Credentials) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Namespace open/read/write/commit failure.
    Unavailable {
        op: &'static str,
        reason: String,
    },
}

impl StoreError {
    pub fn unavailable(op: &'static str, reason: impl std::fmt::Display) -> Self {
        StoreError::Unavailable {
            op,
            reason: reason.to_string(),
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable { op, reason } => {
                write!(f, "credential store unavailable ({op}): {reason}")
            }
        }
    }
}

impl std::error::Error for StoreError {}
