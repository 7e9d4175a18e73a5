//! Startup configuration for the provisioning flow.

use std::{path::PathBuf, time::Duration};

use crate::credentials::{MAX_PASSWORD_LEN, MAX_SSID_LEN};

pub const DEFAULT_AP_SSID: &str = "ESP32_Config";
pub const DEFAULT_AP_PASSWORD: &str = "12345678";
pub const DEFAULT_AP_MAX_CLIENTS: u16 = 4;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_NAMESPACE: &str = "wifi_creds";
pub const DEFAULT_PAGE_ROOT: &str = "/spiffs";

/// WPA2-PSK passphrases are 8..=63 bytes.
const MIN_WPA_PASSWORD_LEN: usize = 8;
/// ESP-IDF soft-AP limit.
const MAX_AP_CLIENTS: u16 = 10;
/// NVS namespace names are limited to 15 characters.
const MAX_NAMESPACE_LEN: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionConfig {
    pub ap_ssid: String,
    /// Empty means an open access point.
    pub ap_password: String,
    pub ap_max_clients: u16,
    pub connect_timeout: Duration,
    pub poll_interval: Duration,
    /// NVS namespace holding the `ssid` / `password` record.
    pub namespace: String,
    /// Directory the portal pages are served from.
    pub page_root: PathBuf,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            ap_ssid: DEFAULT_AP_SSID.to_string(),
            ap_password: DEFAULT_AP_PASSWORD.to_string(),
            ap_max_clients: DEFAULT_AP_MAX_CLIENTS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            namespace: DEFAULT_NAMESPACE.to_string(),
            page_root: PathBuf::from(DEFAULT_PAGE_ROOT),
        }
    }
}

impl ProvisionConfig {
    /// Defaults, overridden by values baked in at build time.
    pub fn from_env() -> Self {
        static AP_SSID: Option<&str> = std::option_env!("PROVISION_AP_SSID");
        static AP_PASSWORD: Option<&str> = std::option_env!("PROVISION_AP_PASSWORD");
        static CONNECT_TIMEOUT_MS: Option<&str> = std::option_env!("PROVISION_CONNECT_TIMEOUT_MS");
        static POLL_INTERVAL_MS: Option<&str> = std::option_env!("PROVISION_POLL_INTERVAL_MS");

        let mut config = Self::default();
        if let Some(ssid) = AP_SSID {
            config.ap_ssid = ssid.to_string();
        }
        if let Some(password) = AP_PASSWORD {
            config.ap_password = password.to_string();
        }
        if let Some(ms) = CONNECT_TIMEOUT_MS.and_then(parse_millis) {
            config.connect_timeout = ms;
        }
        if let Some(ms) = POLL_INTERVAL_MS.and_then(parse_millis) {
            config.poll_interval = ms;
        }
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ap_ssid.is_empty() || self.ap_ssid.len() > MAX_SSID_LEN {
            return Err(ConfigError::ApSsid(self.ap_ssid.len()));
        }
        let pass_len = self.ap_password.len();
        if pass_len != 0 && !(MIN_WPA_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&pass_len) {
            return Err(ConfigError::ApPassword(pass_len));
        }
        if !(1..=MAX_AP_CLIENTS).contains(&self.ap_max_clients) {
            return Err(ConfigError::ApMaxClients(self.ap_max_clients));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("connect_timeout"));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("poll_interval"));
        }
        if self.namespace.is_empty() || self.namespace.len() > MAX_NAMESPACE_LEN {
            return Err(ConfigError::Namespace(self.namespace.clone()));
        }
        Ok(())
    }
}

fn parse_millis(s: &str) -> Option<Duration> {
    match s.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(e) => {
            log::warn!("Ignoring invalid duration {s:?}: {e}");
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ApSsid(usize),
    ApPassword(usize),
    ApMaxClients(u16),
    ZeroDuration(&'static str),
    Namespace(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ApSsid(len) => {
                write!(f, "AP ssid must be 1..={MAX_SSID_LEN} bytes, got {len}")
            }
            ConfigError::ApPassword(len) => write!(
                f,
                "AP password must be empty or {MIN_WPA_PASSWORD_LEN}..={MAX_PASSWORD_LEN} bytes, got {len}"
            ),
            ConfigError::ApMaxClients(n) => {
                write!(f, "AP max clients must be 1..={MAX_AP_CLIENTS}, got {n}")
            }
            ConfigError::ZeroDuration(name) => write!(f, "{name} must be non-zero"),
            ConfigError::Namespace(ns) => write!(
                f,
                "NVS namespace must be 1..={MAX_NAMESPACE_LEN} bytes, got {ns:?}"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
