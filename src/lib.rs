//! WiFi provisioning for headless devices.
//!
//! On boot the stored credentials are tried as a station; if there are none or
//! the join times out, a soft-AP with a small web form collects new ones, which
//! are persisted before the device restarts.

pub mod captive_portal;
pub mod config;
pub mod credentials;
pub mod network;
pub mod provisioner;
pub mod store;
pub mod supervisor;

#[cfg(test)]
mod testing;

pub use config::ProvisionConfig;
pub use credentials::Credentials;
pub use provisioner::{Provisioner, Restart, State};
