//! Boot-time provisioning state machine.
//!
//! ```text
//! Init -> TryStored -> Attempting -> Connected  (serves the portal, runs forever)
//!                  \             \-> Fallback -> AwaitingCapture -> Persisting -> Restarting
//!                   \------------------^
//! ```

use std::convert::Infallible;

use crate::{
    captive_portal::{CaptureSlot, Portal},
    config::ProvisionConfig,
    credentials::Credentials,
    network::Network,
    store::CredentialStore,
    supervisor::{ConnectSupervisor, ConnectivityOutcome},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Init,
    TryStored,
    Attempting,
    Connected,
    Fallback,
    AwaitingCapture,
    Persisting,
    Restarting,
}

/// The only way [`Provisioner::run`] ends: the caller must restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restart;

pub struct Provisioner<S, N, P> {
    config: ProvisionConfig,
    store: S,
    network: N,
    portal: P,
    slot: CaptureSlot,
    state: State,
}

impl<S, N, P> Provisioner<S, N, P>
where
    S: CredentialStore,
    N: Network,
    P: Portal,
{
    pub fn new(config: ProvisionConfig, store: S, network: N, portal: P) -> Self {
        Self {
            config,
            store,
            network,
            portal,
            slot: CaptureSlot::new(),
            state: State::Init,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    fn enter(&mut self, next: State) {
        log::info!("Provisioning {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run one boot cycle.
    ///
    /// Returns once new credentials have been captured and persisted; after a
    /// successful join it never returns. Errors mean the access point or the
    /// portal could not be brought up.
    pub async fn run(&mut self) -> anyhow::Result<Restart> {
        self.enter(State::TryStored);
        let stored = self.store.load();

        if let Some(credentials) = stored {
            log::info!("Loaded WiFi credentials from NVS. Connecting...");
            self.enter(State::Attempting);
            match self.attempt(&credentials).await {
                ConnectivityOutcome::Connected => {
                    self.enter(State::Connected);
                    return self.serve_connected().await;
                }
                ConnectivityOutcome::TimedOut => {
                    log::warn!("Failed to connect as STA, falling back to AP mode.");
                }
            }
        } else {
            log::info!("No stored WiFi credentials");
        }

        self.enter(State::Fallback);
        self.network.start_access_point(
            &self.config.ap_ssid,
            &self.config.ap_password,
            self.config.ap_max_clients,
        )?;
        self.portal.start(self.slot.clone())?;
        log::info!("Started WiFi Config Server in AP mode.");

        self.enter(State::AwaitingCapture);
        let captured = self.await_capture().await;

        self.enter(State::Persisting);
        log::info!("Got credentials from web. Saving to NVS and rebooting...");
        if let Err(e) = self.store.save(&captured) {
            // restart anyway, the next boot falls back to AP mode again
            log::error!("Failed to save credentials: {e}");
        }

        self.enter(State::Restarting);
        Ok(Restart)
    }

    /// Keep running boot cycles in-process, tearing down between them.
    ///
    /// For hosts where a device restart is not available; each cycle starts
    /// from `Init` with a fresh capture slot.
    pub async fn run_forever(mut self) -> anyhow::Result<Infallible> {
        loop {
            let Restart = self.run().await?;
            self.portal.stop();
            if let Err(e) = self.network.stop() {
                log::warn!("Failed to stop network: {:?}", e);
            }
            self.slot = CaptureSlot::new();
            self.state = State::Init;
        }
    }

    async fn attempt(&mut self, credentials: &Credentials) -> ConnectivityOutcome {
        ConnectSupervisor::new(self.config.connect_timeout)
            .attempt(&mut self.network, credentials)
            .await
    }

    /// Connected: serve the portal for late reconfiguration and idle.
    ///
    /// Submissions made now are captured but not acted upon.
    async fn serve_connected(&mut self) -> anyhow::Result<Restart> {
        log::info!("Connected to WiFi successfully.");
        match self.portal.start(self.slot.clone()) {
            Ok(()) => log::info!("Started WiFi Config Server in STA mode."),
            Err(e) => log::error!("Failed to start WiFi Config Server: {:?}", e),
        }
        loop {
            std::future::pending::<()>().await;
        }
    }

    async fn await_capture(&self) -> Credentials {
        loop {
            if let Some(credentials) = self.slot.get() {
                return credentials;
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}
