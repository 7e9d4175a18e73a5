//! Single bounded station-join attempt.

use std::time::Duration;

use crate::{
    credentials::Credentials,
    network::{NetEvent, Network},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityOutcome {
    Connected,
    TimedOut,
}

/// Turns the radio's asynchronous station events into one outcome.
///
/// Exactly one `start_station` call per attempt; retries are the caller's
/// business.
#[derive(Debug, Clone, Copy)]
pub struct ConnectSupervisor {
    timeout: Duration,
}

impl ConnectSupervisor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Join `credentials` and wait up to the timeout for an address.
    ///
    /// Failing to subscribe or to start the join is reported as `TimedOut`
    /// without waiting.
    pub async fn attempt<N: Network>(
        &self,
        network: &mut N,
        credentials: &Credentials,
    ) -> ConnectivityOutcome {
        let mut subscription = match network.subscribe() {
            Ok(sub) => sub,
            Err(e) => {
                log::error!("Failed to subscribe to network events: {:?}", e);
                return ConnectivityOutcome::TimedOut;
            }
        };

        if let Err(e) = network.start_station(credentials) {
            log::error!("Failed to start station mode: {:?}", e);
            return ConnectivityOutcome::TimedOut;
        }

        let wait_for_address = async {
            loop {
                match subscription.recv().await {
                    Some(NetEvent::GotAddress) => break,
                    Some(NetEvent::Disconnected) => {
                        log::debug!("Station disconnected while waiting for an address");
                    }
                    // sender gone: only the timeout can end the wait
                    None => std::future::pending::<()>().await,
                }
            }
        };

        let outcome = match tokio::time::timeout(self.timeout, wait_for_address).await {
            Ok(()) => ConnectivityOutcome::Connected,
            Err(_) => ConnectivityOutcome::TimedOut,
        };

        drop(subscription);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedNetwork;
    use tokio::time::Instant;

    const TIMEOUT: Duration = Duration::from_secs(10);

    fn home() -> Credentials {
        Credentials::new("HomeNet", "hunter2")
    }

    #[tokio::test(start_paused = true)]
    async fn address_within_timeout_connects() {
        let mut net = ScriptedNetwork::new()
            .emit_after(Duration::from_secs(2), NetEvent::GotAddress);
        let start = Instant::now();

        let outcome = ConnectSupervisor::new(TIMEOUT).attempt(&mut net, &home()).await;

        assert_eq!(outcome, ConnectivityOutcome::Connected);
        assert!(start.elapsed() < TIMEOUT);
        assert_eq!(net.station_attempts(), vec![home()]);
        assert_eq!(net.subscribers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn silence_times_out_after_the_deadline() {
        let mut net = ScriptedNetwork::new();
        let start = Instant::now();

        let outcome = ConnectSupervisor::new(TIMEOUT).attempt(&mut net, &home()).await;

        assert_eq!(outcome, ConnectivityOutcome::TimedOut);
        assert!(start.elapsed() >= TIMEOUT);
        assert_eq!(net.station_attempts().len(), 1);
        assert_eq!(net.subscribers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_alone_does_not_end_the_wait() {
        let mut net = ScriptedNetwork::new()
            .emit_after(Duration::from_secs(1), NetEvent::Disconnected)
            .emit_after(Duration::from_secs(3), NetEvent::GotAddress);

        let outcome = ConnectSupervisor::new(TIMEOUT).attempt(&mut net, &home()).await;

        assert_eq!(outcome, ConnectivityOutcome::Connected);
        assert_eq!(net.station_attempts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn address_after_the_deadline_is_ignored() {
        let mut net = ScriptedNetwork::new()
            .emit_after(Duration::from_secs(11), NetEvent::GotAddress);

        let outcome = ConnectSupervisor::new(TIMEOUT).attempt(&mut net, &home()).await;

        assert_eq!(outcome, ConnectivityOutcome::TimedOut);
        assert_eq!(net.subscribers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_start_reports_timeout_and_unsubscribes() {
        let mut net = ScriptedNetwork::new().fail_station();
        let start = Instant::now();

        let outcome = ConnectSupervisor::new(TIMEOUT).attempt(&mut net, &home()).await;

        assert_eq!(outcome, ConnectivityOutcome::TimedOut);
        assert!(start.elapsed() < TIMEOUT);
        assert_eq!(net.subscribers(), 0);
    }
}
