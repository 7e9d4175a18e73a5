//! Radio abstraction: station join, soft-AP and connectivity events.

use tokio::sync::mpsc;

use crate::credentials::Credentials;

#[cfg(target_os = "espidf")]
mod esp;
#[cfg(target_os = "espidf")]
pub use esp::EspNetwork;

/// Station connectivity transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetEvent {
    Disconnected,
    GotAddress,
}

pub trait Network {
    /// Start listening for [`NetEvent`]s. Listening ends when the returned
    /// [`Subscription`] is dropped.
    fn subscribe(&mut self) -> anyhow::Result<Subscription>;

    /// Begin joining `credentials` as a client. Does not wait for the outcome.
    fn start_station(&mut self, credentials: &Credentials) -> anyhow::Result<()>;

    /// Host a network. An empty `password` makes it open.
    fn start_access_point(
        &mut self,
        ssid: &str,
        password: &str,
        max_clients: u16,
    ) -> anyhow::Result<()>;

    /// Bring the radio down.
    fn stop(&mut self) -> anyhow::Result<()>;
}

/// Sending half handed to whatever produces events.
#[derive(Debug, Clone)]
pub struct EventSender(mpsc::UnboundedSender<NetEvent>);

impl EventSender {
    /// Returns `false` once the subscription is gone.
    pub fn send(&self, event: NetEvent) -> bool {
        self.0.send(event).is_ok()
    }
}

/// A scoped event subscription.
///
/// Owns whatever keeps the producers registered (its guards); dropping the
/// subscription drops the guards and so unregisters the producers.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<NetEvent>,
    _guards: Vec<Box<dyn Send>>,
}

impl Subscription {
    pub fn channel() -> (EventSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            EventSender(tx),
            Self {
                events: rx,
                _guards: Vec::new(),
            },
        )
    }

    /// Tie `guard`'s lifetime to this subscription.
    pub fn guard(mut self, guard: impl Send + 'static) -> Self {
        self._guards.push(Box::new(guard));
        self
    }

    /// Next event, or `None` if every sender is gone.
    pub async fn recv(&mut self) -> Option<NetEvent> {
        self.events.recv().await
    }
}
