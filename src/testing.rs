//! Scripted collaborators for unit tests.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use crate::{
    captive_portal::{accept_submission, CaptureError, CaptureSlot, Portal},
    credentials::Credentials,
    network::{EventSender, NetEvent, Network, Subscription},
    store::{CredentialStore, StoreError},
};

/// In-memory store with the same write-then-commit visibility as NVS.
///
/// Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryRecord>>,
}

#[derive(Debug, Default)]
struct MemoryRecord {
    committed: Option<Credentials>,
    fail_commit: bool,
    saves: usize,
}

impl MemoryStore {
    pub fn with_credentials(credentials: Credentials) -> Self {
        let store = Self::default();
        store.lock().committed = Some(credentials);
        store
    }

    /// Make every following commit fail.
    pub fn fail_commits(&self, fail: bool) {
        self.lock().fail_commit = fail;
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> MutexGuard<'_, MemoryRecord> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Option<Credentials> {
        self.lock().committed.clone()
    }

    fn save(&mut self, credentials: &Credentials) -> Result<(), StoreError> {
        let mut record = self.lock();

        // both fields are staged; only the commit makes them visible
        let staged = credentials.clone();
        if record.fail_commit {
            return Err(StoreError::unavailable("commit", "injected failure"));
        }
        record.committed = Some(staged);
        record.saves += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPoint {
    pub ssid: String,
    pub password: String,
    pub max_clients: u16,
}

#[derive(Default)]
struct NetState {
    script: Vec<(Duration, NetEvent)>,
    fail_station: bool,
    fail_access_point: bool,
    next_id: usize,
    subscribers: Vec<(usize, EventSender)>,
    station_attempts: Vec<Credentials>,
    access_points: Vec<AccessPoint>,
    stops: usize,
}

/// Network that replays a fixed event script after every `start_station`.
#[derive(Clone, Default)]
pub struct ScriptedNetwork {
    state: Arc<Mutex<NetState>>,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit_after(self, delay: Duration, event: NetEvent) -> Self {
        self.lock().script.push((delay, event));
        self
    }

    pub fn fail_station(self) -> Self {
        self.lock().fail_station = true;
        self
    }

    pub fn fail_access_point(self) -> Self {
        self.lock().fail_access_point = true;
        self
    }

    pub fn station_attempts(&self) -> Vec<Credentials> {
        self.lock().station_attempts.clone()
    }

    pub fn access_points(&self) -> Vec<AccessPoint> {
        self.lock().access_points.clone()
    }

    pub fn subscribers(&self) -> usize {
        self.lock().subscribers.len()
    }

    pub fn stops(&self) -> usize {
        self.lock().stops
    }

    fn lock(&self) -> MutexGuard<'_, NetState> {
        self.state.lock().unwrap()
    }
}

struct Unsubscribe {
    state: Arc<Mutex<NetState>>,
    id: usize,
}

impl Drop for Unsubscribe {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.subscribers.retain(|(id, _)| *id != self.id);
    }
}

impl Network for ScriptedNetwork {
    fn subscribe(&mut self) -> anyhow::Result<Subscription> {
        let (tx, subscription) = Subscription::channel();
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.subscribers.push((id, tx));
        Ok(subscription.guard(Unsubscribe {
            state: self.state.clone(),
            id,
        }))
    }

    fn start_station(&mut self, credentials: &Credentials) -> anyhow::Result<()> {
        let mut state = self.lock();
        state.station_attempts.push(credentials.clone());
        if state.fail_station {
            anyhow::bail!("station start failed");
        }
        for (delay, event) in state.script.clone() {
            let shared = self.state.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let subscribers = shared.lock().unwrap().subscribers.clone();
                for (_, tx) in subscribers {
                    tx.send(event);
                }
            });
        }
        Ok(())
    }

    fn start_access_point(
        &mut self,
        ssid: &str,
        password: &str,
        max_clients: u16,
    ) -> anyhow::Result<()> {
        let mut state = self.lock();
        if state.fail_access_point {
            anyhow::bail!("access point start failed");
        }
        state.access_points.push(AccessPoint {
            ssid: ssid.to_string(),
            password: password.to_string(),
            max_clients,
        });
        Ok(())
    }

    fn stop(&mut self) -> anyhow::Result<()> {
        self.lock().stops += 1;
        Ok(())
    }
}

#[derive(Default)]
struct PortalState {
    slot: Option<CaptureSlot>,
    starts: usize,
    stops: usize,
}

/// Portal that keeps the slot so tests can post forms to it.
#[derive(Clone, Default)]
pub struct FakePortal {
    state: Arc<Mutex<PortalState>>,
}

impl FakePortal {
    pub fn starts(&self) -> usize {
        self.state.lock().unwrap().starts
    }

    pub fn stops(&self) -> usize {
        self.state.lock().unwrap().stops
    }

    /// POST `/wifi` with `body`.
    pub fn post_wifi(&self, body: &[u8]) -> Result<Credentials, CaptureError> {
        let slot = self
            .state
            .lock()
            .unwrap()
            .slot
            .clone()
            .expect("portal not started");
        let mut rest = body;
        accept_submission(&slot, body.len(), |buf: &mut [u8]| {
            let n = rest.len().min(buf.len());
            buf[..n].copy_from_slice(&rest[..n]);
            rest = &rest[n..];
            Ok::<_, std::io::Error>(n)
        })
    }
}

impl Portal for FakePortal {
    fn start(&mut self, slot: CaptureSlot) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.slot = Some(slot);
        state.starts += 1;
        Ok(())
    }

    fn stop(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.slot = None;
        state.stops += 1;
    }
}
