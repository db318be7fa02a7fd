//! Simulated router connector and session handles

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use router_core::{
    Action, Band, ClientError, ClientResult, Credentials, DataKind, Identity, RouterConnector,
    RouterHandle,
};
use serde_json::Value;
use tracing::debug;

use crate::state::RouterState;

/// Injected failures and delays
#[derive(Debug, Clone, Default)]
struct Faults {
    connect: Option<ClientError>,
    fetch: Option<ClientError>,
    apply: Option<ClientError>,
    empty: Vec<DataKind>,
    latency: Duration,
    panic_on_fetch: bool,
    unconfirmed: bool,
}

/// Call counters, readable from tests
#[derive(Debug, Default)]
struct Counters {
    connects: AtomicU64,
    disconnects: AtomicU64,
    fetches: AtomicU64,
    applies: AtomicU64,
    identity_calls: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Snapshot of the simulator's call counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimStats {
    /// Successful logins
    pub connects: u64,
    pub disconnects: u64,
    pub fetches: u64,
    pub applies: u64,
    pub identity_calls: u64,
    /// Highest number of router calls observed in flight at once
    pub max_concurrent_calls: usize,
}

impl SimStats {
    /// Calls made on handles, excluding connect/disconnect
    pub fn calls(&self) -> u64 {
        self.fetches + self.applies + self.identity_calls
    }
}

struct Inner {
    username: String,
    password: String,
    state: RwLock<RouterState>,
    faults: RwLock<Faults>,
    counters: Counters,
    /// Bumped to expire every open session
    generation: AtomicU64,
}

/// Simulated router.
///
/// Cloning gives another reference to the same router, so a test can keep a
/// copy for fault injection and assertions while the dispatcher owns another.
#[derive(Clone)]
pub struct SimRouter {
    inner: Arc<Inner>,
}

impl SimRouter {
    /// Router accepting exactly these credentials
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::with_state(username, password, RouterState::default())
    }

    pub fn with_state(
        username: impl Into<String>,
        password: impl Into<String>,
        state: RouterState,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                username: username.into(),
                password: password.into(),
                state: RwLock::new(state),
                faults: RwLock::new(Faults::default()),
                counters: Counters::default(),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn stats(&self) -> SimStats {
        let c = &self.inner.counters;
        SimStats {
            connects: c.connects.load(Ordering::SeqCst),
            disconnects: c.disconnects.load(Ordering::SeqCst),
            fetches: c.fetches.load(Ordering::SeqCst),
            applies: c.applies.load(Ordering::SeqCst),
            identity_calls: c.identity_calls.load(Ordering::SeqCst),
            max_concurrent_calls: c.max_in_flight.load(Ordering::SeqCst),
        }
    }

    /// Read access to the router state
    pub fn state(&self) -> RouterState {
        self.inner.state.read().clone()
    }

    /// Modify the router state directly
    pub fn update_state(&self, f: impl FnOnce(&mut RouterState)) {
        f(&mut self.inner.state.write());
    }

    pub fn set_clients(&self, clients: Value) {
        self.inner.state.write().clients = clients;
    }

    /// Replace the radio bands the router reports (and accepts)
    pub fn set_bands(&self, bands: Vec<Band>) {
        let mut state = self.inner.state.write();
        state.radios = bands.iter().map(|b| (*b, true)).collect();
        state.identity.bands = bands;
    }

    pub fn set_speedtest_duration(&self, duration: Duration) {
        self.inner.state.write().speedtest_duration = duration;
    }

    pub fn fail_connect(&self, error: Option<ClientError>) {
        self.inner.faults.write().connect = error;
    }

    pub fn fail_fetch(&self, error: Option<ClientError>) {
        self.inner.faults.write().fetch = error;
    }

    pub fn fail_apply(&self, error: Option<ClientError>) {
        self.inner.faults.write().apply = error;
    }

    /// Make `kind` come back absent (or present again)
    pub fn set_empty(&self, kind: DataKind, empty: bool) {
        let mut faults = self.inner.faults.write();
        faults.empty.retain(|k| *k != kind);
        if empty {
            faults.empty.push(kind);
        }
    }

    /// Delay every login and call
    pub fn set_latency(&self, latency: Duration) {
        self.inner.faults.write().latency = latency;
    }

    pub fn panic_on_fetch(&self, panic: bool) {
        self.inner.faults.write().panic_on_fetch = panic;
    }

    /// Apply mutations but report them as unconfirmed
    pub fn set_unconfirmed(&self, unconfirmed: bool) {
        self.inner.faults.write().unconfirmed = unconfirmed;
    }

    /// Expire every open session, as a router restart or idle logout would
    pub fn drop_sessions(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn faults(&self) -> Faults {
        self.inner.faults.read().clone()
    }
}

#[async_trait]
impl RouterConnector for SimRouter {
    async fn connect(&self, credentials: &Credentials) -> ClientResult<Arc<dyn RouterHandle>> {
        let faults = self.faults();
        if !faults.latency.is_zero() {
            tokio::time::sleep(faults.latency).await;
        }
        if let Some(err) = faults.connect {
            return Err(err);
        }
        if credentials.username != self.inner.username || credentials.password != self.inner.password
        {
            return Err(ClientError::Authentication(
                "Invalid username or password".to_string(),
            ));
        }
        self.inner.counters.connects.fetch_add(1, Ordering::SeqCst);
        debug!(host = %credentials.hostname, "Simulated router login");
        Ok(Arc::new(SimHandle {
            router: self.clone(),
            generation: self.inner.generation.load(Ordering::SeqCst),
            open: AtomicBool::new(true),
        }))
    }
}

/// Tracks calls in flight for the concurrency high-water mark
struct InFlight<'a>(&'a Counters);

impl<'a> InFlight<'a> {
    fn enter(counters: &'a Counters) -> Self {
        let now = counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        counters.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(counters)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// An authenticated session on a [`SimRouter`]
pub struct SimHandle {
    router: SimRouter,
    generation: u64,
    open: AtomicBool,
}

impl SimHandle {
    fn ensure_open(&self) -> ClientResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(ClientError::Network("Session expired".to_string()))
        }
    }

    async fn delay(&self, faults: &Faults) {
        if !faults.latency.is_zero() {
            tokio::time::sleep(faults.latency).await;
        }
    }
}

#[async_trait]
impl RouterHandle for SimHandle {
    fn is_connected(&self) -> bool {
        self.open.load(Ordering::SeqCst)
            && self.generation == self.router.inner.generation.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) -> ClientResult<()> {
        if self.open.swap(false, Ordering::SeqCst) {
            self.router
                .inner
                .counters
                .disconnects
                .fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn fetch(&self, kind: DataKind, _params: Option<Value>) -> ClientResult<Option<Value>> {
        let counters = &self.router.inner.counters;
        counters.fetches.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight::enter(counters);
        self.ensure_open()?;

        let faults = self.router.faults();
        self.delay(&faults).await;
        if faults.panic_on_fetch {
            panic!("simulated router client fault while fetching {}", kind);
        }
        if let Some(err) = faults.fetch {
            return Err(err);
        }
        if faults.empty.contains(&kind) {
            return Ok(None);
        }
        Ok(self.router.inner.state.read().render(kind))
    }

    async fn apply(&self, action: Action) -> ClientResult<bool> {
        let counters = &self.router.inner.counters;
        counters.applies.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight::enter(counters);
        self.ensure_open()?;

        let faults = self.router.faults();
        self.delay(&faults).await;
        if let Some(err) = faults.apply {
            return Err(err);
        }
        let confirmed = self.router.inner.state.write().apply(&action)?;
        debug!(action = %action.describe(), confirmed, "Simulated router applied action");
        Ok(confirmed && !faults.unconfirmed)
    }

    async fn identity(&self, _force: bool) -> ClientResult<Identity> {
        let counters = &self.router.inner.counters;
        counters.identity_calls.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight::enter(counters);
        self.ensure_open()?;

        let faults = self.router.faults();
        self.delay(&faults).await;
        Ok(self.router.inner.state.read().identity.clone())
    }
}
