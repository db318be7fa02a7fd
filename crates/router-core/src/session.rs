//! Router session lifecycle
//!
//! Two policies:
//!
//! - **Per-call**: every scoped invocation connects, runs, and disconnects.
//!   Teardown runs on every exit path, including deadline expiry and a
//!   panicking router client.
//! - **Shared**: at most one cached handle, created lazily under a lock that
//!   covers only the acquire-or-create decision. A failure observed on the
//!   cached handle evicts it so the next acquire reconnects.
//!
//! Under the shared policy router-client calls can additionally be serialized
//! through a call gate (`serialize_calls`), for clients that cannot take
//! concurrent requests on one session.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::{RouterConnector, RouterHandle};
use crate::error::{ClientError, ClientResult, OperationError};
use crate::models::{Action, Credentials, DataKind, Identity};

/// How router sessions are shared between invocations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPolicy {
    /// Fresh session per invocation
    #[default]
    PerCall,
    /// One lazily created session reused while connected
    Shared,
}

impl std::fmt::Display for SessionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPolicy::PerCall => f.write_str("per_call"),
            SessionPolicy::Shared => f.write_str("shared"),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub policy: SessionPolicy,
    /// Issue calls on the shared handle one at a time
    #[serde(default = "default_serialize_calls")]
    pub serialize_calls: bool,
}

fn default_serialize_calls() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            policy: SessionPolicy::default(),
            serialize_calls: default_serialize_calls(),
        }
    }
}

/// A router handle lent to one invocation
#[derive(Clone)]
pub struct Session {
    handle: Arc<dyn RouterHandle>,
    gate: Option<Arc<Mutex<()>>>,
}

impl Session {
    pub fn handle(&self) -> &Arc<dyn RouterHandle> {
        &self.handle
    }

    async fn enter(&self) -> Option<MutexGuard<'_, ()>> {
        match &self.gate {
            Some(gate) => Some(gate.lock().await),
            None => None,
        }
    }

    pub async fn fetch(&self, kind: DataKind, params: Option<Value>) -> ClientResult<Option<Value>> {
        let _permit = self.enter().await;
        self.handle.fetch(kind, params).await
    }

    pub async fn apply(&self, action: Action) -> ClientResult<bool> {
        let _permit = self.enter().await;
        self.handle.apply(action).await
    }

    pub async fn identity(&self, force: bool) -> ClientResult<Identity> {
        let _permit = self.enter().await;
        self.handle.identity(force).await
    }
}

/// Failure of a scoped session run
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Connecting or authenticating failed
    #[error("{0}")]
    Acquire(ClientError),
    /// The router client failed during the call
    #[error("{0}")]
    Call(ClientError),
    /// The deadline expired before the run finished
    #[error("Operation timed out after {0:?}")]
    Deadline(Duration),
    /// The router client panicked
    #[error("Router client fault: {0}")]
    Panicked(String),
}

impl SessionError {
    pub fn into_operation_error(self, context: &'static str) -> OperationError {
        match self {
            SessionError::Acquire(err) => OperationError::from_acquire(context, err),
            SessionError::Call(err) => OperationError::from_call(context, err),
            SessionError::Deadline(_) => OperationError::Timeout {
                context,
                message: self.to_string(),
            },
            SessionError::Panicked(_) => OperationError::Device {
                context,
                message: self.to_string(),
            },
        }
    }

    /// Whether this failure says anything about the health of the session
    fn taints_session(&self) -> bool {
        !matches!(self, SessionError::Call(ClientError::NotSupported(_)))
    }
}

/// Creates and tears down router sessions according to a [`SessionPolicy`]
pub struct SessionManager {
    connector: Arc<dyn RouterConnector>,
    credentials: Credentials,
    config: SessionConfig,
    cached: Mutex<Option<Arc<dyn RouterHandle>>>,
    gate: Arc<Mutex<()>>,
}

impl SessionManager {
    pub fn new(
        connector: Arc<dyn RouterConnector>,
        credentials: Credentials,
        config: SessionConfig,
    ) -> Self {
        Self {
            connector,
            credentials,
            config,
            cached: Mutex::new(None),
            gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn policy(&self) -> SessionPolicy {
        self.config.policy
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Whether a shared session is currently cached
    pub async fn has_cached_session(&self) -> bool {
        self.cached.lock().await.is_some()
    }

    fn shared_session(&self, handle: Arc<dyn RouterHandle>) -> Session {
        let gate = self.config.serialize_calls.then(|| self.gate.clone());
        Session { handle, gate }
    }

    /// Obtain a session for one invocation
    pub async fn acquire(&self) -> ClientResult<Session> {
        match self.config.policy {
            SessionPolicy::PerCall => {
                let handle = self.connector.connect(&self.credentials).await?;
                debug!(host = %self.credentials.hostname, "Router session opened");
                Ok(Session { handle, gate: None })
            }
            SessionPolicy::Shared => {
                let mut cached = self.cached.lock().await;
                if let Some(handle) = cached.as_ref() {
                    if handle.is_connected() {
                        return Ok(self.shared_session(handle.clone()));
                    }
                    debug!("Cached router session is no longer connected");
                    if let Some(stale) = cached.take() {
                        close(&stale).await;
                    }
                }
                let handle = self.connector.connect(&self.credentials).await?;
                info!(host = %self.credentials.hostname, "Shared router session established");
                *cached = Some(handle.clone());
                Ok(self.shared_session(handle))
            }
        }
    }

    /// Give a session back. Per-call sessions are disconnected; shared ones stay cached.
    pub async fn release(&self, session: Session) {
        if self.config.policy == SessionPolicy::PerCall {
            close(&session.handle).await;
            debug!("Router session closed");
        }
    }

    /// Evict a shared session after a failure so the next acquire reconnects
    pub async fn invalidate(&self, session: &Session) {
        if self.config.policy != SessionPolicy::Shared {
            return;
        }
        let stale = {
            let mut cached = self.cached.lock().await;
            match cached.as_ref() {
                Some(current) if Arc::ptr_eq(current, &session.handle) => cached.take(),
                _ => None,
            }
        };
        if let Some(handle) = stale {
            warn!("Evicting shared router session after failure");
            close(&handle).await;
        }
    }

    /// Drop the shared session, if any. Returns whether one was cached.
    pub async fn disconnect(&self) -> bool {
        let handle = self.cached.lock().await.take();
        match handle {
            Some(handle) => {
                close(&handle).await;
                info!("Shared router session disconnected");
                true
            }
            None => false,
        }
    }

    /// Run `f` with a session, releasing it on every exit path.
    ///
    /// `deadline` bounds acquisition plus the call. On expiry the in-flight
    /// future is dropped and the session is still released.
    pub async fn scoped<T, F, Fut>(&self, deadline: Duration, f: F) -> Result<T, SessionError>
    where
        F: FnOnce(Session) -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let started = Instant::now();
        let session = match tokio::time::timeout(deadline, self.acquire()).await {
            Ok(Ok(session)) => session,
            Ok(Err(err)) => return Err(SessionError::Acquire(err)),
            Err(_) => return Err(SessionError::Deadline(deadline)),
        };

        let remaining = deadline.saturating_sub(started.elapsed());
        let call = AssertUnwindSafe(f(session.clone())).catch_unwind();
        let outcome = match tokio::time::timeout(remaining, call).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(err))) => Err(SessionError::Call(err)),
            Ok(Err(panic)) => Err(SessionError::Panicked(panic_message(panic))),
            Err(_) => Err(SessionError::Deadline(deadline)),
        };

        if let Err(ref err) = outcome {
            if err.taints_session() {
                self.invalidate(&session).await;
            }
        }
        self.release(session).await;
        outcome
    }
}

async fn close(handle: &Arc<dyn RouterHandle>) {
    if let Err(e) = handle.disconnect().await {
        warn!(error = %e, "Router session teardown failed");
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
