//! Router-client capability - the seam to the device
//!
//! Everything that actually talks to a router lives behind these two traits.
//! The dispatcher never sees vendor details: it connects, makes one (or a
//! fixed few) calls on the returned handle and disconnects.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ClientResult;
use crate::models::{Action, Credentials, DataKind, Identity};

/// Opens authenticated sessions to a router
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RouterConnector: Send + Sync {
    /// Authenticate and return a live handle.
    ///
    /// Fails with [`ClientError::Authentication`](crate::ClientError::Authentication)
    /// or [`ClientError::Network`](crate::ClientError::Network).
    async fn connect(&self, credentials: &Credentials) -> ClientResult<Arc<dyn RouterHandle>>;
}

/// An authenticated session to a router
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RouterHandle: Send + Sync {
    /// Whether the session is still believed to be usable
    fn is_connected(&self) -> bool;

    /// Terminate the session. Calling it on a closed session is not an error.
    async fn disconnect(&self) -> ClientResult<()>;

    /// Fetch one category of data. `Ok(None)` means the router has no data
    /// for this kind.
    async fn fetch(&self, kind: DataKind, params: Option<Value>) -> ClientResult<Option<Value>>;

    /// Apply a mutation. Returns whether the change was observed to take effect.
    async fn apply(&self, action: Action) -> ClientResult<bool>;

    /// Router model, firmware and capabilities. `force` bypasses any cache.
    async fn identity(&self, force: bool) -> ClientResult<Identity>;
}
