//! router-sim - Simulated home router
//!
//! Implements [`RouterConnector`](router_core::RouterConnector) and
//! [`RouterHandle`](router_core::RouterHandle) over in-memory state. Used by
//! `routerd` when no real router client is configured, and by tests, which
//! use its call counters and fault injection to observe what the dispatcher
//! did.

pub mod router;
pub mod state;

pub use router::{SimHandle, SimRouter, SimStats};
pub use state::RouterState;
