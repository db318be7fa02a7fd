//! router-core - Core traits and types for router management
//!
//! This crate owns everything the transport skins share:
//!
//! - the router-client capability ([`RouterConnector`] / [`RouterHandle`]),
//! - the data model ([`DataKind`], [`Action`], [`Identity`], ...),
//! - session lifecycle ([`SessionManager`]) with per-call and shared policies,
//! - the operation catalog and the [`Dispatcher`] that turns a named call into
//!   a result [`Envelope`].
//!
//! # Architecture
//!
//! ```text
//!   HTTP adapter        tool adapter
//!        │                   │
//!        └───────┬───────────┘
//!                ▼
//!   Operation::from_call  (validation, no network)
//!                │
//!                ▼
//!           Dispatcher ──► SessionManager ──► RouterConnector
//!                │               │
//!                │          Session (RouterHandle)
//!                ▼
//!            Envelope
//! ```

pub mod catalog;
pub mod client;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod models;
pub mod operation;
pub mod session;

pub use catalog::{OperationKind, OperationSpec, ParamDefault, ParamSpec, ParamType, OPERATIONS};
pub use client::{RouterConnector, RouterHandle};
pub use dispatch::{DispatchConfig, Dispatcher, SpeedtestConfig};
pub use envelope::Envelope;
pub use error::{ClientError, ClientResult, OperationError, OperationResult};
pub use models::*;
pub use operation::{Operation, Request};
pub use session::{Session, SessionConfig, SessionError, SessionManager, SessionPolicy};
