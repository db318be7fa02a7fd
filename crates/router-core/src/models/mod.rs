//! Shared data models for router clients

mod action;
mod band;
mod credentials;
mod data_kind;
mod identity;

pub use action::*;
pub use band::*;
pub use credentials::*;
pub use data_kind::*;
pub use identity::*;
