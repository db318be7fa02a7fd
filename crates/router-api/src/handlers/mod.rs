//! HTTP request handlers for the router API
//!
//! Handlers are thin: they collect arguments and call the dispatcher.

pub mod health;
pub mod operations;
