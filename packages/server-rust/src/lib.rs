//! `fedithread` server: thread pages and federation documents over axum.

pub mod auth;
pub mod memory;
pub mod network;
pub mod web;

pub use network::{NetworkConfig, NetworkModule};
pub use web::{WebConfig, WebState};
