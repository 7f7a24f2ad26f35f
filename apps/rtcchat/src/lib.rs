//! # RTCChat Library
//!
//! This library exposes the server modules for testing and integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;

// Re-export rtcchat_core for convenience
pub use rtcchat_core;
