//! mediasrv - Content-addressed media presence server
//!
//! This library crate exposes the core functionality for integration testing.

pub mod collector;
pub mod config;
pub mod digest;
pub mod handler;
pub mod index;
pub mod protocol;
pub mod server;
