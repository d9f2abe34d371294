//! Tubeforged - media link resolver and transcoding proxy
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod server;
pub mod streaming;
