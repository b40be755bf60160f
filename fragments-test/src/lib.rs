//! Test utilities for the fragments server.
//!
//! See the modules for all available utilities.

pub mod server;
pub mod tracing;
