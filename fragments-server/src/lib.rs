//! The fragments server component.
//!
//! This builds on top of [`fragments_service`] and exposes owner-scoped fragments over `HTTP`.
//! Owners are identified by the `x-owner-id` header, which an authenticating gateway in front of
//! the server is expected to set.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod cli;
pub mod config;
pub mod endpoints;
pub mod extractors;
pub mod healthcheck;
pub mod observability;
pub mod state;
pub mod web;
