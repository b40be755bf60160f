//! Module implementing the fragments API webserver.
//!
//! The main server application is implemented in the [`App`] struct, which sets up routing and
//! middleware. To listen to incoming connections, use the [`server()`] function, which opens a
//! TCP listener and serves the application until shutdown.
//!
//! # Testing
//!
//! For end-to-end tests of the server, see the `fragments-test` crate, which provides utilities to
//! start a test server.

mod app;
mod middleware;
mod server;

pub use app::App;
pub use server::server;
