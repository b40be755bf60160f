//! The fragments HTTP server.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

fn main() -> anyhow::Result<()> {
    fragments_server::cli::execute()
}
