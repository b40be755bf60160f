//! Logging for tests.

use tracing_subscriber::EnvFilter;

/// Crates whose logs are shown at every level by default.
const CRATE_NAMES: &[&str] = &["fragments_server", "fragments_service", "fragments_types"];

/// Initializes logging for tests.
///
/// Output goes to the stdout captured by the test runner. `RUST_LOG` replaces the default filter,
/// which shows errors from dependencies and everything from the fragments crates. Calling this
/// more than once is fine.
///
/// # Example
///
/// ```
/// fragments_test::tracing::init();
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_test_writer()
        .compact()
        .try_init()
        .ok();
}

fn default_filter() -> EnvFilter {
    CRATE_NAMES.iter().fold(EnvFilter::new("ERROR"), |filter, name| {
        match format!("{name}=TRACE").parse() {
            Ok(directive) => filter.add_directive(directive),
            Err(_) => filter,
        }
    })
}
