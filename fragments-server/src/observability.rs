//! Logging and error reporting setup.

use std::env;
use std::io::IsTerminal;

use secrecy::ExposeSecret;
use sentry::integrations::tracing as sentry_tracing;
use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, Registry, prelude::*};

use crate::config::{Config, LogFormat};

/// The release name reported to Sentry.
const RELEASE: &str = concat!("fragments@", env!("CARGO_PKG_VERSION"));

/// Initializes the Sentry client if a DSN is configured.
///
/// The returned guard flushes pending events when dropped. This must be called before the async
/// runtime is created.
pub fn init_sentry(config: &Config) -> Option<sentry::ClientInitGuard> {
    let sentry_config = &config.sentry;
    let dsn = sentry_config.dsn.as_ref()?;

    Some(sentry::init(sentry::ClientOptions {
        dsn: dsn.expose_secret().as_str().parse().ok(),
        release: Some(RELEASE.into()),
        environment: sentry_config.environment.clone(),
        server_name: sentry_config.server_name.clone(),
        sample_rate: sentry_config.sample_rate,
        traces_sample_rate: sentry_config.traces_sample_rate,
        debug: sentry_config.debug,
        enable_logs: true,
        ..Default::default()
    }))
}

/// Installs the global tracing subscriber.
///
/// Logs are written to stderr in the configured format. If Sentry is enabled, warnings and errors
/// are also reported as Sentry events.
pub fn init_tracing(config: &Config) {
    // Same as the default filter, except it converts warnings into events
    // and also sends everything at or above INFO as logs instead of breadcrumbs.
    let sentry_layer = config.sentry.is_enabled().then(|| {
        sentry_tracing::layer().event_filter(|metadata| match *metadata.level() {
            Level::ERROR | Level::WARN => {
                sentry_tracing::EventFilter::Event | sentry_tracing::EventFilter::Log
            }
            Level::INFO => sentry_tracing::EventFilter::Log,
            Level::DEBUG | Level::TRACE => sentry_tracing::EventFilter::Ignore,
        })
    });

    let (level, env_filter) = parse_rust_log(config.logging.level);

    tracing_subscriber::registry()
        .with(format_layer(config.logging.format).with_filter(level))
        .with(sentry_layer)
        .with(env_filter)
        .init();
}

fn format_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    match format {
        LogFormat::Auto if std::io::stderr().is_terminal() => layer.pretty().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Auto | LogFormat::Simplified => layer.compact().with_ansi(false).boxed(),
        LogFormat::Json => layer
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .boxed(),
    }
}

/// Resolves the effective log level and filter.
///
/// If `RUST_LOG` is a plain level such as `debug`, it overrides `default_level`. Any other value is
/// used literally as filter directives, and the level is not restricted further.
pub fn parse_rust_log(default_level: LevelFilter) -> (LevelFilter, EnvFilter) {
    let level = match env::var(EnvFilter::DEFAULT_ENV) {
        Ok(value) => match value.parse::<LevelFilter>() {
            Ok(level) => level,
            Err(_) => return (LevelFilter::TRACE, EnvFilter::new(value)),
        },
        Err(_) => default_level,
    };

    // This is the maximum verbosity that will be logged, we filter this down to `level`.
    let env_filter = EnvFilter::new(
        "INFO,\
        tower_http=TRACE,\
        fragments_server=TRACE,\
        fragments_service=TRACE,\
        fragments_types=TRACE,\
        ",
    );

    (level, env_filter)
}
