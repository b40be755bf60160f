//! Configuration for the fragments server.
//!
//! Configuration can be loaded from multiple sources with the following precedence (highest to
//! lowest):
//!
//! 1. Environment variables (prefixed with `FRAGMENTS__`)
//! 2. YAML configuration file (specified via `-c` or `--config` flag)
//! 3. Defaults
//!
//! See [`Config`] for a description of all configuration fields and their defaults.
//!
//! # Environment Variables
//!
//! Environment variables use `FRAGMENTS__` as a prefix and double underscores (`__`) to denote
//! nested configuration structures. For example:
//!
//! - `FRAGMENTS__HTTP_ADDR=0.0.0.0:8888` sets the HTTP server address
//! - `FRAGMENTS__STORAGE__TYPE=filesystem` sets the storage type
//! - `FRAGMENTS__STORAGE__PATH=/data` sets the directory name
//!
//! # YAML Configuration File
//!
//! The above configuration in YAML format would look like this:
//!
//! ```yaml
//! http_addr: 0.0.0.0:8888
//!
//! storage:
//!   type: filesystem
//!   path: /data
//! ```

use std::borrow::Cow;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Result;
use figment::providers::{Env, Format, Serialized, Yaml};
use secrecy::{CloneableSecret, SecretBox, SerializableSecret, zeroize::Zeroize};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "FRAGMENTS__";

/// Default limit for request bodies, 5 MiB.
const DEFAULT_MAX_BODY_SIZE: usize = 5 * 1024 * 1024;

/// Newtype around `String` that protects against accidental logging of secrets in the
/// configuration. Use with [`secrecy::SecretBox`].
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigSecret(String);

impl ConfigSecret {
    /// Returns the secret value.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ConfigSecret {
    fn from(str: &str) -> Self {
        ConfigSecret(str.to_string())
    }
}

impl fmt::Debug for ConfigSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "[redacted]")
    }
}

impl CloneableSecret for ConfigSecret {}
impl SerializableSecret for ConfigSecret {}
impl Zeroize for ConfigSecret {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// Storage backend configuration.
///
/// The `type` field in YAML or `__TYPE` in environment variables determines which variant is used.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Storage {
    /// In-memory storage (type `"memory"`).
    ///
    /// All fragments are lost when the server stops. Suitable for tests and local development.
    Memory,

    /// Local filesystem storage (type `"filesystem"`).
    ///
    /// # Example
    ///
    /// ```yaml
    /// storage:
    ///   type: filesystem
    ///   path: /data
    /// ```
    FileSystem {
        /// Directory path for storing fragments.
        ///
        /// The directory is created if it doesn't exist. Relative paths are resolved from the
        /// server's working directory.
        ///
        /// # Environment Variable
        ///
        /// `FRAGMENTS__STORAGE__PATH`
        path: PathBuf,
    },
}

/// Runtime configuration for the Tokio async runtime.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Runtime {
    /// Number of worker threads for the server runtime.
    ///
    /// # Default
    ///
    /// Defaults to the number of CPU cores on the host machine.
    ///
    /// # Environment Variable
    ///
    /// `FRAGMENTS__RUNTIME__WORKER_THREADS`
    pub worker_threads: usize,
}

impl Default for Runtime {
    fn default() -> Self {
        Self {
            worker_threads: num_cpus::get(),
        }
    }
}

/// [Sentry](https://sentry.io/) error tracking configuration.
///
/// Sentry is disabled by default and only enabled when a DSN is provided.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Sentry {
    /// Sentry DSN. When `None`, Sentry integration is disabled.
    ///
    /// # Environment Variable
    ///
    /// `FRAGMENTS__SENTRY__DSN`
    pub dsn: Option<SecretBox<ConfigSecret>>,

    /// Environment name for this deployment, such as `"production"`.
    pub environment: Option<Cow<'static, str>>,

    /// Server name or identifier, usually the hostname or pod name.
    pub server_name: Option<Cow<'static, str>>,

    /// Error event sampling rate between `0.0` and `1.0`.
    ///
    /// # Default
    ///
    /// `1.0` (send all errors)
    pub sample_rate: f32,

    /// Performance trace sampling rate between `0.0` and `1.0`.
    ///
    /// # Default
    ///
    /// `0.01` (send 1% of traces)
    pub traces_sample_rate: f32,

    /// Enable Sentry SDK debug output on stderr.
    pub debug: bool,
}

impl Sentry {
    /// Returns whether Sentry integration is enabled.
    pub fn is_enabled(&self) -> bool {
        self.dsn.is_some()
    }
}

impl Default for Sentry {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            server_name: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.01,
            debug: false,
        }
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Chooses [`LogFormat::Pretty`] for TTY, otherwise [`LogFormat::Simplified`].
    Auto,

    /// Pretty printing with colors.
    ///
    /// ```text
    ///  INFO  fragments_server::web > HTTP server listening on 0.0.0.0:8080
    /// ```
    Pretty,

    /// Simplified plain text output.
    ///
    /// ```text
    /// 2020-12-04T12:10:32Z [fragments_server::web] INFO: HTTP server listening on 0.0.0.0:8080
    /// ```
    Simplified,

    /// JSON lines.
    Json,
}

/// The logging format parse error.
#[derive(Clone, Debug)]
pub struct FormatParseError(String);

impl fmt::Display for FormatParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"error parsing "{}" as format: expected one of "auto", "pretty", "simplified", "json""#,
            self.0
        )
    }
}

impl std::str::FromStr for LogFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let result = match s {
            "" => LogFormat::Auto,
            s if s.eq_ignore_ascii_case("auto") => LogFormat::Auto,
            s if s.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            s if s.eq_ignore_ascii_case("simplified") => LogFormat::Simplified,
            s if s.eq_ignore_ascii_case("json") => LogFormat::Json,
            s => return Err(FormatParseError(s.into())),
        };

        Ok(result)
    }
}

impl std::error::Error for FormatParseError {}

mod display_fromstr {
    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: std::fmt::Display,
    {
        serializer.collect_str(&value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: std::str::FromStr,
        <T as std::str::FromStr>::Err: std::fmt::Display,
    {
        use serde::Deserialize;
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Logging configuration. Logs are always written to stderr.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    /// Minimum log level to output: TRACE, DEBUG, INFO, WARN, ERROR or OFF.
    ///
    /// `RUST_LOG` takes precedence if set.
    ///
    /// # Default
    ///
    /// `INFO`
    ///
    /// # Environment Variable
    ///
    /// `FRAGMENTS__LOGGING__LEVEL`
    #[serde(with = "display_fromstr")]
    pub level: LevelFilter,

    /// Log output format, see [`LogFormat`].
    ///
    /// # Environment Variable
    ///
    /// `FRAGMENTS__LOGGING__FORMAT`
    pub format: LogFormat,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Auto,
        }
    }
}

/// Main configuration struct for the fragments server.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server bind address.
    ///
    /// # Default
    ///
    /// `0.0.0.0:8080`
    ///
    /// # Environment Variable
    ///
    /// `FRAGMENTS__HTTP_ADDR`
    pub http_addr: SocketAddr,

    /// Public base URL of the API, such as `https://fragments.example.com`.
    ///
    /// Used to build the `Location` header of created fragments. When not set, the URL is derived
    /// from the `Host` header of the request.
    ///
    /// # Environment Variable
    ///
    /// `FRAGMENTS__API_URL`
    pub api_url: Option<String>,

    /// Maximum size of request bodies in bytes. Larger requests are rejected with `413`.
    ///
    /// # Default
    ///
    /// 5 MiB
    ///
    /// # Environment Variable
    ///
    /// `FRAGMENTS__MAX_BODY_SIZE`
    pub max_body_size: usize,

    /// Storage backend for fragments.
    ///
    /// # Default
    ///
    /// Filesystem storage in the `./data` directory
    pub storage: Storage,

    /// Configuration of the internal task runtime.
    pub runtime: Runtime,

    /// Logging configuration.
    pub logging: Logging,

    /// Sentry error tracking configuration.
    pub sentry: Sentry,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            api_url: None,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            storage: Storage::FileSystem {
                path: PathBuf::from("data"),
            },
            runtime: Runtime::default(),
            logging: Logging::default(),
            sentry: Sentry::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the provided arguments.
    ///
    /// Configuration is merged in the following order (later sources override earlier ones):
    /// 1. Default values
    /// 2. YAML configuration file (if provided)
    /// 3. Environment variables (prefixed with `FRAGMENTS__`)
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML file cannot be read or parsed, or if any value fails to
    /// deserialize into its target type.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }
}
