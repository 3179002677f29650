//! Router configuration with environment variable support
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `TJALL_ROOT_DIR` | [`RouterConfig::root_dir`] | empty |
//! | `TJALL_ROUTES_DIR` | [`RouterConfig::routes_dir`] | `src/routes` |
//! | `TJALL_MODE` | [`RouterConfig::mode`] | `production` |
//! | `TJALL_ADDR` | [`RouterConfig::addr`] | `127.0.0.1:8080` |
//!
//! # Example
//!
//! ```ignore
//! use tjall_router::{init_tracing, Router, RouterConfig};
//!
//! let config = RouterConfig::from_env()?;
//! init_tracing(&config);
//! let router = Router::configure(&config);
//! ```

use serde::{Deserialize, Deserializer};
use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Error type for configuration loading failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable deserialization failed
    #[error("Configuration error: {0}")]
    Env(#[from] envy::Error),
}

/// Runtime mode of the router
///
/// In [`Mode::Dev`] the error boundary is not installed: unexpected failures
/// are returned from [`Router::run`](crate::Router::run) unhandled so they
/// stay visible. [`Mode::Production`] masks them behind a 500 response.
///
/// Only `dev` (or `development`) selects development mode; any other name
/// means production.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Development mode, errors left unhandled
    Dev,
    /// Production mode, errors rendered by the boundary
    #[default]
    Production,
}

impl Mode {
    /// Mode selected by a configuration value
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Self::Dev,
            _ => Self::Production,
        }
    }

    /// Check if running in development mode
    pub fn is_dev(self) -> bool {
        matches!(self, Self::Dev)
    }

    /// Get the mode name as a string
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Production => "production",
        }
    }

    /// Default log level for this mode
    pub fn default_log_level(self) -> &'static str {
        match self {
            Self::Dev => "debug",
            Self::Production => "info",
        }
    }
}

impl FromStr for Mode {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration consumed by [`Router::configure`](crate::Router::configure)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Application root the routes directory is resolved against
    pub root_dir: PathBuf,
    /// Directory holding the route files
    pub routes_dir: PathBuf,
    /// Runtime mode
    pub mode: Mode,
    /// Address [`serve`](crate::serve) binds to
    pub addr: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::new(),
            routes_dir: PathBuf::from("src/routes"),
            mode: Mode::default(),
            addr: "127.0.0.1:8080".to_string(),
        }
    }
}

impl RouterConfig {
    /// Prefix of the environment variables read by [`RouterConfig::from_env`]
    pub const ENV_PREFIX: &'static str = "TJALL_";

    /// Load `.env` if present, then read `TJALL_*` variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Ok(envy::prefixed(Self::ENV_PREFIX).from_env::<Self>()?)
    }

    /// Read configuration from explicit `(name, value)` pairs
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::prefixed(Self::ENV_PREFIX).from_iter::<_, Self>(vars)?)
    }

    /// Set the runtime mode
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the routes directory
    pub fn routes_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.routes_dir = dir.into();
        self
    }

    /// Set the application root
    pub fn root_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.root_dir = dir.into();
        self
    }

    /// The routes directory resolved against the root
    pub fn routes_path(&self) -> PathBuf {
        self.root_dir.join(&self.routes_dir)
    }

    /// The directory route files are matched against
    ///
    /// Route files know their source path relative to the build directory,
    /// so an absolute root narrows the match to `routes_dir` alone (made
    /// relative to the root when it lies inside it).
    pub fn route_files_dir(&self) -> PathBuf {
        if !self.root_dir.is_absolute() {
            return self.routes_path();
        }
        self.routes_dir
            .strip_prefix(&self.root_dir)
            .unwrap_or(&self.routes_dir)
            .to_path_buf()
    }
}

/// Install a `tracing` fmt subscriber
///
/// `RUST_LOG` wins when set; otherwise the level follows the mode. Does
/// nothing if a global subscriber is already installed.
pub fn init_tracing(config: &RouterConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.mode.default_log_level()));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
