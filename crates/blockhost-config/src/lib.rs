//! Blockhost Config
//!
//! Settings of a blockhost process. Values are layered, later layers winning:
//!
//! 1. built-in defaults
//! 2. an optional JSON file (camelCase keys, all optional)
//! 3. `BLOCKHOST_LISTEN_ADDR` and `BLOCKHOST_DATABASE_URL`
//! 4. command line flags, passed in as [`Overrides`]
//!
//! Validation runs once, after every layer is applied.
//!
//! ```json
//! {
//!   "listenAddr": "0.0.0.0:8000",
//!   "databaseUrl": "sqlite:///var/lib/blockhost/plugin.sqlite",
//!   "replayConcurrency": 8,
//!   "maxRequestBodyBytes": 1048576
//! }
//! ```

mod error;

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use error::ConfigError;

/// Environment variable overriding [`HostConfig::listen_addr`].
pub const LISTEN_ADDR_ENV: &str = "BLOCKHOST_LISTEN_ADDR";

/// Environment variable overriding [`HostConfig::database_url`].
pub const DATABASE_URL_ENV: &str = "BLOCKHOST_DATABASE_URL";

/// Settings given on the command line. Each one replaces both the file
/// value and the environment variable for that setting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
  pub listen_addr: Option<SocketAddr>,
  pub database_url: Option<String>,
}

/// Settings of a blockhost process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct HostConfig {
  /// Address the HTTP server binds to.
  pub listen_addr: SocketAddr,
  /// Trigger store location, e.g. `sqlite://plugin.sqlite`.
  pub database_url: String,
  /// Most watch calls in flight while replaying remembered triggers.
  pub replay_concurrency: usize,
  /// Largest request body accepted by trigger execution.
  pub max_request_body_bytes: usize,
}

impl Default for HostConfig {
  fn default() -> Self {
    Self {
      listen_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
      database_url: "sqlite://plugin.sqlite".to_string(),
      replay_concurrency: 4,
      max_request_body_bytes: 2 * 1024 * 1024,
    }
  }
}

impl HostConfig {
  /// Read a config file. Keys missing from the file keep their defaults.
  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Load from an optional file, the process environment and `overrides`.
  pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<Self, ConfigError> {
    Self::resolve(path, |name| std::env::var(name).ok(), overrides)
  }

  /// Layer file, variables looked up through `var` and `overrides`, then
  /// validate the result once.
  ///
  /// A variable is not read at all when an override replaces it, so a bad
  /// value there cannot fail startup.
  pub fn resolve(
    path: Option<&Path>,
    var: impl Fn(&str) -> Option<String>,
    overrides: Overrides,
  ) -> Result<Self, ConfigError> {
    let config = match path {
      Some(path) => Self::from_file(path)?,
      None => Self::default(),
    };

    let mut config = config.with_env(|name| match name {
      LISTEN_ADDR_ENV if overrides.listen_addr.is_some() => None,
      DATABASE_URL_ENV if overrides.database_url.is_some() => None,
      _ => var(name),
    })?;
    if let Some(addr) = overrides.listen_addr {
      config.listen_addr = addr;
    }
    if let Some(url) = overrides.database_url {
      config.database_url = url;
    }

    config.validate()?;
    Ok(config)
  }

  /// Apply overrides looked up through `var`. Does not validate.
  pub fn with_env(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
    if let Some(addr) = var(LISTEN_ADDR_ENV) {
      self.listen_addr = addr.parse().map_err(|e| ConfigError::InvalidValue {
        field: LISTEN_ADDR_ENV,
        message: format!("'{}': {}", addr, e),
      })?;
    }
    if let Some(url) = var(DATABASE_URL_ENV) {
      self.database_url = url;
    }
    Ok(self)
  }

  /// Check that the settings are usable.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if !self.database_url.starts_with("sqlite:") {
      return Err(ConfigError::InvalidValue {
        field: "databaseUrl",
        message: format!("'{}' is not a sqlite url", self.database_url),
      });
    }
    if self.replay_concurrency == 0 {
      return Err(ConfigError::InvalidValue {
        field: "replayConcurrency",
        message: "must be at least 1".to_string(),
      });
    }
    if self.max_request_body_bytes == 0 {
      return Err(ConfigError::InvalidValue {
        field: "maxRequestBodyBytes",
        message: "must be at least 1".to_string(),
      });
    }
    Ok(())
  }
}
