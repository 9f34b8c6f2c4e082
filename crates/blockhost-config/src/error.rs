use std::path::PathBuf;

/// Errors that can occur while loading host configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  /// The config file could not be read.
  #[error("failed to read config file {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The config file is not valid config JSON.
  #[error("failed to parse config file {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  /// A setting holds a value the host cannot run with.
  #[error("invalid value for {field}: {message}")]
  InvalidValue { field: &'static str, message: String },
}
