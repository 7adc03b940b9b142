//! Layered configuration: optional TOML file, then `ROSTER_*` environment.

use std::path::Path;

use roster_http::{DirectoryConfig, HttpConfig, SenderConfig};
use roster_sync::SyncConfig;
use serde::Deserialize;

/// Everything the binary reads from configuration.
///
/// ```toml
/// [directory]
/// base_url = "https://www.ncpilgrimage.com/api"
///
/// [sender]
/// token = "..."
///
/// [http]
/// max_connections_per_host = 2
///
/// [sync]
/// chunk_size = 20
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub directory: DirectoryConfig,
  pub sender:    SenderConfig,
  pub http:      HttpConfig,
  pub sync:      SyncConfig,
}

impl Settings {
  /// Read `path` if it exists, then overlay environment variables such as
  /// `ROSTER_SYNC__CHUNK_SIZE=10`.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("ROSTER")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }
}
