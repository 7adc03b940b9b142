//! Error types for `roster-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid identifier: {0:?}")]
  InvalidId(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
