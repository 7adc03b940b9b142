//! Error type for `roster-sync`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("directory error: {0}")]
  Directory(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("marketing service error: {0}")]
  Marketing(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("no group resolved for newsletter {0:?}")]
  UnmappedNewsletter(String),

  #[error("week does not have a location")]
  MissingLocation,

  #[error("no conference mapped to location {0:?}")]
  UnmappedLocation(String),

  #[error("no conference id found for conference named {0:?}")]
  UnknownConference(String),
}

impl Error {
  pub fn directory(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Directory(Box::new(e))
  }

  pub fn marketing(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Marketing(Box::new(e))
  }

  /// Whether this error is a gap in the fixed domain mapping rather than a
  /// failure. Mapping gaps skip the record instead of counting as errors.
  pub fn is_mapping_gap(&self) -> bool {
    matches!(
      self,
      Self::UnmappedNewsletter(_)
        | Self::MissingLocation
        | Self::UnmappedLocation(_)
        | Self::UnknownConference(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
