//! Sync jobs that keep the marketing service and the directory consistent.
//!
//! Every job is written against the [`DirectoryClient`] and
//! [`MarketingClient`] traits from `roster-core`; HTTP lives in
//! `roster-http`.
//!
//! [`DirectoryClient`]: roster_core::directory::DirectoryClient
//! [`MarketingClient`]: roster_core::marketing::MarketingClient

pub mod batch;
pub mod conference_newsletters;
pub mod error;
pub mod policy;
pub mod reconcile;
pub mod resolve;
pub mod stats;
pub mod subscriptions;
pub mod week_conferences;

#[cfg(test)]
pub(crate) mod testing;
#[cfg(test)]
mod tests;

pub use conference_newsletters::assign_conference_newsletters;
pub use error::{Error, Result};
pub use stats::{SyncOutcome, SyncStats};
pub use subscriptions::{Selection, sync_subscriptions};
pub use week_conferences::assign_week_conferences;

use serde::Deserialize;

use crate::batch::{BatchScheduler, DEFAULT_CHUNK_SIZE};

/// Run-wide knobs shared by every job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  /// Units processed concurrently; the next chunk waits for this one.
  pub chunk_size: usize,
  /// Compute and log every write without performing it.
  pub dry_run:    bool,
  /// Process at most this many units.
  pub limit:      Option<usize>,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      chunk_size: DEFAULT_CHUNK_SIZE,
      dry_run:    false,
      limit:      None,
    }
  }
}

impl SyncConfig {
  pub fn scheduler(&self) -> BatchScheduler { BatchScheduler::new(self.chunk_size) }
}
