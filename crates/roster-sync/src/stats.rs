//! Per-record outcomes and the run summary folded from them.

use std::fmt;

use serde::Serialize;

use crate::Error;

/// What happened to one record during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
  Created,
  Updated,
  Unchanged,
  /// The fixed domain mapping had no answer for this record.
  Skipped { reason: String },
  Failed { error: String },
}

impl SyncOutcome {
  pub fn is_failure(&self) -> bool { matches!(self, Self::Failed { .. }) }
}

impl From<Error> for SyncOutcome {
  fn from(error: Error) -> Self {
    if error.is_mapping_gap() {
      Self::Skipped {
        reason: error.to_string(),
      }
    } else {
      Self::Failed {
        error: error.to_string(),
      }
    }
  }
}

impl fmt::Display for SyncOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Created => f.write_str("created"),
      Self::Updated => f.write_str("updated"),
      Self::Unchanged => f.write_str("not updated"),
      Self::Skipped { reason } => write!(f, "skipped: {reason}"),
      Self::Failed { error } => write!(f, "error: {error}"),
    }
  }
}

/// The outcome for one record, tagged with the key it is logged under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report<K> {
  pub key:     K,
  pub outcome: SyncOutcome,
}

impl<K: fmt::Display> Report<K> {
  pub fn log(&self) {
    match &self.outcome {
      SyncOutcome::Failed { error } => {
        tracing::error!(key = %self.key, %error, "record failed");
      }
      SyncOutcome::Skipped { reason } => {
        tracing::warn!(key = %self.key, %reason, "record skipped");
      }
      outcome => {
        tracing::info!(key = %self.key, %outcome, "finished processing record");
      }
    }
  }
}

/// Run-scoped counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
  pub created:   usize,
  pub updated:   usize,
  pub unchanged: usize,
  pub skipped:   usize,
  pub errored:   usize,
}

impl SyncStats {
  pub fn record(&mut self, outcome: &SyncOutcome) {
    match outcome {
      SyncOutcome::Created => self.created += 1,
      SyncOutcome::Updated => self.updated += 1,
      SyncOutcome::Unchanged => self.unchanged += 1,
      SyncOutcome::Skipped { .. } => self.skipped += 1,
      SyncOutcome::Failed { .. } => self.errored += 1,
    }
  }

  pub fn total(&self) -> usize {
    self.created + self.updated + self.unchanged + self.skipped + self.errored
  }
}

impl fmt::Display for SyncStats {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} created, {} updated, {} no updates, {} skipped, {} errors",
      self.created, self.updated, self.unchanged, self.skipped, self.errored
    )
  }
}
