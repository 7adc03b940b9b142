//! Assign every weekend to the conference of its location.

use std::{collections::HashMap, fmt, pin::pin};

use futures::StreamExt;
use roster_core::directory::{Conference, ConferenceId, DirectoryClient, Week};
use tracing::info;

use crate::{
  Error, Result, SyncConfig,
  policy::conference_for_location,
  stats::{Report, SyncOutcome, SyncStats},
};

/// The conference id a week belongs to, by way of its location.
pub fn conference_for_week(
  week: &Week,
  conference_ids: &HashMap<&str, ConferenceId>,
) -> Result<ConferenceId> {
  let location = week.location.as_deref().ok_or(Error::MissingLocation)?;
  let conference = conference_for_location(location)
    .ok_or_else(|| Error::UnmappedLocation(location.to_string()))?;
  conference_ids
    .get(conference)
    .copied()
    .ok_or_else(|| Error::UnknownConference(conference.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekKey(pub String);

impl fmt::Display for WeekKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "week #{}", self.0)
  }
}

pub async fn assign_week_conferences<D: DirectoryClient>(
  directory: &D,
  config: &SyncConfig,
) -> Result<SyncStats> {
  let (mut weeks, conferences) = tokio::try_join!(
    async { directory.get_weeks().await.map_err(Error::directory) },
    async { directory.get_conferences().await.map_err(Error::directory) },
  )?;
  info!(
    weeks = weeks.len(),
    conferences = conferences.len(),
    "found weeks and conferences"
  );

  let conference_ids: HashMap<&str, ConferenceId> = conferences
    .iter()
    .map(|Conference { id, name }| (name.as_str(), *id))
    .collect();

  if let Some(limit) = config.limit {
    weeks.truncate(limit);
  }

  let mut stats = SyncStats::default();
  let mut reports = pin!(config.scheduler().run(weeks, |week| {
    assign_week(directory, week, &conference_ids, config.dry_run)
  }));
  while let Some(report) = reports.next().await {
    report.log();
    stats.record(&report.outcome);
  }

  info!(%stats, "week conference assignment finished");
  Ok(stats)
}

async fn assign_week<D: DirectoryClient>(
  directory: &D,
  mut week: Week,
  conference_ids: &HashMap<&str, ConferenceId>,
  dry_run: bool,
) -> Report<WeekKey> {
  let key = WeekKey(week.week_id.clone());
  let outcome = async {
    let conference_id = conference_for_week(&week, conference_ids)?;
    if week.conference_id == Some(conference_id) {
      return Ok(SyncOutcome::Unchanged);
    }
    week.conference_id = Some(conference_id);
    if dry_run {
      info!(week_id = %week.week_id, %conference_id, "dry run, skipping write");
    } else {
      directory
        .update_week(&week)
        .await
        .map_err(Error::directory)?;
      info!(week_id = %week.week_id, %conference_id, "updated week conference");
    }
    Ok::<_, Error>(SyncOutcome::Updated)
  }
  .await
  .unwrap_or_else(SyncOutcome::from);
  Report { key, outcome }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn week(location: Option<&str>) -> Week {
    Week {
      week_id:       "104".into(),
      location:      location.map(Into::into),
      conference_id: None,
      extra:         Default::default(),
    }
  }

  fn ids() -> HashMap<&'static str, ConferenceId> {
    HashMap::from([("Piedmont", ConferenceId(1)), ("Eastern", ConferenceId(3))])
  }

  #[test]
  fn location_resolves_through_conference_name() {
    let id = conference_for_week(&week(Some("Camp Dixie")), &ids()).unwrap();
    assert_eq!(id, ConferenceId(3));
  }

  #[test]
  fn gaps_in_the_mapping_are_distinguished() {
    assert!(matches!(
      conference_for_week(&week(None), &ids()),
      Err(Error::MissingLocation)
    ));
    assert!(matches!(
      conference_for_week(&week(Some("Camp Unknown")), &ids()),
      Err(Error::UnmappedLocation(l)) if l == "Camp Unknown"
    ));
    assert!(matches!(
      conference_for_week(&week(Some("Camp Harrison")), &ids()),
      Err(Error::UnknownConference(c)) if c == "Western"
    ));
  }
}
