//! Subscribe people to the newsletters of the conferences they served in.

use std::{collections::BTreeMap, fmt, pin::pin};

use futures::StreamExt;
use roster_core::{
  directory::{DirectoryClient, Newsletter, NewsletterId},
  person::{Member, Person, PersonId},
};
use tracing::{debug, info};

use crate::{
  Error, Result, SyncConfig,
  policy::conference_for_newsletter,
  stats::{Report, SyncOutcome, SyncStats},
};

/// Conference name → the newsletter dedicated to it.
pub type ConferenceNewsletters = BTreeMap<String, NewsletterId>;

/// Index the newsletters dedicated to a conference by conference name.
pub fn conference_newsletters(newsletters: &[Newsletter]) -> ConferenceNewsletters {
  newsletters
    .iter()
    .filter_map(|n| {
      conference_for_newsletter(&n.label).map(|conf| (conf.to_string(), n.id))
    })
    .collect()
}

/// Conference newsletters the member should have but lacks, or the
/// conferences that have no newsletter if there is nothing to add.
pub fn missing_newsletters(
  member: &Member,
  by_conference: &ConferenceNewsletters,
) -> std::result::Result<Vec<NewsletterId>, Vec<String>> {
  let current = member.newsletter_ids();
  let mut missing = Vec::new();
  let mut unmapped = Vec::new();
  for name in member.conference_names() {
    match by_conference.get(name) {
      Some(id) if !current.contains(id) => missing.push(*id),
      Some(_) => {}
      None => unmapped.push(name.to_string()),
    }
  }
  if missing.is_empty() && !unmapped.is_empty() {
    return Err(unmapped);
  }
  Ok(missing)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PilgrimKey(pub PersonId);

impl fmt::Display for PilgrimKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "pilgrim id {}", self.0)
  }
}

/// Add every person to the conference newsletters they lack.
///
/// Counts a person whose newsletters were extended as updated.
pub async fn assign_conference_newsletters<D: DirectoryClient>(
  directory: &D,
  config: &SyncConfig,
) -> Result<SyncStats> {
  let (mut people, newsletters) = tokio::try_join!(
    async { directory.get_people().await.map_err(Error::directory) },
    async { directory.get_newsletters().await.map_err(Error::directory) },
  )?;
  info!(
    people = people.len(),
    newsletters = newsletters.len(),
    "fetched people and newsletters"
  );

  let by_conference = conference_newsletters(&newsletters);
  info!(count = by_conference.len(), "found conference newsletters");

  if let Some(limit) = config.limit {
    people.truncate(limit);
  }

  let mut stats = SyncStats::default();
  let mut reports = pin!(config.scheduler().run(people, |person| {
    assign_person(directory, person, &by_conference, config.dry_run)
  }));
  while let Some(report) = reports.next().await {
    report.log();
    stats.record(&report.outcome);
  }

  info!(%stats, "conference newsletter assignment finished");
  Ok(stats)
}

async fn assign_person<D: DirectoryClient>(
  directory: &D,
  person: Person,
  by_conference: &ConferenceNewsletters,
  dry_run: bool,
) -> Report<PilgrimKey> {
  let key = PilgrimKey(person.id);
  let outcome = try_assign_person(directory, person, by_conference, dry_run)
    .await
    .unwrap_or_else(SyncOutcome::from);
  Report { key, outcome }
}

async fn try_assign_person<D: DirectoryClient>(
  directory: &D,
  person: Person,
  by_conference: &ConferenceNewsletters,
  dry_run: bool,
) -> Result<SyncOutcome> {
  let id = person.id;
  let (roles, newsletters) = tokio::try_join!(
    async { directory.get_person_roles(id).await.map_err(Error::directory) },
    async {
      directory
        .get_person_newsletters(id)
        .await
        .map_err(Error::directory)
    },
  )?;
  debug!(
    person_id = %id,
    roles = roles.len(),
    newsletters = newsletters.len(),
    "fetched member data"
  );
  let member = Member {
    person,
    roles,
    newsletters,
  };

  let missing = match missing_newsletters(&member, by_conference) {
    Ok(missing) => missing,
    Err(unmapped) => {
      return Ok(SyncOutcome::Skipped {
        reason: format!("no newsletter for conferences {unmapped:?}"),
      });
    }
  };
  if missing.is_empty() {
    return Ok(SyncOutcome::Unchanged);
  }

  if dry_run {
    info!(person_id = %id, newsletters = ?missing, "dry run, skipping write");
  } else {
    directory
      .add_person_newsletters(id, &missing)
      .await
      .map_err(Error::directory)?;
    info!(person_id = %id, newsletters = ?missing, "added newsletters");
  }
  Ok(SyncOutcome::Updated)
}
