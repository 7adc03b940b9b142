//! Subscription sync: directory people → marketing-service subscribers.
//!
//! Setup (groups, fields, the people list) must succeed or the run aborts.
//! After that every person is processed independently: a failure is logged
//! against the person's email, counted, and the run continues.

use std::{
  collections::{BTreeMap, BTreeSet, HashMap, HashSet},
  fmt,
  pin::pin,
};

use futures::StreamExt;
use roster_core::{
  directory::DirectoryClient,
  marketing::{FieldNameMap, GroupId, MarketingClient},
  normalize::{canonical_people, normalize_email},
  person::{Member, Person, PersonId},
};
use tracing::{debug, info, warn};

use crate::{
  Error, Result, SyncConfig,
  reconcile::{Action, Reconciliation, reconcile},
  resolve::{planned_group_ids, resolve_field_names, resolve_group_ids},
  stats::{Report, SyncOutcome, SyncStats},
};

/// Which people a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
  /// Everyone in the directory.
  All,
  /// People the directory has flagged since the last sync. Their flags are
  /// cleared afterwards unless their sync failed.
  Flagged,
  /// Specific people.
  People(Vec<PersonId>),
}

/// The key a subscriber's outcome is reported under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberKey {
  pub person_id: PersonId,
  pub email:     String,
}

impl fmt::Display for SubscriberKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} (pilgrim id {})", self.email, self.person_id)
  }
}

/// Bring every selected person's subscriber record in line with the
/// directory.
pub async fn sync_subscriptions<D, M>(
  directory: &D,
  marketing: &M,
  selection: &Selection,
  config: &SyncConfig,
) -> Result<SyncStats>
where
  D: DirectoryClient,
  M: MarketingClient,
{
  // ── Setup ─────────────────────────────────────────────────────────────

  let (newsletters, groups) = tokio::try_join!(
    async { directory.get_newsletters().await.map_err(Error::directory) },
    async { marketing.get_groups().await.map_err(Error::marketing) },
  )?;
  let titles: BTreeSet<String> =
    newsletters.into_iter().map(|n| n.label).collect();
  let group_ids = if config.dry_run {
    planned_group_ids(&titles, &groups)
  } else {
    resolve_group_ids(marketing, &titles, &groups).await?
  };
  info!(count = group_ids.len(), "found newsletter groups");

  let field_names = resolve_field_names(marketing).await?;
  info!(count = field_names.len(), "found fields");

  let people = directory.get_people().await.map_err(Error::directory)?;
  info!(count = people.len(), "found people");

  let flagged = match selection {
    Selection::Flagged => {
      let ids = directory
        .get_people_to_sync()
        .await
        .map_err(Error::directory)?;
      info!(count = ids.len(), "found people flagged for sync");
      Some(ids)
    }
    _ => None,
  };
  let selected: Option<BTreeSet<PersonId>> = match selection {
    Selection::All => None,
    Selection::Flagged => Some(flagged.iter().flatten().copied().collect()),
    Selection::People(ids) => Some(ids.iter().copied().collect()),
  };

  let email_by_id: HashMap<PersonId, String> = people
    .iter()
    .filter_map(|p| Some((p.id, normalize_email(p.email.as_deref()?)?)))
    .collect();

  let mut people = canonical_people(people);
  info!(count = people.len(), "found people with distinct email addresses");

  if let Some(ids) = &selected {
    let emails: HashSet<&str> = ids
      .iter()
      .filter_map(|id| email_by_id.get(id).map(String::as_str))
      .collect();
    people.retain(|p| p.email.as_deref().is_some_and(|e| emails.contains(e)));
    info!(count = people.len(), "selected people");

    for id in ids.iter().filter(|id| !email_by_id.contains_key(id)) {
      warn!(person_id = %id, "selected person has no usable email, skipping");
    }
  }
  if let Some(limit) = config.limit {
    people.truncate(limit);
  }

  // ── Per-person sync ───────────────────────────────────────────────────

  let syncer = SubscriberSync {
    directory,
    marketing,
    group_ids: &group_ids,
    field_names: &field_names,
    dry_run: config.dry_run,
  };

  let mut stats = SyncStats::default();
  let mut succeeded: HashSet<String> = HashSet::new();
  let mut reports = pin!(
    config
      .scheduler()
      .run(people, |person| syncer.sync(person))
  );
  while let Some(report) = reports.next().await {
    report.log();
    stats.record(&report.outcome);
    if !report.outcome.is_failure() {
      succeeded.insert(report.key.email);
    }
  }

  if let Some(flagged) = flagged {
    // People without an email have nothing to sync and are cleared too.
    let done: Vec<PersonId> = flagged
      .into_iter()
      .filter(|id| email_by_id.get(id).is_none_or(|e| succeeded.contains(e)))
      .collect();
    if config.dry_run {
      info!(count = done.len(), "dry run, leaving sync flags in place");
    } else if !done.is_empty() {
      directory
        .clear_people_to_sync(&done)
        .await
        .map_err(Error::directory)?;
      info!(count = done.len(), "cleared sync flags");
    }
  }

  info!(%stats, "subscription sync finished");
  Ok(stats)
}

/// The groups a member must belong to: one per newsletter subscription.
pub fn desired_groups(
  member: &Member,
  group_ids: &BTreeMap<String, GroupId>,
) -> Result<BTreeSet<GroupId>> {
  member
    .newsletters
    .iter()
    .map(|newsletter| {
      group_ids
        .get(&newsletter.label)
        .cloned()
        .ok_or_else(|| Error::UnmappedNewsletter(newsletter.label.clone()))
    })
    .collect()
}

struct SubscriberSync<'a, D, M> {
  directory:   &'a D,
  marketing:   &'a M,
  group_ids:   &'a BTreeMap<String, GroupId>,
  field_names: &'a FieldNameMap,
  dry_run:     bool,
}

impl<D: DirectoryClient, M: MarketingClient> SubscriberSync<'_, D, M> {
  async fn sync(&self, person: Person) -> Report<SubscriberKey> {
    let key = SubscriberKey {
      person_id: person.id,
      email:     person.email.clone().unwrap_or_default(),
    };
    let outcome = self
      .try_sync(person, &key.email)
      .await
      .unwrap_or_else(SyncOutcome::from);
    Report { key, outcome }
  }

  async fn try_sync(&self, person: Person, email: &str) -> Result<SyncOutcome> {
    let (roles, newsletters) = tokio::try_join!(
      async {
        self
          .directory
          .get_person_roles(person.id)
          .await
          .map_err(Error::directory)
      },
      async {
        self
          .directory
          .get_person_newsletters(person.id)
          .await
          .map_err(Error::directory)
      },
    )?;
    debug!(
      person_id = %person.id,
      roles = roles.len(),
      newsletters = newsletters.len(),
      "fetched member data"
    );
    let member = Member {
      person,
      roles,
      newsletters,
    };

    let desired = desired_groups(&member, self.group_ids)?;
    let remote = self
      .marketing
      .get_subscriber(email)
      .await
      .map_err(Error::marketing)?;

    let Reconciliation { payload, action } =
      reconcile(&member, &desired, remote.as_ref(), self.field_names);
    let outcome = match action {
      Action::Noop => return Ok(SyncOutcome::Unchanged),
      Action::Create => SyncOutcome::Created,
      Action::Update => SyncOutcome::Updated,
    };

    let body = serde_json::to_string(&payload).unwrap_or_default();
    if self.dry_run {
      info!(%email, ?action, payload = %body, "dry run, skipping write");
      return Ok(outcome);
    }

    match action {
      Action::Create => self.marketing.create_subscriber(email, &payload).await,
      _ => self.marketing.update_subscriber(email, &payload).await,
    }
    .map_err(Error::marketing)?;
    info!(%email, ?action, payload = %body, "wrote subscriber");

    Ok(outcome)
  }
}
