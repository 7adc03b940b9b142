//! Job-level tests against in-memory fakes.

use std::{collections::BTreeSet, sync::Mutex};

use roster_core::{
  directory::{Conference, ConferenceId, Newsletter, NewsletterId, Week},
  marketing::{GroupId, RemoteGroup, RemoteSubscriber},
  person::{NewsletterSubscription, Person, PersonId, Role},
};

use crate::{
  Error, Selection, SyncConfig, SyncStats, assign_conference_newsletters,
  assign_week_conferences,
  policy::{CHURCH_FIELD, PILGRIM_ID_FIELD, WEEKENDS_SERVED_FIELD},
  sync_subscriptions,
  testing::{FakeDirectory, FakeMarketing, Write},
};

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn person(id: u64, first: &str, email: Option<&str>) -> Person {
  Person {
    id:         PersonId(id),
    first_name: first.into(),
    last_name:  "Pilgrim".into(),
    email:      email.map(Into::into),
    church:     Some("Grace Church".into()),
  }
}

fn role(week_id: &str, guest: bool, conference: &str) -> Role {
  Role {
    week_id:         week_id.into(),
    location:        Some("Camp Hanes".into()),
    date:            Some("2021-04-08".into()),
    conference_name: Some(conference.into()),
    guest,
  }
}

fn newsletter(id: u64, label: &str) -> Newsletter {
  Newsletter {
    id:    NewsletterId(id),
    label: label.into(),
  }
}

fn subscription(id: u64, label: &str) -> NewsletterSubscription {
  NewsletterSubscription {
    id:    NewsletterId(id),
    label: label.into(),
  }
}

fn marketing() -> FakeMarketing {
  let mut marketing = FakeMarketing::with_fields(&[
    ("Pilgrim ID", PILGRIM_ID_FIELD),
    ("Church", CHURCH_FIELD),
    ("Weekends Served", WEEKENDS_SERVED_FIELD),
    ("Guest Weekend Number", "{$guest_weekend_number}"),
    ("Guest Weekend Date", "{$guest_weekend_date}"),
    ("Guest Weekend Location", "{$guest_weekend_location}"),
    ("Last Weekend Number", "{$last_weekend_number}"),
    ("Last Weekend Date", "{$last_weekend_date}"),
    ("Last Weekend Location", "{$last_weekend_location}"),
  ]);
  marketing.groups = Mutex::new(vec![RemoteGroup {
    id:    GroupId::new("g-news"),
    title: "News".into(),
  }]);
  marketing
}

/// Ann subscribes to News, Bob to Prayer; both have served.
fn directory() -> FakeDirectory {
  let mut directory = FakeDirectory {
    people: vec![
      person(1, "Ann", Some("ann@example.com")),
      person(2, "Bob", Some("bob@example.com")),
    ],
    newsletters: vec![newsletter(10, "News"), newsletter(11, "Prayer")],
    ..Default::default()
  };
  directory.roles.insert(PersonId(1), vec![
    role("80", true, "Piedmont"),
    role("95", false, "Piedmont"),
  ]);
  directory
    .roles
    .insert(PersonId(2), vec![role("81", true, "Western")]);
  directory
    .subscriptions
    .insert(PersonId(1), vec![subscription(10, "News")]);
  directory
    .subscriptions
    .insert(PersonId(2), vec![subscription(11, "Prayer")]);
  directory
}

fn column(subscriber: &RemoteSubscriber, title: &str) -> Option<String> {
  subscriber
    .columns
    .iter()
    .find(|c| c.title == title)
    .map(|c| c.value.clone())
}

async fn sync_all(
  directory: &FakeDirectory,
  marketing: &FakeMarketing,
) -> SyncStats {
  sync_subscriptions(directory, marketing, &Selection::All, &SyncConfig::default())
    .await
    .unwrap()
}

// ─── Subscription sync ───────────────────────────────────────────────────────

#[tokio::test]
async fn first_run_creates_and_second_run_changes_nothing() {
  let directory = directory();
  let marketing = marketing();

  let stats = sync_all(&directory, &marketing).await;
  assert_eq!(stats.created, 2);
  assert_eq!(stats.total(), 2);
  assert_eq!(marketing.created_groups(), vec!["Prayer"]);

  let ann = marketing.subscriber("ann@example.com").unwrap();
  assert_eq!(ann.firstname, "Ann");
  assert_eq!(ann.groups, BTreeSet::from([GroupId::new("g-news")]));
  assert_eq!(column(&ann, "Pilgrim ID").as_deref(), Some("1"));
  assert_eq!(column(&ann, "Weekends Served").as_deref(), Some("1"));
  assert_eq!(column(&ann, "Guest Weekend Number").as_deref(), Some("80"));
  assert_eq!(column(&ann, "Last Weekend Number").as_deref(), Some("95"));

  let bob = marketing.subscriber("bob@example.com").unwrap();
  let prayer = marketing.group_id("Prayer").unwrap();
  assert_eq!(bob.groups, BTreeSet::from([prayer]));

  let stats = sync_all(&directory, &marketing).await;
  assert_eq!(stats.unchanged, 2);
  assert_eq!(stats.total(), 2);
  assert_eq!(marketing.created_groups().len(), 1);
  assert_eq!(marketing.writes().len(), 2);
}

#[tokio::test]
async fn directory_changes_become_updates() {
  let mut directory = directory();
  let marketing = marketing();
  sync_all(&directory, &marketing).await;

  directory.people[0].first_name = "Anne".into();
  directory
    .subscriptions
    .insert(PersonId(1), vec![subscription(10, "News"), subscription(11, "Prayer")]);

  let stats = sync_all(&directory, &marketing).await;
  assert_eq!(stats.updated, 1);
  assert_eq!(stats.unchanged, 1);

  let Some(Write::Update(email, payload)) = marketing.writes().last().cloned()
  else {
    panic!("expected an update");
  };
  assert_eq!(email, "ann@example.com");
  assert_eq!(payload.firstname.as_deref(), Some("Anne"));
  assert_eq!(payload.lastname, None);
  assert_eq!(payload.groups.map(|g| g.len()), Some(2));
  assert_eq!(payload.fields, None);
}

#[tokio::test]
async fn duplicate_emails_sync_once_as_lowest_id() {
  let directory = FakeDirectory {
    people: vec![
      person(9, "Late", Some("Dup@Example.com")),
      person(5, "Early", Some(" dup@example.com")),
      person(7, "Nobody", None),
    ],
    ..Default::default()
  };
  let marketing = marketing();

  let stats = sync_all(&directory, &marketing).await;
  assert_eq!(stats.created, 1);
  assert_eq!(stats.total(), 1);

  let dup = marketing.subscriber("dup@example.com").unwrap();
  assert_eq!(dup.firstname, "Early");
  assert_eq!(column(&dup, "Pilgrim ID").as_deref(), Some("5"));
}

#[tokio::test]
async fn one_failure_does_not_stop_the_run() {
  let mut directory = directory();
  directory.people.push(person(3, "Cat", Some("cat@example.com")));
  directory.failing.insert(PersonId(2));
  let marketing = FakeMarketing {
    rejected: BTreeSet::from(["cat@example.com".to_string()]),
    ..marketing()
  };

  let stats = sync_all(&directory, &marketing).await;
  assert_eq!(stats.created, 1);
  assert_eq!(stats.errored, 2);
  assert!(marketing.subscriber("ann@example.com").is_some());
  assert!(marketing.subscriber("cat@example.com").is_none());
}

#[tokio::test]
async fn unmapped_subscription_is_skipped() {
  let mut directory = directory();
  directory
    .subscriptions
    .insert(PersonId(2), vec![subscription(99, "Retired Newsletter")]);
  let marketing = marketing();

  let stats = sync_all(&directory, &marketing).await;
  assert_eq!(stats.created, 1);
  assert_eq!(stats.skipped, 1);
  assert!(marketing.subscriber("bob@example.com").is_none());
}

#[tokio::test]
async fn failed_group_creation_aborts_the_run() {
  let directory = directory();
  let marketing = FakeMarketing {
    reject_group_creation: true,
    ..marketing()
  };

  let result = sync_subscriptions(
    &directory,
    &marketing,
    &Selection::All,
    &SyncConfig::default(),
  )
  .await;
  assert!(matches!(result, Err(Error::Marketing(_))));
  assert!(marketing.writes().is_empty());
}

#[tokio::test]
async fn dry_run_reports_without_writing() {
  let directory = FakeDirectory {
    flagged: vec![PersonId(1)],
    ..directory()
  };
  let marketing = marketing();
  let config = SyncConfig {
    dry_run: true,
    ..Default::default()
  };

  let stats = sync_subscriptions(&directory, &marketing, &Selection::Flagged, &config)
    .await
    .unwrap();
  assert_eq!(stats.created, 1);
  assert!(marketing.writes().is_empty());
  assert!(marketing.created_groups().is_empty());
  assert!(directory.cleared().is_empty());
}

#[tokio::test]
async fn flagged_people_are_cleared_unless_they_failed() {
  let mut directory = directory();
  directory.people.push(person(3, "Cat", Some("cat@example.com")));
  directory.people.push(person(4, "Dan", None));
  directory.flagged = vec![PersonId(2), PersonId(3), PersonId(4)];
  let marketing = FakeMarketing {
    rejected: BTreeSet::from(["cat@example.com".to_string()]),
    ..marketing()
  };

  let stats = sync_subscriptions(
    &directory,
    &marketing,
    &Selection::Flagged,
    &SyncConfig::default(),
  )
  .await
  .unwrap();
  assert_eq!(stats.created, 1);
  assert_eq!(stats.errored, 1);
  assert!(marketing.subscriber("ann@example.com").is_none());
  assert_eq!(directory.cleared(), vec![PersonId(2), PersonId(4)]);
}

#[tokio::test]
async fn selecting_a_duplicate_syncs_the_canonical_person() {
  let mut directory = directory();
  directory.people.push(person(30, "Ann Again", Some("ANN@example.com")));

  let marketing = marketing();
  let stats = sync_subscriptions(
    &directory,
    &marketing,
    &Selection::People(vec![PersonId(30), PersonId(404)]),
    &SyncConfig::default(),
  )
  .await
  .unwrap();

  assert_eq!(stats.created, 1);
  let ann = marketing.subscriber("ann@example.com").unwrap();
  assert_eq!(column(&ann, "Pilgrim ID").as_deref(), Some("1"));
  assert!(marketing.subscriber("bob@example.com").is_none());
}

#[tokio::test]
async fn limit_caps_the_people_processed() {
  let directory = directory();
  let marketing = marketing();
  let config = SyncConfig {
    limit: Some(1),
    ..Default::default()
  };

  let stats = sync_subscriptions(&directory, &marketing, &Selection::All, &config)
    .await
    .unwrap();
  assert_eq!(stats.total(), 1);
  assert!(marketing.subscriber("ann@example.com").is_some());
}

// ─── Conference newsletters ──────────────────────────────────────────────────

#[tokio::test]
async fn conference_newsletters_are_added_where_missing() {
  let mut directory = FakeDirectory {
    people: vec![
      person(1, "Ann", None),
      person(2, "Bob", None),
      person(3, "Cat", None),
    ],
    newsletters: vec![
      newsletter(10, "News"),
      newsletter(20, "Western Conference"),
      newsletter(30, "Eastern Conference"),
    ],
    ..Default::default()
  };
  directory.roles.insert(PersonId(1), vec![
    role("1", true, "Western"),
    role("2", false, "Eastern"),
  ]);
  directory
    .subscriptions
    .insert(PersonId(1), vec![subscription(20, "Western Conference")]);
  directory
    .roles
    .insert(PersonId(2), vec![role("3", true, "Piedmont")]);

  let stats = assign_conference_newsletters(&directory, &SyncConfig::default())
    .await
    .unwrap();
  assert_eq!(stats.updated, 1);
  assert_eq!(stats.skipped, 1);
  assert_eq!(stats.unchanged, 1);
  assert_eq!(directory.added_newsletters(), vec![(
    PersonId(1),
    vec![NewsletterId(30)]
  )]);
}

// ─── Week conferences ────────────────────────────────────────────────────────

fn week(id: &str, location: Option<&str>, conference: Option<u64>) -> Week {
  let mut extra = serde_json::Map::new();
  extra.insert("week_name".into(), format!("Week {id}").into());
  Week {
    week_id: id.into(),
    location: location.map(Into::into),
    conference_id: conference.map(ConferenceId),
    extra,
  }
}

#[tokio::test]
async fn weeks_are_assigned_by_location() {
  let directory = FakeDirectory {
    weeks: vec![
      week("1", Some("Camp Dixie"), None),
      week("2", None, None),
      week("3", Some("Camp Harrison"), None),
      week("4", Some("Camp Hanes"), Some(1)),
      week("5", Some("Camp Weaver"), None),
      week("6", Some("Camp Nowhere"), None),
    ],
    conferences: vec![
      Conference {
        id:   ConferenceId(1),
        name: "Piedmont".into(),
      },
      Conference {
        id:   ConferenceId(3),
        name: "Eastern".into(),
      },
    ],
    rejected_weeks: BTreeSet::from(["5".to_string()]),
    ..Default::default()
  };

  let stats = assign_week_conferences(&directory, &SyncConfig::default())
    .await
    .unwrap();
  assert_eq!(stats.updated, 1);
  assert_eq!(stats.skipped, 3);
  assert_eq!(stats.unchanged, 1);
  assert_eq!(stats.errored, 1);

  let updated = directory.updated_weeks();
  assert_eq!(updated.len(), 1);
  assert_eq!(updated[0].week_id, "1");
  assert_eq!(updated[0].conference_id, Some(ConferenceId(3)));
  assert_eq!(updated[0].extra["week_name"], "Week 1");
}
