//! Subscriber reconciliation: directory member → minimal subscriber payload.
//!
//! Computes the attributes that must be written so the marketing service's
//! subscriber matches the directory, and whether that write is a create, an
//! update, or nothing at all. Pure: the caller performs the write.

use std::collections::BTreeSet;

use roster_core::{
  marketing::{
    FieldNameMap, FieldValues, GroupId, RemoteSubscriber, SubscriberPayload,
  },
  normalize::{normalize_email, sanitize_text},
  person::{Member, Role},
};

use crate::policy::{
  CHURCH_FIELD, PILGRIM_ID_FIELD, WEEKENDS_SERVED_FIELD, Weekend,
};

/// The write a reconciliation calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  Create,
  Update,
  Noop,
}

/// The result of reconciling a member against the marketing service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
  pub payload: SubscriberPayload,
  pub action:  Action,
}

/// Compute the payload that transitions `remote` to match `member`.
///
/// `desired_groups` is the complete set of groups the member should belong
/// to. When `remote` is `None` the result is always [`Action::Create`] and the
/// payload carries the member's normalized email.
pub fn reconcile(
  member: &Member,
  desired_groups: &BTreeSet<GroupId>,
  remote: Option<&RemoteSubscriber>,
  field_names: &FieldNameMap,
) -> Reconciliation {
  let mut payload = SubscriberPayload {
    firstname: changed_name(
      &member.person.first_name,
      remote.map(|r| r.firstname.as_str()),
    ),
    lastname: changed_name(
      &member.person.last_name,
      remote.map(|r| r.lastname.as_str()),
    ),
    ..Default::default()
  };

  let current_groups = remote.map(|r| r.groups.clone()).unwrap_or_default();
  if current_groups
    .symmetric_difference(desired_groups)
    .next()
    .is_some()
  {
    // The service replaces group membership wholesale.
    payload.groups = Some(desired_groups.clone());
  }

  let current_fields = remote
    .map(|r| r.field_values(field_names))
    .unwrap_or_default();
  let new_fields = desired_fields(member, &current_fields);
  if new_fields != current_fields {
    payload.fields = Some(new_fields);
  }

  let action = match remote {
    None => {
      payload.email = member.person.email.as_deref().and_then(normalize_email);
      Action::Create
    }
    Some(_) if payload.is_empty() => Action::Noop,
    Some(_) => Action::Update,
  };

  Reconciliation { payload, action }
}

/// The trimmed directory value, if the remote is absent or holds something
/// else.
fn changed_name(directory: &str, remote: Option<&str>) -> Option<String> {
  let expected = directory.trim();
  remote
    .is_none_or(|current| current != expected)
    .then(|| expected.to_string())
}

/// Start from the current field values and overlay everything the directory
/// determines.
fn desired_fields(member: &Member, current: &FieldValues) -> FieldValues {
  let mut fields = current.clone();

  if let Some(role) = member.guest_role() {
    set_weekend_fields(&mut fields, Weekend::Guest, role);
  }
  if let Some(role) = member.last_role() {
    set_weekend_fields(&mut fields, Weekend::Last, role);
  }

  fields.insert(PILGRIM_ID_FIELD.into(), member.person.id.to_string());

  match member.person.church.as_deref() {
    Some(church) => {
      fields.insert(CHURCH_FIELD.into(), sanitize_text(church));
    }
    None if current.contains_key(CHURCH_FIELD) => {
      fields.insert(CHURCH_FIELD.into(), String::new());
    }
    None => {}
  }

  fields.insert(
    WEEKENDS_SERVED_FIELD.into(),
    member.weekends_served().to_string(),
  );

  fields
}

fn set_weekend_fields(fields: &mut FieldValues, weekend: Weekend, role: &Role) {
  fields.insert(weekend.number_field(), role.week_id.clone());
  if let Some(date) = &role.date {
    fields.insert(weekend.date_field(), date.clone());
  }
  if let Some(location) = &role.location {
    fields.insert(weekend.location_field(), location.clone());
  }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
