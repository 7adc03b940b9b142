//! In-memory fakes of both remote services for unit tests.

use std::{
  collections::{BTreeSet, HashMap},
  sync::Mutex,
};

use roster_core::{
  directory::{Conference, DirectoryClient, Newsletter, NewsletterId, Week},
  marketing::{
    FieldColumn, GroupId, MarketingClient, RemoteField, RemoteGroup,
    RemoteSubscriber, SubscriberPayload,
  },
  person::{NewsletterSubscription, Person, PersonId, Role},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct FakeError(pub String);

// ─── Directory ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeDirectory {
  pub people:             Vec<Person>,
  pub roles:              HashMap<PersonId, Vec<Role>>,
  pub subscriptions:      HashMap<PersonId, Vec<NewsletterSubscription>>,
  pub newsletters:        Vec<Newsletter>,
  pub conferences:        Vec<Conference>,
  pub weeks:              Vec<Week>,
  pub flagged:            Vec<PersonId>,
  /// People whose role lookup fails.
  pub failing:            BTreeSet<PersonId>,
  /// Weeks whose update is refused.
  pub rejected_weeks:     BTreeSet<String>,
  pub added_newsletters:  Mutex<Vec<(PersonId, Vec<NewsletterId>)>>,
  pub updated_weeks:      Mutex<Vec<Week>>,
  pub cleared:            Mutex<Vec<PersonId>>,
}

impl FakeDirectory {
  pub fn added_newsletters(&self) -> Vec<(PersonId, Vec<NewsletterId>)> {
    self.added_newsletters.lock().unwrap().clone()
  }

  pub fn updated_weeks(&self) -> Vec<Week> {
    self.updated_weeks.lock().unwrap().clone()
  }

  pub fn cleared(&self) -> Vec<PersonId> { self.cleared.lock().unwrap().clone() }
}

impl DirectoryClient for FakeDirectory {
  type Error = FakeError;

  async fn get_auth(&self) -> Result<serde_json::Value, FakeError> {
    Ok(serde_json::json!({ "authenticated": true }))
  }

  async fn get_people(&self) -> Result<Vec<Person>, FakeError> {
    Ok(self.people.clone())
  }

  async fn get_person_roles(&self, id: PersonId) -> Result<Vec<Role>, FakeError> {
    if self.failing.contains(&id) {
      return Err(FakeError(format!("roles for {id} unavailable")));
    }
    Ok(self.roles.get(&id).cloned().unwrap_or_default())
  }

  async fn get_person_newsletters(
    &self,
    id: PersonId,
  ) -> Result<Vec<NewsletterSubscription>, FakeError> {
    Ok(self.subscriptions.get(&id).cloned().unwrap_or_default())
  }

  async fn add_person_newsletters(
    &self,
    id: PersonId,
    newsletter_ids: &[NewsletterId],
  ) -> Result<(), FakeError> {
    self
      .added_newsletters
      .lock()
      .unwrap()
      .push((id, newsletter_ids.to_vec()));
    Ok(())
  }

  async fn get_people_to_sync(&self) -> Result<Vec<PersonId>, FakeError> {
    Ok(self.flagged.clone())
  }

  async fn clear_people_to_sync(&self, ids: &[PersonId]) -> Result<(), FakeError> {
    self.cleared.lock().unwrap().extend_from_slice(ids);
    Ok(())
  }

  async fn get_newsletters(&self) -> Result<Vec<Newsletter>, FakeError> {
    Ok(self.newsletters.clone())
  }

  async fn get_conferences(&self) -> Result<Vec<Conference>, FakeError> {
    Ok(self.conferences.clone())
  }

  async fn get_weeks(&self) -> Result<Vec<Week>, FakeError> {
    Ok(self.weeks.clone())
  }

  async fn update_week(&self, week: &Week) -> Result<(), FakeError> {
    if self.rejected_weeks.contains(&week.week_id) {
      return Err(FakeError(format!("week {} rejected", week.week_id)));
    }
    self.updated_weeks.lock().unwrap().push(week.clone());
    Ok(())
  }
}

// ─── Marketing ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
  Create(String, SubscriberPayload),
  Update(String, SubscriberPayload),
}

/// A marketing service that applies writes to its own subscriber table, so a
/// second sync sees the result of the first.
#[derive(Default)]
pub struct FakeMarketing {
  pub fields:                Vec<RemoteField>,
  pub groups:                Mutex<Vec<RemoteGroup>>,
  pub subscribers:           Mutex<HashMap<String, RemoteSubscriber>>,
  /// Emails whose writes the service rejects.
  pub rejected:              BTreeSet<String>,
  pub reject_group_creation: bool,
  pub created_groups:        Mutex<Vec<String>>,
  pub writes:                Mutex<Vec<Write>>,
}

impl FakeMarketing {
  pub fn with_fields(fields: &[(&str, &str)]) -> Self {
    Self {
      fields: fields
        .iter()
        .enumerate()
        .map(|(idx, (title, name))| RemoteField {
          id:         idx.to_string(),
          title:      title.to_string(),
          field_name: name.to_string(),
        })
        .collect(),
      ..Default::default()
    }
  }

  pub fn created_groups(&self) -> Vec<String> {
    self.created_groups.lock().unwrap().clone()
  }

  pub fn group_id(&self, title: &str) -> Option<GroupId> {
    self
      .groups
      .lock()
      .unwrap()
      .iter()
      .find(|g| g.title == title)
      .map(|g| g.id.clone())
  }

  pub fn writes(&self) -> Vec<Write> { self.writes.lock().unwrap().clone() }

  pub fn subscriber(&self, email: &str) -> Option<RemoteSubscriber> {
    self.subscribers.lock().unwrap().get(email).cloned()
  }

  fn apply(&self, email: &str, payload: &SubscriberPayload) {
    let mut subscribers = self.subscribers.lock().unwrap();
    let subscriber =
      subscribers
        .entry(email.to_string())
        .or_insert_with(|| RemoteSubscriber {
          email:     email.to_string(),
          firstname: String::new(),
          lastname:  String::new(),
          groups:    BTreeSet::new(),
          columns:   vec![],
        });
    if let Some(first) = &payload.firstname {
      subscriber.firstname = first.clone();
    }
    if let Some(last) = &payload.lastname {
      subscriber.lastname = last.clone();
    }
    if let Some(groups) = &payload.groups {
      subscriber.groups = groups.clone();
    }
    if let Some(values) = &payload.fields {
      subscriber.columns = self
        .fields
        .iter()
        .filter_map(|field| {
          values.get(&field.field_name).map(|value| FieldColumn {
            title: field.title.clone(),
            value: value.clone(),
          })
        })
        .collect();
    }
  }

  fn check_rejected(&self, email: &str) -> Result<(), FakeError> {
    if self.rejected.contains(email) {
      return Err(FakeError(format!("subscriber {email} rejected")));
    }
    Ok(())
  }
}

impl MarketingClient for FakeMarketing {
  type Error = FakeError;

  async fn get_subscriber(
    &self,
    email: &str,
  ) -> Result<Option<RemoteSubscriber>, FakeError> {
    Ok(self.subscriber(email))
  }

  async fn get_groups(&self) -> Result<Vec<RemoteGroup>, FakeError> {
    Ok(self.groups.lock().unwrap().clone())
  }

  async fn get_fields(&self) -> Result<Vec<RemoteField>, FakeError> {
    Ok(self.fields.clone())
  }

  async fn create_group(&self, title: &str) -> Result<GroupId, FakeError> {
    if self.reject_group_creation {
      return Err(FakeError(format!("group {title} rejected")));
    }
    let mut groups = self.groups.lock().unwrap();
    let id = GroupId::new(format!("group-{}", groups.len() + 1));
    groups.push(RemoteGroup {
      id:    id.clone(),
      title: title.to_string(),
    });
    self.created_groups.lock().unwrap().push(title.to_string());
    Ok(id)
  }

  async fn update_subscriber(
    &self,
    email: &str,
    payload: &SubscriberPayload,
  ) -> Result<(), FakeError> {
    self.check_rejected(email)?;
    self
      .writes
      .lock()
      .unwrap()
      .push(Write::Update(email.to_string(), payload.clone()));
    self.apply(email, payload);
    Ok(())
  }

  async fn create_subscriber(
    &self,
    email: &str,
    payload: &SubscriberPayload,
  ) -> Result<(), FakeError> {
    self.check_rejected(email)?;
    self
      .writes
      .lock()
      .unwrap()
      .push(Write::Create(email.to_string(), payload.clone()));
    self.apply(email, payload);
    Ok(())
  }
}
