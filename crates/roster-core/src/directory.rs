//! The directory: the authoritative source of people, weeks and conferences.
//!
//! The [`DirectoryClient`] trait is implemented by `roster-http`. Sync jobs
//! depend on this abstraction, not on the HTTP client.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  de::{self, numeric_id},
  person::{NewsletterSubscription, Person, PersonId, Role},
};

numeric_id!(
  /// The directory's identifier for a newsletter.
  NewsletterId
);

numeric_id!(
  /// The directory's identifier for a conference.
  ConferenceId
);

// ─── Records ─────────────────────────────────────────────────────────────────

/// An entry in the directory's newsletter catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Newsletter {
  #[serde(rename = "newsletter_id")]
  pub id:    NewsletterId,
  #[serde(rename = "newsletter_label")]
  pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conference {
  #[serde(rename = "conference_id")]
  pub id:   ConferenceId,
  #[serde(rename = "conference_name")]
  pub name: String,
}

/// A weekend as stored in the directory.
///
/// Only the attributes roster reads are typed; everything else round-trips
/// through `extra` so the week can be written back whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Week {
  #[serde(deserialize_with = "de::text")]
  pub week_id:       String,
  #[serde(default, deserialize_with = "de::non_blank")]
  pub location:      Option<String>,
  #[serde(default, deserialize_with = "de::optional_id")]
  pub conference_id: Option<ConferenceId>,
  #[serde(flatten)]
  pub extra:         serde_json::Map<String, serde_json::Value>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the directory service.
///
/// Authentication and session handling are the implementation's concern.
/// All methods return `Send` futures so implementations can be shared across
/// tasks on a multi-threaded runtime.
pub trait DirectoryClient: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The directory's view of the current session.
  fn get_auth(
    &self,
  ) -> impl Future<Output = Result<serde_json::Value, Self::Error>> + Send + '_;

  // ── People ────────────────────────────────────────────────────────────

  fn get_people(
    &self,
  ) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + '_;

  /// Roles in chronological order.
  fn get_person_roles(
    &self,
    id: PersonId,
  ) -> impl Future<Output = Result<Vec<Role>, Self::Error>> + Send + '_;

  fn get_person_newsletters(
    &self,
    id: PersonId,
  ) -> impl Future<Output = Result<Vec<NewsletterSubscription>, Self::Error>>
  + Send
  + '_;

  /// Subscribe a person to additional newsletters.
  fn add_person_newsletters<'a>(
    &'a self,
    id: PersonId,
    newsletter_ids: &'a [NewsletterId],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Incremental sync queue ────────────────────────────────────────────

  /// Ids of people whose newsletter subscriptions changed since the last
  /// sync.
  fn get_people_to_sync(
    &self,
  ) -> impl Future<Output = Result<Vec<PersonId>, Self::Error>> + Send + '_;

  fn clear_people_to_sync<'a>(
    &'a self,
    ids: &'a [PersonId],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Catalogue ─────────────────────────────────────────────────────────

  fn get_newsletters(
    &self,
  ) -> impl Future<Output = Result<Vec<Newsletter>, Self::Error>> + Send + '_;

  fn get_conferences(
    &self,
  ) -> impl Future<Output = Result<Vec<Conference>, Self::Error>> + Send + '_;

  fn get_weeks(
    &self,
  ) -> impl Future<Output = Result<Vec<Week>, Self::Error>> + Send + '_;

  /// Write a week back in full.
  fn update_week<'a>(
    &'a self,
    week: &'a Week,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
