//! People as the directory describes them.
//!
//! A [`Person`] is the directory's record of a pilgrim. Roles and newsletter
//! subscriptions live behind separate endpoints; a [`Member`] bundles a person
//! with both once they have been fetched.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
  de::{self, numeric_id},
  directory::NewsletterId,
};

numeric_id!(
  /// The directory's identifier for a person (`pilgrim_id`).
  PersonId
);

/// A directory person record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  #[serde(rename = "pilgrim_id")]
  pub id:         PersonId,
  #[serde(default, deserialize_with = "de::text_or_empty")]
  pub first_name: String,
  #[serde(default, deserialize_with = "de::text_or_empty")]
  pub last_name:  String,
  /// Raw email as stored in the directory; see
  /// [`normalize_email`](crate::normalize::normalize_email).
  #[serde(default, deserialize_with = "de::non_blank")]
  pub email:      Option<String>,
  #[serde(default, deserialize_with = "de::non_blank")]
  pub church:     Option<String>,
}

/// A person's participation in one weekend, as guest or team member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
  /// The weekend number.
  #[serde(deserialize_with = "de::text")]
  pub week_id:         String,
  #[serde(default, deserialize_with = "de::non_blank")]
  pub location:        Option<String>,
  #[serde(default, deserialize_with = "de::non_blank")]
  pub date:            Option<String>,
  #[serde(default, deserialize_with = "de::non_blank")]
  pub conference_name: Option<String>,
  #[serde(rename = "role_type_guest", default, deserialize_with = "de::flag")]
  pub guest:           bool,
}

/// A person's subscription to one directory newsletter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsletterSubscription {
  #[serde(rename = "newsletter_id")]
  pub id:    NewsletterId,
  #[serde(rename = "newsletter_label")]
  pub label: String,
}

/// A person together with their roles and newsletter subscriptions.
///
/// `roles` keeps the directory's chronological order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
  pub person:      Person,
  pub roles:       Vec<Role>,
  pub newsletters: Vec<NewsletterSubscription>,
}

impl Member {
  /// The person's guest weekend: the first role, if it is flagged as guest.
  pub fn guest_role(&self) -> Option<&Role> {
    self.roles.first().filter(|role| role.guest)
  }

  /// The most recent weekend, whatever the role.
  pub fn last_role(&self) -> Option<&Role> { self.roles.last() }

  /// Number of weekends served on team (every non-guest role).
  pub fn weekends_served(&self) -> usize {
    self.roles.iter().filter(|role| !role.guest).count()
  }

  /// Distinct conference names across all roles.
  pub fn conference_names(&self) -> BTreeSet<&str> {
    self
      .roles
      .iter()
      .filter_map(|role| role.conference_name.as_deref())
      .collect()
  }

  pub fn newsletter_ids(&self) -> BTreeSet<NewsletterId> {
    self.newsletters.iter().map(|n| n.id).collect()
  }
}
