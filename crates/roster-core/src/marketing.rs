//! The marketing service: subscribers, groups and custom fields.
//!
//! Subscribers are keyed by normalized email. The [`MarketingClient`] trait is
//! implemented by `roster-http` against Sender.net.

use std::{
  collections::{BTreeMap, BTreeSet},
  fmt,
  future::Future,
};

use serde::{Deserialize, Deserializer, Serialize};

use crate::de;

/// Custom-field title → remote field name (e.g. `"Church"` → `"{$church}"`).
pub type FieldNameMap = BTreeMap<String, String>;

/// Remote field name → value.
pub type FieldValues = BTreeMap<String, String>;

// ─── Groups and fields ───────────────────────────────────────────────────────

/// The marketing service's identifier for a group (distribution list).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GroupId(pub String);

impl GroupId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }
}

impl fmt::Display for GroupId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl<'de> Deserialize<'de> for GroupId {
  fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
    de::text(d).map(Self)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteGroup {
  pub id:    GroupId,
  pub title: String,
}

/// A custom subscriber attribute.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteField {
  #[serde(deserialize_with = "de::text")]
  pub id:         String,
  pub title:      String,
  /// The placeholder key used in subscriber payloads, e.g. `{$church}`.
  pub field_name: String,
}

// ─── Subscribers ─────────────────────────────────────────────────────────────

/// One custom-field value on a subscriber, addressed by field title.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldColumn {
  pub title: String,
  #[serde(default, deserialize_with = "de::text_or_empty")]
  pub value: String,
}

/// A subscriber record as held by the marketing service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteSubscriber {
  pub email:     String,
  #[serde(default, deserialize_with = "de::text_or_empty")]
  pub firstname: String,
  #[serde(default, deserialize_with = "de::text_or_empty")]
  pub lastname:  String,
  /// Ids of the groups the subscriber belongs to.
  #[serde(rename = "subscriber_tags", default, deserialize_with = "tag_ids")]
  pub groups:    BTreeSet<GroupId>,
  #[serde(default, deserialize_with = "columns")]
  pub columns:   Vec<FieldColumn>,
}

impl RemoteSubscriber {
  /// Current custom-field values keyed by field name.
  ///
  /// Columns whose title has no known field are ignored.
  pub fn field_values(&self, field_names: &FieldNameMap) -> FieldValues {
    self
      .columns
      .iter()
      .filter_map(|column| {
        field_names
          .get(&column.title)
          .map(|name| (name.clone(), column.value.clone()))
      })
      .collect()
  }
}

fn tag_ids<'de, D: Deserializer<'de>>(
  d: D,
) -> Result<BTreeSet<GroupId>, D::Error> {
  #[derive(Deserialize)]
  struct Tag {
    id: GroupId,
  }
  Ok(
    Option::<Vec<Tag>>::deserialize(d)?
      .unwrap_or_default()
      .into_iter()
      .map(|tag| tag.id)
      .collect(),
  )
}

fn columns<'de, D: Deserializer<'de>>(
  d: D,
) -> Result<Vec<FieldColumn>, D::Error> {
  Ok(Option::<Vec<FieldColumn>>::deserialize(d)?.unwrap_or_default())
}

/// The attributes to write to a subscriber.
///
/// Every attribute is optional; an empty payload means no remote change is
/// required. `groups` and `fields` always carry the complete desired state,
/// never a delta.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubscriberPayload {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email:     Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub firstname: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub lastname:  Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub groups:    Option<BTreeSet<GroupId>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub fields:    Option<FieldValues>,
}

impl SubscriberPayload {
  pub fn is_empty(&self) -> bool {
    self.email.is_none()
      && self.firstname.is_none()
      && self.lastname.is_none()
      && self.groups.is_none()
      && self.fields.is_none()
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the marketing service.
///
/// Write methods must fail with a distinguishable error when the service
/// reports a non-success result. Retries are the implementation's concern.
pub trait MarketingClient: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Look up a subscriber by normalized email. Returns `None` if the service
  /// has no such subscriber.
  fn get_subscriber<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<RemoteSubscriber>, Self::Error>>
  + Send
  + 'a;

  /// All groups, across every page.
  fn get_groups(
    &self,
  ) -> impl Future<Output = Result<Vec<RemoteGroup>, Self::Error>> + Send + '_;

  /// All custom fields, across every page.
  fn get_fields(
    &self,
  ) -> impl Future<Output = Result<Vec<RemoteField>, Self::Error>> + Send + '_;

  /// Create a group and return its id.
  fn create_group<'a>(
    &'a self,
    title: &'a str,
  ) -> impl Future<Output = Result<GroupId, Self::Error>> + Send + 'a;

  fn update_subscriber<'a>(
    &'a self,
    email: &'a str,
    payload: &'a SubscriberPayload,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Create a subscriber. The email is taken from `email`, whatever the
  /// payload carries.
  fn create_subscriber<'a>(
    &'a self,
    email: &'a str,
    payload: &'a SubscriberPayload,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
