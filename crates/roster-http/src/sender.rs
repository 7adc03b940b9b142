//! HTTP client for the Sender.net v2 marketing API.
//!
//! Every response is wrapped in an envelope
//! `{ success, message, data, links }`. List endpoints are paginated through
//! `links.next`.

use reqwest::{
  Client, Method, RequestBuilder, StatusCode, Url,
  header::{ACCEPT, HeaderValue},
};
use roster_core::marketing::{
  GroupId, MarketingClient, RemoteField, RemoteGroup, RemoteSubscriber,
  SubscriberPayload,
};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::debug;

use crate::{
  Error, Result,
  transport::{HttpConfig, Reply, Transport},
};

pub const DEFAULT_URL: &str = "https://api.sender.net/v2";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
  pub base_url: String,
  pub token:    String,
}

impl Default for SenderConfig {
  fn default() -> Self {
    Self {
      base_url: DEFAULT_URL.to_string(),
      token:    String::new(),
    }
  }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
  #[serde(default)]
  success: Option<bool>,
  #[serde(default)]
  message: Option<Value>,
  data:    Option<T>,
  #[serde(default, rename = "links", deserialize_with = "next_link")]
  next:    Option<String>,
}

/// `links.next` when `links` is an object carrying a non-empty URL. Any
/// other shape (`null`, `[]`, `{}`) ends pagination.
fn next_link<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
  Ok(match Option::<Value>::deserialize(d)? {
    Some(Value::Object(mut links)) => match links.remove("next") {
      Some(Value::String(href)) if !href.is_empty() => Some(href),
      _ => None,
    },
    _ => None,
  })
}

#[derive(Debug, Deserialize)]
struct Created {
  id: GroupId,
}

/// The envelope's message as display text.
fn message_text(message: Option<Value>, fallback: &str) -> String {
  match message {
    Some(Value::String(text)) => text,
    Some(Value::Null) | None => fallback.to_string(),
    Some(other) => other.to_string(),
  }
}

pub struct SenderClient {
  transport: Transport,
  base_url:  Url,
  token:     String,
}

impl SenderClient {
  pub fn new(config: SenderConfig, http: &HttpConfig) -> Result<Self> {
    let base_url = Url::parse(&config.base_url)
      .map_err(|_| Error::InvalidUrl(config.base_url.clone()))?;
    if base_url.cannot_be_a_base() {
      return Err(Error::InvalidUrl(config.base_url));
    }
    Ok(Self {
      transport: Transport::new(http)?,
      base_url,
      token: config.token,
    })
  }

  /// The base URL with `segments` appended, each percent-encoded.
  fn url(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
    request
      .bearer_auth(&self.token)
      .header(ACCEPT, HeaderValue::from_static("application/json"))
  }

  async fn get(&self, url: &Url) -> Result<Reply> {
    self
      .transport
      .send(|client: &Client| self.authorized(client.get(url.clone())))
      .await
  }

  /// Fetch every page of a list endpoint, in order.
  async fn get_paginated<T: DeserializeOwned>(&self, first: Url) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut next = Some(first);
    while let Some(url) = next.take() {
      let envelope: Envelope<Vec<T>> = self.get(&url).await?.error_for_status()?.json()?;
      debug!(%url, count = envelope.data.as_ref().map_or(0, Vec::len), "fetched page");
      items.extend(envelope.data.unwrap_or_default());
      next = match envelope.next {
        Some(href) => Some(
          Url::parse(&href).map_err(|_| Error::InvalidUrl(href.clone()))?,
        ),
        None => None,
      };
    }
    Ok(items)
  }

  /// Send a write and unwrap its envelope. A non-success status or
  /// `success: false` is a [`Error::Rejected`].
  async fn write<B, T>(&self, method: Method, url: Url, body: &B) -> Result<Option<T>>
  where
    B: Serialize + Sync,
    T: DeserializeOwned,
  {
    let reply = self
      .transport
      .send(|client: &Client| {
        self.authorized(client.request(method.clone(), url.clone())).json(body)
      })
      .await?;

    let envelope: Option<Envelope<T>> = reply.json().ok();
    let rejected = !reply.status.is_success()
      || envelope.as_ref().is_some_and(|e| e.success == Some(false));
    if rejected {
      let fallback = reply
        .status
        .canonical_reason()
        .unwrap_or("request rejected");
      let message = match envelope {
        Some(envelope) => message_text(envelope.message, fallback),
        None if !reply.body.is_empty() => reply.body,
        None => fallback.to_string(),
      };
      return Err(Error::Rejected {
        status: reply.status,
        message,
      });
    }
    Ok(envelope.and_then(|e| e.data))
  }
}

impl MarketingClient for SenderClient {
  type Error = Error;

  async fn get_subscriber(&self, email: &str) -> Result<Option<RemoteSubscriber>> {
    let reply = self.get(&self.url(&["subscribers", email])).await?;
    if reply.status == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    let envelope: Envelope<RemoteSubscriber> = reply.error_for_status()?.json()?;
    envelope.data.map(Some).ok_or(Error::MissingData)
  }

  async fn get_groups(&self) -> Result<Vec<RemoteGroup>> {
    self.get_paginated(self.url(&["groups"])).await
  }

  async fn get_fields(&self) -> Result<Vec<RemoteField>> {
    self.get_paginated(self.url(&["fields"])).await
  }

  async fn create_group(&self, title: &str) -> Result<GroupId> {
    let body = serde_json::json!({ "title": title });
    let created: Option<Created> =
      self.write(Method::POST, self.url(&["groups"]), &body).await?;
    created.map(|c| c.id).ok_or(Error::MissingData)
  }

  async fn update_subscriber(
    &self,
    email: &str,
    payload: &SubscriberPayload,
  ) -> Result<()> {
    let url = self.url(&["subscribers", email]);
    self.write::<_, Value>(Method::PATCH, url, payload).await?;
    Ok(())
  }

  async fn create_subscriber(
    &self,
    email: &str,
    payload: &SubscriberPayload,
  ) -> Result<()> {
    let payload = SubscriberPayload {
      email: Some(email.to_string()),
      ..payload.clone()
    };
    self
      .write::<_, Value>(Method::POST, self.url(&["subscribers"]), &payload)
      .await?;
    Ok(())
  }
}
