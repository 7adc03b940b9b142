//! HTTP client for the pilgrimage directory API.
//!
//! The directory authenticates with a `ci_session` cookie. A session token
//! can be configured directly; otherwise one is obtained by exchanging a
//! Google token at `POST /auth/token`, once per client.

use reqwest::Method;
use roster_core::{
  directory::{Conference, DirectoryClient, Newsletter, NewsletterId, Week},
  person::{NewsletterSubscription, Person, PersonId, Role},
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use tracing::info;

use crate::{
  Error, Result,
  transport::{HttpConfig, Reply, Transport},
};

pub const PRODUCTION_URL: &str = "https://www.ncpilgrimage.com/api";
pub const DEVELOPMENT_URL: &str = "http://pilgrimage.localtest.me/api";

const SESSION_COOKIE: &str = "ci_session";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
  /// Defaults to [`DEVELOPMENT_URL`] when unset.
  pub base_url:      Option<String>,
  /// An existing `ci_session` value; skips the token exchange.
  pub session_token: Option<String>,
  pub google_token:  Option<String>,
}

#[derive(Deserialize)]
struct TokenReply {
  token: String,
}

pub struct HttpDirectory {
  transport:    Transport,
  base_url:     String,
  google_token: Option<String>,
  session:      OnceCell<String>,
}

impl HttpDirectory {
  pub fn new(config: DirectoryConfig, http: &HttpConfig) -> Result<Self> {
    let base_url = config
      .base_url
      .unwrap_or_else(|| DEVELOPMENT_URL.to_string())
      .trim_end_matches('/')
      .to_string();
    info!(%base_url, "using directory");
    Ok(Self {
      transport: Transport::new(http)?,
      base_url,
      google_token: config.google_token,
      session: OnceCell::new_with(config.session_token),
    })
  }

  fn url(&self, path: &str) -> String { format!("{}{path}", self.base_url) }

  async fn session(&self) -> Result<&str> {
    self
      .session
      .get_or_try_init(|| self.exchange_token())
      .await
      .map(String::as_str)
  }

  async fn exchange_token(&self) -> Result<String> {
    let google_token = self
      .google_token
      .as_deref()
      .ok_or(Error::MissingCredentials)?;
    let url = self.url("/auth/token");
    let reply = self
      .transport
      .send(|client| {
        client
          .post(&url)
          .json(&json!({ "google_token": google_token }))
      })
      .await?
      .error_for_status()?;
    let TokenReply { token } = reply.json()?;
    info!("obtained directory session");
    Ok(token)
  }

  async fn request(
    &self,
    method: Method,
    path: &str,
    body: Option<Value>,
  ) -> Result<Reply> {
    let cookie = format!("{SESSION_COOKIE}={}", self.session().await?);
    let url = self.url(path);
    let reply = self
      .transport
      .send(|client| {
        let request = client
          .request(method.clone(), &url)
          .header(reqwest::header::COOKIE, &cookie);
        match &body {
          Some(body) => request.json(body),
          None => request,
        }
      })
      .await?;
    check(reply)
  }

  async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
    self.request(Method::GET, path, None).await?.json()
  }
}

/// Fail on error statuses and on successful bodies that are not JSON.
fn check(reply: Reply) -> Result<Reply> {
  let reply = reply.error_for_status()?;
  match reply.content_type.as_deref() {
    Some(ct) if !ct.starts_with("application/json") && !reply.body.is_empty() => {
      Err(Error::UnexpectedContentType(ct.to_string()))
    }
    _ => Ok(reply),
  }
}

impl DirectoryClient for HttpDirectory {
  type Error = Error;

  async fn get_auth(&self) -> Result<Value> { self.get("/auth").await }

  async fn get_people(&self) -> Result<Vec<Person>> {
    self.get("/pilgrims").await
  }

  async fn get_person_roles(&self, id: PersonId) -> Result<Vec<Role>> {
    self.get(&format!("/pilgrims/{id}/roles")).await
  }

  async fn get_person_newsletters(
    &self,
    id: PersonId,
  ) -> Result<Vec<NewsletterSubscription>> {
    self.get(&format!("/pilgrims/{id}/newsletters")).await
  }

  async fn add_person_newsletters(
    &self,
    id: PersonId,
    newsletter_ids: &[NewsletterId],
  ) -> Result<()> {
    let body = json!({ "newsletter_ids": newsletter_ids });
    self
      .request(Method::POST, &format!("/pilgrims/{id}/newsletters"), Some(body))
      .await?;
    Ok(())
  }

  async fn get_people_to_sync(&self) -> Result<Vec<PersonId>> {
    self.get("/newsletter-sub-sync").await
  }

  async fn clear_people_to_sync(&self, ids: &[PersonId]) -> Result<()> {
    let body = json!({ "pilgrim_ids": ids });
    self
      .request(Method::DELETE, "/newsletter-sub-sync", Some(body))
      .await?;
    Ok(())
  }

  async fn get_newsletters(&self) -> Result<Vec<Newsletter>> {
    self.get("/newsletters").await
  }

  async fn get_conferences(&self) -> Result<Vec<Conference>> {
    self.get("/conferences").await
  }

  async fn get_weeks(&self) -> Result<Vec<Week>> { self.get("/weeks").await }

  async fn update_week(&self, week: &Week) -> Result<()> {
    let body = serde_json::to_value(week)?;
    self
      .request(Method::PUT, &format!("/weeks/{}", week.week_id), Some(body))
      .await?;
    Ok(())
  }
}
