//! Shared request plumbing: connection limit, timeout and retries.

use std::{sync::Arc, time::Duration};

use reqwest::{
  Client, Method, RequestBuilder, StatusCode, header::CONTENT_TYPE,
};
use serde::{Deserialize, de::DeserializeOwned};
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use crate::{Error, Result, retry::RetryPolicy};

/// Settings shared by both HTTP clients.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
  pub timeout_secs:             u64,
  /// Requests in flight to one service at a time.
  pub max_connections_per_host: usize,
  pub retry:                    RetryPolicy,
}

impl Default for HttpConfig {
  fn default() -> Self {
    Self {
      timeout_secs:             30,
      max_connections_per_host: 2,
      retry:                    RetryPolicy::default(),
    }
  }
}

/// A fully read response.
#[derive(Debug, Clone)]
pub struct Reply {
  pub method:       Method,
  pub url:          String,
  pub status:       StatusCode,
  pub content_type: Option<String>,
  pub body:         String,
}

impl Reply {
  pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
    Ok(serde_json::from_str(&self.body)?)
  }

  /// Turn a non-success status into [`Error::Status`].
  pub fn error_for_status(self) -> Result<Self> {
    if self.status.is_success() {
      return Ok(self);
    }
    error!(
      method = %self.method,
      url = %self.url,
      status = %self.status,
      body = %self.body,
      "request failed"
    );
    Err(Error::Status {
      method: self.method,
      url:    self.url,
      status: self.status,
      body:   self.body,
    })
  }
}

/// One service's HTTP connection. Cheap to clone; clones share the
/// connection limit.
#[derive(Clone)]
pub struct Transport {
  client:  Client,
  limiter: Arc<Semaphore>,
  retry:   RetryPolicy,
}

impl Transport {
  pub fn new(config: &HttpConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self {
      client,
      limiter: Arc::new(Semaphore::new(config.max_connections_per_host.max(1))),
      retry: config.retry.clone(),
    })
  }

  /// Send the request `build` produces, rebuilding it for every attempt.
  ///
  /// Connection failures, timeouts, 429 and 5xx are retried under the retry
  /// policy; any other status is handed back in the [`Reply`].
  pub async fn send<F>(&self, build: F) -> Result<Reply>
  where
    F: Fn(&Client) -> RequestBuilder,
  {
    let build = &build;
    self
      .retry
      .execute(move |attempt| async move {
        let request = build(&self.client).build()?;
        let method = request.method().clone();
        let url = request.url().to_string();
        if attempt > 1 {
          warn!(
            attempt,
            max_attempts = self.retry.max_attempts,
            %method,
            %url,
            "retrying request"
          );
        }

        let _permit = self.limiter.acquire().await?;
        let response = self.client.execute(request).await?;
        let status = response.status();
        let content_type = response
          .headers()
          .get(CONTENT_TYPE)
          .and_then(|value| value.to_str().ok())
          .map(str::to_owned);
        let body = response.text().await?;
        debug!(%method, %url, %status, "request finished");

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
          return Err(Error::Status {
            method,
            url,
            status,
            body,
          });
        }
        Ok(Reply {
          method,
          url,
          status,
          content_type,
          body,
        })
      })
      .await
  }
}
