//! Error type for `roster-http`.

use reqwest::{Method, StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The server answered with a non-success status.
  #[error("{method} {url} returned {status}: {body}")]
  Status {
    method: Method,
    url:    String,
    status: StatusCode,
    body:   String,
  },

  /// The service refused a write (`success: false` or a non-success status).
  #[error("rejected ({status}): {message}")]
  Rejected { status: StatusCode, message: String },

  #[error("unexpected content type {0:?}")]
  UnexpectedContentType(String),

  #[error("response envelope has no data")]
  MissingData,

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("invalid url {0:?}")]
  InvalidUrl(String),

  #[error("no directory session token or google token configured")]
  MissingCredentials,

  #[error("connection limiter closed")]
  LimiterClosed(#[from] tokio::sync::AcquireError),
}

impl Error {
  /// Connection failures, timeouts, 429 and 5xx are worth another attempt.
  pub fn is_retryable(&self) -> bool {
    match self {
      Self::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
      Self::Status { status, .. } => {
        *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
      }
      _ => false,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  fn status(code: u16) -> Error {
    Error::Status {
      method: Method::GET,
      url:    "http://localhost/x".into(),
      status: StatusCode::from_u16(code).unwrap(),
      body:   String::new(),
    }
  }

  #[test]
  fn transient_statuses_are_retryable() {
    assert!(status(429).is_retryable());
    assert!(status(502).is_retryable());
    assert!(!status(404).is_retryable());
    assert!(!status(400).is_retryable());
    assert!(
      !Error::Rejected {
        status:  StatusCode::SERVICE_UNAVAILABLE,
        message: "nope".into(),
      }
      .is_retryable()
    );
  }
}
