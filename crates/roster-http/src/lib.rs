//! reqwest implementations of the `roster-core` client traits.
//!
//! [`HttpDirectory`] talks to the pilgrimage directory and [`SenderClient`]
//! to the Sender.net marketing API. Each owns a [`Transport`], so the
//! connection limit applies per service.

pub mod directory;
pub mod error;
pub mod retry;
pub mod sender;
pub mod transport;

pub use directory::{DirectoryConfig, HttpDirectory};
pub use error::{Error, Result};
pub use retry::RetryPolicy;
pub use sender::{SenderClient, SenderConfig};
pub use transport::{HttpConfig, Transport};
