//! Core types and trait definitions for roster.
//!
//! This crate is deliberately free of HTTP dependencies. It describes the
//! directory's people and the marketing service's subscribers, and the two
//! client traits the sync layer is written against.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod de;
pub mod directory;
pub mod error;
pub mod marketing;
pub mod normalize;
pub mod person;

pub use error::{Error, Result};
