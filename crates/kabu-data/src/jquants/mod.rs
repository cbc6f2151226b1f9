//! J-Quants API client.
//!
//! [`JQuantsClient`] handles authentication, request pacing and pagination.
//! Each endpoint module owns its wire types and the conversion into the
//! typed records of [`crate::store`].

pub mod client;
pub mod listed;
pub mod quotes;
pub mod statements;

pub use client::{DEFAULT_BASE_URL, JQuantsClient};
