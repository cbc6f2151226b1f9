//! Glue between the CLI and the library crates.

pub(crate) mod config;
pub(crate) mod pipeline;
pub(crate) mod store_manager;
