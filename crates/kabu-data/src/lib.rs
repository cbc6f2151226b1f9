#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/kabu-analysis/kabu/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod jquants;
pub mod market;
pub mod parse;
pub mod store;

pub use error::{DataError, Result};
pub use market::MarketCode;
pub use store::Store;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
