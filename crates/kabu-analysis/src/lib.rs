#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/kabu-analysis/kabu/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod assessment;
pub mod context;
pub mod error;
pub mod summary;

pub use assessment::{AssessmentDeriver, AssessmentReport, Pass, PassReport};
pub use context::PipelineContext;
pub use error::{AnalysisError, Result};
pub use summary::{RebuildStats, SummaryReducer};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
