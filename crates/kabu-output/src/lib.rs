#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/kabu-analysis/kabu/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod report;
pub mod table;

pub use export::{AssessmentExport, ExportError, ExportFormat, Exporter};
pub use report::IssuerReport;
pub use table::{display_code, render_listings, render_screen, render_summaries, truncate_name};
