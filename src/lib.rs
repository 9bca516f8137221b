//! Age-wise enrollment imbalance pipeline.
//!
//! Raw enrollment rows are cleaned ([`cleaning`]), annotated with imbalance
//! metrics ([`metrics`]), ranked at district and PIN-code level
//! ([`ranking`]) and summarized ([`summary`]). [`pipeline::run`] chains the
//! stages; [`cache::PipelineCache`] memoizes whole runs.
pub mod cache;
pub mod cleaning;
pub mod config;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod output;
pub mod pipeline;
pub mod ranking;
pub mod reports;
pub mod summary;
pub mod types;
pub mod util;

pub use config::{PipelineConfig, PrioritySplit, RankMetric};
pub use error::{PipelineError, ValidationReport, ValidationWarning};
pub use pipeline::{run, PipelineOutput};
pub use types::{AgeCounts, EnrollmentRecord, Grade, MetricSet, Priority, RawRow, RawTable, Tier};
