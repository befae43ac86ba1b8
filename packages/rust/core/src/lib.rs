//! Batch orchestration for domain enrichment.
//!
//! [`scheduler::BatchScheduler`] splits a domain list into bounded sub-batches,
//! drives the extractor over each one and persists results as it goes.
//! [`jobs::JobRegistry`] runs that work in the background and exposes its
//! status, and [`search::search_company`] reads back what was stored.

pub mod jobs;
pub mod scheduler;
pub mod search;

pub use jobs::{ImportRequest, JobRegistry, JobState, JobStatus};
pub use scheduler::{BatchScheduler, ProgressReporter, RunOptions, SilentProgress, plan_batches};
pub use search::search_company;
