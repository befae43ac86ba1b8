//! Shared types, error model, and configuration for the enricher.
//!
//! This crate is the foundation depended on by all other enricher crates.
//! It provides:
//! - [`EnricherError`]: the unified error type
//! - Domain types ([`DomainKey`], [`ExtractionRecord`], [`BatchReport`], [`JobId`])
//! - Configuration ([`AppConfig`], [`FetchConfig`], [`BatchConfig`], config loading)

pub mod config;
pub mod domain;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BatchConfig, BatchSection, DEFAULT_TARGET_BATCH_SIZE, FetchConfig, FetchSection,
    MAX_BATCH_SIZE, StorageSection, TIMEOUT_SECS_RANGE, config_dir, config_file_path, init_config, load_config,
    load_config_from, validate_config,
};
pub use domain::{DomainKey, title_case};
pub use error::{EnricherError, Result};
pub use types::{BatchProgress, BatchReport, ExtractionRecord, JobId, Outcome, OutcomeCounts};
