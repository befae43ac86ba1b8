//! Homepage fetching, metadata resolution, and batch extraction.
//!
//! This crate provides:
//! - [`fetcher`]: bounded-timeout homepage GET ([`Fetcher`], [`FetchOutcome`])
//! - [`resolver`]: ordered fallback rules for name/url/description/twitter
//! - [`batch`]: concurrent fetch-and-resolve over one sub-batch ([`BatchExtractor`])

pub mod batch;
pub mod fetcher;
pub mod resolver;

pub use batch::{BatchExtractor, extract_one, record_from_fetch};
pub use fetcher::{FetchOutcome, Fetcher};
pub use resolver::{CompanyMeta, clean_company_name, is_extractable, resolve};
