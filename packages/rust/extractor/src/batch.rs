//! Concurrent fetch-and-resolve over one sub-batch of domains.
//!
//! Every domain becomes one tokio task; a semaphore caps how many are in
//! flight. The semaphore lives for a single [`BatchExtractor::extract_batch`]
//! call. Per-domain failures become [`Outcome::Fallback`] or
//! [`Outcome::Error`] records, so a batch always yields one record per input.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use enricher_shared::{
    DomainKey, ExtractionRecord, FetchConfig, Outcome, OutcomeCounts, Result,
};

use crate::fetcher::{FetchOutcome, Fetcher};
use crate::resolver::{is_extractable, resolve};

/// Fetches and resolves homepages for batches of domains.
#[derive(Debug, Clone)]
pub struct BatchExtractor {
    fetcher: Fetcher,
}

impl BatchExtractor {
    /// Create an extractor with the given fetch configuration.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(config)?,
        })
    }

    /// Extract one record per domain, at most `concurrency` fetches in flight.
    ///
    /// Records come back in input order. Never fails.
    #[instrument(skip_all, fields(domains = domains.len(), concurrency = concurrency))]
    pub async fn extract_batch<S: AsRef<str>>(
        &self,
        domains: &[S],
        concurrency: usize,
    ) -> Vec<ExtractionRecord> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut handles = Vec::with_capacity(domains.len());

        for raw in domains {
            let domain = DomainKey::normalize(raw.as_ref());
            let fetcher = self.fetcher.clone();
            let sem = semaphore.clone();
            let task_domain = domain.clone();

            let handle = tokio::spawn(async move {
                let Ok(_permit) = sem.acquire().await else {
                    return ExtractionRecord::fallback(task_domain, Outcome::Error);
                };
                extract_one(&fetcher, task_domain).await
            });
            handles.push((domain, handle));
        }

        let mut records = Vec::with_capacity(handles.len());
        for (domain, handle) in handles {
            match handle.await {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(%domain, error = %e, "extraction task failed");
                    records.push(ExtractionRecord::fallback(domain, Outcome::Error));
                }
            }
        }

        let counts = OutcomeCounts::tally(&records);
        info!(
            success = counts.success,
            fallback = counts.fallback,
            error = counts.error,
            "batch extracted"
        );

        records
    }
}

/// Fetch and resolve a single domain.
pub async fn extract_one(fetcher: &Fetcher, domain: DomainKey) -> ExtractionRecord {
    let outcome = fetcher.fetch(&domain).await;
    record_from_fetch(domain, outcome)
}

/// Classify a fetch outcome and build the domain's record.
pub fn record_from_fetch(domain: DomainKey, outcome: FetchOutcome) -> ExtractionRecord {
    match outcome {
        FetchOutcome::Html(html) if is_extractable(&html) => {
            let meta = resolve(&html, &domain);
            debug!(%domain, name = %meta.name, outcome = "success", "resolved");
            ExtractionRecord {
                domain,
                name: meta.name,
                url: meta.url,
                description: meta.description,
                twitter: meta.twitter,
                outcome: Outcome::Success,
            }
        }
        FetchOutcome::Html(_) => {
            debug!(%domain, outcome = "fallback", "no extractable content");
            ExtractionRecord::fallback(domain, Outcome::Fallback)
        }
        FetchOutcome::HttpError(status) => {
            debug!(%domain, status, outcome = "fallback", "non-200 response");
            ExtractionRecord::fallback(domain, Outcome::Fallback)
        }
        FetchOutcome::TimeoutOrNetwork(reason) => {
            debug!(%domain, %reason, outcome = "error", "fetch failed");
            ExtractionRecord::fallback(domain, Outcome::Error)
        }
    }
}
