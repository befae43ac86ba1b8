//! Batch scheduler: domain list → sized sub-batches → extract → persist → report.
//!
//! Sub-batches run strictly one after another, so at most one sub-batch's
//! fetch pool is ever open. Each sub-batch is persisted before the next one
//! starts, so a crash mid-run loses only the sub-batch in flight.

use std::ops::Range;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use enricher_extractor::BatchExtractor;
use enricher_shared::{
    BatchConfig, BatchProgress, BatchReport, DEFAULT_TARGET_BATCH_SIZE, EnricherError,
    ExtractionRecord, FetchConfig, JobId, MAX_BATCH_SIZE, OutcomeCounts, Result,
};
use enricher_storage::Storage;

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called once the batch plan is known, before any fetching.
    fn started(&self, total_batches: usize, total_domains: usize);
    /// Called after each sub-batch has been extracted and persisted.
    fn batch_completed(&self, progress: &BatchProgress);
    /// Called when the run completes.
    fn done(&self, report: &BatchReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn started(&self, _total_batches: usize, _total_domains: usize) {}
    fn batch_completed(&self, _progress: &BatchProgress) {}
    fn done(&self, _report: &BatchReport) {}
}

/// Per-run options.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Job to record the run under. A fresh id is generated when absent.
    pub job_id: Option<JobId>,
    /// Concurrent fetches allowed within one sub-batch.
    pub target_batch_size: usize,
    /// Checked before each sub-batch.
    pub cancel: CancellationToken,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            job_id: None,
            target_batch_size: DEFAULT_TARGET_BATCH_SIZE,
            cancel: CancellationToken::new(),
        }
    }
}

/// Split `total` domains into sub-batch ranges.
///
/// The largest sub-batch is capped at `max_size`, itself clamped to
/// `1..=MAX_BATCH_SIZE`; the domains are then spread evenly over the
/// resulting number of batches, e.g. 1200 domains with a cap of 500 become
/// three batches of 400.
pub fn plan_batches(total: usize, max_size: usize) -> Vec<Range<usize>> {
    if total == 0 {
        return Vec::new();
    }

    let optimal = max_size.clamp(1, MAX_BATCH_SIZE).min(total);
    let num_batches = total.div_ceil(optimal);
    let batch_size = total.div_ceil(num_batches).max(1);

    (0..num_batches)
        .map(|i| (i * batch_size)..((i + 1) * batch_size).min(total))
        .collect()
}

/// Runs a full domain list through the extractor in sequential sub-batches.
pub struct BatchScheduler {
    extractor: BatchExtractor,
    max_batch_size: usize,
}

impl BatchScheduler {
    /// Create a scheduler with its own extractor.
    pub fn new(fetch: &FetchConfig, batch: &BatchConfig) -> Result<Self> {
        Ok(Self::with_extractor(BatchExtractor::new(fetch)?, batch))
    }

    /// Create a scheduler around an existing extractor.
    pub fn with_extractor(extractor: BatchExtractor, batch: &BatchConfig) -> Self {
        Self {
            extractor,
            max_batch_size: batch.max_size,
        }
    }

    /// Enrich every domain, persisting after each sub-batch.
    ///
    /// Per-domain failures never fail the run. Storage errors and
    /// cancellation do; everything persisted before that point stays stored.
    #[instrument(skip_all, fields(domains = domains.len()))]
    pub async fn run(
        &self,
        domains: &[String],
        storage: &Storage,
        options: &RunOptions,
        progress: &dyn ProgressReporter,
    ) -> Result<BatchReport> {
        let job_id = options.job_id.unwrap_or_default();
        let plan = plan_batches(domains.len(), self.max_batch_size);
        let total_batches = plan.len();

        info!(
            %job_id,
            total_batches,
            batch_size = plan.first().map(|r| r.len()).unwrap_or(0),
            target_batch_size = options.target_batch_size,
            "starting run"
        );

        storage.insert_import_job(&job_id, domains.len()).await?;
        progress.started(total_batches, domains.len());

        let mut records: Vec<ExtractionRecord> = Vec::with_capacity(domains.len());

        for (i, range) in plan.into_iter().enumerate() {
            if options.cancel.is_cancelled() {
                warn!(%job_id, completed = i, total_batches, "run cancelled");
                let stats = serde_json::json!({
                    "status": "cancelled",
                    "completed_batches": i,
                    "total_batches": total_batches,
                    "counts": OutcomeCounts::tally(&records),
                });
                storage
                    .finish_import_job(&job_id, &stats.to_string())
                    .await?;
                return Err(EnricherError::Cancelled {
                    completed_batches: i,
                    total_batches,
                });
            }

            let batch = &domains[range];
            let batch_records = self
                .extractor
                .extract_batch(batch, options.target_batch_size)
                .await;

            let inserted = storage.save_records(&batch_records).await?;
            records.extend(batch_records);

            let update = BatchProgress::new(i + 1, total_batches, domains.len());
            info!(
                batch = i + 1,
                total_batches,
                size = batch.len(),
                inserted,
                "batch completed"
            );
            progress.batch_completed(&update);
        }

        let report = BatchReport::new(Some(job_id), records, total_batches);
        let stats = serde_json::json!({
            "status": "completed",
            "total_batches": total_batches,
            "counts": report.counts,
        });
        storage
            .finish_import_job(&job_id, &stats.to_string())
            .await?;

        info!(
            %job_id,
            total = report.counts.total,
            success = report.counts.success,
            fallback = report.counts.fallback,
            error = report.counts.error,
            "run completed"
        );
        progress.done(&report);

        Ok(report)
    }
}
