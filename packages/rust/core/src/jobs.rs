//! Background import jobs.
//!
//! [`JobRegistry::submit`] validates an [`ImportRequest`], spawns the
//! scheduler run on the tokio runtime and returns a [`JobId`] immediately.
//! Each job publishes its latest [`JobStatus`] on a `watch` channel that the
//! scheduler's progress reporter writes after every sub-batch.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use enricher_shared::{BatchProgress, BatchReport, EnricherError, JobId, Result};
use enricher_storage::Storage;

use crate::scheduler::{BatchScheduler, ProgressReporter, RunOptions};

/// Body accepted by the job submission boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub domains: Option<Vec<String>>,
}

impl ImportRequest {
    pub fn new(domains: Vec<String>) -> Self {
        Self {
            domains: Some(domains),
        }
    }

    /// Parse a JSON request body.
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| EnricherError::validation(format!("malformed request: {e}")))
    }

    /// The domain list, or a validation error if none was given.
    pub fn into_domains(self) -> Result<Vec<String>> {
        self.domains
            .ok_or_else(|| EnricherError::validation("No domains provided"))
    }
}

/// Lifecycle state of an import job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    Pending,
    Progress,
    Success,
    Failure,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}

/// Snapshot returned by [`JobRegistry::status`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<BatchProgress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<BatchReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobStatus {
    fn pending() -> Self {
        Self {
            state: JobState::Pending,
            progress: None,
            result: None,
            error: None,
        }
    }
}

struct JobEntry {
    status: watch::Receiver<JobStatus>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

/// Publishes scheduler progress onto a job's status channel.
struct WatchProgress<'a> {
    tx: &'a watch::Sender<JobStatus>,
}

impl ProgressReporter for WatchProgress<'_> {
    fn started(&self, total_batches: usize, total_domains: usize) {
        self.tx.send_modify(|s| {
            s.state = JobState::Progress;
            s.progress = Some(BatchProgress::new(0, total_batches, total_domains));
        });
    }

    fn batch_completed(&self, progress: &BatchProgress) {
        self.tx.send_modify(|s| {
            s.state = JobState::Progress;
            s.progress = Some(progress.clone());
        });
    }

    fn done(&self, _report: &BatchReport) {}
}

/// In-process registry of submitted import jobs.
pub struct JobRegistry {
    scheduler: Arc<BatchScheduler>,
    storage: Arc<Storage>,
    target_batch_size: usize,
    jobs: RwLock<HashMap<JobId, JobEntry>>,
}

impl JobRegistry {
    pub fn new(scheduler: Arc<BatchScheduler>, storage: Arc<Storage>, target_batch_size: usize) -> Self {
        Self {
            scheduler,
            storage,
            target_batch_size,
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Validate and start an import job. Returns without waiting for it.
    #[instrument(skip_all)]
    pub async fn submit(&self, request: ImportRequest) -> Result<JobId> {
        let domains = request.into_domains()?;
        let job_id = JobId::new();
        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(JobStatus::pending());

        let options = RunOptions {
            job_id: Some(job_id),
            target_batch_size: self.target_batch_size,
            cancel: cancel.clone(),
        };
        let scheduler = self.scheduler.clone();
        let storage = self.storage.clone();

        info!(%job_id, total_domains = domains.len(), "job submitted");

        // Register before spawning so a fast job cannot finish unobserved.
        let mut jobs = self.jobs.write().await;
        let handle = tokio::spawn(async move {
            let reporter = WatchProgress { tx: &tx };
            let result = scheduler
                .run(&domains, &storage, &options, &reporter)
                .await;

            tx.send_modify(|s| match result {
                Ok(report) => {
                    s.state = JobState::Success;
                    s.result = Some(report);
                }
                Err(e) => {
                    warn!(%job_id, error = %e, "job failed");
                    s.state = JobState::Failure;
                    s.error = Some(e.to_string());
                }
            });
        });

        jobs.insert(
            job_id,
            JobEntry {
                status: rx,
                cancel,
                handle: Some(handle),
            },
        );

        Ok(job_id)
    }

    /// Latest status of a job.
    pub async fn status(&self, job_id: &JobId) -> Result<JobStatus> {
        let jobs = self.jobs.read().await;
        let entry = jobs
            .get(job_id)
            .ok_or_else(|| EnricherError::JobNotFound(job_id.to_string()))?;
        Ok(entry.status.borrow().clone())
    }

    /// Request cancellation. Takes effect before the job's next sub-batch.
    pub async fn cancel(&self, job_id: &JobId) -> Result<()> {
        let jobs = self.jobs.read().await;
        let entry = jobs
            .get(job_id)
            .ok_or_else(|| EnricherError::JobNotFound(job_id.to_string()))?;
        entry.cancel.cancel();
        info!(%job_id, "job cancellation requested");
        Ok(())
    }

    /// Wait for a job to finish and return its final status.
    pub async fn wait(&self, job_id: &JobId) -> Result<JobStatus> {
        let handle = {
            let mut jobs = self.jobs.write().await;
            let entry = jobs
                .get_mut(job_id)
                .ok_or_else(|| EnricherError::JobNotFound(job_id.to_string()))?;
            entry.handle.take()
        };

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(%job_id, error = %e, "job task aborted");
                let jobs = self.jobs.read().await;
                if let Some(entry) = jobs.get(job_id) {
                    let mut status = entry.status.borrow().clone();
                    status.state = JobState::Failure;
                    status.error = Some(e.to_string());
                    return Ok(status);
                }
            }
        }

        self.status(job_id).await
    }
}
