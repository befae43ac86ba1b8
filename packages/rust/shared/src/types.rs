//! Core domain types for extraction records, progress and reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DomainKey;

// ---------------------------------------------------------------------------
// JobId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for import job identifiers (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a new time-sortable job identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Classification of a single domain's extraction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The homepage was fetched and its metadata resolved.
    Success,
    /// The site answered, but not with usable HTML.
    Fallback,
    /// The site could not be reached, or extraction failed.
    Error,
}

impl Outcome {
    /// The persisted `status` column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Fallback => "fallback",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "fallback" => Ok(Self::Fallback),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown outcome '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// ExtractionRecord
// ---------------------------------------------------------------------------

/// Result of one extraction attempt for one domain. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub domain: DomainKey,
    /// Company name (always present, falls back to the domain label).
    pub name: String,
    /// Canonical URL declared by the site.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Twitter handle from `twitter:site` / `twitter:creator`.
    #[serde(default)]
    pub twitter: Option<String>,
    /// Serialized as `status` to match the persisted column.
    #[serde(rename = "status")]
    pub outcome: Outcome,
}

impl ExtractionRecord {
    /// A record carrying only the domain-derived name.
    pub fn fallback(domain: DomainKey, outcome: Outcome) -> Self {
        let name = domain.fallback_name();
        Self {
            domain,
            name,
            url: None,
            description: None,
            twitter: None,
            outcome,
        }
    }
}

// ---------------------------------------------------------------------------
// Progress and reports
// ---------------------------------------------------------------------------

/// Emitted after each sub-batch completes. Transient, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub completed_batches: usize,
    pub total_batches: usize,
    pub total_domains: usize,
    /// Human-readable status line, e.g. `"Processing batch 2 of 3"`.
    pub message: String,
}

impl BatchProgress {
    pub fn new(completed_batches: usize, total_batches: usize, total_domains: usize) -> Self {
        Self {
            completed_batches,
            total_batches,
            total_domains,
            message: format!("Processing batch {completed_batches} of {total_batches}"),
        }
    }
}

/// Record counts by outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub total: usize,
    pub success: usize,
    pub fallback: usize,
    pub error: usize,
}

impl OutcomeCounts {
    /// Tally a slice of records.
    pub fn tally(records: &[ExtractionRecord]) -> Self {
        records.iter().fold(Self::default(), |mut counts, r| {
            counts.add(r.outcome);
            counts
        })
    }

    pub fn add(&mut self, outcome: Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Success => self.success += 1,
            Outcome::Fallback => self.fallback += 1,
            Outcome::Error => self.error += 1,
        }
    }
}

/// Final result of a full run. Built once, immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Owning import job, when the run was submitted through the job boundary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    pub records: Vec<ExtractionRecord>,
    pub counts: OutcomeCounts,
    pub total_batches: usize,
    pub completed_at: DateTime<Utc>,
}

impl BatchReport {
    /// Build a report from aggregated records, tallying counts.
    pub fn new(job_id: Option<JobId>, records: Vec<ExtractionRecord>, total_batches: usize) -> Self {
        let counts = OutcomeCounts::tally(&records);
        Self {
            job_id,
            records,
            counts,
            total_batches,
            completed_at: Utc::now(),
        }
    }
}
