//! Error types for the enricher.
//!
//! Library crates use [`EnricherError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all enricher operations.
#[derive(Debug, thiserror::Error)]
pub enum EnricherError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Timeout, DNS, refused connection or any other transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// A response arrived with a status other than 200.
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// Unparseable or empty HTML.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Structurally invalid request (e.g. no domain list at all).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The run was cancelled between sub-batches.
    #[error("run cancelled after {completed_batches} of {total_batches} batches")]
    Cancelled {
        completed_batches: usize,
        total_batches: usize,
    },

    /// No job with the given identifier is known.
    #[error("job not found: {0}")]
    JobNotFound(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, EnricherError>;

impl EnricherError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error should be reported to a caller as a bad request.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = EnricherError::config("unknown key");
        assert_eq!(err.to_string(), "config error: unknown key");

        let err = EnricherError::validation("No domains provided");
        assert!(err.to_string().contains("No domains provided"));
        assert!(err.is_bad_request());

        let err = EnricherError::Http { status: 404 };
        assert_eq!(err.to_string(), "HTTP error: status 404");
        assert!(!err.is_bad_request());
    }

    #[test]
    fn cancelled_reports_progress() {
        let err = EnricherError::Cancelled {
            completed_batches: 1,
            total_batches: 3,
        };
        assert_eq!(err.to_string(), "run cancelled after 1 of 3 batches");
    }
}
