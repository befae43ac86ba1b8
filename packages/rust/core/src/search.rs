//! Company search over persisted records.
//!
//! Matches the query as a literal substring of a stored name or domain and
//! returns the first hit in domain order.

use tracing::debug;

use enricher_shared::{EnricherError, ExtractionRecord, Result};
use enricher_storage::Storage;

/// Find the first stored company whose name or domain contains `query`.
pub async fn search_company(storage: &Storage, query: &str) -> Result<Option<ExtractionRecord>> {
    let query = query.trim();
    if query.is_empty() {
        return Err(EnricherError::validation("query is required"));
    }

    let found = storage.lookup(query).await?;
    debug!(query, found = found.is_some(), "company search");
    Ok(found)
}
