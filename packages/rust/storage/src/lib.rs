//! libSQL storage layer for enriched company records.
//!
//! The [`Storage`] struct wraps a local libSQL database holding one row per
//! domain plus a history of import jobs. Writes are idempotent by domain:
//! re-inserting a domain that already exists leaves the stored row untouched,
//! so a retried import can safely persist the same records twice.

mod migrations;

use std::path::Path;

use chrono::Utc;
use enricher_shared::{DomainKey, EnricherError, ExtractionRecord, JobId, Outcome, Result};
use libsql::{Connection, Database, params};
use tokio::sync::Mutex;
use tracing::debug;

/// Primary storage handle wrapping a libSQL database.
///
/// All statements go through one connection behind an async mutex, so a
/// transaction opened by one caller never interleaves with another's.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Mutex<Connection>,
}

/// One row of the `import_jobs` table.
#[derive(Debug, Clone)]
pub struct ImportJobRow {
    pub id: String,
    pub total_domains: usize,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub stats_json: Option<String>,
}

fn storage_err(e: impl std::fmt::Display) -> EnricherError {
    EnricherError::Storage(e.to_string())
}

impl Storage {
    /// Open or create a database at `path`, applying pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| EnricherError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn: Mutex::new(conn),
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                let conn = self.conn.lock().await;
                conn.execute_batch(migration.sql).await.map_err(|e| {
                    EnricherError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let conn = self.conn.lock().await;
        let result = conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Company operations
    // -----------------------------------------------------------------------

    /// Whether a row for `domain` already exists.
    pub async fn exists(&self, domain: &DomainKey) -> Result<bool> {
        let conn = self.conn.lock().await;
        exists_in(&conn, domain).await
    }

    /// Insert a record. A domain that is already stored is left unchanged.
    ///
    /// Returns `true` if a new row was written.
    pub async fn insert(&self, record: &ExtractionRecord) -> Result<bool> {
        let conn = self.conn.lock().await;
        insert_into(&conn, record).await
    }

    /// Persist a sub-batch of records in one transaction, skipping domains
    /// already stored.
    ///
    /// Returns the number of rows written.
    pub async fn save_records(&self, records: &[ExtractionRecord]) -> Result<usize> {
        // Held until commit so no other statement lands inside this transaction.
        let conn = self.conn.lock().await;
        let tx = conn.transaction().await.map_err(storage_err)?;
        let mut inserted = 0;
        for record in records {
            if exists_in(&tx, &record.domain).await? {
                debug!(domain = %record.domain, "already stored, skipping");
                continue;
            }
            if insert_into(&tx, record).await? {
                inserted += 1;
            }
        }
        tx.commit().await.map_err(storage_err)?;
        Ok(inserted)
    }

    /// Get the stored record for an exact domain.
    pub async fn get(&self, domain: &DomainKey) -> Result<Option<ExtractionRecord>> {
        let conn = self.conn.lock().await;
        let mut rows = conn
            .query(
                "SELECT domain, name, url, description, twitter, status
                 FROM companies WHERE domain = ?1",
                params![domain.as_str()],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_record(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// First record whose name or domain contains `query`, by domain order.
    pub async fn lookup(&self, query: &str) -> Result<Option<ExtractionRecord>> {
        let pattern = format!("%{}%", escape_like(query));
        let conn = self.conn.lock().await;
        let mut rows = conn
            .query(
                "SELECT domain, name, url, description, twitter, status
                 FROM companies
                 WHERE name LIKE ?1 ESCAPE '\\' OR domain LIKE ?1 ESCAPE '\\'
                 ORDER BY domain
                 LIMIT 1",
                params![pattern.as_str()],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_record(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Number of stored companies.
    pub async fn count(&self) -> Result<usize> {
        let conn = self.conn.lock().await;
        let mut rows = conn
            .query("SELECT COUNT(*) FROM companies", params![])
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).map_err(storage_err)? as usize),
            Ok(None) => Ok(0),
            Err(e) => Err(storage_err(e)),
        }
    }

    // -----------------------------------------------------------------------
    // Import job operations
    // -----------------------------------------------------------------------

    /// Record the start of an import job.
    pub async fn insert_import_job(&self, job_id: &JobId, total_domains: usize) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO import_jobs (id, total_domains, started_at) VALUES (?1, ?2, ?3)",
            params![job_id.to_string(), total_domains as i64, now.as_str()],
        )
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    /// Mark an import job finished with its summary stats.
    pub async fn finish_import_job(&self, job_id: &JobId, stats_json: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE import_jobs SET finished_at = ?1, stats_json = ?2 WHERE id = ?3",
            params![now.as_str(), stats_json, job_id.to_string()],
        )
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    /// Get an import job by ID.
    pub async fn get_import_job(&self, job_id: &JobId) -> Result<Option<ImportJobRow>> {
        let conn = self.conn.lock().await;
        let mut rows = conn
            .query(
                "SELECT id, total_domains, started_at, finished_at, stats_json
                 FROM import_jobs WHERE id = ?1",
                params![job_id.to_string()],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(ImportJobRow {
                id: row.get::<String>(0).map_err(storage_err)?,
                total_domains: row.get::<i64>(1).map_err(storage_err)? as usize,
                started_at: row.get::<String>(2).map_err(storage_err)?,
                finished_at: row.get::<String>(3).ok(),
                stats_json: row.get::<String>(4).ok(),
            })),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }
}

/// Exact-domain existence check on any connection or transaction.
async fn exists_in(conn: &Connection, domain: &DomainKey) -> Result<bool> {
    let mut rows = conn
        .query(
            "SELECT 1 FROM companies WHERE domain = ?1 LIMIT 1",
            params![domain.as_str()],
        )
        .await
        .map_err(storage_err)?;

    match rows.next().await {
        Ok(row) => Ok(row.is_some()),
        Err(e) => Err(storage_err(e)),
    }
}

async fn insert_into(conn: &Connection, record: &ExtractionRecord) -> Result<bool> {
    let now = Utc::now().to_rfc3339();
    let written = conn
        .execute(
            "INSERT INTO companies (domain, name, url, description, twitter, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(domain) DO NOTHING",
            params![
                record.domain.as_str(),
                record.name.as_str(),
                record.url.as_deref(),
                record.description.as_deref(),
                record.twitter.as_deref(),
                record.outcome.as_str(),
                now.as_str(),
            ],
        )
        .await
        .map_err(storage_err)?;
    Ok(written > 0)
}

/// Escape `LIKE` wildcards so the query matches literally.
fn escape_like(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Convert a database row to an [`ExtractionRecord`].
fn row_to_record(row: &libsql::Row) -> Result<ExtractionRecord> {
    let status: String = row.get(5).map_err(storage_err)?;
    Ok(ExtractionRecord {
        domain: DomainKey::normalize(&row.get::<String>(0).map_err(storage_err)?),
        name: row.get::<String>(1).map_err(storage_err)?,
        url: row.get::<String>(2).ok(),
        description: row.get::<String>(3).ok(),
        twitter: row.get::<String>(4).ok(),
        outcome: status
            .parse::<Outcome>()
            .map_err(EnricherError::Storage)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("enricher_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn record(domain: &str, name: &str, outcome: Outcome) -> ExtractionRecord {
        ExtractionRecord {
            domain: DomainKey::normalize(domain),
            name: name.into(),
            url: Some(format!("https://{domain}/")),
            description: Some(format!("{name} does things")),
            twitter: None,
            outcome,
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.get_schema_version().await, 2);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("enricher_test_{}.db", Uuid::now_v7()));
        let s1 = Storage::open(&tmp).await.expect("first open");
        drop(s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 2);
    }

    #[tokio::test]
    async fn insert_and_get() {
        let storage = test_storage().await;
        let acme = record("acme.com", "Acme", Outcome::Success);

        assert!(!storage.exists(&acme.domain).await.unwrap());
        assert!(storage.insert(&acme).await.expect("insert"));
        assert!(storage.exists(&acme.domain).await.unwrap());

        let found = storage.get(&acme.domain).await.unwrap().expect("stored");
        assert_eq!(found, acme);
    }

    #[tokio::test]
    async fn duplicate_insert_keeps_one_row() {
        let storage = test_storage().await;
        let first = record("acme.com", "Acme", Outcome::Success);
        let second = ExtractionRecord {
            name: "Acme Again".into(),
            outcome: Outcome::Fallback,
            ..first.clone()
        };

        assert!(storage.insert(&first).await.unwrap());
        assert!(!storage.insert(&second).await.unwrap());
        assert_eq!(storage.count().await.unwrap(), 1);

        let stored = storage.get(&first.domain).await.unwrap().unwrap();
        assert_eq!(stored.name, "Acme");
        assert_eq!(stored.outcome, Outcome::Success);
    }

    #[tokio::test]
    async fn save_records_skips_existing() {
        let storage = test_storage().await;
        storage
            .insert(&record("acme.com", "Acme", Outcome::Success))
            .await
            .unwrap();

        let batch = vec![
            record("acme.com", "Acme", Outcome::Error),
            record("globex.com", "Globex", Outcome::Fallback),
            record("initech.com", "Initech", Outcome::Success),
        ];
        assert_eq!(storage.save_records(&batch).await.unwrap(), 2);
        assert_eq!(storage.save_records(&batch).await.unwrap(), 0);
        assert_eq!(storage.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn existence_is_exact_not_substring() {
        let storage = test_storage().await;
        storage
            .insert(&record("myexample.com", "My Example", Outcome::Success))
            .await
            .unwrap();

        assert!(!storage.exists(&DomainKey::normalize("example.com")).await.unwrap());
        let inserted = storage
            .save_records(&[record("example.com", "Example", Outcome::Success)])
            .await
            .unwrap();
        assert_eq!(inserted, 1);
    }

    #[tokio::test]
    async fn lookup_by_name_or_domain() {
        let storage = test_storage().await;
        for (domain, name) in [("globex.com", "Globex Corporation"), ("initech.io", "Initech")] {
            storage
                .insert(&record(domain, name, Outcome::Success))
                .await
                .unwrap();
        }

        let by_name = storage.lookup("corporation").await.unwrap().expect("match");
        assert_eq!(by_name.domain.as_str(), "globex.com");

        let by_domain = storage.lookup("tech.io").await.unwrap().expect("match");
        assert_eq!(by_domain.name, "Initech");

        assert!(storage.lookup("umbrella").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lookup_treats_wildcards_literally() {
        let storage = test_storage().await;
        storage
            .insert(&record("acme.com", "Acme", Outcome::Success))
            .await
            .unwrap();

        assert!(storage.lookup("%").await.unwrap().is_none());
        assert!(storage.lookup("a_me").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn import_job_lifecycle() {
        let storage = test_storage().await;
        let job_id = JobId::new();

        storage
            .insert_import_job(&job_id, 1200)
            .await
            .expect("insert import job");
        let row = storage.get_import_job(&job_id).await.unwrap().expect("job row");
        assert_eq!(row.total_domains, 1200);
        assert!(row.finished_at.is_none());

        storage
            .finish_import_job(&job_id, r#"{"success": 10}"#)
            .await
            .expect("finish import job");
        let row = storage.get_import_job(&job_id).await.unwrap().unwrap();
        assert!(row.finished_at.is_some());
        assert!(row.stats_json.unwrap().contains("success"));

        assert!(storage.get_import_job(&JobId::new()).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_do_not_share_a_transaction() {
        let storage = std::sync::Arc::new(test_storage().await);

        let mut handles = Vec::new();
        for writer in 0..8 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                for chunk in 0..20 {
                    let records: Vec<ExtractionRecord> = (0..5)
                        .map(|i| {
                            let domain = format!("w{writer}-c{chunk}-{i}.example");
                            record(&domain, "Concurrent", Outcome::Error)
                        })
                        .collect();
                    storage.save_records(&records).await?;
                    storage.count().await?;
                }
                Ok::<_, EnricherError>(())
            }));
        }

        for handle in handles {
            handle.await.expect("writer task").expect("save_records");
        }
        assert_eq!(storage.count().await.unwrap(), 8 * 20 * 5);
    }
}
