//! SQL migration definitions for the company database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: companies",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per enriched domain; the first extraction wins
CREATE TABLE IF NOT EXISTS companies (
    domain      TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    url         TEXT,
    description TEXT,
    twitter     TEXT,
    status      TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_companies_name ON companies(name);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Import job history",
            sql: r#"
CREATE TABLE IF NOT EXISTS import_jobs (
    id            TEXT PRIMARY KEY,
    total_domains INTEGER NOT NULL,
    started_at    TEXT NOT NULL,
    finished_at   TEXT,
    stats_json    TEXT
);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
