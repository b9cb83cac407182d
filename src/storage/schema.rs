//! Database schema definitions
//!
//! Every statement uses `CREATE ... IF NOT EXISTS`, so creating a table that is
//! already present is a no-op.

/// Raw per-term outcomes
pub const RESPONSES_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS responses (
    time TEXT NOT NULL,
    id INTEGER NOT NULL,
    term TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('success', 'failure')),
    response TEXT,
    exception TEXT
);

CREATE INDEX IF NOT EXISTS idx_responses_status ON responses(status);
CREATE INDEX IF NOT EXISTS idx_responses_id ON responses(id);
"#;

/// URL records derived from successful responses
pub const URLS_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS urls (
    time TEXT NOT NULL,
    id INTEGER NOT NULL,
    term TEXT NOT NULL,
    correctedTerm TEXT,
    urls TEXT,
    notes TEXT
);
"#;

/// Campaign runs and sub-batch checkpoints
pub const BOOKKEEPING_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS campaigns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS batch_checkpoints (
    day TEXT NOT NULL,
    batch_index INTEGER NOT NULL,
    first_id INTEGER NOT NULL,
    last_id INTEGER NOT NULL,
    term_count INTEGER NOT NULL,
    completed_at TEXT NOT NULL,
    PRIMARY KEY (day, batch_index)
);
"#;

/// Creates the bookkeeping tables
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(BOOKKEEPING_SQL)?;
    Ok(())
}
