use crate::error::BackendError;
use crate::tenant::{Prefix, TableKind};
use sqlx::SqlitePool;

/// Current UTC time with millisecond precision, the format every
/// `created_at` column is written and compared in.
pub const SQLITE_NOW: &str = "strftime('%Y-%m-%d %H:%M:%f', 'now')";

/// Create the tenant's three tables if they do not exist yet.
pub async fn provision_tables(pool: &SqlitePool, prefix: &Prefix) -> Result<(), BackendError> {
    let nodes = prefix.table(TableKind::Nodes);
    let edges = prefix.table(TableKind::Edges);
    let translates = prefix.table(TableKind::Translates);

    let ddl = format!(
        "CREATE TABLE IF NOT EXISTS {nodes} (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            identifier  TEXT,
            data        TEXT,
            ttld        INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT ({SQLITE_NOW})
        );
        CREATE INDEX IF NOT EXISTS idx_{nodes}_ttld ON {nodes}(ttld, created_at);

        CREATE TABLE IF NOT EXISTS {edges} (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            left_node_id   INTEGER,
            right_node_id  INTEGER,
            relation       TEXT,
            data           TEXT,
            ttld           INTEGER NOT NULL DEFAULT 0,
            created_at     TEXT NOT NULL DEFAULT ({SQLITE_NOW})
        );
        CREATE INDEX IF NOT EXISTS idx_{edges}_ttld ON {edges}(ttld, created_at);

        CREATE TABLE IF NOT EXISTS {translates} (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            identifier  TEXT,
            value       TEXT,
            data        TEXT,
            ttld        INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT ({SQLITE_NOW})
        );
        CREATE INDEX IF NOT EXISTS idx_{translates}_ttld ON {translates}(ttld, created_at);"
    );

    sqlx::raw_sql(&ddl)
        .execute(pool)
        .await
        .map_err(|source| BackendError::Provision {
            prefix: prefix.to_string(),
            source,
        })?;

    tracing::debug!(prefix = %prefix, "tenant tables provisioned");
    Ok(())
}
