//! Schema for the local passage store.

use anyhow::Result;
use sqlx::SqlitePool;

/// Create the passage store. Safe to run on every startup.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS passages (
            namespace TEXT NOT NULL,
            id TEXT NOT NULL,
            source TEXT NOT NULL,
            page_number INTEGER NOT NULL,
            total_pages INTEGER NOT NULL,
            chunk_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            dims INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (namespace, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_passages_source ON passages(namespace, source)")
        .execute(pool)
        .await?;

    Ok(())
}
