//! Local SQLite vector index with brute-force cosine queries.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use super::{rank, VectorIndex};
use crate::db;
use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::error::{RagError, Result};
use crate::migrate;
use crate::models::{Passage, PassageMetadata, ScoredPassage};

/// Passages in a local SQLite file, queried by brute-force cosine.
pub struct SqliteIndex {
    name: String,
    pool: SqlitePool,
}

impl SqliteIndex {
    /// Connect to (and create if needed) the database at `path`.
    pub async fn open(name: &str, path: &Path) -> Result<Self> {
        let pool = db::connect(path)
            .await
            .map_err(|e| RagError::index(format!("{:#}", e)))?;
        migrate::run_migrations(&pool)
            .await
            .map_err(|e| RagError::index(format!("{:#}", e)))?;
        Ok(Self {
            name: name.to_string(),
            pool,
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, namespace: &str, passages: &[Passage]) -> Result<usize> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await.map_err(RagError::index)?;

        for p in passages {
            sqlx::query(
                r#"
                INSERT INTO passages (namespace, id, source, page_number, total_pages, chunk_index, text, embedding, dims, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(namespace, id) DO UPDATE SET
                    source = excluded.source,
                    page_number = excluded.page_number,
                    total_pages = excluded.total_pages,
                    chunk_index = excluded.chunk_index,
                    text = excluded.text,
                    embedding = excluded.embedding,
                    dims = excluded.dims,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(namespace)
            .bind(&p.id)
            .bind(&p.metadata.source)
            .bind(p.metadata.page_number as i64)
            .bind(p.metadata.total_pages as i64)
            .bind(p.metadata.chunk_index as i64)
            .bind(&p.text)
            .bind(vec_to_blob(&p.values))
            .bind(p.values.len() as i64)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(RagError::index)?;
        }

        tx.commit().await.map_err(RagError::index)?;
        Ok(passages.len())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPassage>> {
        // Fetch all vectors and compute cosine similarity in Rust
        let rows = sqlx::query(
            r#"
            SELECT id, source, page_number, total_pages, chunk_index, text, embedding
            FROM passages
            WHERE namespace = ?
            "#,
        )
        .bind(namespace)
        .fetch_all(&self.pool)
        .await
        .map_err(RagError::index)?;

        let hits = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let page_number: i64 = row.get("page_number");
                let total_pages: i64 = row.get("total_pages");
                let chunk_index: i64 = row.get("chunk_index");
                ScoredPassage {
                    id: row.get("id"),
                    score: cosine_similarity(vector, &blob_to_vec(&blob)),
                    page_content: row.get("text"),
                    metadata: PassageMetadata {
                        source: row.get("source"),
                        page_number: page_number as u32,
                        total_pages: total_pages as u32,
                        chunk_index: chunk_index as usize,
                    },
                }
            })
            .collect();

        Ok(rank(hits, top_k))
    }

    async fn count(&self, namespace: &str) -> Result<usize> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM passages WHERE namespace = ?")
            .bind(namespace)
            .fetch_one(&self.pool)
            .await
            .map_err(RagError::index)?;
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn passage(id: &str, chunk_index: usize, values: Vec<f32>) -> Passage {
        Passage {
            id: id.to_string(),
            values,
            text: format!("passage {}", id),
            metadata: PassageMetadata {
                source: "report.pdf".to_string(),
                page_number: 2,
                total_pages: 5,
                chunk_index,
            },
        }
    }

    #[tokio::test]
    async fn test_upsert_and_query_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let index = SqliteIndex::open("idx", &tmp.path().join("data/index.sqlite"))
            .await
            .unwrap();

        let written = index
            .upsert(
                "pdf",
                &[
                    passage("a", 0, vec![1.0, 0.0, 0.0]),
                    passage("b", 1, vec![0.0, 1.0, 0.0]),
                ],
            )
            .await
            .unwrap();
        assert_eq!(written, 2);
        assert_eq!(index.count("pdf").await.unwrap(), 2);

        let hits = index.query("pdf", &[0.1, 0.9, 0.0], 4).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "b");
        assert_eq!(hits[0].page_content, "passage b");
        assert_eq!(hits[0].metadata.source, "report.pdf");
        assert_eq!(hits[0].metadata.page_number, 2);
        assert_eq!(hits[0].metadata.total_pages, 5);
        assert_eq!(hits[0].metadata.chunk_index, 1);
        index.close().await;
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_by_id() {
        let tmp = TempDir::new().unwrap();
        let index = SqliteIndex::open("idx", &tmp.path().join("index.sqlite"))
            .await
            .unwrap();

        index.upsert("pdf", &[passage("a", 0, vec![1.0, 0.0])]).await.unwrap();
        index.upsert("pdf", &[passage("a", 0, vec![0.0, 1.0])]).await.unwrap();
        assert_eq!(index.count("pdf").await.unwrap(), 1);
        assert_eq!(index.count("other").await.unwrap(), 0);
        index.close().await;
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.sqlite");
        {
            let index = SqliteIndex::open("idx", &path).await.unwrap();
            index.upsert("pdf", &[passage("a", 0, vec![1.0])]).await.unwrap();
            index.close().await;
        }
        let index = SqliteIndex::open("idx", &path).await.unwrap();
        assert_eq!(index.count("pdf").await.unwrap(), 1);
        index.close().await;
    }
}
