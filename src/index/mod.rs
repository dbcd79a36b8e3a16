//! Vector index backends.
//!
//! Every backend stores [`Passage`]s under a namespace and answers
//! nearest-neighbour queries by cosine similarity. Upserting an id that
//! already exists in the namespace replaces it, so re-ingesting a
//! document never duplicates passages.
//!
//! | Provider   | Storage                                  |
//! |------------|------------------------------------------|
//! | `sqlite`   | local file, brute-force cosine           |
//! | `pinecone` | hosted index over its REST data plane    |
//!
//! [`MemoryIndex`] is not selectable from configuration: processed markers
//! outlive the process, so the index they vouch for must too.

mod memory;
mod pinecone;
mod sqlite;

pub use memory::MemoryIndex;
pub use pinecone::PineconeIndex;
pub use sqlite::SqliteIndex;

use async_trait::async_trait;

use crate::config::IndexConfig;
use crate::error::Result;
use crate::models::{Passage, ScoredPassage};

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Index name as configured.
    fn name(&self) -> &str;

    /// Insert or replace passages by id. Returns the number written.
    async fn upsert(&self, namespace: &str, passages: &[Passage]) -> Result<usize>;

    /// Up to `top_k` passages, most similar first.
    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPassage>>;

    /// Number of passages stored in `namespace`.
    async fn count(&self, namespace: &str) -> Result<usize>;
}

/// Open the configured index backend.
pub async fn create_index(config: &IndexConfig) -> Result<Box<dyn VectorIndex>> {
    match config.provider.as_str() {
        "sqlite" => Ok(Box::new(SqliteIndex::open(&config.name, &config.path).await?)),
        "pinecone" => Ok(Box::new(PineconeIndex::new(config)?)),
        other => Err(crate::error::RagError::Configuration(format!(
            "unknown index provider: {}",
            other
        ))),
    }
}

/// Sort by descending score and keep the first `top_k`.
pub(crate) fn rank(mut hits: Vec<ScoredPassage>, top_k: usize) -> Vec<ScoredPassage> {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    hits.truncate(top_k);
    hits
}
