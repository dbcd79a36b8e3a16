//! In-process vector index for tests and embedding in other programs.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use super::{rank, VectorIndex};
use crate::embedding::cosine_similarity;
use crate::error::Result;
use crate::models::{Passage, ScoredPassage};

/// In-process index. Used for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    name: String,
    namespaces: RwLock<HashMap<String, BTreeMap<String, Passage>>>,
}

impl MemoryIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespaces: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, namespace: &str, passages: &[Passage]) -> Result<usize> {
        let mut guard = self.namespaces.write().unwrap_or_else(|e| e.into_inner());
        let ns = guard.entry(namespace.to_string()).or_default();
        for passage in passages {
            ns.insert(passage.id.clone(), passage.clone());
        }
        Ok(passages.len())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPassage>> {
        let guard = self.namespaces.read().unwrap_or_else(|e| e.into_inner());
        let Some(ns) = guard.get(namespace) else {
            return Ok(Vec::new());
        };
        let hits = ns
            .values()
            .map(|p| ScoredPassage {
                id: p.id.clone(),
                score: cosine_similarity(vector, &p.values),
                page_content: p.text.clone(),
                metadata: p.metadata.clone(),
            })
            .collect();
        Ok(rank(hits, top_k))
    }

    async fn count(&self, namespace: &str) -> Result<usize> {
        let guard = self.namespaces.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.get(namespace).map(|ns| ns.len()).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PassageMetadata;

    fn passage(id: &str, values: Vec<f32>) -> Passage {
        Passage {
            id: id.to_string(),
            values,
            text: format!("text of {}", id),
            metadata: PassageMetadata {
                source: "a.pdf".to_string(),
                page_number: 1,
                total_pages: 1,
                chunk_index: 0,
            },
        }
    }

    #[tokio::test]
    async fn query_ranks_by_similarity() {
        let index = MemoryIndex::new("test");
        index
            .upsert(
                "ns",
                &[
                    passage("x", vec![1.0, 0.0]),
                    passage("y", vec![0.0, 1.0]),
                    passage("xy", vec![0.7, 0.7]),
                ],
            )
            .await
            .unwrap();

        let hits = index.query("ns", &[1.0, 0.1], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "x");
        assert_eq!(hits[1].id, "xy");
        assert!(hits[0].score >= hits[1].score);
        assert_eq!(hits[0].page_content, "text of x");
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let index = MemoryIndex::new("test");
        index.upsert("ns", &[passage("a", vec![1.0, 0.0])]).await.unwrap();
        index.upsert("ns", &[passage("a", vec![0.0, 1.0])]).await.unwrap();
        assert_eq!(index.count("ns").await.unwrap(), 1);

        let hits = index.query("ns", &[0.0, 1.0], 1).await.unwrap();
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let index = MemoryIndex::new("test");
        index.upsert("one", &[passage("a", vec![1.0])]).await.unwrap();
        assert_eq!(index.count("two").await.unwrap(), 0);
        assert!(index.query("two", &[1.0], 4).await.unwrap().is_empty());
    }
}
