//! Pinecone data-plane client.
//!
//! Talks to an existing index host directly (`index.host` in the config);
//! the index itself must already exist with a dimension matching the
//! embedding model. Authenticates with `PINECONE_API_KEY`.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::VectorIndex;
use crate::config::IndexConfig;
use crate::error::{RagError, Result};
use crate::http::{build_client, trim_base_url, JsonPost};
use crate::models::{Passage, PassageMetadata, ScoredPassage};

pub const API_KEY_ENV: &str = "PINECONE_API_KEY";

/// Pinecone caps upsert requests; 100 vectors stays well under the limit.
const UPSERT_BATCH: usize = 100;
const MAX_RETRIES: u32 = 5;
const TIMEOUT_SECS: u64 = 30;

pub struct PineconeIndex {
    name: String,
    host: String,
    api_key: String,
    client: reqwest::Client,
}

impl PineconeIndex {
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| {
            RagError::Configuration(format!("{} environment variable not set", API_KEY_ENV))
        })?;
        let host = config
            .host
            .as_deref()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                RagError::Configuration("index.host must be set for pinecone".to_string())
            })?;
        Ok(Self {
            name: config.name.clone(),
            host: normalize_host(host),
            api_key,
            client: build_client(TIMEOUT_SECS).map_err(RagError::index)?,
        })
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        JsonPost {
            client: &self.client,
            url: format!("{}{}", self.host, path),
            service: "Pinecone",
            headers: vec![("Api-Key", self.api_key.clone())],
            max_retries: MAX_RETRIES,
        }
        .send(body)
        .await
        .map_err(|e| RagError::index(format!("{:#}", e)))
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, namespace: &str, passages: &[Passage]) -> Result<usize> {
        let mut written = 0;
        for batch in passages.chunks(UPSERT_BATCH) {
            let body = upsert_body(namespace, batch);
            let json = self.post("/vectors/upsert", &body).await?;
            written += json["upsertedCount"]
                .as_u64()
                .map(|n| n as usize)
                .unwrap_or(batch.len());
        }
        Ok(written)
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPassage>> {
        let body = json!({
            "namespace": namespace,
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
            "includeValues": false,
        });
        let json = self.post("/query", &body).await?;
        parse_matches(&json)
    }

    async fn count(&self, namespace: &str) -> Result<usize> {
        let json = self.post("/describe_index_stats", &json!({})).await?;
        Ok(json["namespaces"][namespace]["vectorCount"]
            .as_u64()
            .unwrap_or(0) as usize)
    }
}

fn normalize_host(host: &str) -> String {
    let host = trim_base_url(host);
    if host.starts_with("http://") || host.starts_with("https://") {
        host
    } else {
        format!("https://{}", host)
    }
}

fn upsert_body(namespace: &str, passages: &[Passage]) -> Value {
    let vectors: Vec<Value> = passages
        .iter()
        .map(|p| {
            json!({
                "id": p.id,
                "values": p.values,
                "metadata": {
                    "text": p.text,
                    "source": p.metadata.source,
                    "page_number": p.metadata.page_number,
                    "total_pages": p.metadata.total_pages,
                    "chunk_index": p.metadata.chunk_index,
                },
            })
        })
        .collect();
    json!({ "vectors": vectors, "namespace": namespace })
}

fn parse_matches(json: &Value) -> Result<Vec<ScoredPassage>> {
    let matches = json["matches"]
        .as_array()
        .ok_or_else(|| RagError::index("invalid Pinecone response: missing matches"))?;

    matches
        .iter()
        .map(|m| {
            let id = m["id"]
                .as_str()
                .ok_or_else(|| RagError::index("invalid Pinecone response: match without id"))?;
            let meta = &m["metadata"];
            Ok(ScoredPassage {
                id: id.to_string(),
                score: m["score"].as_f64().unwrap_or(0.0) as f32,
                page_content: meta["text"].as_str().unwrap_or_default().to_string(),
                metadata: PassageMetadata {
                    source: meta["source"].as_str().unwrap_or_default().to_string(),
                    page_number: meta["page_number"].as_f64().unwrap_or(0.0) as u32,
                    total_pages: meta["total_pages"].as_f64().unwrap_or(0.0) as u32,
                    chunk_index: meta["chunk_index"].as_f64().unwrap_or(0.0) as usize,
                },
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_gets_https_scheme() {
        assert_eq!(
            normalize_host("idx-abc.svc.pinecone.io/"),
            "https://idx-abc.svc.pinecone.io"
        );
        assert_eq!(normalize_host("http://localhost:5080"), "http://localhost:5080");
    }

    #[test]
    fn upsert_body_carries_text_and_attribution() {
        let passage = Passage {
            id: "c1".to_string(),
            values: vec![0.5, 0.25],
            text: "hello".to_string(),
            metadata: PassageMetadata {
                source: "a.pdf".to_string(),
                page_number: 3,
                total_pages: 9,
                chunk_index: 4,
            },
        };
        let body = upsert_body("leekoko-pdf", &[passage]);
        assert_eq!(body["namespace"], "leekoko-pdf");
        let v = &body["vectors"][0];
        assert_eq!(v["id"], "c1");
        assert_eq!(v["values"][1], 0.25);
        assert_eq!(v["metadata"]["text"], "hello");
        assert_eq!(v["metadata"]["source"], "a.pdf");
        assert_eq!(v["metadata"]["page_number"], 3);
        assert_eq!(v["metadata"]["chunk_index"], 4);
    }

    #[test]
    fn parse_matches_reads_metadata() {
        let json = json!({
            "matches": [
                {
                    "id": "c1",
                    "score": 0.9,
                    "metadata": {
                        "text": "passage",
                        "source": "a.pdf",
                        "page_number": 2.0,
                        "total_pages": 4.0,
                        "chunk_index": 1.0
                    }
                }
            ],
            "namespace": "ns"
        });
        let hits = parse_matches(&json).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].page_content, "passage");
        assert_eq!(hits[0].metadata.page_number, 2);
        assert_eq!(hits[0].metadata.chunk_index, 1);
        assert!((hits[0].score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn parse_matches_rejects_malformed_response() {
        assert!(matches!(
            parse_matches(&json!({ "error": "nope" })),
            Err(RagError::Index(_))
        ));
    }
}
