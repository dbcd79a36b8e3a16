//! Core data types that flow through ingestion and retrieval.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A PDF discovered in the documents directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Base file name; doubles as the processed-marker id.
    pub name: String,
    pub path: PathBuf,
}

impl SourceDocument {
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            path: path.to_path_buf(),
        }
    }

    /// Identifier recorded by the processed-set tracker.
    pub fn marker_id(&self) -> &str {
        &self.name
    }
}

/// Text extracted from one page of a source document.
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    pub source: String,
    /// 1-based page number.
    pub page_number: u32,
    pub total_pages: u32,
    pub text: String,
}

/// A bounded, overlapping span of a document's text.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Stable key derived from `source` and `chunk_index`.
    pub id: String,
    pub source: String,
    pub page_number: u32,
    pub total_pages: u32,
    /// Position within the document, contiguous from 0.
    pub chunk_index: usize,
    pub text: String,
}

/// Attribution carried alongside every stored passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageMetadata {
    pub source: String,
    pub page_number: u32,
    pub total_pages: u32,
    pub chunk_index: usize,
}

/// An embedded chunk as written to the vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct Passage {
    pub id: String,
    pub values: Vec<f32>,
    pub text: String,
    pub metadata: PassageMetadata,
}

impl Passage {
    pub fn from_chunk(chunk: &Chunk, values: Vec<f32>) -> Self {
        Self {
            id: chunk.id.clone(),
            values,
            text: chunk.text.clone(),
            metadata: PassageMetadata {
                source: chunk.source.clone(),
                page_number: chunk.page_number,
                total_pages: chunk.total_pages,
                chunk_index: chunk.chunk_index,
            },
        }
    }
}

/// A passage returned by a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredPassage {
    pub id: String,
    pub score: f32,
    pub page_content: String,
    pub metadata: PassageMetadata,
}

/// One prior exchange in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
}

impl ChatTurn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

impl From<(String, String)> for ChatTurn {
    fn from((question, answer): (String, String)) -> Self {
        Self { question, answer }
    }
}

/// Answer produced by the retrieval chain for one question.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainOutput {
    pub text: String,
    /// Retrieved passages in rank order, for attribution.
    pub source_documents: Vec<ScoredPassage>,
}
