//! Conversational retrieval chain.
//!
//! One call runs three steps in order:
//!
//! 1. **Condense**: with prior turns, ask the chat model to rewrite the
//!    follow-up as a standalone question. Without history the question is
//!    used as is and no model call is made.
//! 2. **Retrieve**: embed the standalone question and take the `top_k`
//!    nearest passages from the index namespace.
//! 3. **Generate**: answer from those passages only. An empty retrieval
//!    short-circuits to [`NOT_CONFIDENT_PHRASE`].
//!
//! The chain keeps no conversation state; history travels with each call,
//! so one instance can serve concurrent requests.

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::error::{RagError, Result};
use crate::index::{create_index, VectorIndex};
use crate::llm::{create_chat_model, ChatModel};
use crate::models::{ChainOutput, ChatTurn, ScoredPassage};
use crate::prompt::{self, NOT_CONFIDENT_PHRASE};

pub struct ConversationalRetrievalChain {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn ChatModel>,
    namespace: String,
    top_k: usize,
}

impl ConversationalRetrievalChain {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn ChatModel>,
        namespace: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            llm,
            namespace: namespace.into(),
            top_k: top_k.max(1),
        }
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        let embedder: Arc<dyn Embedder> = create_embedder(&config.embedding)?.into();
        let index: Arc<dyn VectorIndex> = create_index(&config.index).await?.into();
        let llm: Arc<dyn ChatModel> = create_chat_model(&config.generation)?.into();
        Ok(Self::new(
            embedder,
            index,
            llm,
            &config.index.namespace,
            config.retrieval.top_k,
        ))
    }

    /// Answer `question` in the context of `history`.
    ///
    /// An empty question is rejected with [`RagError::EmptyQuestion`] before
    /// any external call. Other failures come back as
    /// [`RagError::QueryFailed`].
    pub async fn call(&self, question: &str, history: &[ChatTurn]) -> Result<ChainOutput> {
        let question = sanitize_question(question)?;
        self.run(&question, history)
            .await
            .map_err(|e| RagError::QueryFailed(Box::new(e)))
    }

    async fn run(&self, question: &str, history: &[ChatTurn]) -> Result<ChainOutput> {
        let standalone = self.condense(question, history).await?;
        let passages = self.retrieve(&standalone).await?;
        let text = self.generate(&standalone, &passages).await?;
        Ok(ChainOutput {
            text,
            source_documents: passages,
        })
    }

    /// Standalone form of `question`. Calls the model only when `history`
    /// is non-empty.
    pub async fn condense(&self, question: &str, history: &[ChatTurn]) -> Result<String> {
        if history.is_empty() {
            return Ok(question.to_string());
        }
        let prompt = prompt::condense_prompt(question, history);
        let condensed = self.llm.complete(&prompt).await?;
        let condensed = condensed.trim();
        if condensed.is_empty() {
            return Ok(question.to_string());
        }
        tracing::debug!(original = question, condensed, "condensed follow-up question");
        Ok(condensed.to_string())
    }

    pub async fn retrieve(&self, question: &str) -> Result<Vec<ScoredPassage>> {
        let vector = self.embedder.embed_query(question).await?;
        let passages = self
            .index
            .query(&self.namespace, &vector, self.top_k)
            .await?;
        tracing::debug!(hits = passages.len(), namespace = %self.namespace, "retrieved passages");
        Ok(passages)
    }

    pub async fn generate(&self, question: &str, passages: &[ScoredPassage]) -> Result<String> {
        if passages.is_empty() {
            return Ok(NOT_CONFIDENT_PHRASE.to_string());
        }
        let prompt = prompt::qa_prompt(question, passages);
        self.llm.complete(&prompt).await
    }
}

/// `pdfqa ask`: answer one question and print the answer with its sources.
///
/// `history_path` points to a JSON array of prior turns, either
/// `{"question", "answer"}` objects or `[question, answer]` pairs.
pub async fn run_ask(
    config: &Config,
    question: &str,
    history_path: Option<&Path>,
) -> anyhow::Result<()> {
    let history = match history_path {
        Some(path) => read_history(path)?,
        None => Vec::new(),
    };

    let chain = ConversationalRetrievalChain::from_config(config).await?;
    let output = chain.call(question, &history).await?;

    println!("{}", output.text);
    if !output.source_documents.is_empty() {
        println!();
        println!("sources:");
        for (i, doc) in output.source_documents.iter().enumerate() {
            println!(
                "  {}. [{:.2}] {} p.{}/{}",
                i + 1,
                doc.score,
                doc.metadata.source,
                doc.metadata.page_number,
                doc.metadata.total_pages
            );
        }
    }
    Ok(())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryEntry {
    Turn(ChatTurn),
    Pair(String, String),
}

/// Parse a history file into ordered turns.
pub fn read_history(path: &Path) -> anyhow::Result<Vec<ChatTurn>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read history file {}", path.display()))?;
    let entries: Vec<HistoryEntry> = serde_json::from_str(&content)
        .with_context(|| format!("invalid history file {}", path.display()))?;
    Ok(entries
        .into_iter()
        .map(|e| match e {
            HistoryEntry::Turn(turn) => turn,
            HistoryEntry::Pair(question, answer) => ChatTurn { question, answer },
        })
        .collect())
}

/// Trim and flatten newlines; reject blank input.
pub fn sanitize_question(question: &str) -> Result<String> {
    let sanitized = question.trim().replace(['\r', '\n'], " ");
    if sanitized.is_empty() {
        return Err(RagError::EmptyQuestion);
    }
    Ok(sanitized)
}
