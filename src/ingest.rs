//! Ingestion pipeline orchestration.
//!
//! Coordinates the incremental ingest flow: discovery → tracker check →
//! load → chunking → embedding → upsert → mark. Each file is committed on
//! its own, so a failure part-way through a run leaves every earlier file
//! marked and the failing file (and everything after it) unmarked.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::chunk::TextSplitter;
use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::error::{RagError, Result};
use crate::index::{create_index, VectorIndex};
use crate::loader::{DocumentLoader, PdfLoader};
use crate::models::{Passage, SourceDocument};
use crate::tracker::{MarkerDir, ProcessedSet};

/// Counters for one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub files_found: usize,
    pub skipped: usize,
    /// Base names of files committed in this run, in processing order.
    pub ingested: Vec<String>,
    pub chunks_upserted: usize,
}

pub struct IngestionPipeline {
    docs_dir: PathBuf,
    namespace: String,
    splitter: TextSplitter,
    batch_size: usize,
    loader: Arc<dyn DocumentLoader>,
    tracker: Arc<dyn ProcessedSet>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl IngestionPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        docs_dir: impl Into<PathBuf>,
        namespace: impl Into<String>,
        splitter: TextSplitter,
        batch_size: usize,
        loader: Arc<dyn DocumentLoader>,
        tracker: Arc<dyn ProcessedSet>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            docs_dir: docs_dir.into(),
            namespace: namespace.into(),
            splitter,
            batch_size: batch_size.max(1),
            loader,
            tracker,
            embedder,
            index,
        }
    }

    /// Wire the production collaborators described by `config`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let embedder: Arc<dyn Embedder> = create_embedder(&config.embedding)?.into();
        let index: Arc<dyn VectorIndex> = create_index(&config.index).await?.into();
        Ok(Self::new(
            &config.paths.docs_dir,
            &config.index.namespace,
            TextSplitter::from_config(&config.chunking)?,
            config.embedding.batch_size,
            Arc::new(PdfLoader),
            Arc::new(MarkerDir::new(&config.paths.processed_dir)),
            embedder,
            index,
        ))
    }

    /// All candidate PDFs in the documents directory, sorted by name.
    pub fn discover(&self) -> Result<Vec<SourceDocument>> {
        discover_documents(&self.docs_dir)
    }

    /// Documents that a run would process, without touching anything.
    pub async fn pending(&self) -> Result<Vec<SourceDocument>> {
        pending_documents(&self.docs_dir, self.tracker.as_ref()).await
    }

    /// Run one ingestion pass. Errors are wrapped in
    /// [`RagError::IngestionFailed`].
    pub async fn run(&self) -> Result<IngestReport> {
        self.run_inner()
            .await
            .map_err(|e| RagError::IngestionFailed(Box::new(e)))
    }

    async fn run_inner(&self) -> Result<IngestReport> {
        let docs = self.discover()?;
        let mut report = IngestReport {
            files_found: docs.len(),
            ..IngestReport::default()
        };

        for doc in &docs {
            if self.tracker.has_processed(doc.marker_id()).await {
                tracing::info!(file = %doc.name, "already processed, skipping");
                report.skipped += 1;
                continue;
            }

            let written = self.ingest_document(doc).await?;
            report.chunks_upserted += written;
            report.ingested.push(doc.name.clone());
        }

        if report.ingested.is_empty() {
            tracing::info!("No documents to process.");
        }
        Ok(report)
    }

    /// Load, chunk, embed, upsert and mark one document.
    async fn ingest_document(&self, doc: &SourceDocument) -> Result<usize> {
        let pages = self.loader.load(&doc.path).await?;
        let chunks = self.splitter.split_pages(&pages);

        if chunks.is_empty() {
            tracing::warn!(file = %doc.name, pages = pages.len(), "no extractable text");
            self.tracker.mark_processed(doc.marker_id()).await?;
            return Ok(0);
        }

        let mut written = 0;
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self.embedder.embed_documents(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(RagError::embedding(format!(
                    "expected {} vectors, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            let passages: Vec<Passage> = batch
                .iter()
                .zip(vectors)
                .map(|(chunk, values)| Passage::from_chunk(chunk, values))
                .collect();
            written += self.index.upsert(&self.namespace, &passages).await?;
        }

        self.tracker.mark_processed(doc.marker_id()).await?;
        tracing::info!(
            file = %doc.name,
            pages = pages.len(),
            chunks = chunks.len(),
            namespace = %self.namespace,
            "ingested"
        );
        Ok(written)
    }
}

/// `pdfqa ingest`: run the pipeline and print a summary.
///
/// With `dry_run`, only lists the documents that would be processed; no
/// embedding or index client is created.
pub async fn run_ingest(config: &Config, dry_run: bool) -> anyhow::Result<()> {
    if dry_run {
        let tracker = MarkerDir::new(&config.paths.processed_dir);
        let found = discover_documents(&config.paths.docs_dir)?.len();
        let pending = pending_documents(&config.paths.docs_dir, &tracker).await?;

        println!("ingest (dry-run)");
        println!("  files found: {}", found);
        println!("  pending: {}", pending.len());
        for doc in &pending {
            println!("    {}", doc.name);
        }
        return Ok(());
    }

    let pipeline = IngestionPipeline::from_config(config).await?;
    let report = pipeline.run().await?;

    if report.ingested.is_empty() {
        println!("No documents to process.");
    }
    println!("ingest {}", config.index.namespace);
    println!("  files found: {}", report.files_found);
    println!("  skipped: {}", report.skipped);
    println!("  ingested: {}", report.ingested.len());
    for name in &report.ingested {
        println!("    {}", name);
    }
    println!("  chunks upserted: {}", report.chunks_upserted);
    println!("ok");
    Ok(())
}

/// Regular files directly inside `dir` whose extension is exactly `pdf`.
pub fn discover_documents(dir: &Path) -> Result<Vec<SourceDocument>> {
    let list_err = |message: String| RagError::ListDocuments {
        path: dir.to_path_buf(),
        message,
    };

    if !dir.is_dir() {
        return Err(list_err("not a directory".to_string()));
    }

    let mut docs = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| list_err(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_pdf = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "pdf");
        if is_pdf {
            docs.push(SourceDocument::from_path(entry.path()));
        }
    }
    Ok(docs)
}

/// Discovered documents that `tracker` has no marker for, in name order.
pub async fn pending_documents(
    docs_dir: &Path,
    tracker: &dyn ProcessedSet,
) -> Result<Vec<SourceDocument>> {
    let mut pending = Vec::new();
    for doc in discover_documents(docs_dir)? {
        if !tracker.has_processed(doc.marker_id()).await {
            pending.push(doc);
        }
    }
    Ok(pending)
}
