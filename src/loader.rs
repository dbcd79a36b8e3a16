//! PDF text extraction into page-level units.
//!
//! [`PdfLoader`] tries `pdf-extract` first and falls back to `lopdf`'s
//! per-page extractor when `pdf-extract` errors, panics, or produces no
//! text at all. Any file neither can read is a [`RagError::Load`].

use async_trait::async_trait;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use crate::error::{RagError, Result};
use crate::models::{PageText, SourceDocument};

/// Page-ordered text for one source file.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self, path: &Path) -> Result<Vec<PageText>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfLoader;

#[async_trait]
impl DocumentLoader for PdfLoader {
    async fn load(&self, path: &Path) -> Result<Vec<PageText>> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RagError::load(path, e))?;
        let source = SourceDocument::from_path(path).name;

        let texts = tokio::task::spawn_blocking(move || extract_pages(&bytes))
            .await
            .map_err(|e| RagError::load(path, e))?
            .map_err(|e| RagError::load(path, e))?;

        let total_pages = texts.len() as u32;
        Ok(texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| PageText {
                source: source.clone(),
                page_number: i as u32 + 1,
                total_pages,
                text: clean_page_text(&text),
            })
            .collect())
    }
}

/// Extract raw text for every page, in page order.
pub fn extract_pages(bytes: &[u8]) -> std::result::Result<Vec<String>, String> {
    let primary = catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }));

    let primary_err = match primary {
        Ok(Ok(pages)) if pages.iter().any(|p| !p.trim().is_empty()) => return Ok(pages),
        Ok(Ok(_)) => "pdf-extract produced no text".to_string(),
        Ok(Err(e)) => format!("pdf-extract failed: {}", e),
        Err(_) => "pdf-extract panicked".to_string(),
    };
    tracing::debug!(reason = %primary_err, "falling back to lopdf extraction");

    extract_pages_lopdf(bytes).map_err(|e| format!("{}; {}", primary_err, e))
}

fn extract_pages_lopdf(bytes: &[u8]) -> std::result::Result<Vec<String>, String> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| format!("lopdf failed: {}", e))?;
    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err("document has no pages".to_string());
    }
    Ok(pages
        .keys()
        .map(|&number| doc.extract_text(&[number]).unwrap_or_default())
        .collect())
}

/// Drop NUL bytes and blank lines, trim each line.
fn clean_page_text(text: &str) -> String {
    text.replace('\0', "")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn invalid_pdf_returns_error() {
        assert!(extract_pages(b"not a pdf").is_err());
    }

    #[test]
    fn clean_page_text_strips_noise() {
        assert_eq!(
            clean_page_text("  Title \n\n\n body\0 text  \n"),
            "Title\nbody text"
        );
    }

    #[tokio::test]
    async fn missing_file_is_load_error() {
        let tmp = TempDir::new().unwrap();
        let err = PdfLoader
            .load(&tmp.path().join("absent.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Load { .. }));
    }

    #[tokio::test]
    async fn corrupt_file_is_load_error_naming_the_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4 garbage").unwrap();
        let err = PdfLoader.load(&path).await.unwrap_err();
        match err {
            RagError::Load { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
