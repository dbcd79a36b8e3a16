//! Recursive character text splitter.
//!
//! Splits page text into [`Chunk`]s of at most `chunk_size` characters,
//! carrying up to `chunk_overlap` characters of trailing context from one
//! chunk into the next. Splitting tries coarse separators first
//! (`"\n\n"`, then `"\n"`, then `" "`) and only falls back to individual
//! characters for runs with no separator at all.
//!
//! Each page is split on its own, so a chunk never spans two pages.
//! Chunk ids are UUIDv5 values derived from the document name and chunk
//! index, which makes re-upserting the same document overwrite rather
//! than duplicate.

use std::collections::VecDeque;

use uuid::Uuid;

use crate::config::ChunkingConfig;
use crate::error::{RagError, Result};
use crate::models::{Chunk, PageText};

const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::Configuration(
                "chunk size must be > 0".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::Configuration(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split every page of one document, numbering chunks from 0.
    pub fn split_pages(&self, pages: &[PageText]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for page in pages {
            for text in self.split_text(&page.text) {
                let index = chunks.len();
                chunks.push(make_chunk(page, index, text));
            }
        }
        chunks
    }

    /// Split raw text into chunk strings.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = "";
                break;
            }
            if text.contains(sep.as_str()) {
                separator = sep.as_str();
                remaining = &separators[i + 1..];
                break;
            }
        }

        let splits: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        };

        let mut final_chunks = Vec::new();
        let mut good_splits: Vec<String> = Vec::new();
        for split in splits {
            if char_len(&split) < self.chunk_size {
                good_splits.push(split);
                continue;
            }
            if !good_splits.is_empty() {
                final_chunks.extend(self.merge_splits(&good_splits, separator));
                good_splits.clear();
            }
            if remaining.is_empty() {
                final_chunks.push(split);
            } else {
                final_chunks.extend(self.split_recursive(&split, remaining));
            }
        }
        if !good_splits.is_empty() {
            final_chunks.extend(self.merge_splits(&good_splits, separator));
        }
        final_chunks
    }

    /// Greedily join small splits into chunks, keeping a trailing window
    /// of at most `chunk_overlap` characters as the start of the next chunk.
    fn merge_splits(&self, splits: &[String], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for split in splits {
            let len = char_len(split);
            let joined_len = |current: &VecDeque<&str>, total: usize| {
                total + len + if current.is_empty() { 0 } else { sep_len }
            };

            if joined_len(&current, total) > self.chunk_size {
                if total > self.chunk_size {
                    tracing::debug!(
                        size = total,
                        limit = self.chunk_size,
                        "created a chunk longer than the configured size"
                    );
                }
                if !current.is_empty() {
                    if let Some(doc) = join_docs(&current, separator) {
                        docs.push(doc);
                    }
                    while total > self.chunk_overlap
                        || (joined_len(&current, total) > self.chunk_size && total > 0)
                    {
                        let Some(front) = current.pop_front() else {
                            break;
                        };
                        let removed = char_len(front) + if current.is_empty() { 0 } else { sep_len };
                        total = total.saturating_sub(removed);
                    }
                }
            }

            current.push_back(split);
            total += len + if current.len() > 1 { sep_len } else { 0 };
        }

        if let Some(doc) = join_docs(&current, separator) {
            docs.push(doc);
        }
        docs
    }
}

fn join_docs(parts: &VecDeque<&str>, separator: &str) -> Option<String> {
    let joined = parts.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Same document name and index always map to the same id.
fn chunk_id(source: &str, index: usize) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("{}#{}", source, index).as_bytes()).to_string()
}

fn make_chunk(page: &PageText, index: usize, text: String) -> Chunk {
    Chunk {
        id: chunk_id(&page.source, index),
        source: page.source.clone(),
        page_number: page.page_number,
        total_pages: page.total_pages,
        chunk_index: index,
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: u32, text: &str) -> PageText {
        PageText {
            source: "doc.pdf".to_string(),
            page_number: n,
            total_pages: 3,
            text: text.to_string(),
        }
    }

    #[test]
    fn small_text_single_chunk() {
        let splitter = TextSplitter::new(1000, 200).unwrap();
        let chunks = splitter.split_text("Hello, world!");
        assert_eq!(chunks, vec!["Hello, world!".to_string()]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let splitter = TextSplitter::new(1000, 200).unwrap();
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text("   \n\n  ").is_empty());
    }

    #[test]
    fn chunks_respect_size_limit() {
        let splitter = TextSplitter::new(1000, 200).unwrap();
        let text = (0..400)
            .map(|i| format!("word{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = splitter.split_text(&text);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 1000, "chunk too long: {}", c.len());
        }
    }

    #[test]
    fn adjacent_chunks_overlap() {
        let splitter = TextSplitter::new(50, 20).unwrap();
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu nu xi omicron pi rho sigma";
        let chunks = splitter.split_text(text);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let last_word = pair[0].split(' ').last().unwrap();
            assert!(
                pair[1].contains(last_word),
                "expected '{}' to carry over into '{}'",
                last_word,
                pair[1]
            );
        }
    }

    #[test]
    fn chunks_cover_all_words() {
        let splitter = TextSplitter::new(60, 10).unwrap();
        let words: Vec<String> = (0..100).map(|i| format!("w{}", i)).collect();
        let text = words.join(" ");
        let chunks = splitter.split_text(&text);
        let joined = chunks.join(" ");
        for w in &words {
            assert!(joined.split(' ').any(|x| x == w), "missing {}", w);
        }
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let splitter = TextSplitter::new(30, 0).unwrap();
        let text = "First paragraph here.\n\nSecond paragraph here.";
        let chunks = splitter.split_text(text);
        assert_eq!(
            chunks,
            vec![
                "First paragraph here.".to_string(),
                "Second paragraph here.".to_string()
            ]
        );
    }

    #[test]
    fn unbroken_run_split_by_characters() {
        let splitter = TextSplitter::new(10, 2).unwrap();
        let chunks = splitter.split_text(&"x".repeat(25));
        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }

    #[test]
    fn deterministic() {
        let splitter = TextSplitter::new(1000, 200).unwrap();
        let text = (0..300)
            .map(|i| format!("Sentence number {}.", i))
            .collect::<Vec<_>>()
            .join("\n");
        let pages = vec![page(1, &text), page(2, "short page")];
        let a = splitter.split_pages(&pages);
        let b = splitter.split_pages(&pages);
        assert_eq!(a, b);
    }

    #[test]
    fn pages_are_split_independently_with_contiguous_indices() {
        let splitter = TextSplitter::new(1000, 200).unwrap();
        let pages = vec![page(1, "page one"), page(2, "page two"), page(3, "page three")];
        let chunks = splitter.split_pages(&pages);
        assert_eq!(chunks.len(), 3);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
            assert_eq!(c.page_number, i as u32 + 1);
            assert_eq!(c.source, "doc.pdf");
        }
    }

    #[test]
    fn chunk_ids_are_stable_and_distinct() {
        let splitter = TextSplitter::new(1000, 200).unwrap();
        let pages = vec![page(1, "one"), page(2, "two")];
        let a = splitter.split_pages(&pages);
        let b = splitter.split_pages(&pages);
        assert_eq!(a[0].id, b[0].id);
        assert_ne!(a[0].id, a[1].id);
    }

    #[test]
    fn overlap_not_smaller_than_size_rejected() {
        assert!(TextSplitter::new(100, 100).is_err());
        assert!(TextSplitter::new(0, 0).is_err());
    }

    #[test]
    fn chunk_count_tracks_stride() {
        // 4000 chars of 9-char words; stride is size - overlap = 800.
        let splitter = TextSplitter::new(1000, 200).unwrap();
        let text = (0..400)
            .map(|i| format!("word{:05}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let total = text.chars().count();
        let expected = (total as f64 / 800.0).ceil() as usize;
        let chunks = splitter.split_text(&text);
        assert!(
            chunks.len().abs_diff(expected) <= 1,
            "got {} chunks, expected about {}",
            chunks.len(),
            expected
        );
    }
}
