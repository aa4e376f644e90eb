//! Recursive character text splitting
//!
//! Text is split on the coarsest separator present (paragraphs, then lines,
//! then words, then characters) and the pieces are greedily merged back into
//! chunks of at most `chunk_size` characters, each chunk repeating up to
//! `overlap` characters from the end of the previous one.

use super::PdfPage;
use crate::index::DocumentChunk;
use crate::models::PassageMetadata;
use std::collections::VecDeque;
use tracing::{info, warn};

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size.saturating_sub(1)),
        }
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (position, separator) = separators
            .iter()
            .enumerate()
            .find(|(_, sep)| sep.is_empty() || text.contains(**sep))
            .map(|(i, sep)| (i, *sep))
            .unwrap_or((separators.len(), ""));
        let finer = separators.get(position + 1..).unwrap_or(&[]);

        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(separator).filter(|s| !s.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        for piece in pieces {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending, separator));
                pending.clear();
            }
            if finer.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge(&pending, separator));
        }
        chunks
    }

    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            let joiner = if window.is_empty() { 0 } else { sep_len };

            if total + len + joiner > self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total, self.chunk_size
                    );
                }
                if !window.is_empty() {
                    push_joined(&mut chunks, &window, separator);
                    loop {
                        let joiner = if window.is_empty() { 0 } else { sep_len };
                        let over_budget = total + len + joiner > self.chunk_size;
                        if !(total > self.overlap || (over_budget && total > 0)) {
                            break;
                        }
                        let Some(front) = window.pop_front() else {
                            break;
                        };
                        let trailing = if window.is_empty() { 0 } else { sep_len };
                        total = total.saturating_sub(char_len(front) + trailing);
                    }
                }
            }

            window.push_back(piece);
            total += len + if window.len() > 1 { sep_len } else { 0 };
        }

        push_joined(&mut chunks, &window, separator);
        chunks
    }
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Chunk every page, carrying its source and page number onto each chunk
pub fn split_pages(pages: &[PdfPage], chunk_size: usize, overlap: usize) -> Vec<DocumentChunk> {
    let splitter = TextSplitter::new(chunk_size, overlap);
    let chunks: Vec<DocumentChunk> = pages
        .iter()
        .flat_map(|page| {
            splitter.split_text(&page.text).into_iter().map(|text| {
                DocumentChunk::new(
                    text,
                    PassageMetadata {
                        source: page.source.clone(),
                        page: Some(page.page),
                    },
                )
            })
        })
        .collect();

    info!(
        "Successfully created {} text chunks from {} pages",
        chunks.len(),
        pages.len()
    );
    chunks
}
