//! Fixed-window character chunking.
//!
//! Window `i` starts at `i * (chunk_size - chunk_overlap)` characters and spans
//! at most `chunk_size` characters. Splitting stops after the first window that
//! reaches the end of the text, so consecutive windows share exactly
//! `chunk_overlap` characters.

use tracing::info;

use crate::document::Document;
use crate::error::{RagError, Result};
use crate::vector_entry::{Chunk, Metadata};

#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(RagError::InvalidChunking {
                chunk_size,
                chunk_overlap,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Character ranges `(start, end)` of each window over a text of `len`
    /// characters.
    pub fn windows(&self, len: usize) -> Vec<(usize, usize)> {
        let step = self.chunk_size - self.chunk_overlap;
        let mut windows = Vec::new();
        let mut start = 0;
        while start < len {
            let end = (start + self.chunk_size).min(len);
            windows.push((start, end));
            if end == len {
                break;
            }
            start += step;
        }
        windows
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        let offsets = char_offsets(text);
        let len = offsets.len() - 1;
        self.windows(len)
            .into_iter()
            .map(|(start, end)| text[offsets[start]..offsets[end]].to_string())
            .collect()
    }

    pub fn split_document(&self, document: &Document) -> Vec<Chunk> {
        let source = document.source.display().to_string();
        let file_name = document.file_name();
        let text = &document.text;
        let offsets = char_offsets(text);
        let len = offsets.len() - 1;

        self.windows(len)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, (start, end))| Chunk {
                text: text[offsets[start]..offsets[end]].to_string(),
                metadata: Metadata {
                    source: source.clone(),
                    file_name: file_name.clone(),
                    chunk_index,
                    start_char: start,
                    end_char: end,
                },
            })
            .collect()
    }

    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = documents
            .iter()
            .flat_map(|doc| self.split_document(doc))
            .collect();
        info!(
            "Split {} documents into {} chunks (chunk_size={}, chunk_overlap={})",
            documents.len(),
            chunks.len(),
            self.chunk_size,
            self.chunk_overlap
        );
        chunks
    }
}

/// Byte offset of every character boundary, including the end of the text.
fn char_offsets(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect()
}
