use crate::config::Number;
use serde::{Deserialize, Serialize};

/// A window of source text plus where it came from.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub metadata: Metadata,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Metadata {
    pub source: String,
    pub file_name: String,
    pub chunk_index: usize,
    /// Character offsets into the source document, end exclusive.
    pub start_char: usize,
    pub end_char: usize,
}

impl Chunk {
    pub fn preview(&self, max_chars: usize) -> String {
        let mut preview: String = self.text.chars().take(max_chars).collect();
        if self.text.chars().nth(max_chars).is_some() {
            preview.push_str("...");
        }
        preview
    }
}

#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk: Chunk,
    /// Stored L2-normalized.
    pub vector: Vec<Number>,
}
