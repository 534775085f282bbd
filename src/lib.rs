//! Retrieval-augmented generation over a directory of documents: load,
//! chunk, embed, index in memory, retrieve, prompt a local chat model.

pub mod chunker;
pub mod config;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod index;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod vector_entry;
pub mod vector_ops;

pub use chunker::TextChunker;
pub use config::Settings;
pub use document::{load_directory, load_file, Document};
pub use embeddings::{Embedder, HashEmbedder, OllamaEmbedder, OpenAiEmbedder};
pub use error::{RagError, Result};
pub use index::{SearchResult, VectorIndex};
pub use llm::{LanguageModel, OllamaChat};
pub use pipeline::{Answer, RagPipeline};
pub use prompt::PromptTemplate;
pub use vector_entry::{Chunk, IndexEntry, Metadata};
