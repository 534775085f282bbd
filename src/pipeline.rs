use tracing::{debug, info};

use crate::chunker::TextChunker;
use crate::config::Settings;
use crate::document::Document;
use crate::embeddings::{self, Embedder};
use crate::error::Result;
use crate::index::{SearchResult, VectorIndex};
use crate::llm::{LanguageModel, OllamaChat};
use crate::prompt::PromptTemplate;
use crate::vector_entry::Chunk;

const CONTEXT_SEPARATOR: &str = "\n\n";

/// Generated text together with the chunks it was conditioned on.
#[derive(Debug)]
pub struct Answer<'a> {
    pub text: String,
    pub sources: Vec<SearchResult<'a>>,
}

pub struct RagPipeline {
    embedder: Box<dyn Embedder>,
    llm: Box<dyn LanguageModel>,
    index: VectorIndex,
    template: PromptTemplate,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(
        embedder: Box<dyn Embedder>,
        llm: Box<dyn LanguageModel>,
        template: PromptTemplate,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            llm,
            index: VectorIndex::new(),
            template,
            top_k,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let embedder = embeddings::from_settings(settings)?;
        let llm = OllamaChat::from_settings(settings)?;
        let template = PromptTemplate::new(settings.prompt_template.clone())?;
        Ok(Self::new(embedder, Box::new(llm), template, settings.top_k))
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Embeds and inserts `chunks`; returns how many were added.
    pub fn index_chunks(&mut self, chunks: Vec<Chunk>) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_documents(&texts)?;
        let count = chunks.len();
        self.index.insert(chunks, vectors)?;
        info!("Indexed {} chunks ({} total)", count, self.index.len());
        Ok(count)
    }

    pub fn index_documents(&mut self, documents: &[Document], chunker: &TextChunker) -> Result<usize> {
        self.index_chunks(chunker.split_documents(documents))
    }

    pub fn retrieve(&self, query: &str) -> Result<Vec<SearchResult<'_>>> {
        self.index.retrieve(self.embedder.as_ref(), query, self.top_k)
    }

    pub fn ask(&self, question: &str) -> Result<String> {
        Ok(self.ask_with_sources(question)?.text)
    }

    pub fn ask_with_sources(&self, question: &str) -> Result<Answer<'_>> {
        let sources = self.retrieve(question)?;
        let context = sources
            .iter()
            .map(|r| r.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);
        debug!(
            "Retrieved {} chunks ({} characters of context)",
            sources.len(),
            context.len()
        );

        let prompt = self.template.render(&context, question);
        let text = self.llm.generate(&prompt)?;
        Ok(Answer { text, sources })
    }
}
