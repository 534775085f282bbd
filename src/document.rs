//! Document loading: walks a directory and extracts text from PDF and
//! plain-text files.

use memmap2::Mmap;
use std::fs::File;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{RagError, Result};

const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub source: PathBuf,
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }

    pub fn file_name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Pdf,
    Text,
}

fn document_kind(path: &Path) -> Option<DocumentKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if ext == "pdf" {
        Some(DocumentKind::Pdf)
    } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        Some(DocumentKind::Text)
    } else {
        None
    }
}

/// Loads every supported file under `dir`, in file-name order.
pub fn load_directory(dir: &Path) -> Result<Vec<Document>> {
    if !dir.is_dir() {
        return Err(RagError::load(dir, "not a readable directory"));
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| RagError::load(dir, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        match document_kind(path) {
            Some(kind) => documents.push(read_document(path, kind)?),
            None => debug!("Skipping unsupported file {}", path.display()),
        }
    }

    if documents.is_empty() {
        return Err(RagError::NoDocuments(dir.to_path_buf()));
    }

    info!("Loaded {} documents from {}", documents.len(), dir.display());
    Ok(documents)
}

/// Loads a single PDF or text file.
pub fn load_file(path: &Path) -> Result<Document> {
    let kind = document_kind(path)
        .ok_or_else(|| RagError::load(path, "unsupported file type"))?;
    read_document(path, kind)
}

fn read_document(path: &Path, kind: DocumentKind) -> Result<Document> {
    let file = File::open(path).map_err(|e| RagError::load(path, e))?;
    let len = file.metadata().map_err(|e| RagError::load(path, e))?.len();
    if len == 0 {
        if kind == DocumentKind::Pdf {
            return Err(RagError::load(path, "empty PDF file"));
        }
        return Ok(Document::new(path, String::new()));
    }

    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| RagError::load(path, e))?;

    let text = match kind {
        DocumentKind::Pdf => extract_pdf_text(path, &mmap)?,
        DocumentKind::Text => String::from_utf8_lossy(&mmap).into_owned(),
    };

    debug!("Read {} characters from {}", text.chars().count(), path.display());
    Ok(Document::new(path, text))
}

/// pdf-extract panics on some well-formed but unusual PDFs (e.g. a page
/// using a font its resources never define); both outcomes become `Load`.
fn extract_pdf_text(path: &Path, bytes: &[u8]) -> Result<String> {
    match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(RagError::load(path, format!("PDF extraction failed: {:?}", e))),
        Err(_) => Err(RagError::load(path, "PDF extraction panicked")),
    }
}
