use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ragline::{load_directory, RagPipeline, Settings, TextChunker};

const PREVIEW_CHARS: usize = 80;

#[derive(Parser)]
#[command(name = "ragline")]
#[command(version = "0.1")]
#[command(about = "Ask questions about a directory of documents", long_about = None)]
struct Cli {
    /// Settings file (defaults to ./ragline.{toml,json,yaml} when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory of PDF and text documents
    #[arg(long, global = true)]
    docs: Option<String>,

    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    #[arg(long, global = true)]
    chunk_overlap: Option<usize>,

    /// Number of chunks retrieved per question
    #[arg(short = 'k', long, global = true)]
    top_k: Option<usize>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer QUESTION, or every line read from stdin when omitted
    Ask {
        question: Option<String>,
        /// Print the retrieved chunks to stderr before each answer
        #[arg(long)]
        show_context: bool,
    },
    /// Print the chunks retrieved for QUERY as JSON
    Search { query: String },
    /// Print every chunk as a JSON line without embedding
    Chunks,
    /// Print the resolved settings
    Config,
}

impl Cli {
    fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(docs) = &self.docs {
            settings.docs_path = docs.clone();
        }
        if let Some(size) = self.chunk_size {
            settings.chunk_size = size;
        }
        if let Some(overlap) = self.chunk_overlap {
            settings.chunk_overlap = overlap;
        }
        if let Some(k) = self.top_k {
            settings.top_k = k;
        }
        if self.verbose {
            settings.verbose = true;
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("RAGLINE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn build_pipeline(settings: &Settings) -> Result<RagPipeline> {
    let chunker = TextChunker::new(settings.chunk_size, settings.chunk_overlap)?;
    let documents = load_directory(Path::new(&settings.docs_path))
        .with_context(|| format!("Failed to load documents from '{}'", settings.docs_path))?;

    let mut pipeline = RagPipeline::from_settings(settings)?;
    pipeline
        .index_documents(&documents, &chunker)
        .context("Failed to index documents")?;
    Ok(pipeline)
}

fn answer(pipeline: &RagPipeline, question: &str, show_context: bool) -> Result<()> {
    let answer = pipeline
        .ask_with_sources(question)
        .with_context(|| format!("Failed to answer '{}'", question))?;

    if show_context {
        for (rank, source) in answer.sources.iter().enumerate() {
            eprintln!(
                "[{}] {} #{} (similarity {:.4})\n{}\n",
                rank + 1,
                source.chunk.metadata.file_name,
                source.chunk.metadata.chunk_index,
                source.similarity,
                source.chunk.text
            );
        }
    }

    println!("{}", answer.text);
    io::stdout().flush()?;
    Ok(())
}

fn ask_command(settings: &Settings, question: Option<&str>, show_context: bool) -> Result<()> {
    let pipeline = build_pipeline(settings)?;

    if let Some(question) = question {
        return answer(&pipeline, question, show_context);
    }

    info!("Reading questions from stdin");
    let stdin = io::stdin();
    let reader = stdin.lock();
    reader.lines().try_for_each(|line_result| -> Result<()> {
        let line = line_result?;
        let question = line.trim();
        if question.is_empty() {
            return Ok(());
        }
        answer(&pipeline, question, show_context)
    })
}

fn search_command(settings: &Settings, query: &str) -> Result<()> {
    let pipeline = build_pipeline(settings)?;
    let results = pipeline.retrieve(query)?;

    let output = serde_json::json!({
        "query": query,
        "index_record_count": pipeline.index().len(),
        "results": results.iter().map(|r| {
            serde_json::json!({
                "source": r.chunk.metadata.source,
                "chunk_index": r.chunk.metadata.chunk_index,
                "similarity": r.similarity,
                "preview": r.chunk.preview(PREVIEW_CHARS),
            })
        }).collect::<Vec<_>>(),
        "actual_results_count": results.len(),
        "requested_results_count": pipeline.top_k(),
    });

    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

fn chunks_command(settings: &Settings) -> Result<()> {
    let chunker = TextChunker::new(settings.chunk_size, settings.chunk_overlap)?;
    let documents = load_directory(Path::new(&settings.docs_path))
        .with_context(|| format!("Failed to load documents from '{}'", settings.docs_path))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for chunk in chunker.split_documents(&documents) {
        let line = serde_json::json!({
            "source": chunk.metadata.source,
            "chunk_index": chunk.metadata.chunk_index,
            "start_char": chunk.metadata.start_char,
            "end_char": chunk.metadata.end_char,
            "length": chunk.metadata.end_char - chunk.metadata.start_char,
            "preview": chunk.preview(PREVIEW_CHARS),
        });
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

fn config_command(settings: &Settings) -> Result<()> {
    settings.print_config();
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();
    let mut settings = Settings::load(args.config.as_deref())?;
    args.apply_overrides(&mut settings);
    settings.validate()?;
    init_tracing(settings.verbose);

    match &args.command {
        Commands::Ask {
            question,
            show_context,
        } => ask_command(&settings, question.as_deref(), *show_context)?,
        Commands::Search { query } => search_command(&settings, query)?,
        Commands::Chunks => chunks_command(&settings)?,
        Commands::Config => config_command(&settings)?,
    }
    Ok(())
}
