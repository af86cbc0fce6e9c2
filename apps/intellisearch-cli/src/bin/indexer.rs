use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use intellisearch_cli::{build_index, corpus_path, init_tracing, load_corpus};
use intellisearch_core::config::{Config, IndexBackend};
use intellisearch_vector::open_index;

#[derive(Parser)]
#[command(name = "intellisearch-indexer")]
#[command(about = "Embed a corpus and publish it to the vector index")]
struct Args {
    /// Corpus file or directory (defaults to `corpus.path`)
    corpus: Option<PathBuf>,

    /// Index at most this many documents
    #[arg(long)]
    limit: Option<usize>,

    /// Hide the progress bar
    #[arg(long, short)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = Config::load().context("loading configuration")?;
    let app = config.app()?;
    if app.index.backend == IndexBackend::Memory {
        tracing::warn!("index.backend = \"memory\" does not persist; the query binary indexes on startup instead");
    }

    let path = corpus_path(&app, args.corpus.as_deref());
    let documents = load_corpus(&path, args.limit)?;
    println!("IntelliSearch indexer\n=====================");
    println!("Corpus:    {} ({} documents)", path.display(), documents.len());

    let embedder = intellisearch_embed::load_embedder(&app.embedding).context("loading embedding model")?;
    println!("Embedder:  {}", embedder.model_id());
    let handle = open_index(&app.index).await.context("opening vector index")?;

    let report = build_index(&app, embedder, documents, handle.writer.as_ref(), !args.quiet).await?;

    println!("\nIndexed {} documents (dim {}) in {:.1?}", report.indexed, report.dim, report.elapsed);
    if !report.skipped.is_empty() {
        println!("Skipped {} empty documents: {}", report.skipped.len(), report.skipped.join(", "));
    }
    println!("Query with: cargo run --bin intellisearch-query -- \"<question>\"");
    Ok(())
}
