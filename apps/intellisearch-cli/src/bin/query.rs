use anyhow::{bail, Context, Result};
use clap::Parser;

use intellisearch_cli::{capabilities, init_tracing};
use intellisearch_core::config::Config;
use intellisearch_core::RetrievalOutcome;
use intellisearch_rag::{Instrumented, QueryService, RetrievalOrchestrator, SettingsUpdate};

#[derive(Parser)]
#[command(name = "intellisearch-query")]
#[command(about = "Retrieve context for a question from the local index, falling back to the web")]
struct Args {
    /// Question to answer
    query: Vec<String>,

    /// Minimum cosine similarity for a local match, in [0, 1]
    #[arg(long)]
    threshold: Option<f32>,

    /// Cap on both local matches and web results
    #[arg(long)]
    max_results: Option<usize>,

    /// Never fall back to web search
    #[arg(long)]
    no_web: bool,

    /// Use search snippets only, skip page extraction
    #[arg(long)]
    no_extract: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,

    /// Print the composed context window
    #[arg(long)]
    show_context: bool,

    /// Print orchestrator statistics after the query
    #[arg(long)]
    stats: bool,
}

impl Args {
    fn settings_update(&self) -> SettingsUpdate {
        SettingsUpdate {
            similarity_threshold: self.threshold,
            max_local_results: self.max_results,
            max_web_results: self.max_results,
            enable_web_fallback: self.no_web.then_some(false),
            extract_web_content: self.no_extract.then_some(false),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let question = args.query.join(" ");
    if question.trim().is_empty() && !args.stats {
        bail!("usage: intellisearch-query [OPTIONS] <QUESTION>...");
    }

    let config = Config::load().context("loading configuration")?;
    let app = config.app()?;
    let caps = capabilities(&app).await?;
    let service = Instrumented::new(RetrievalOrchestrator::new(&caps, app.retrieval.clone())?);
    service.configure(&args.settings_update()).context("invalid retrieval options")?;

    if !question.trim().is_empty() {
        let outcome = service.query(&question).await?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        } else {
            print_outcome(&outcome, args.show_context);
        }
    }

    if args.stats {
        let stats = service.stats().await;
        println!("{}", serde_json::to_string_pretty(&stats)?);
        let metrics = service.metrics();
        tracing::info!(queries = metrics.queries, mean_ms = metrics.mean_latency().as_millis(), "session metrics");
    }
    Ok(())
}

fn print_outcome(outcome: &RetrievalOutcome, show_context: bool) {
    println!("Strategy:   {}", outcome.strategy);
    println!("Confidence: {:.3}", outcome.confidence);
    println!("Elapsed:    {:.1?}", outcome.elapsed);
    let sources = outcome.sources();
    if sources.is_empty() {
        println!("\nNo sources.");
    } else {
        println!("\nSources:");
        for s in &sources {
            println!("  [{}] {} ({})", s.label, s.title, s.locator);
        }
    }
    if show_context {
        println!("\n{}", outcome.context_text);
    }
}
