//! Tumorboard — cancer variant actionability assessment.
//! Entry point for the `tumorboard` binary.

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tumorboard_common::{TumorboardError, VariantQuery};
use tumorboard_engine::AssessmentEngine;
use tumorboard_evidence::sources::MyVariantClient;
use tumorboard_llm::{build_backend, BackendKind};
use tumorboard_validation::{validate, GoldStandard};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "tumorboard", version, about = "Tier cancer variants with an LLM and score it against a gold standard")]
struct Cli {
    /// Path to tumorboard.toml (overrides TUMORBOARD_CONFIG).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Model name passed to the backend.
    #[arg(long, global = true, env = "TUMORBOARD_MODEL")]
    model: Option<String>,

    /// openai | openai_compatible | ollama | anthropic | gemini
    #[arg(long, global = true)]
    backend: Option<BackendKind>,

    /// Write JSON here instead of stdout.
    #[arg(long, short, global = true)]
    output: Option<PathBuf>,

    #[arg(long, global = true)]
    max_concurrency: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assess one variant.
    Assess {
        #[arg(long)]
        gene: String,
        #[arg(long)]
        variant: String,
        #[arg(long)]
        tumor: Option<String>,
    },
    /// Assess a JSON array of {gene, variant, tumor_type?} records.
    Batch { input: PathBuf },
    /// Run a gold standard and report accuracy metrics.
    Validate {
        gold: PathBuf,
        /// Print the text report to stderr as well as writing JSON.
        #[arg(long)]
        text: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tumorboard=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        config.llm.backend = backend;
    }
    if let Some(model) = &cli.model {
        config.llm.model = model.clone();
    }
    let max_concurrency = cli.max_concurrency.unwrap_or(config.assessment.max_concurrency);

    // Credentials and backend are resolved before any item work starts.
    let backend = build_backend(config.backend_config())
        .context("could not configure the LLM backend")?;
    let evidence = MyVariantClient::new()
        .with_base_url(config.evidence.base_url.clone())
        .with_timeout(Duration::from_secs(config.evidence.timeout_secs))
        .with_retry(config.assessment.retry.clone());
    let engine = AssessmentEngine::new(Arc::new(evidence), backend);
    let assess_config = config.assess_config();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = %config.llm.backend,
        model = %assess_config.model,
        "Tumorboard starting"
    );

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling remaining work");
                cancel.cancel();
            }
        });
    }

    match cli.command {
        Command::Assess { gene, variant, tumor } => {
            let query = VariantQuery::new(gene, variant, tumor);
            let assessment = engine.assess_one(&assess_config, &query).await?;
            info!(tier = %assessment.tier, confidence = assessment.confidence, "Assessment complete");
            write_json(&assessment, cli.output.as_deref())?;
        }
        Command::Batch { input } => {
            let queries = load_queries(&input)?;

            let outcome = engine.assess_batch(&assess_config, queries, max_concurrency, &cancel).await;
            info!(
                total = outcome.summary.total,
                succeeded = outcome.summary.succeeded,
                failed = outcome.summary.failed,
                cancelled = outcome.summary.cancelled,
                "Batch complete"
            );
            write_json(&outcome, cli.output.as_deref())?;
        }
        Command::Validate { gold, text } => {
            let gold = GoldStandard::load(&gold)?;
            let report = validate(&engine, &assess_config, &gold, max_concurrency, &cancel).await?;
            if text || cli.output.is_some() {
                eprint!("{}", report.render_text());
            }
            write_json(&report, cli.output.as_deref())?;
        }
    }

    Ok(())
}

/// Batch input: a JSON array of `{gene, variant, tumor_type?}`.
fn load_queries(path: &Path) -> tumorboard_common::Result<Vec<VariantQuery>> {
    let text = std::fs::read_to_string(path)?;
    let queries: Vec<VariantQuery> = serde_json::from_str(&text)?;
    if let Some(i) = queries.iter().position(|q| q.gene.trim().is_empty() || q.variant.trim().is_empty()) {
        return Err(TumorboardError::InvalidInput(format!(
            "{}: record {i} needs a gene and a variant",
            path.display()
        )));
    }
    info!(path = %path.display(), queries = queries.len(), "Loaded batch input");
    Ok(queries)
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json + "\n").with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "Wrote output");
        }
        None => println!("{json}"),
    }
    Ok(())
}
