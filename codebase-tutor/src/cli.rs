//! # codebase-tutor CLI Interface
//!
//! Command parsing and the async entrypoint for the `codebase-tutor` binary.
//! The pipeline itself lives in `codebase-tutor-core`; this module only
//! resolves configuration, builds the crawler and LLM client, and reports
//! where the tutorial was written.
//!
//! For programmatic or integration use, call [`run`] with a constructed [`Cli`].

use crate::llm_client::ProviderClient;
use crate::load_config::{load_config, resolve, FileConfig};
use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use codebase_tutor_core::cache::{CachedLlm, ResponseCache};
use codebase_tutor_core::crawl::SourceCrawler;
use codebase_tutor_core::flow::build_tutorial;
use std::path::PathBuf;

/// Turn a codebase into a beginner-friendly tutorial.
#[derive(Debug, Parser)]
#[clap(
    name = "codebase-tutor",
    version,
    about = "Generate a beginner-friendly Markdown tutorial for a codebase with an LLM"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Crawl a repository or directory and write a tutorial for it
    Generate(GenerateArgs),
}

#[derive(Debug, Default, Args)]
#[clap(group(ArgGroup::new("source").required(true).args(["repo", "dir"])))]
pub struct GenerateArgs {
    /// URL of a repository (GitHub, or any git URL)
    #[clap(long)]
    pub repo: Option<String>,

    /// Path to a local directory
    #[clap(long)]
    pub dir: Option<PathBuf>,

    /// Project name (default: derived from the repository or directory)
    #[clap(short = 'n', long)]
    pub name: Option<String>,

    /// GitHub personal access token
    #[clap(short = 't', long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Base output directory (default: output)
    #[clap(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Include glob; repeat for several. Replaces the default list
    #[clap(short = 'i', long = "include")]
    pub include: Vec<String>,

    /// Exclude glob; repeat for several. Replaces the default list
    #[clap(short = 'e', long = "exclude")]
    pub exclude: Vec<String>,

    /// Maximum file size in bytes (default: 100000)
    #[clap(short = 's', long)]
    pub max_size: Option<u64>,

    /// Language of the tutorial (default: english)
    #[clap(long)]
    pub language: Option<String>,

    /// Do not read or write the LLM response cache
    #[clap(long)]
    pub no_cache: bool,

    /// Maximum number of abstractions to identify (default: 10)
    #[clap(long)]
    pub max_abstractions: Option<usize>,

    /// Optional YAML config file
    #[clap(long)]
    pub config: Option<PathBuf>,
}

/// Async CLI entrypoint for main() and integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Generate(args) => generate(args).await,
    }
}

async fn generate(args: GenerateArgs) -> Result<()> {
    let file = match &args.config {
        Some(path) => load_config(path)?,
        None => FileConfig::default(),
    };
    let resolved = resolve(&args, file)?;
    resolved.tutorial.trace_loaded();
    tracing::info!(
        command = "generate",
        repo = resolved.source.repo_url().unwrap_or("-"),
        "Starting tutorial generation"
    );

    let client = ProviderClient::from_settings(resolved.llm)
        .context("Failed to construct LLM client")?;
    let llm = CachedLlm::new(client, ResponseCache::open(&resolved.cache_file));
    let crawler = SourceCrawler::for_source(resolved.source, resolved.crawl)
        .context("Failed to set up crawler")?;

    match build_tutorial(&resolved.tutorial, &crawler, &llm).await {
        Ok(report) => {
            tracing::info!(command = "generate", ?report, "Tutorial generation complete");
            println!(
                "Tutorial with {} chapters generated in {}",
                report.chapters.len(),
                report.output_path.display()
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "generate", error = %e, "Tutorial generation failed");
            Err(anyhow::Error::new(e).context("Tutorial generation failed"))
        }
    }
}
