use anyhow::{bail, Result};
use astro_core::corpus::load_corpus;
use astro_core::persist::{load_meta, load_snapshot, save_snapshot, IndexPaths};
use astro_core::search::search;
use astro_core::{EngineConfig, ResultCache, SearchOptions, TfIdfIndex};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "astro-indexer")]
#[command(about = "Build and inspect the interpretation TF-IDF index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index snapshot from a directory of text files
    Build {
        /// Corpus directory (defaults to ASTRO_CORPUS_DIR or ./data/processed_texts)
        #[arg(long)]
        corpus: Option<PathBuf>,
        /// Output snapshot directory
        #[arg(long)]
        output: PathBuf,
        /// Walk subdirectories of the corpus
        #[arg(long, default_value_t = false)]
        recursive: bool,
    },
    /// Run a query against a snapshot or directly against a corpus
    Search {
        #[arg(long, conflicts_with = "corpus")]
        snapshot: Option<PathBuf>,
        #[arg(long)]
        corpus: Option<PathBuf>,
        #[arg(long)]
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
        #[arg(long, default_value_t = 0.1)]
        min_score: f64,
    },
    /// Print the header of a snapshot
    Stats {
        #[arg(long)]
        snapshot: PathBuf,
    },
    /// Drop expired result-cache entries, or everything with --all
    Cache {
        /// Cache directory (defaults to ASTRO_CACHE_DIR or ./data/cache)
        #[arg(long)]
        dir: Option<PathBuf>,
        #[arg(long)]
        ttl_secs: Option<u64>,
        #[arg(long, default_value_t = false)]
        all: bool,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let env = EngineConfig::from_env();

    match cli.command {
        Commands::Build { corpus, output, recursive } => {
            let corpus = corpus.unwrap_or(env.corpus_dir);
            build_snapshot(&corpus, &output, recursive || env.recursive)
        }
        Commands::Search { snapshot, corpus, query, limit, min_score } => {
            let index = match (snapshot, corpus) {
                (Some(dir), _) => load_snapshot(&IndexPaths::new(dir))?,
                (None, corpus) => {
                    let dir = corpus.unwrap_or(env.corpus_dir);
                    TfIdfIndex::build(&load_corpus(&dir, env.recursive))
                }
            };
            let hits = search(&index, &query, SearchOptions { limit, min_score });
            println!("{}", serde_json::to_string_pretty(&hits)?);
            Ok(())
        }
        Commands::Stats { snapshot } => {
            let meta = load_meta(&IndexPaths::new(snapshot))?;
            println!("{}", serde_json::to_string_pretty(&meta)?);
            Ok(())
        }
        Commands::Cache { dir, ttl_secs, all } => {
            let dir = dir.unwrap_or(env.cache_dir);
            let ttl = ttl_secs.map(Duration::from_secs).unwrap_or(env.cache_ttl);
            let cache = ResultCache::new(&dir, ttl);
            if all {
                cache.clear();
                tracing::info!(dir = %dir.display(), "cache cleared");
            } else {
                let removed = cache.clear_expired();
                tracing::info!(dir = %dir.display(), removed, "expired cache entries removed");
            }
            Ok(())
        }
    }
}

fn build_snapshot(corpus: &Path, output: &Path, recursive: bool) -> Result<()> {
    if !corpus.is_dir() {
        bail!("corpus directory {} does not exist", corpus.display());
    }
    let docs = load_corpus(corpus, recursive);
    let index = TfIdfIndex::build(&docs);
    tracing::info!(
        documents = index.num_documents(),
        paragraphs = index.num_paragraphs(),
        terms = index.num_terms(),
        "indexed corpus"
    );

    let meta = save_snapshot(&IndexPaths::new(output), &index)?;
    tracing::info!(output = %output.display(), created_at = %meta.created_at, "snapshot written");
    Ok(())
}
