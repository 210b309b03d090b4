use anyhow::Result;
use astro_core::{EngineConfig, Language};
use astro_server::{build_app, AppState};
use axum::Router;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Directory of interpretation texts
    #[arg(long, env = "ASTRO_CORPUS_DIR")]
    corpus: Option<PathBuf>,
    /// Prebuilt snapshot directory, tried before the corpus
    #[arg(long, env = "ASTRO_SNAPSHOT_DIR")]
    snapshot: Option<PathBuf>,
    /// Result cache directory
    #[arg(long, env = "ASTRO_CACHE_DIR")]
    cache_dir: Option<PathBuf>,
    /// Language the corpus is written in
    #[arg(long, env = "ASTRO_CORPUS_LANG")]
    corpus_lang: Option<Language>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let mut config = EngineConfig::from_env();
    if let Some(dir) = args.corpus {
        config.corpus_dir = dir;
    }
    if args.snapshot.is_some() {
        config.snapshot_dir = args.snapshot;
    }
    if let Some(dir) = args.cache_dir {
        config.cache_dir = dir;
    }
    if let Some(lang) = args.corpus_lang {
        config.corpus_language = lang;
    }
    let admin_token = std::env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty());

    let state = tokio::task::spawn_blocking(move || AppState::new(config, admin_token)).await?;
    let app: Router = build_app(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
