use crate::translate::Language;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Engine settings. `Default` gives the on-disk layout used by the server;
/// `from_env` lets deployments override each field.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub corpus_dir: PathBuf,
    pub recursive: bool,
    /// Language the corpus is written in; lookups translate away from it.
    pub corpus_language: Language,
    /// Prebuilt index written by the indexer. Preferred over the corpus when readable.
    pub snapshot_dir: Option<PathBuf>,
    pub cache_dir: PathBuf,
    pub cache_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            corpus_dir: PathBuf::from("./data/processed_texts"),
            recursive: false,
            corpus_language: Language::En,
            snapshot_dir: None,
            cache_dir: PathBuf::from("./data/cache"),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(dir) = std::env::var("ASTRO_CORPUS_DIR") {
            cfg.corpus_dir = PathBuf::from(dir);
        }
        if let Ok(val) = std::env::var("ASTRO_CORPUS_RECURSIVE") {
            cfg.recursive = matches!(val.trim(), "1" | "true" | "yes");
        }
        if let Ok(code) = std::env::var("ASTRO_CORPUS_LANG") {
            match code.parse() {
                Ok(lang) => cfg.corpus_language = lang,
                Err(err) => tracing::warn!(%err, "ignoring ASTRO_CORPUS_LANG"),
            }
        }
        if let Ok(dir) = std::env::var("ASTRO_SNAPSHOT_DIR") {
            cfg.snapshot_dir = Some(PathBuf::from(dir));
        }
        if let Ok(dir) = std::env::var("ASTRO_CACHE_DIR") {
            cfg.cache_dir = PathBuf::from(dir);
        }
        if let Ok(secs) = std::env::var("ASTRO_CACHE_TTL_SECS") {
            match secs.trim().parse::<u64>() {
                Ok(secs) => cfg.cache_ttl = Duration::from_secs(secs),
                Err(err) => tracing::warn!(%err, "ignoring ASTRO_CACHE_TTL_SECS"),
            }
        }
        cfg
    }
}
