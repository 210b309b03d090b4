use crate::config::EngineConfig;
use crate::corpus::load_corpus;
use crate::index::TfIdfIndex;
use crate::persist::{load_snapshot, IndexPaths};
use crate::search::{search, simple_search, LegacyMatch, SearchMatch, SearchOptions};
use crate::translate::Language;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Owns the process-wide index. Builds are serialized by `building`, so concurrent
/// first callers wait for one build instead of starting their own. Readers only take
/// the slot's read lock; a rebuild swaps the new `Arc` in once it is complete.
pub struct IndexService {
    config: EngineConfig,
    slot: RwLock<Option<Arc<TfIdfIndex>>>,
    building: Mutex<()>,
    builds: AtomicUsize,
}

impl IndexService {
    pub fn new(config: EngineConfig) -> Self {
        Self { config, slot: RwLock::new(None), building: Mutex::new(()), builds: AtomicUsize::new(0) }
    }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn corpus_language(&self) -> Language { self.config.corpus_language }

    pub fn index(&self) -> Arc<TfIdfIndex> {
        if let Some(index) = self.slot.read().as_ref() {
            return index.clone();
        }
        let _build = self.building.lock();
        // Another caller may have finished the build while we waited.
        if let Some(index) = self.slot.read().as_ref() {
            return index.clone();
        }
        let index = Arc::new(self.load());
        *self.slot.write() = Some(index.clone());
        index
    }

    /// Build now rather than on the first query.
    pub fn warm(&self) -> Arc<TfIdfIndex> { self.index() }

    pub fn invalidate(&self) {
        *self.slot.write() = None;
    }

    /// Build a fresh index and swap it in. Queries keep using the previous index until then.
    pub fn rebuild(&self) -> Arc<TfIdfIndex> {
        let _build = self.building.lock();
        let index = Arc::new(self.load());
        *self.slot.write() = Some(index.clone());
        index
    }

    /// Content fingerprint of the current index.
    pub fn fingerprint(&self) -> String { self.index().fingerprint().to_string() }

    pub fn is_built(&self) -> bool { self.slot.read().is_some() }

    /// How many times an index has been loaded or built by this service.
    pub fn build_count(&self) -> usize { self.builds.load(Ordering::SeqCst) }

    pub fn search(&self, query: &str, opts: SearchOptions) -> Vec<SearchMatch> {
        search(&self.index(), query, opts)
    }

    pub fn simple_search(&self, query: &str, limit: usize) -> Vec<LegacyMatch> {
        simple_search(&self.index(), query, limit)
    }

    fn load(&self) -> TfIdfIndex {
        self.builds.fetch_add(1, Ordering::SeqCst);
        let start = Instant::now();
        if let Some(dir) = &self.config.snapshot_dir {
            match load_snapshot(&IndexPaths::new(dir)) {
                Ok(index) => {
                    tracing::info!(
                        snapshot = %dir.display(),
                        paragraphs = index.num_paragraphs(),
                        terms = index.num_terms(),
                        took_ms = start.elapsed().as_millis() as u64,
                        "index loaded from snapshot"
                    );
                    return index;
                }
                Err(err) => {
                    tracing::warn!(snapshot = %dir.display(), %err, "snapshot unusable, building from corpus")
                }
            }
        }
        let corpus = load_corpus(&self.config.corpus_dir, self.config.recursive);
        let index = TfIdfIndex::build(&corpus);
        tracing::info!(
            corpus = %self.config.corpus_dir.display(),
            documents = index.num_documents(),
            paragraphs = index.num_paragraphs(),
            terms = index.num_terms(),
            took_ms = start.elapsed().as_millis() as u64,
            "index built"
        );
        index
    }
}
