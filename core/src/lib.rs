//! Interpretation retrieval engine.
//!
//! Paragraph-level TF-IDF search over a directory of astrological interpretation
//! texts, term translation across six languages, and a two-tier result cache.
//!
//! - **`tokenizer`**: text normalization shared by indexing and querying.
//! - **`corpus`**: reads text files and splits them into paragraphs.
//! - **`index`**: the sparse TF-IDF inverted index.
//! - **`search`**: scoring, ranking and highlighting.
//! - **`service`**: owns the process-wide, lazily built index.
//! - **`interpret`**: planet/sign/house/aspect/transit lookups on top of search.
//! - **`translate`**: term dictionaries and text substitution.
//! - **`cache`**: memory + disk result cache with TTL expiry.
//! - **`persist`**: index snapshots written by the indexer.

pub mod cache;
pub mod config;
pub mod corpus;
pub mod index;
pub mod interpret;
pub mod persist;
pub mod search;
pub mod service;
pub mod tokenizer;
pub mod translate;

pub use cache::{key_for, ResultCache};
pub use config::EngineConfig;
pub use index::{ParagraphId, ParagraphMeta, Posting, TfIdfIndex};
pub use search::{LegacyMatch, SearchMatch, SearchOptions};
pub use service::IndexService;
pub use translate::{Category, Language};
