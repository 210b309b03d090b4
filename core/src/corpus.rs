use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

lazy_static! {
    static ref BLANK_LINE: Regex = Regex::new(r"\r?\n[ \t\r]*\n").expect("valid regex");
}

const TEXT_EXTENSIONS: &[&str] = &["txt", "text"];

/// Document id -> paragraphs in file order. Ordered by id so index builds are reproducible.
pub type Corpus = BTreeMap<String, Vec<String>>;

/// Split text on blank lines, trimming each block and dropping empty ones.
pub fn split_paragraphs(content: &str) -> Vec<String> {
    BLANK_LINE
        .split(content)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load every text file under `dir`. A missing directory yields an empty corpus and
/// unreadable files are skipped; neither is an error.
pub fn load_corpus(dir: &Path, recursive: bool) -> Corpus {
    let mut corpus = Corpus::new();
    if !dir.is_dir() {
        tracing::info!(dir = %dir.display(), "corpus directory not found, using empty corpus");
        return corpus;
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::warn!(%err, "skipping unreadable corpus entry");
                None
            }
        })
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && has_text_extension(p))
        .collect();

    for path in files {
        let doc_id = document_id(dir, &path);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                corpus.insert(doc_id, split_paragraphs(&content));
            }
            Err(err) => tracing::warn!(file = %path.display(), %err, "skipping corpus file"),
        }
    }
    tracing::info!(documents = corpus.len(), "corpus loaded");
    corpus
}

fn has_text_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn document_id(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
