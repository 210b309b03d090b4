use crate::corpus::Corpus;
use crate::tokenizer::term_frequencies;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

/// Dense paragraph id, assigned in discovery order (documents by id, paragraphs in file order).
pub type ParagraphId = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphMeta {
    /// Id of the document the paragraph came from.
    pub source: String,
    /// Position of the paragraph inside its document.
    pub position: u32,
    /// Paragraph text in NFC, the same form the tokenizer matches against.
    pub text: String,
    /// Post-filter token count; the tf denominator.
    pub token_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub paragraph: ParagraphId,
    pub weight: f64, // tf * idf
}

/// Sparse TF-IDF index over paragraphs. A term absent from a paragraph has no posting.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TfIdfIndex {
    postings: HashMap<String, Vec<Posting>>, // postings sorted by paragraph
    paragraphs: Vec<ParagraphMeta>,
    num_documents: u32,
    /// sha256 over every paragraph's source and text, in id order.
    fingerprint: String,
}

impl TfIdfIndex {
    pub fn new() -> Self { Self::default() }

    pub fn build(corpus: &Corpus) -> Self {
        let mut paragraphs: Vec<ParagraphMeta> = Vec::new();
        let mut raw: HashMap<String, Vec<(ParagraphId, u32)>> = HashMap::new();
        let mut hasher = Sha256::new();

        for (doc_id, blocks) in corpus {
            for (position, text) in blocks.iter().enumerate() {
                let id = paragraphs.len() as ParagraphId;
                let text: String = text.nfc().collect();
                hasher.update(doc_id.as_bytes());
                hasher.update([0u8]);
                hasher.update(text.as_bytes());
                hasher.update([0x1eu8]);
                let freqs = term_frequencies(&text);
                let token_count: u32 = freqs.values().sum();
                for (term, count) in freqs {
                    raw.entry(term).or_default().push((id, count));
                }
                paragraphs.push(ParagraphMeta {
                    source: doc_id.clone(),
                    position: position as u32,
                    text,
                    token_count,
                });
            }
        }

        // df >= 1 for every observed term, so idf is always defined.
        let n = paragraphs.len() as f64;
        let postings = raw
            .into_iter()
            .map(|(term, plist)| {
                let idf = (n / plist.len() as f64).ln();
                let list = plist
                    .into_iter()
                    .map(|(paragraph, count)| {
                        let tf = count as f64 / paragraphs[paragraph as usize].token_count as f64;
                        Posting { paragraph, weight: tf * idf }
                    })
                    .collect();
                (term, list)
            })
            .collect();

        Self {
            postings,
            paragraphs,
            num_documents: corpus.len() as u32,
            fingerprint: format!("{:x}", hasher.finalize()),
        }
    }

    pub fn is_empty(&self) -> bool { self.paragraphs.is_empty() }
    pub fn num_paragraphs(&self) -> usize { self.paragraphs.len() }
    pub fn num_terms(&self) -> usize { self.postings.len() }
    pub fn num_documents(&self) -> u32 { self.num_documents }

    /// Content hash of the indexed paragraphs. Equal corpora give equal fingerprints
    /// across processes, so it can key anything derived from the index.
    pub fn fingerprint(&self) -> &str { &self.fingerprint }

    pub fn paragraph(&self, id: ParagraphId) -> Option<&ParagraphMeta> {
        self.paragraphs.get(id as usize)
    }

    pub fn paragraphs(&self) -> &[ParagraphMeta] { &self.paragraphs }

    pub fn postings(&self, term: &str) -> &[Posting] {
        self.postings.get(term).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(|k| k.as_str())
    }

    /// Number of paragraphs containing `term`.
    pub fn document_frequency(&self, term: &str) -> usize { self.postings(term).len() }

    /// TF-IDF weight of `term` in `paragraph`, `None` when the term does not occur there.
    pub fn weight(&self, term: &str, paragraph: ParagraphId) -> Option<f64> {
        let list = self.postings(term);
        list.binary_search_by_key(&paragraph, |p| p.paragraph)
            .ok()
            .map(|i| list[i].weight)
    }
}
