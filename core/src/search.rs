use crate::index::{ParagraphId, TfIdfIndex};
use crate::tokenizer::normalize;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub limit: usize,
    /// Scores at or below this threshold are dropped.
    pub min_score: f64,
}

impl Default for SearchOptions {
    fn default() -> Self { Self { limit: 5, min_score: 0.1 } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub source: String,
    pub paragraph_index: u32,
    pub score: f64,
    pub paragraph: String,
    pub highlighted: String,
    pub matched_terms: Vec<String>,
}

/// Result shape of the old plain-text search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyMatch {
    pub source: String,
    pub matched_terms: Vec<String>,
    pub paragraphs: Vec<String>,
}

impl From<SearchMatch> for LegacyMatch {
    fn from(m: SearchMatch) -> Self {
        Self { source: m.source, matched_terms: m.matched_terms, paragraphs: vec![m.paragraph] }
    }
}

/// Rank paragraphs against `query`, best first. Ties keep paragraph order.
pub fn search(index: &TfIdfIndex, query: &str, opts: SearchOptions) -> Vec<SearchMatch> {
    if index.is_empty() {
        return Vec::new();
    }
    let tokens = normalize(query);
    if tokens.is_empty() {
        return Vec::new();
    }

    // Repeated query tokens count once per occurrence.
    let mut scores = vec![0.0f64; index.num_paragraphs()];
    for token in &tokens {
        for p in index.postings(token) {
            scores[p.paragraph as usize] += p.weight;
        }
    }

    let mut ranked: Vec<(ParagraphId, f64)> = scores
        .into_iter()
        .enumerate()
        .filter(|(_, s)| *s > opts.min_score)
        .map(|(id, s)| (id as ParagraphId, s))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked.truncate(opts.limit);

    let mut unique: Vec<String> = Vec::with_capacity(tokens.len());
    for t in tokens {
        if !unique.contains(&t) {
            unique.push(t);
        }
    }

    ranked
        .into_iter()
        .filter_map(|(id, score)| {
            let meta = index.paragraph(id)?;
            let matched_terms = unique
                .iter()
                .filter(|t| index.weight(t, id).is_some())
                .cloned()
                .collect();
            Some(SearchMatch {
                source: meta.source.clone(),
                paragraph_index: meta.position,
                score,
                paragraph: meta.text.clone(),
                highlighted: highlight(&meta.text, &unique),
                matched_terms,
            })
        })
        .collect()
}

pub fn simple_search(index: &TfIdfIndex, query: &str, limit: usize) -> Vec<LegacyMatch> {
    let opts = SearchOptions { limit, ..SearchOptions::default() };
    search(index, query, opts).into_iter().map(LegacyMatch::from).collect()
}

/// Wrap each case-insensitive whole-word occurrence of `terms` as `**TERM**`.
/// One combined pass, longest term first, so markers are never re-matched.
pub fn highlight(text: &str, terms: &[String]) -> String {
    let mut sorted: Vec<&String> = terms.iter().filter(|t| !t.is_empty()).collect();
    if sorted.is_empty() {
        return text.to_string();
    }
    sorted.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
    let alternation = sorted.iter().map(|t| regex::escape(t)).collect::<Vec<_>>().join("|");
    let pat = match RegexBuilder::new(&format!(r"\b(?:{alternation})\b"))
        .case_insensitive(true)
        .build()
    {
        Ok(p) => p,
        Err(err) => {
            tracing::warn!(%err, "highlight pattern rejected");
            return text.to_string();
        }
    };
    pat.replace_all(text, |caps: &regex::Captures| format!("**{}**", caps[0].to_uppercase()))
        .into_owned()
}
