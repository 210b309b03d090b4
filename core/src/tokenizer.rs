use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use std::collections::{HashMap, HashSet};

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\w+").expect("valid regex");
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            // Portuguese
            "o","a","os","as","um","uma","uns","umas","e","de","do","da","dos","das",
            "em","no","na","nos","nas","por","para","com","que","se",
            // English
            "the","and","of","to","in","is","for","with","by","on","at","from","an",
            "this","that","these","those",
        ];
        words.iter().copied().collect()
    };
}

pub fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Normalize text into index tokens: NFC, lowercase, word runs, stopwords and
/// single-character tokens removed. Output keeps the order of appearance.
pub fn normalize(text: &str) -> Vec<String> {
    let lowered = text.nfc().collect::<String>().to_lowercase();
    WORD.find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|tok| tok.chars().count() > 1 && !is_stopword(tok))
        .map(str::to_string)
        .collect()
}

/// Raw occurrence count per token.
pub fn term_frequencies(text: &str) -> HashMap<String, u32> {
    let mut freqs = HashMap::new();
    for token in normalize(text) {
        *freqs.entry(token).or_insert(0) += 1;
    }
    freqs
}
