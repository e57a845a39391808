//! Query keyword extraction, used to bias section scoring toward what the
//! user asked about.

use std::collections::HashSet;

use lazy_static::lazy_static;

/// Maximum keywords returned per query
pub const MAX_QUERY_KEYWORDS: usize = 10;
/// Tokens this short (in chars) are ignored
pub const MIN_KEYWORD_CHARS: usize = 4;

pub const FRENCH_STOP_WORDS: &[&str] = &[
    "le", "la", "les", "de", "du", "des", "un", "une", "et", "ou", "dans", "sur", "avec", "pour",
    "par", "à", "au", "aux", "ce", "ces", "cet", "cette", "qui", "que", "quoi", "dont", "où",
];

lazy_static! {
    static ref STOP_WORDS: HashSet<&'static str> = FRENCH_STOP_WORDS.iter().copied().collect();
}

/// Lowercase, split on whitespace, drop stop words and tokens of three chars
/// or fewer, keep the first ten in query order.
pub fn extract_keywords_from_query(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|word| !STOP_WORDS.contains(*word))
        .filter(|word| word.chars().count() >= MIN_KEYWORD_CHARS)
        .take(MAX_QUERY_KEYWORDS)
        .map(str::to_string)
        .collect()
}
