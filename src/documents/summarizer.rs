//! Extractive sentence summarizer for sections that overflow the budget.
//!
//! Output is ordered by sentence importance, not by original position.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::context::tokens::{char_len, chars_to_tokens, CHARS_PER_TOKEN};

lazy_static! {
    /// Terminal punctuation, whitespace, then an uppercase letter
    static ref SENTENCE_BREAK: Regex = Regex::new(r"[.!?]\s+\p{Lu}").unwrap();
}

pub const FRENCH_SENTENCE_KEYWORDS: &[&str] = &[
    "doit",
    "devrait",
    "important",
    "nécessaire",
    "résultat",
    "conclusion",
];

/// Sentence filtering and weighting policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SentenceRules {
    /// Sentences must be strictly longer than this (chars)
    pub min_chars: usize,
    /// ...and strictly shorter than this
    pub max_chars: usize,
    pub base_score: f64,
    pub digit_bonus: f64,
    /// Inclusive char range that earns `ideal_length_bonus`
    pub ideal_min_chars: usize,
    pub ideal_max_chars: usize,
    pub ideal_length_bonus: f64,
    /// Per keyword present (once per keyword)
    pub keyword_bonus: f64,
    pub keywords: Vec<String>,
}

impl Default for SentenceRules {
    fn default() -> Self {
        Self {
            min_chars: 20,
            max_chars: 500,
            base_score: 1.0,
            digit_bonus: 1.0,
            ideal_min_chars: 50,
            ideal_max_chars: 200,
            ideal_length_bonus: 1.0,
            keyword_bonus: 1.0,
            keywords: FRENCH_SENTENCE_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl SentenceRules {
    pub fn score(&self, sentence: &str) -> f64 {
        let len = char_len(sentence);
        let lower = sentence.to_lowercase();
        let mut score = self.base_score;

        if sentence.chars().any(|c| c.is_ascii_digit()) {
            score += self.digit_bonus;
        }
        if (self.ideal_min_chars..=self.ideal_max_chars).contains(&len) {
            score += self.ideal_length_bonus;
        }
        let present = self
            .keywords
            .iter()
            .filter(|k| !k.is_empty() && lower.contains(k.to_lowercase().as_str()))
            .count();
        score += self.keyword_bonus * present as f64;

        score
    }

    fn keeps(&self, sentence: &str) -> bool {
        let len = char_len(sentence);
        len > self.min_chars && len < self.max_chars && ends_with_terminal(sentence)
    }
}

fn ends_with_terminal(text: &str) -> bool {
    text.ends_with(['.', '!', '?'])
}

/// Split on `.`/`!`/`?` followed by whitespace and an uppercase letter.
/// Line endings are normalized to `\n` first; pieces are trimmed.
pub fn split_sentences(text: &str) -> Vec<String> {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in SENTENCE_BREAK.find_iter(&text) {
        // Punctuation is ASCII, so the sentence ends one byte into the match
        let end = m.start() + 1;
        sentences.push(text[start..end].trim().to_string());
        let upper_len = m.as_str().chars().last().map(char::len_utf8).unwrap_or(0);
        start = m.end() - upper_len;
    }
    sentences.push(text[start..].trim().to_string());

    sentences.retain(|s| !s.is_empty());
    sentences
}

/// Pick the highest-scoring sentences of `section` that fit in `max_tokens`.
///
/// Returns an empty string when no sentence survives filtering.
pub fn summarize(section: &str, max_tokens: u32, rules: &SentenceRules) -> String {
    let mut candidates: Vec<(f64, String)> = split_sentences(section)
        .into_iter()
        .filter(|s| rules.keeps(s))
        .map(|s| (rules.score(&s), s))
        .collect();

    // Stable: equal scores keep their original order
    candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let max_chars = max_tokens as usize * CHARS_PER_TOKEN;
    let mut summary = String::new();
    let mut summary_chars = 0usize;

    for (_, sentence) in candidates {
        let added = char_len(&sentence) + usize::from(!summary.is_empty());
        let next_chars = summary_chars + added;
        if chars_to_tokens(next_chars) > max_tokens || next_chars > max_chars {
            break;
        }
        if !summary.is_empty() {
            summary.push(' ');
        }
        summary.push_str(&sentence);
        summary_chars = next_chars;
    }

    if !summary.is_empty() && !ends_with_terminal(&summary) {
        summary.push('.');
    }

    summary
}
