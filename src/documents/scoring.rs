//! Section Scoring
//!
//! Structural and lexical heuristics that rank sections for inclusion. The
//! weights and keyword list are data ([`ScoringRules`]) so another locale or
//! domain can swap them without touching the compressor.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::context::tokens::{char_len, estimate_tokens};

lazy_static! {
    static ref LEADING_HEADING: Regex = Regex::new(r"^#{1,3}\s").unwrap();
    static ref BULLET_LINE: Regex = Regex::new(r"(?m)^[-*]\s").unwrap();
    static ref DIGIT_RUN: Regex = Regex::new(r"[0-9]+").unwrap();
}

/// Default salient-term list (French)
pub const FRENCH_SECTION_KEYWORDS: &[&str] = &[
    "conclusion",
    "résumé",
    "important",
    "critique",
    "essentiel",
    "recommandation",
    "résultat",
    "analyse",
    "synthèse",
    "objectif",
    "problème",
    "solution",
    "décision",
    "action",
    "priorité",
];

/// A scored slice of a document
#[derive(Debug, Clone, PartialEq)]
pub struct Section<'a> {
    /// Position in document order, used as the tie-break
    pub index: usize,
    pub content: &'a str,
    pub score: f64,
    pub tokens: u32,
}

impl<'a> Section<'a> {
    pub fn new(index: usize, content: &'a str, score: f64) -> Self {
        Self {
            index,
            content,
            score,
            tokens: estimate_tokens(content),
        }
    }
}

/// Scoring policy for sections. Implementations must be pure and return >= 0.
pub trait SectionScorer: Send + Sync {
    fn score(&self, section: &str, priority_keywords: &[String]) -> f64;
}

/// Additive rule table with a final short-section penalty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringRules {
    pub base_score: f64,
    /// Section opens with a `#`..`###` heading
    pub heading_bonus: f64,
    /// Per caller-supplied keyword found
    pub priority_keyword_bonus: f64,
    /// Pipe-delimited table: more than `table_min_fields` fields
    pub table_bonus: f64,
    pub table_min_fields: usize,
    /// Any `-`/`*` bullet line
    pub list_bonus: f64,
    /// More than `numeric_min_runs` digit runs
    pub numeric_bonus: f64,
    pub numeric_min_runs: usize,
    /// Per salient keyword present (once per keyword)
    pub keyword_bonus: f64,
    pub keywords: Vec<String>,
    /// Sections shorter than this many chars get multiplied by `short_penalty`
    pub short_section_chars: usize,
    pub short_penalty: f64,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            base_score: 1.0,
            heading_bonus: 3.0,
            priority_keyword_bonus: 5.0,
            table_bonus: 2.0,
            table_min_fields: 3,
            list_bonus: 1.0,
            numeric_bonus: 2.0,
            numeric_min_runs: 2,
            keyword_bonus: 2.0,
            keywords: FRENCH_SECTION_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            short_section_chars: 100,
            short_penalty: 0.5,
        }
    }
}

impl ScoringRules {
    /// Same weights with a different keyword list
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

fn count_present(haystack_lower: &str, keywords: &[String]) -> usize {
    keywords
        .iter()
        .map(|k| k.to_lowercase())
        .filter(|k| !k.is_empty() && haystack_lower.contains(k.as_str()))
        .count()
}

impl SectionScorer for ScoringRules {
    fn score(&self, section: &str, priority_keywords: &[String]) -> f64 {
        let lower = section.to_lowercase();
        let mut score = self.base_score;

        if LEADING_HEADING.is_match(section) {
            score += self.heading_bonus;
        }

        score += self.priority_keyword_bonus * count_present(&lower, priority_keywords) as f64;

        if section.contains('|') && section.split('|').count() > self.table_min_fields {
            score += self.table_bonus;
        }

        if BULLET_LINE.is_match(section) {
            score += self.list_bonus;
        }

        if DIGIT_RUN.find_iter(section).count() > self.numeric_min_runs {
            score += self.numeric_bonus;
        }

        score += self.keyword_bonus * count_present(&lower, &self.keywords) as f64;

        if char_len(section) < self.short_section_chars {
            score *= self.short_penalty;
        }

        score.max(0.0)
    }
}

/// Score every section with `scorer`, keeping document order
pub fn score_sections<'a>(
    sections: &[&'a str],
    scorer: &dyn SectionScorer,
    priority_keywords: &[String],
) -> Vec<Section<'a>> {
    sections
        .iter()
        .enumerate()
        .map(|(index, content)| Section::new(index, content, scorer.score(content, priority_keywords)))
        .collect()
}

/// Sort by score descending; equal scores keep document order
pub fn rank_sections(sections: &mut [Section<'_>]) {
    sections.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });
}
