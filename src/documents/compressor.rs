//! Document Compression
//!
//! Fits a batch of extracted document texts into the document share of the
//! context window. Documents under their allocation pass through untouched;
//! larger ones are rebuilt from their highest-scoring sections plus
//! extractive summaries of what overflowed.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::normalize::normalize_text;
use super::scoring::{rank_sections, score_sections, ScoringRules, SectionScorer};
use super::splitter::split_into_sections;
use super::summarizer::{summarize, SentenceRules};
use crate::config::ContextConfig;
use crate::context::budget::TokenBudget;
use crate::context::tokens::estimate_tokens;

/// Prefix for summarized overflow sections
pub const SUMMARY_PREFIX: &str = "[Résumé] ";
/// Appended when any original section is missing verbatim from the output
pub const COMPRESSION_NOTE: &str =
    "\n---\n[Note: Document compressé automatiquement pour optimiser le traitement]";

const SECTION_SEPARATOR: &str = "\n\n";

lazy_static! {
    static ref EXCESS_NEWLINES: Regex = Regex::new(r"\n{3,}").unwrap();
}

/// Extracted document text handed in by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDocument {
    pub name: String,
    pub content: String,
}

impl RawDocument {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Result for one document. When `compressed` is false, `content` is the
/// input unchanged and both token counts are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressedDocument {
    pub name: String,
    pub content: String,
    pub compressed: bool,
    pub original_tokens: u32,
    pub compressed_tokens: u32,
}

impl CompressedDocument {
    fn passthrough(doc: &RawDocument, tokens: u32) -> Self {
        Self {
            name: doc.name.clone(),
            content: doc.content.clone(),
            compressed: false,
            original_tokens: tokens,
            compressed_tokens: tokens,
        }
    }
}

/// Batch telemetry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionStats {
    pub documents: usize,
    pub compressed_documents: usize,
    pub original_tokens: u64,
    pub compressed_tokens: u64,
}

impl CompressionStats {
    pub fn from_documents(docs: &[CompressedDocument]) -> Self {
        docs.iter().fold(Self::default(), |mut stats, doc| {
            stats.documents += 1;
            stats.compressed_documents += usize::from(doc.compressed);
            stats.original_tokens += doc.original_tokens as u64;
            stats.compressed_tokens += doc.compressed_tokens as u64;
            stats
        })
    }

    pub fn saved_tokens(&self) -> u64 {
        self.original_tokens.saturating_sub(self.compressed_tokens)
    }
}

/// Compression pipeline with its budget config and scoring policies
pub struct DocumentCompressor {
    config: ContextConfig,
    scorer: Box<dyn SectionScorer>,
    sentence_rules: SentenceRules,
}

impl Default for DocumentCompressor {
    fn default() -> Self {
        Self::new(ContextConfig::default())
    }
}

impl DocumentCompressor {
    pub fn new(config: ContextConfig) -> Self {
        Self {
            config,
            scorer: Box::new(ScoringRules::default()),
            sentence_rules: SentenceRules::default(),
        }
    }

    pub fn with_scorer(mut self, scorer: Box<dyn SectionScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_sentence_rules(mut self, rules: SentenceRules) -> Self {
        self.sentence_rules = rules;
        self
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn budget(&self, total_docs: usize) -> TokenBudget {
        TokenBudget::from_config(&self.config, total_docs)
    }

    /// Compress without query bias
    pub fn compress_documents(&self, documents: &[RawDocument], total_docs: usize) -> Vec<CompressedDocument> {
        self.compress_documents_with_keywords(documents, total_docs, &[])
    }

    /// Compress every document against its share of the budget. Output has
    /// one entry per input, in input order.
    pub fn compress_documents_with_keywords(
        &self,
        documents: &[RawDocument],
        total_docs: usize,
        priority_keywords: &[String],
    ) -> Vec<CompressedDocument> {
        self.compress_documents_framed(documents, total_docs, priority_keywords, |_| 0)
    }

    /// Same as [`Self::compress_documents_with_keywords`], with each target
    /// reduced by `framing(doc)` tokens the caller wraps around the document.
    pub fn compress_documents_framed<F>(
        &self,
        documents: &[RawDocument],
        total_docs: usize,
        priority_keywords: &[String],
        framing: F,
    ) -> Vec<CompressedDocument>
    where
        F: Fn(&RawDocument) -> u32,
    {
        let budget = self.budget(total_docs);
        if budget.is_over_allocated() {
            warn!(
                total_docs = budget.total_docs,
                allocated_per_doc = budget.allocated_per_doc,
                available = budget.available_tokens,
                "Per-document floor exceeds the available context window"
            );
        }

        let results: Vec<CompressedDocument> = documents
            .iter()
            .map(|doc| {
                let target = budget.allocated_per_doc.saturating_sub(framing(doc));
                self.compress_document(doc, target, priority_keywords)
            })
            .collect();

        let stats = CompressionStats::from_documents(&results);
        info!(
            documents = stats.documents,
            compressed = stats.compressed_documents,
            original_tokens = stats.original_tokens,
            compressed_tokens = stats.compressed_tokens,
            "Document batch prepared"
        );

        results
    }

    /// Compress one document against `target_tokens`
    pub fn compress_document(
        &self,
        doc: &RawDocument,
        target_tokens: u32,
        priority_keywords: &[String],
    ) -> CompressedDocument {
        let original_tokens = estimate_tokens(&doc.content);
        if original_tokens <= target_tokens {
            debug!(name = %doc.name, tokens = original_tokens, "Document fits, passing through");
            return CompressedDocument::passthrough(doc, original_tokens);
        }

        let content = self.compress_text(&doc.content, target_tokens, priority_keywords);
        let compressed_tokens = estimate_tokens(&content);

        if compressed_tokens > original_tokens {
            warn!(name = %doc.name, tokens = original_tokens, "Compressed form is larger than the original, keeping original");
            return CompressedDocument::passthrough(doc, original_tokens);
        }

        debug!(
            name = %doc.name,
            original_tokens,
            compressed_tokens,
            target_tokens,
            "Document compressed"
        );

        CompressedDocument {
            name: doc.name.clone(),
            content,
            compressed: true,
            original_tokens,
            compressed_tokens,
        }
    }

    /// Rebuild `text` from ranked sections: whole sections up to the summary
    /// threshold, then summaries of overflow sections scoring above 1.
    /// Overflow sections scoring 1 or less are dropped.
    ///
    /// The result, note included, never estimates above `target_tokens`
    /// unless the target is smaller than the note itself.
    pub fn compress_text(&self, text: &str, target_tokens: u32, priority_keywords: &[String]) -> String {
        let normalized = normalize_text(text);
        let pieces = split_into_sections(&normalized, self.config.max_section_tokens);
        let mut sections = score_sections(&pieces, self.scorer.as_ref(), priority_keywords);
        rank_sections(&mut sections);

        // Every piece is charged its own rounded-up estimate, so the sum bounds
        // the estimate of the joined text. The note is reserved up front.
        let pack_limit = target_tokens.saturating_sub(estimate_tokens(COMPRESSION_NOTE));
        let section_budget = pack_limit as f64 * self.config.summary_threshold;
        let separator_tokens = estimate_tokens(SECTION_SEPARATOR);
        let prefix_tokens = estimate_tokens(SUMMARY_PREFIX);

        let mut result = String::new();
        let mut current_tokens: u32 = 0;
        let mut summarized = 0usize;
        let mut dropped = 0usize;

        for section in &sections {
            let cost = section.tokens + separator_tokens;
            if (current_tokens + cost) as f64 <= section_budget {
                result.push_str(section.content);
                result.push_str(SECTION_SEPARATOR);
                current_tokens += cost;
                continue;
            }

            if section.score <= 1.0 {
                dropped += 1;
                continue;
            }

            let remaining = pack_limit.saturating_sub(current_tokens + prefix_tokens + separator_tokens);
            let summary = summarize(section.content, remaining, &self.sentence_rules);
            if summary.is_empty() {
                dropped += 1;
                continue;
            }
            current_tokens += prefix_tokens + estimate_tokens(&summary) + separator_tokens;
            result.push_str(SUMMARY_PREFIX);
            result.push_str(&summary);
            result.push_str(SECTION_SEPARATOR);
            summarized += 1;
        }

        let mut result = EXCESS_NEWLINES.replace_all(&result, "\n\n").trim().to_string();

        if pieces.iter().any(|piece| !result.contains(piece)) {
            result.push_str(COMPRESSION_NOTE);
        }

        debug!(
            sections = sections.len(),
            summarized,
            dropped,
            tokens = current_tokens,
            "Sections packed"
        );

        result
    }
}

/// Compress with the default config and no query bias
pub fn compress_documents(documents: &[RawDocument], total_docs: usize) -> Vec<CompressedDocument> {
    DocumentCompressor::default().compress_documents(documents, total_docs)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A small window so tests can exercise compression with short texts
    fn small_config() -> ContextConfig {
        ContextConfig {
            max_tokens: 1_000,
            max_system_tokens: 100,
            max_history_tokens: 100,
            max_response_tokens: 100,
            min_tokens_per_doc: 100,
            summary_threshold: 0.8,
            max_section_tokens: 200,
        }
    }

    fn filler_paragraph(seed: usize) -> String {
        format!(
            "Paragraphe {} avec un contenu descriptif ordinaire. {}",
            seed,
            "Il sert uniquement à occuper de la place dans le texte courant. ".repeat(3)
        )
    }

    fn large_document() -> String {
        let mut text = String::from("# Conclusion\nLe résultat principal doit être retenu. La décision est importante pour la suite du projet.\n\n");
        for i in 0..40 {
            text.push_str(&filler_paragraph(i));
            text.push_str("\n\n");
        }
        text
    }

    #[test]
    fn test_small_documents_pass_through() {
        let docs = vec![
            RawDocument::new("a.pdf", "Contenu court."),
            RawDocument::new("b.docx", ""),
        ];
        let results = compress_documents(&docs, 2);
        for (doc, result) in docs.iter().zip(&results) {
            assert!(!result.compressed);
            assert_eq!(result.content, doc.content);
            assert_eq!(result.original_tokens, result.compressed_tokens);
        }
        assert_eq!(results[1].original_tokens, 0);
    }

    #[test]
    fn test_three_large_docs_under_allocation_not_compressed() {
        let content = "x".repeat(80_000); // 20,000 tokens
        let docs: Vec<RawDocument> = (0..3).map(|i| RawDocument::new(format!("doc{}", i), content.clone())).collect();
        let results = compress_documents(&docs, 3);
        assert!(results.iter().all(|r| !r.compressed && r.original_tokens == 20_000));
    }

    #[test]
    fn test_single_document_under_window_not_compressed() {
        let docs = vec![RawDocument::new("big", "y".repeat(400_000))]; // 100,000 tokens
        let results = compress_documents(&docs, 1);
        assert!(!results[0].compressed);
    }

    #[test]
    fn test_oversized_single_document_compressed() {
        let mut content = String::new();
        for i in 0..600 {
            content.push_str(&format!("## Partie {}\n", i));
            content.push_str(&filler_paragraph(i).repeat(10));
            content.push_str("\n\n");
        }
        let original = estimate_tokens(&content);
        assert!(original > 150_000);

        let results = compress_documents(&[RawDocument::new("huge.txt", content)], 1);
        let result = &results[0];
        assert!(result.compressed);
        assert!(result.compressed_tokens <= 119_000);
        assert!(result.compressed_tokens < result.original_tokens);
        assert!(result.content.ends_with(COMPRESSION_NOTE));
    }

    #[test]
    fn test_compression_keeps_high_scoring_sections_first() {
        let compressor = DocumentCompressor::new(small_config());
        let content = large_document();
        let result = compressor.compress_document(&RawDocument::new("rapport", content), 500, &[]);

        assert!(result.compressed);
        assert!(result.content.starts_with("# Conclusion"));
        assert!(result.content.ends_with(COMPRESSION_NOTE));
        assert!(result.compressed_tokens < result.original_tokens);
    }

    #[test]
    fn test_no_fabricated_content() {
        let compressor = DocumentCompressor::new(small_config());
        let content = large_document();
        let result = compressor.compress_document(&RawDocument::new("rapport", content.clone()), 500, &[]);

        let body = result.content.trim_end_matches(COMPRESSION_NOTE);
        for block in body.split("\n\n") {
            let block = block.trim_start_matches(SUMMARY_PREFIX);
            if block.is_empty() {
                continue;
            }
            if result.content.contains(&format!("{}{}", SUMMARY_PREFIX, block)) {
                // Summaries are built from whole original sentences
                for sentence in super::super::summarizer::split_sentences(block) {
                    assert!(content.contains(&sentence), "fabricated sentence: {}", sentence);
                }
            } else {
                assert!(content.contains(block), "fabricated block: {}", block);
            }
        }
    }

    fn treasury_section() -> String {
        format!(
            "Section sur la trésorerie et le budget prévisionnel de l'année. {}",
            "Les flux de caisse y sont détaillés pour les lecteurs du rapport. ".repeat(8)
        )
    }

    #[test]
    fn test_priority_keywords_bias_selection() {
        let compressor = DocumentCompressor::new(small_config());
        let mut content = large_document();
        content.push_str(&treasury_section());

        // Unbiased, the section ties with the filler and comes last: too big
        // for what is left of the whole-section budget, and scoring 1 it is
        // not summarized either.
        let plain = compressor.compress_document(&RawDocument::new("r", content.clone()), 300, &[]);
        let biased = compressor.compress_document(&RawDocument::new("r", content), 300, &["trésorerie".to_string()]);

        assert!(plain.compressed && biased.compressed);
        assert!(!plain.content.contains("trésorerie et le budget"));
        assert!(biased.content.contains(treasury_section().trim()));
        assert!(biased.content.starts_with("# Conclusion"));
    }

    #[test]
    fn test_many_small_sections_stay_within_target() {
        let config = ContextConfig {
            max_tokens: 4_000,
            max_system_tokens: 300,
            max_history_tokens: 300,
            max_response_tokens: 400,
            min_tokens_per_doc: 100,
            ..Default::default()
        };
        let compressor = DocumentCompressor::new(config);
        let content: String = (0..1_000)
            .map(|i| format!("# Analyse {:05}\nLe résultat doit être noté ici. Fin.\n\n", i))
            .collect();

        let results = compressor.compress_documents(&[RawDocument::new("notes", content)], 1);
        let result = &results[0];
        assert!(result.compressed);
        assert!(result.compressed_tokens <= 3_000, "{} tokens", result.compressed_tokens);
        assert!(result.content.contains(SUMMARY_PREFIX));
        assert!(result.content.ends_with(COMPRESSION_NOTE));
    }

    #[test]
    fn test_compression_normalizes_text() {
        let compressor = DocumentCompressor::new(small_config());
        let content = large_document().replace(
            "Le résultat principal",
            "Le\u{00A0}re\u{0301}sultat\u{200B} principal",
        );
        let result = compressor.compress_document(&RawDocument::new("rapport", content), 500, &[]);

        assert!(result.compressed);
        assert!(result.content.contains("Le résultat principal"));
        assert!(!result.content.contains('\u{00A0}'));
        assert!(!result.content.contains('\u{200B}'));
        assert!(!result.content.contains('\u{0301}'));
    }

    #[test]
    fn test_equal_size_result_still_marked_compressed() {
        let compressor = DocumentCompressor::new(small_config());
        // Nothing fits a 5-token target, leaving only the note, which is
        // exactly as long as this document
        let content = "x".repeat(COMPRESSION_NOTE.chars().count());
        let result = compressor.compress_document(&RawDocument::new("x", content), 5, &[]);

        assert!(result.compressed);
        assert_eq!(result.content, COMPRESSION_NOTE);
        assert_eq!(result.compressed_tokens, result.original_tokens);
    }

    #[test]
    fn test_larger_result_keeps_original() {
        let compressor = DocumentCompressor::new(small_config());
        let content = "x".repeat(40); // 10 tokens, smaller than the note
        let result = compressor.compress_document(&RawDocument::new("x", content.clone()), 5, &[]);

        assert!(!result.compressed);
        assert_eq!(result.content, content);
    }

    #[test]
    fn test_low_score_overflow_dropped_silently() {
        let config = small_config();
        let compressor = DocumentCompressor::new(config);
        // Plain paragraphs score exactly 1: nothing is summarized
        let content: String = (0..20).map(|i| format!("{}\n\n", filler_paragraph(i))).collect();
        let text = compressor.compress_text(&content, 200, &[]);
        assert!(!text.contains(SUMMARY_PREFIX));
        assert!(text.ends_with(COMPRESSION_NOTE));
    }

    #[test]
    fn test_overflow_with_score_above_one_is_summarized() {
        let compressor = DocumentCompressor::new(small_config());
        let important = "Le résultat final doit être validé par la direction générale. \
             Une analyse détaillée montre des écarts importants sur trois sites. \
             La recommandation est de revoir le plan avant la fin du trimestre."
            .repeat(4);
        let mut content = String::new();
        for i in 0..6 {
            content.push_str(&format!("# Analyse {}\n{}\n\n", i, important));
        }
        let text = compressor.compress_text(&content, 250, &[]);
        assert!(text.contains(SUMMARY_PREFIX));
    }

    #[test]
    fn test_output_order_matches_input() {
        let docs = vec![
            RawDocument::new("first", large_document()),
            RawDocument::new("second", "court"),
            RawDocument::new("third", large_document()),
        ];
        let compressor = DocumentCompressor::new(small_config());
        let results = compressor.compress_documents(&docs, 3);

        assert_eq!(results.len(), docs.len());
        for (doc, result) in docs.iter().zip(&results) {
            assert_eq!(doc.name, result.name);
        }
        assert!(results[0].compressed);
        assert!(!results[1].compressed);
    }

    #[test]
    fn test_custom_scorer_and_sentence_rules() {
        struct PreferNeedle;
        impl SectionScorer for PreferNeedle {
            fn score(&self, section: &str, _: &[String]) -> f64 {
                if section.contains("aiguille") { 10.0 } else { 0.0 }
            }
        }

        let compressor = DocumentCompressor::new(small_config())
            .with_scorer(Box::new(PreferNeedle))
            .with_sentence_rules(SentenceRules { min_chars: 5, ..Default::default() });
        let mut content = large_document();
        content.push_str("Une aiguille dans la botte de foin.");

        let text = compressor.compress_text(&content, 100, &[]);
        assert!(text.starts_with("Une aiguille dans la botte de foin."));
        assert!(text.ends_with(COMPRESSION_NOTE));
    }

    #[test]
    fn test_no_note_when_everything_kept() {
        let compressor = DocumentCompressor::new(small_config());
        let text = compressor.compress_text("# A\nun\n\n# B\ndeux", 1_000, &[]);
        assert!(!text.contains(COMPRESSION_NOTE));
        assert!(text.contains("# A\nun"));
        assert!(text.contains("# B\ndeux"));
    }

    #[test]
    fn test_stats() {
        let docs = vec![
            CompressedDocument {
                name: "a".into(),
                content: String::new(),
                compressed: true,
                original_tokens: 1_000,
                compressed_tokens: 400,
            },
            CompressedDocument {
                name: "b".into(),
                content: String::new(),
                compressed: false,
                original_tokens: 50,
                compressed_tokens: 50,
            },
        ];
        let stats = CompressionStats::from_documents(&docs);
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.compressed_documents, 1);
        assert_eq!(stats.saved_tokens(), 600);
    }
}
