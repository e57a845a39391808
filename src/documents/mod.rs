//! Document Compression Module
//!
//! Splits, scores and summarizes extracted document text so a batch of
//! documents fits the context window of one LLM call.

pub mod compressor;
pub mod keywords;
pub mod normalize;
pub mod scoring;
pub mod splitter;
pub mod summarizer;

// Re-export key public types
pub use compressor::{
    compress_documents, CompressedDocument, CompressionStats, DocumentCompressor, RawDocument,
    COMPRESSION_NOTE, SUMMARY_PREFIX,
};
pub use keywords::extract_keywords_from_query;
pub use normalize::normalize_text;
pub use scoring::{ScoringRules, Section, SectionScorer};
pub use splitter::split_into_sections;
pub use summarizer::{summarize, SentenceRules};
