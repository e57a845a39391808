// Ringo Library
// Document-to-context compression used by the chat layer and the CLI binary

pub mod config;
pub mod context;
pub mod conversation;
pub mod documents;

// Re-export commonly used types for CLI
pub use config::{ConfigError, ContextConfig};
pub use context::budget::TokenBudget;
pub use context::tokens::{count_tokens, estimate_tokens};

pub use documents::{
    compress_documents, extract_keywords_from_query, CompressedDocument, CompressionStats,
    DocumentCompressor, RawDocument, ScoringRules, SectionScorer, SentenceRules,
};

pub use conversation::{
    build_document_context, document_header, framing_tokens, prepare_document_context, ContextError,
    DocumentContext,
};
