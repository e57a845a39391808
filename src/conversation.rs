//! Conversation context assembly.
//!
//! Wraps compressed documents in delimiters for the system message and caps
//! the aggregate, which the per-document floor can push past the window.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::context::tokens::estimate_tokens;
use crate::documents::{
    extract_keywords_from_query, CompressedDocument, CompressionStats, DocumentCompressor, RawDocument,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("Document context too large: {required} tokens (available {available})")]
    ContextTooLarge { required: u32, available: u32 },
}

impl Serialize for ContextError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Everything the chat layer needs for one turn's document context
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentContext {
    /// Delimited text for the system message
    pub text: String,
    pub tokens: u32,
    pub documents: Vec<CompressedDocument>,
    pub stats: CompressionStats,
    /// Priority keywords drawn from the query, empty when none was given
    pub keywords: Vec<String>,
}

pub fn document_header(name: &str) -> String {
    format!("=== DOCUMENT ACTIF: {} ===", name)
}

/// Tokens a document's header line and separators add to the assembled
/// context: the header, its newline and the blank line before the next one.
pub fn framing_tokens(name: &str) -> u32 {
    estimate_tokens(&document_header(name)) + 1
}

/// Join documents as `header\ncontent`, separated by blank lines
pub fn build_document_context(documents: &[CompressedDocument]) -> String {
    documents
        .iter()
        .map(|doc| format!("{}\n{}", document_header(&doc.name), doc.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Compress `documents` for one chat turn and assemble the context.
///
/// With a query, its keywords are passed to the scorer as priority keywords.
/// Each document's target leaves room for its header, so a batch that is not
/// over-allocated always fits. Fails when the assembled text still exceeds
/// the available window.
pub fn prepare_document_context(
    compressor: &DocumentCompressor,
    documents: &[RawDocument],
    query: Option<&str>,
) -> Result<DocumentContext, ContextError> {
    let keywords = query.map(extract_keywords_from_query).unwrap_or_default();
    if !keywords.is_empty() {
        debug!(keywords = ?keywords, "Biasing compression toward query keywords");
    }

    let compressed = compressor.compress_documents_framed(documents, documents.len(), &keywords, |doc| {
        framing_tokens(&doc.name)
    });
    let text = build_document_context(&compressed);
    let tokens = estimate_tokens(&text);
    let available = compressor.config().available_tokens();

    if tokens > available {
        warn!(tokens, available, documents = documents.len(), "Document context exceeds available window");
        return Err(ContextError::ContextTooLarge {
            required: tokens,
            available,
        });
    }

    Ok(DocumentContext {
        text,
        tokens,
        stats: CompressionStats::from_documents(&compressed),
        documents: compressed,
        keywords,
    })
}
