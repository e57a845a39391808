//! Token Budget Allocation
//!
//! Splits the document share of the context window evenly across documents,
//! with a per-document floor.

use serde::{Deserialize, Serialize};

use crate::config::ContextConfig;

/// Per-document allocation for one compression batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBudget {
    /// Window left after system, history and response reservations
    pub available_tokens: u32,
    pub total_docs: u32,
    /// Even share before the floor is applied
    pub tokens_per_doc: u32,
    /// `max(min_tokens_per_doc, tokens_per_doc)`
    pub allocated_per_doc: u32,
}

impl TokenBudget {
    /// Derive the allocation for `total_docs` documents. Zero is treated as one.
    pub fn from_config(config: &ContextConfig, total_docs: usize) -> Self {
        let total_docs = total_docs.max(1) as u32;
        let available_tokens = config.available_tokens();
        let tokens_per_doc = available_tokens / total_docs;

        Self {
            available_tokens,
            total_docs,
            tokens_per_doc,
            allocated_per_doc: tokens_per_doc.max(config.min_tokens_per_doc),
        }
    }

    /// Sum of every document's allocation
    pub fn aggregate_allocation(&self) -> u64 {
        self.allocated_per_doc as u64 * self.total_docs as u64
    }

    /// The per-document floor pushed the aggregate past the available window.
    /// Accepted; the caller must cap the assembled context.
    pub fn is_over_allocated(&self) -> bool {
        self.aggregate_allocation() > self.available_tokens as u64
    }
}
