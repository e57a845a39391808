//! Context Budget Module
//!
//! Token estimation and the per-document share of the LLM context window.

pub mod budget;
pub mod tokens;

pub use budget::TokenBudget;
pub use tokens::{char_len, chars_to_tokens, count_tokens, estimate_tokens, CHARS_PER_TOKEN};
