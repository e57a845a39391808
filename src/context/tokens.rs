//! Token estimation and counting.
//!
//! Budget math always goes through [`estimate_tokens`] (4 chars per token).
//! [`count_tokens`] gives a real cl100k_base count for reporting only.

use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use tiktoken_rs::{cl100k_base, CoreBPE};

/// Characters per estimated token. Every budget constant is derived from this.
pub const CHARS_PER_TOKEN: usize = 4;

/// Distinct texts whose exact count is remembered
const EXACT_COUNT_CAPACITY: usize = 1_024;

lazy_static! {
    /// Loaded once; `None` when the encoder data cannot be built
    static ref CL100K: Option<CoreBPE> = cl100k_base().ok();
}

static EXACT_COUNTS: RwLock<Option<ExactCountCache>> = RwLock::new(None);

/// Exact counts keyed by text hash, evicting the oldest entry past capacity
struct ExactCountCache {
    counts: HashMap<u64, u32>,
    order: VecDeque<u64>,
    capacity: usize,
}

impl ExactCountCache {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            counts: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    fn lookup(&self, text_hash: u64) -> Option<u32> {
        self.counts.get(&text_hash).copied()
    }

    fn remember(&mut self, text_hash: u64, count: u32) {
        if self.counts.insert(text_hash, count).is_some() {
            return;
        }
        self.order.push_back(text_hash);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.counts.remove(&oldest);
            }
        }
    }
}

fn text_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Length in Unicode scalar values
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Estimate tokens as `ceil(chars / 4)`. Empty text is 0 tokens.
pub fn estimate_tokens(text: &str) -> u32 {
    chars_to_tokens(char_len(text))
}

/// Token estimate for a known character count
pub fn chars_to_tokens(chars: usize) -> u32 {
    chars.div_ceil(CHARS_PER_TOKEN) as u32
}

/// Count cl100k_base tokens, cached by content hash.
///
/// Falls back to [`estimate_tokens`] when the encoder cannot be loaded.
pub fn count_tokens(text: &str) -> u32 {
    if text.is_empty() {
        return 0;
    }

    let Some(bpe) = CL100K.as_ref() else {
        return estimate_tokens(text);
    };

    let key = text_hash(text);
    if let Some(count) = EXACT_COUNTS.read().as_ref().and_then(|c| c.lookup(key)) {
        return count;
    }

    let count = bpe.encode_with_special_tokens(text).len() as u32;
    EXACT_COUNTS
        .write()
        .get_or_insert_with(|| ExactCountCache::with_capacity(EXACT_COUNT_CAPACITY))
        .remember(key, count);

    count
}
