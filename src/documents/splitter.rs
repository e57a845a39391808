//! Section Splitting
//!
//! Breaks document text into heading- and paragraph-bounded sections. Every
//! section is a verbatim (trimmed) slice of the input.

use lazy_static::lazy_static;
use regex::Regex;

use crate::context::tokens::{estimate_tokens, CHARS_PER_TOKEN};

lazy_static! {
    /// `#`, `##` or `###` followed by whitespace at a line start
    static ref HEADING_START: Regex = Regex::new(r"(?m)^#{1,3}\s").unwrap();
    /// Blank-line paragraph separator
    static ref PARAGRAPH_BREAK: Regex = Regex::new(r"\r?\n(?:\r?\n)+").unwrap();
}

/// Split `content` into sections, in document order.
///
/// 1. Cut before every markdown heading (the heading stays with its body).
/// 2. Sections estimated above `max_section_tokens` are cut on blank lines.
/// 3. Paragraphs still above the limit are cut into fixed windows.
///
/// Whitespace-only pieces are dropped.
pub fn split_into_sections(content: &str, max_section_tokens: u32) -> Vec<&str> {
    let mut sections = Vec::new();

    for block in split_on_headings(content) {
        if estimate_tokens(block) <= max_section_tokens {
            push_section(&mut sections, block);
            continue;
        }

        for paragraph in PARAGRAPH_BREAK.split(block) {
            if estimate_tokens(paragraph) <= max_section_tokens {
                push_section(&mut sections, paragraph);
            } else {
                for window in split_into_windows(paragraph, max_section_tokens as usize * CHARS_PER_TOKEN) {
                    push_section(&mut sections, window);
                }
            }
        }
    }

    sections
}

fn push_section<'a>(sections: &mut Vec<&'a str>, piece: &'a str) {
    let trimmed = piece.trim();
    if !trimmed.is_empty() {
        sections.push(trimmed);
    }
}

fn split_on_headings(content: &str) -> Vec<&str> {
    let mut boundaries: Vec<usize> = HEADING_START.find_iter(content).map(|m| m.start()).collect();
    if boundaries.first() != Some(&0) {
        boundaries.insert(0, 0);
    }
    boundaries.push(content.len());

    boundaries
        .windows(2)
        .map(|w| &content[w[0]..w[1]])
        .filter(|s| !s.is_empty())
        .collect()
}

/// Cut text with no usable headings or blank lines into pieces of at most
/// `max_chars` characters, preferring a line break, then a sentence end,
/// then any whitespace in the second half of each window.
pub fn split_into_windows(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut windows = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let window_end = match rest.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => byte_idx,
            None => {
                windows.push(rest);
                break;
            }
        };

        let window = &rest[..window_end];
        let half = window.len() / 2;
        let cut = find_cut(window, half).unwrap_or(window_end);

        windows.push(&rest[..cut]);
        rest = &rest[cut..];
    }

    windows
}

/// Byte offset just past the preferred break, if one lies beyond `min`
fn find_cut(window: &str, min: usize) -> Option<usize> {
    let after = |idx: usize| Some(idx + 1).filter(|&cut| cut > min);

    if let Some(cut) = window.rfind('\n').and_then(after) {
        return Some(cut);
    }

    let sentence_end = window
        .char_indices()
        .zip(window.chars().skip(1))
        .filter(|((_, c), next)| matches!(*c, '.' | '!' | '?') && next.is_whitespace())
        .map(|((idx, _), _)| idx)
        .last();
    if let Some(cut) = sentence_end.and_then(after) {
        return Some(cut);
    }

    window
        .char_indices()
        .filter(|(_, c)| c.is_whitespace())
        .map(|(idx, c)| idx + c.len_utf8())
        .last()
        .filter(|&cut| cut > min)
}
