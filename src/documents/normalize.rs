//! Text cleanup applied before a document is split for compression.

use unicode_normalization::UnicodeNormalization;

fn is_non_breaking_space(c: char) -> bool {
    matches!(c, '\u{00A0}' | '\u{2007}' | '\u{202F}')
}

/// Zero-width, bidi and other invisible format/control characters.
/// Tabs and line breaks survive.
fn is_invisible(c: char) -> bool {
    match c {
        '\t' | '\n' | '\r' => false,
        '\u{200B}'..='\u{200F}'
        | '\u{202A}'..='\u{202E}'
        | '\u{2060}'..='\u{2064}'
        | '\u{FEFF}'
        | '\u{00AD}' => true,
        c => c.is_control(),
    }
}

/// NFC-normalize, turn non-breaking spaces into plain spaces and drop
/// invisible characters.
pub fn normalize_text(text: &str) -> String {
    text.nfc()
        .filter(|c| !is_invisible(*c))
        .map(|c| if is_non_breaking_space(c) { ' ' } else { c })
        .collect()
}
