//! Utility functions for full-text normalization and tokenization.

use std::collections::HashSet;

#[cfg(feature = "unicode-normalization")]
use unicode_normalization::UnicodeNormalization;

/// Normalize a string for full-text matching: lowercase, strip diacritics,
/// collapse whitespace.
///
/// - "Café" → "cafe"
/// - "naïve  résumé" → "naive resume"
#[cfg(feature = "unicode-normalization")]
pub fn normalize(value: &str) -> String {
    value
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase and collapse whitespace only.
#[cfg(not(feature = "unicode-normalization"))]
pub fn normalize(value: &str) -> String {
    value
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(feature = "unicode-normalization")]
fn is_combining_mark(c: char) -> bool {
    matches!(c,
        '\u{0300}'..='\u{036F}' |  // Combining Diacritical Marks
        '\u{1AB0}'..='\u{1AFF}' |  // Combining Diacritical Marks Extended
        '\u{1DC0}'..='\u{1DFF}' |  // Combining Diacritical Marks Supplement
        '\u{20D0}'..='\u{20FF}' |  // Combining Diacritical Marks for Symbols
        '\u{FE20}'..='\u{FE2F}'    // Combining Half Marks
    )
}

/// Split text into normalized words at non-alphanumeric boundaries.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(normalize)
        .filter(|word| !word.is_empty())
}

/// Append the tokens of `text` to `terms`, skipping ones already present.
pub fn collect_terms(text: &str, terms: &mut Vec<String>, seen: &mut HashSet<String>) {
    for token in tokenize(text) {
        if seen.insert(token.clone()) {
            terms.push(token);
        }
    }
}
