//! Document title extraction.

use crate::models::invoice::DEFAULT_TITLE;

use super::patterns::{INVOICE_NUMBER_LINE, LEGAL_SUFFIX, TITLE_KEYWORD};
use super::{first_match, ExtractionMatch, Strategy};

const TITLE_STRATEGIES: [Strategy<[String], String>; 2] = [
    Strategy::new("title-keyword", title_keyword_line),
    Strategy::new("legal-suffix", legal_suffix_line),
];

/// Extract the document title from reconstructed lines.
///
/// Lines that only carry a document number ("FACTURA #123") never become the
/// title; the issuer's company name is preferred over them.
pub fn extract_title(lines: &[String]) -> ExtractionMatch<String> {
    first_match(&TITLE_STRATEGIES, lines)
        .unwrap_or_else(|| ExtractionMatch::fallback(DEFAULT_TITLE.to_string()))
}

fn title_keyword_line(lines: &[String]) -> Option<(String, String)> {
    lines
        .iter()
        .map(|l| l.trim())
        .find(|l| TITLE_KEYWORD.is_match(l) && !INVOICE_NUMBER_LINE.is_match(l))
        .map(|l| (l.to_string(), l.to_string()))
}

/// First line carrying a legal-entity suffix.
pub(crate) fn legal_suffix_line(lines: &[String]) -> Option<(String, String)> {
    lines
        .iter()
        .map(|l| l.trim())
        .find(|l| LEGAL_SUFFIX.is_match(l))
        .map(|l| (l.to_string(), l.to_string()))
}
