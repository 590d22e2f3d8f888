//! Issuer (provider) extraction.

use crate::models::invoice::DEFAULT_PROVIDER;

use super::patterns::PROVIDER_LABEL;
use super::title::legal_suffix_line;
use super::{first_match, ExtractionMatch, Strategy};

const PROVIDER_STRATEGIES: [Strategy<[String], String>; 2] = [
    Strategy::new("issuer-label", labeled_issuer),
    Strategy::new("legal-suffix", legal_suffix_line),
];

/// Extract the issuing company from reconstructed lines.
pub fn extract_provider(lines: &[String]) -> ExtractionMatch<String> {
    first_match(&PROVIDER_STRATEGIES, lines)
        .unwrap_or_else(|| ExtractionMatch::fallback(DEFAULT_PROVIDER.to_string()))
}

fn labeled_issuer(lines: &[String]) -> Option<(String, String)> {
    lines.iter().map(|l| l.trim()).find_map(|line| {
        let caps = PROVIDER_LABEL.captures(line)?;
        let name = caps[1]
            .trim()
            .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '–' | '—' | ':' | '|' | ',' | ';'))
            .to_string();
        (!name.is_empty()).then(|| (name, line.to_string()))
    })
}
