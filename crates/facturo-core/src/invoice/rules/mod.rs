//! Rule-based field extractors for Spanish invoices.
//!
//! Every extractor is an ordered list of named [`Strategy`] values evaluated
//! by [`first_match`]; the first strategy producing a value wins.

pub mod amounts;
pub mod dates;
pub mod items;
pub mod patterns;
pub mod provider;
pub mod title;
pub mod warranty;

pub use amounts::parse_amount;
pub use dates::extract_issue_date;
pub use items::{calculate_expiration_from_items, extract_items};
pub use patterns::*;
pub use provider::extract_provider;
pub use title::extract_title;
pub use warranty::extract_warranty;

use tracing::trace;

/// Strategy name recorded when an extractor fell back to its default value.
pub const DEFAULT_STRATEGY: &str = "default";

/// One named step of an extraction cascade.
pub struct Strategy<I: ?Sized, T> {
    /// Name reported alongside the extracted value.
    pub name: &'static str,
    /// Returns the value and the text it was read from.
    pub run: fn(&I) -> Option<(T, String)>,
}

impl<I: ?Sized, T> Strategy<I, T> {
    pub const fn new(name: &'static str, run: fn(&I) -> Option<(T, String)>) -> Self {
        Self { name, run }
    }
}

/// Evaluate strategies in order and return the first hit.
pub fn first_match<I: ?Sized, T>(strategies: &[Strategy<I, T>], input: &I) -> Option<ExtractionMatch<T>> {
    strategies.iter().find_map(|strategy| {
        let (value, source) = (strategy.run)(input)?;
        trace!("Strategy {} matched {:?}", strategy.name, source);
        Some(ExtractionMatch::new(value, strategy.name, source))
    })
}

/// An extracted value with the strategy that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Name of the strategy that matched.
    pub strategy: &'static str,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, strategy: &'static str, source: impl Into<String>) -> Self {
        Self {
            value,
            strategy,
            source: source.into(),
        }
    }

    /// A default value that no strategy produced.
    pub fn fallback(value: T) -> Self {
        Self::new(value, DEFAULT_STRATEGY, String::new())
    }

    /// True when the value came from the default rather than the text.
    pub fn is_fallback(&self) -> bool {
        self.strategy == DEFAULT_STRATEGY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn starts_with_a(s: &str) -> Option<(char, String)> {
        s.starts_with('a').then(|| ('a', s.to_string()))
    }

    fn any_char(s: &str) -> Option<(char, String)> {
        s.chars().next().map(|c| (c, s.to_string()))
    }

    const CASCADE: [Strategy<str, char>; 2] = [
        Strategy::new("starts-with-a", starts_with_a),
        Strategy::new("any-char", any_char),
    ];

    #[test]
    fn test_first_match_respects_order() {
        let hit = first_match(&CASCADE, "abc").unwrap();
        assert_eq!(hit.strategy, "starts-with-a");

        let hit = first_match(&CASCADE, "xyz").unwrap();
        assert_eq!(hit.strategy, "any-char");
        assert_eq!(hit.value, 'x');

        assert!(first_match(&CASCADE, "").is_none());
    }

    #[test]
    fn test_fallback_flag() {
        assert!(ExtractionMatch::fallback(1).is_fallback());
        assert!(!ExtractionMatch::new(1, "x", "1").is_fallback());
    }
}
