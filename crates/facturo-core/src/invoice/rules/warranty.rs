//! Warranty term extraction.

use chrono::NaiveDate;

use crate::models::invoice::WarrantyTerms;

use super::patterns::{DURATION, DURATION_LINE, WARRANTY_KEYWORD, WARRANTY_PHRASE};
use super::{first_match, ExtractionMatch, Strategy};

const WARRANTY_STRATEGIES: [Strategy<str, u32>; 2] = [
    Strategy::new("keyword-duration", keyword_duration),
    Strategy::new("keyword-then-duration", keyword_then_duration),
];

/// Extract a warranty duration from `text` and count it from `reference`.
///
/// Returns `None` when the text states no warranty, which is a valid outcome.
pub fn extract_warranty(text: &str, reference: NaiveDate) -> Option<ExtractionMatch<WarrantyTerms>> {
    let found = first_match(&WARRANTY_STRATEGIES, text)?;
    Some(ExtractionMatch::new(
        WarrantyTerms::from_days(reference, found.value),
        found.strategy,
        found.source,
    ))
}

/// True when the line mentions a warranty at all.
pub fn is_warranty_line(line: &str) -> bool {
    WARRANTY_KEYWORD.is_match(line)
}

fn keyword_duration(text: &str) -> Option<(u32, String)> {
    let caps = WARRANTY_PHRASE.captures(text)?;
    let days = to_days(&caps[1], &caps[2])?;
    Some((days, caps[0].to_string()))
}

/// Keyword present but the duration is further along its line, or alone on
/// the next line. Durations elsewhere on the invoice (delivery times, payment
/// terms) are not warranty terms.
fn keyword_then_duration(text: &str) -> Option<(u32, String)> {
    WARRANTY_KEYWORD.find_iter(text).find_map(|keyword| {
        let rest = &text[keyword.end()..];
        let (same_line, after) = rest.split_once('\n').unwrap_or((rest, ""));

        let caps = DURATION
            .captures(same_line)
            .or_else(|| DURATION_LINE.captures(after.lines().next()?.trim()))?;
        let days = to_days(&caps[1], &caps[2])?;
        Some((days, caps[0].trim().to_string()))
    })
}

/// Normalize a quantity and unit to days (months are 30 days, years 365).
fn to_days(quantity: &str, unit: &str) -> Option<u32> {
    let quantity: u32 = quantity.parse().ok()?;
    let unit = unit.to_lowercase();
    let factor = if unit.starts_with("mes") {
        30
    } else if unit.starts_with('a') {
        365
    } else {
        1
    };
    quantity.checked_mul(factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn days(text: &str) -> Option<u32> {
        extract_warranty(text, date(2024, 1, 1)).and_then(|m| m.value.duration_days)
    }

    #[test]
    fn test_unit_normalization() {
        assert_eq!(days("Garantía: 2 meses"), Some(60));
        assert_eq!(days("GARANTIA 1 AÑO"), Some(365));
        assert_eq!(days("Validez de la oferta 10 días"), Some(10));
        assert_eq!(days("Cobertura por 3 anos"), Some(1095));
        assert_eq!(days("Vigencia 1 mes"), Some(30));
    }

    #[test]
    fn test_valid_until_from_reference() {
        let found = extract_warranty("Garantía de 6 meses", date(2024, 3, 1)).unwrap();
        assert_eq!(found.value.duration_days, Some(180));
        assert_eq!(found.value.valid_until, Some(date(2024, 8, 28)));
        assert_eq!(found.strategy, "keyword-duration");
    }

    #[test]
    fn test_fallback_duration_after_keyword() {
        let text = "Garantía del fabricante, válida solo con este comprobante original.\nPlazo: 12 meses";
        let found = extract_warranty(text, date(2024, 1, 1)).unwrap();
        assert_eq!(found.value.duration_days, Some(360));
        assert_eq!(found.strategy, "keyword-then-duration");
    }

    #[test]
    fn test_fallback_stays_near_keyword() {
        let found = extract_warranty("GARANTÍA del equipo, válida con boleta original, por 2 años", date(2024, 1, 1)).unwrap();
        assert_eq!(found.value.duration_days, Some(730));

        assert!(extract_warranty("Garantía según fabricante\nEntrega en 5 días", date(2024, 3, 1)).is_none());
        assert!(extract_warranty("Garantía según fabricante\nGracias\nPago a 30 días", date(2024, 3, 1)).is_none());
    }

    #[test]
    fn test_no_warranty() {
        assert!(extract_warranty("Pantalla LCD 45.00 2 90.00", date(2024, 1, 1)).is_none());
        assert!(extract_warranty("Entrega en 5 días", date(2024, 1, 1)).is_none());
        assert!(extract_warranty("Garantía según fabricante", date(2024, 1, 1)).is_none());
    }

    #[test]
    fn test_is_warranty_line() {
        assert!(is_warranty_line("Garantía de 6 meses"));
        assert!(is_warranty_line("VIGENCIA"));
        assert!(!is_warranty_line("Pantalla LCD"));
    }
}
