//! Amount parsing for Spanish and English number formats.

use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse an amount written with either `.` or `,` as separators.
///
/// The last separator is the decimal point when one or two digits follow
/// it; every other separator is a thousands separator. Handles `1.234,56`,
/// `1,234.56`, `45,00` and OCR splits such as `1.250.00`.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',' || *c == '-')
        .collect();

    let negative = cleaned.starts_with('-');
    let cleaned = cleaned.trim_start_matches('-');

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = match cleaned.rfind(['.', ',']) {
        Some(pos) => {
            let (int_part, frac_part) = cleaned.split_at(pos);
            let frac_part = &frac_part[1..];
            let int_digits: String = int_part.chars().filter(|c| c.is_ascii_digit()).collect();

            if (1..=2).contains(&frac_part.len()) {
                format!("{}.{}", int_digits, frac_part)
            } else {
                format!("{}{}", int_digits, frac_part)
            }
        }
        None => cleaned.to_string(),
    };

    let amount = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -amount } else { amount })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(parse_amount("45.00"), Some(dec("45.00")));
        assert_eq!(parse_amount("45,00"), Some(dec("45.00")));
        assert_eq!(parse_amount("1.234,56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("1,234.56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("1.250.00"), Some(dec("1250.00")));
        assert_eq!(parse_amount("1.250"), Some(dec("1250")));
        assert_eq!(parse_amount("S/ 90.5"), Some(dec("90.5")));
        assert_eq!(parse_amount("1200"), Some(dec("1200")));
    }

    #[test]
    fn test_parse_amount_rejects_non_numbers() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount(".,"), None);
    }
}
