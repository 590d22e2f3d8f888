//! Issue date extraction.

use chrono::NaiveDate;

use crate::error::ExtractionError;

use super::patterns::DATE_CANDIDATE;
use super::ExtractionMatch;

const ISO_FORMATS: &[&str] = &["%Y-%m-%d"];
const DMY_LONG_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];
const DMY_SHORT_FORMATS: &[&str] = &["%d/%m/%y", "%d-%m-%y", "%d.%m.%y"];

/// Find the first date-shaped substring in `text` and parse it.
///
/// Fails with [`ExtractionError::DateNotFound`] when nothing looks like a
/// date, and with [`ExtractionError::DateParse`] when the first candidate
/// matches none of the known formats (mixed separators, day 32, month 13).
pub fn extract_issue_date(text: &str) -> Result<ExtractionMatch<NaiveDate>, ExtractionError> {
    let caps = DATE_CANDIDATE
        .captures(text)
        .ok_or(ExtractionError::DateNotFound)?;

    let (candidate, formats, strategy) = if let Some(iso) = caps.name("iso") {
        (iso.as_str(), ISO_FORMATS, "iso")
    } else if let Some(dmy) = caps.name("dmy") {
        let two_digit_year = caps.name("year").is_some_and(|y| y.as_str().len() == 2);
        if two_digit_year {
            (dmy.as_str(), DMY_SHORT_FORMATS, "day-month-short-year")
        } else {
            (dmy.as_str(), DMY_LONG_FORMATS, "day-month-year")
        }
    } else {
        return Err(ExtractionError::DateNotFound);
    };

    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(candidate, format).ok())
        .map(|date| ExtractionMatch::new(date, strategy, candidate))
        .ok_or_else(|| ExtractionError::DateParse {
            value: candidate.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_extract_date_dmy() {
        let found = extract_issue_date("Fecha: 01/03/2024").unwrap();
        assert_eq!(found.value, date(2024, 3, 1));
        assert_eq!(found.source, "01/03/2024");

        assert_eq!(extract_issue_date("15-01-2024").unwrap().value, date(2024, 1, 15));
        assert_eq!(extract_issue_date("5.1.2024").unwrap().value, date(2024, 1, 5));
    }

    #[test]
    fn test_extract_date_iso() {
        let found = extract_issue_date("Emitido el 2024-01-15 en Lima").unwrap();
        assert_eq!(found.value, date(2024, 1, 15));
        assert_eq!(found.strategy, "iso");
    }

    #[test]
    fn test_two_digit_year() {
        let found = extract_issue_date("Fecha 15.01.24").unwrap();
        assert_eq!(found.value, date(2024, 1, 15));
    }

    #[test]
    fn test_first_date_wins() {
        let text = "Emisión: 10/02/2024\nVencimiento: 10/03/2024";
        assert_eq!(extract_issue_date(text).unwrap().value, date(2024, 2, 10));
    }

    #[test]
    fn test_no_date() {
        let err = extract_issue_date("FACTURA\nComercial XYZ S.A.\nTotal 90.00").unwrap_err();
        assert_eq!(err, ExtractionError::DateNotFound);
    }

    #[test]
    fn test_unparseable_date() {
        let err = extract_issue_date("Fecha: 31/02/2024").unwrap_err();
        assert_eq!(
            err,
            ExtractionError::DateParse {
                value: "31/02/2024".to_string()
            }
        );

        let err = extract_issue_date("Fecha: 01/03-2024").unwrap_err();
        assert!(matches!(err, ExtractionError::DateParse { .. }));
    }
}
