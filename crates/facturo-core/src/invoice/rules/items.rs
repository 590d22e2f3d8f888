//! Line item extraction and item-based expiration.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use crate::models::invoice::{add_days, InvoiceLineItem, DEFAULT_WARRANTY_DAYS, NO_WARRANTY_NOTE};

use super::amounts::parse_amount;
use super::patterns::{
    DECIMAL_SPACING, ITEM_CLASSIC, ITEM_STRUCTURED, LEGAL_SUFFIX, PRODUCT_CATEGORY, SUMMARY_ROW,
};
use super::warranty::{extract_warranty, is_warranty_line};
use super::{first_match, ExtractionMatch, Strategy};

/// Lines scanned after a priced row for its warranty line.
const PRICED_LOOKAHEAD: usize = 3;

/// Lines scanned after a descriptive row for its warranty line.
const DESCRIPTIVE_LOOKAHEAD: usize = 2;

/// Minimum length (in characters) of a descriptive row.
const DESCRIPTIVE_MIN_CHARS: usize = 15;

/// A row under consideration plus the lines after it.
struct RowContext<'a> {
    line: &'a str,
    following: &'a [String],
}

/// A row recognized by one of the item strategies.
#[derive(Debug, Clone, PartialEq)]
struct ParsedRow {
    description: String,
    code: Option<String>,
    quantity: Decimal,
    unit_price: Decimal,
    total: Decimal,
    /// Warranty line already located by the strategy.
    warranty_line: Option<String>,
}

fn row_strategies<'a>() -> [Strategy<RowContext<'a>, ParsedRow>; 3] {
    [
        Strategy::new("classic", classic_row),
        Strategy::new("structured", structured_row),
        Strategy::new("descriptive", descriptive_row),
    ]
}

/// Extract purchased items from reconstructed lines.
///
/// Each line yields at most one item. Items without a nearby warranty line
/// get a zero-day warranty valid until `issue_date` and [`NO_WARRANTY_NOTE`].
pub fn extract_items(lines: &[String], issue_date: NaiveDate) -> Vec<ExtractionMatch<InvoiceLineItem>> {
    let strategies = row_strategies();
    let mut items = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let ctx = RowContext {
            line: line.trim(),
            following: &lines[i + 1..],
        };
        let Some(found) = first_match(&strategies, &ctx) else {
            continue;
        };

        let row = found.value;
        let warranty_line = row
            .warranty_line
            .clone()
            .or_else(|| find_warranty_line(ctx.following, PRICED_LOOKAHEAD));

        let item = match warranty_line {
            Some(warranty_line) => {
                let terms = extract_warranty(&warranty_line, issue_date).map(|m| m.value);
                let days = terms.and_then(|t| t.duration_days).unwrap_or(0);
                let valid_until = terms.and_then(|t| t.valid_until).unwrap_or(issue_date);
                build_item(row, days, valid_until, warranty_line)
            }
            None => build_item(row, 0, issue_date, NO_WARRANTY_NOTE.to_string()),
        };

        debug!(
            "Item via {}: {:?} x{} = {}",
            found.strategy, item.description, item.quantity, item.total
        );
        items.push(ExtractionMatch::new(item, found.strategy, found.source));
    }

    items
}

/// Expiration = issue date + longest positive item warranty, else 180 days.
pub fn calculate_expiration_from_items(issue_date: NaiveDate, items: &[InvoiceLineItem]) -> NaiveDate {
    expiration_with_default(issue_date, items, DEFAULT_WARRANTY_DAYS)
}

/// Like [`calculate_expiration_from_items`] with a configurable default window.
pub fn expiration_with_default(issue_date: NaiveDate, items: &[InvoiceLineItem], default_days: u32) -> NaiveDate {
    let days = items
        .iter()
        .filter_map(|i| i.warranty_duration_days)
        .filter(|d| *d > 0)
        .max()
        .unwrap_or(default_days);
    add_days(issue_date, days)
}

fn build_item(row: ParsedRow, days: u32, valid_until: NaiveDate, notes: String) -> InvoiceLineItem {
    InvoiceLineItem {
        description: row.description,
        code: row.code,
        quantity: row.quantity,
        unit_price: row.unit_price,
        total: row.total,
        warranty_duration_days: Some(days),
        warranty_valid_until: Some(valid_until),
        warranty_notes: Some(notes),
    }
}

fn find_warranty_line(following: &[String], lookahead: usize) -> Option<String> {
    following
        .iter()
        .take(lookahead)
        .map(|l| l.trim())
        .find(|l| is_warranty_line(l))
        .map(str::to_string)
}

/// A product code carries a digit ("LAP-0042") or is an upper-case token
/// ("SKU", "USB-C"). Capitalized words ("Teclado") are descriptions.
fn is_sku_like(code: &str) -> bool {
    code.chars().any(|c| c.is_ascii_digit())
        || (code.chars().filter(char::is_ascii_alphabetic).count() >= 2
            && !code.chars().any(|c| c.is_ascii_lowercase()))
}

fn is_item_description(description: &str) -> bool {
    description.chars().any(char::is_alphabetic) && !SUMMARY_ROW.is_match(description)
}

/// `description price qty total`
fn classic_row(ctx: &RowContext<'_>) -> Option<(ParsedRow, String)> {
    let caps = ITEM_CLASSIC.captures(ctx.line)?;
    let description = caps[1].trim();
    if !is_item_description(description) {
        return None;
    }

    let row = ParsedRow {
        description: description.to_string(),
        code: None,
        unit_price: parse_amount(&caps[2])?,
        quantity: caps[3].parse::<Decimal>().ok()?,
        total: parse_amount(&caps[4])?,
        warranty_line: None,
    };
    Some((row, ctx.line.to_string()))
}

/// `qty CODE description price total`, tolerant of OCR spacing around
/// decimal separators.
fn structured_row(ctx: &RowContext<'_>) -> Option<(ParsedRow, String)> {
    let normalized = DECIMAL_SPACING.replace_all(ctx.line, "$1$2$3");
    let caps = ITEM_STRUCTURED.captures(&normalized)?;

    let code = &caps[2];
    let description = caps[3].trim();
    if !is_sku_like(code) || !is_item_description(description) {
        return None;
    }

    let row = ParsedRow {
        description: description.to_string(),
        code: Some(code.to_string()),
        quantity: caps[1].parse::<Decimal>().ok()?,
        unit_price: parse_amount(&fix_split_price(&caps[4]))?,
        total: parse_amount(&caps[5])?,
        warranty_line: None,
    };
    Some((row, normalized.to_string()))
}

/// Product line without prices that is followed by a warranty line.
///
/// Company names ("Servicio Técnico Andino S.A.C.") are issuer headers, not
/// products.
fn descriptive_row(ctx: &RowContext<'_>) -> Option<(ParsedRow, String)> {
    if ctx.line.chars().count() <= DESCRIPTIVE_MIN_CHARS
        || !PRODUCT_CATEGORY.is_match(ctx.line)
        || is_warranty_line(ctx.line)
        || LEGAL_SUFFIX.is_match(ctx.line)
    {
        return None;
    }

    let warranty_line = find_warranty_line(ctx.following, DESCRIPTIVE_LOOKAHEAD)?;
    let row = ParsedRow {
        description: ctx.line.to_string(),
        code: None,
        quantity: Decimal::ONE,
        unit_price: Decimal::ZERO,
        total: Decimal::ZERO,
        warranty_line: Some(warranty_line),
    };
    Some((row, ctx.line.to_string()))
}

/// Rebuild a price that OCR split into three dot-separated groups
/// (`1.250.00` is 1250.00).
fn fix_split_price(raw: &str) -> String {
    let parts: Vec<&str> = raw.split('.').collect();
    match parts.as_slice() {
        [thousands, hundreds, cents] if cents.len() == 2 => {
            format!("{}{}.{}", thousands, hundreds, cents)
        }
        _ => raw.to_string(),
    }
}
