//! Invoice and warranty metadata produced by the extraction pipeline.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Title used when no line looks like an invoice heading or a company name.
pub const DEFAULT_TITLE: &str = "Factura sin título";

/// Provider used when no issuer could be identified.
pub const DEFAULT_PROVIDER: &str = "Proveedor no identificado";

/// Notes attached to line items with no warranty line nearby.
pub const NO_WARRANTY_NOTE: &str = "Sin garantía";

/// Expiration window applied when no item states a warranty.
pub const DEFAULT_WARRANTY_DAYS: u32 = 180;

/// Structured metadata extracted from one scanned invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedInvoiceMetadata {
    /// Document heading (or issuer name when no heading exists).
    pub title: String,

    /// Issuing company.
    pub provider: String,

    /// Date the invoice was issued.
    pub issue_date: NaiveDate,

    /// Warranty expiration, always populated.
    pub expiration_date: NaiveDate,

    /// Invoice-level warranty duration in days.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warranty_duration_days: Option<u32>,

    /// Invoice-level warranty end date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warranty_valid_until: Option<NaiveDate>,

    /// Purchased items in document order.
    #[serde(default)]
    pub items: Vec<InvoiceLineItem>,
}

/// A single purchased item or service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    /// Product/service description.
    pub description: String,

    /// SKU-like product code, when the row carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Quantity.
    pub quantity: Decimal,

    /// Unit price.
    pub unit_price: Decimal,

    /// Line total.
    pub total: Decimal,

    /// Warranty duration in days (0 when none was stated).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warranty_duration_days: Option<u32>,

    /// Warranty end date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warranty_valid_until: Option<NaiveDate>,

    /// Warranty line text, or [`NO_WARRANTY_NOTE`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warranty_notes: Option<String>,
}

/// Warranty duration and end date found in a piece of text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarrantyTerms {
    /// Duration normalized to days.
    pub duration_days: Option<u32>,
    /// Reference date plus the duration.
    pub valid_until: Option<NaiveDate>,
}

impl WarrantyTerms {
    /// Terms for a duration counted from `reference`.
    pub fn from_days(reference: NaiveDate, days: u32) -> Self {
        Self {
            duration_days: Some(days),
            valid_until: Some(add_days(reference, days)),
        }
    }

    /// True when no warranty was stated.
    pub fn is_empty(&self) -> bool {
        self.duration_days.is_none()
    }
}

/// Add whole days to a date, saturating at the calendar maximum.
pub fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}

impl ExtractedInvoiceMetadata {
    /// Validate the metadata and return any consistency issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.title == DEFAULT_TITLE {
            issues.push("Title could not be identified".to_string());
        }

        if self.provider == DEFAULT_PROVIDER {
            issues.push("Provider could not be identified".to_string());
        }

        if self.items.is_empty() {
            issues.push("No line items".to_string());
        }

        if self.expiration_date < self.issue_date {
            issues.push(format!(
                "Expiration date ({}) precedes issue date ({})",
                self.expiration_date, self.issue_date
            ));
        }

        for (i, item) in self.items.iter().enumerate() {
            if item.unit_price.is_zero() {
                continue;
            }
            let expected = item.quantity * item.unit_price;
            if (expected - item.total).abs() > Decimal::new(1, 2) {
                issues.push(format!(
                    "Item {} total ({}) differs from quantity x unit price ({})",
                    i + 1,
                    item.total,
                    expected
                ));
            }
        }

        issues
    }

    /// Longest per-item warranty in days, if any item states one.
    pub fn max_item_warranty_days(&self) -> Option<u32> {
        self.items
            .iter()
            .filter_map(|i| i.warranty_duration_days)
            .filter(|d| *d > 0)
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn item(qty: &str, price: &str, total: &str) -> InvoiceLineItem {
        InvoiceLineItem {
            description: "Pantalla LCD".to_string(),
            code: None,
            quantity: Decimal::from_str(qty).unwrap(),
            unit_price: Decimal::from_str(price).unwrap(),
            total: Decimal::from_str(total).unwrap(),
            warranty_duration_days: Some(0),
            warranty_valid_until: None,
            warranty_notes: Some(NO_WARRANTY_NOTE.to_string()),
        }
    }

    #[test]
    fn test_add_days_crosses_months() {
        assert_eq!(add_days(date(2024, 3, 1), 180), date(2024, 8, 28));
        assert_eq!(add_days(date(2024, 1, 31), 0), date(2024, 1, 31));
    }

    #[test]
    fn test_warranty_terms_from_days() {
        let terms = WarrantyTerms::from_days(date(2024, 1, 1), 365);
        assert_eq!(terms.duration_days, Some(365));
        assert_eq!(terms.valid_until, Some(date(2024, 12, 31)));
        assert!(!terms.is_empty());
        assert!(WarrantyTerms::default().is_empty());
    }

    #[test]
    fn test_validate_flags_inconsistent_totals() {
        let metadata = ExtractedInvoiceMetadata {
            title: "Factura".to_string(),
            provider: "Comercial XYZ S.A.".to_string(),
            issue_date: date(2024, 3, 1),
            expiration_date: date(2024, 8, 28),
            warranty_duration_days: None,
            warranty_valid_until: None,
            items: vec![item("2", "45.00", "90.00"), item("3", "10.00", "31.00")],
        };

        let issues = metadata.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].starts_with("Item 2 total"));
    }

    #[test]
    fn test_validate_flags_defaults() {
        let metadata = ExtractedInvoiceMetadata {
            title: DEFAULT_TITLE.to_string(),
            provider: DEFAULT_PROVIDER.to_string(),
            issue_date: date(2024, 3, 1),
            expiration_date: date(2024, 8, 28),
            warranty_duration_days: None,
            warranty_valid_until: None,
            items: Vec::new(),
        };

        assert_eq!(metadata.validate().len(), 3);
        assert_eq!(metadata.max_item_warranty_days(), None);
    }
}
