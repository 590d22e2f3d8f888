//! Metadata assembly from recognized text.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::config::ExtractionConfig;
use crate::models::invoice::{ExtractedInvoiceMetadata, DEFAULT_WARRANTY_DAYS};
use crate::ocr::BackendKind;

use super::rules::{
    extract_issue_date, extract_items, extract_provider, extract_title, extract_warranty,
    items::expiration_with_default,
};
use super::Result;

/// Result of metadata assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// Extracted metadata.
    pub metadata: ExtractedInvoiceMetadata,
    /// Backend that recognized the text, when it came from an image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendKind>,
    /// Lines the extractors ran on.
    pub lines: Vec<String>,
    /// Strategy that produced each field.
    pub strategies: BTreeMap<String, String>,
    /// Fields that fell back to defaults, plus validation issues.
    pub warnings: Vec<String>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Runs every field extractor and derives the expiration date.
#[derive(Debug, Clone)]
pub struct MetadataAssembler {
    default_warranty_days: u32,
}

impl MetadataAssembler {
    pub fn new() -> Self {
        Self {
            default_warranty_days: DEFAULT_WARRANTY_DAYS,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new().with_default_warranty_days(config.default_warranty_days)
    }

    /// Set the expiration window used when no item states a warranty.
    pub fn with_default_warranty_days(mut self, days: u32) -> Self {
        self.default_warranty_days = days;
        self
    }

    /// Assemble metadata from plain text.
    pub fn assemble_text(&self, text: &str) -> Result<ExtractionReport> {
        let lines: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        self.assemble(&lines, text)
    }

    /// Assemble metadata from reconstructed lines and the full text.
    ///
    /// Only a missing or unparseable issue date aborts; every other field
    /// degrades to its default and records a warning.
    pub fn assemble(&self, lines: &[String], full_text: &str) -> Result<ExtractionReport> {
        let start = Instant::now();
        let mut warnings = Vec::new();
        let mut strategies = BTreeMap::new();

        info!("Assembling metadata from {} lines", lines.len());

        let title = extract_title(lines);
        if title.is_fallback() {
            warnings.push("Could not identify title".to_string());
        }
        strategies.insert("title".to_string(), title.strategy.to_string());

        let provider = extract_provider(lines);
        if provider.is_fallback() {
            warnings.push("Could not identify provider".to_string());
        }
        strategies.insert("provider".to_string(), provider.strategy.to_string());

        let issue_date = extract_issue_date(full_text)?;
        strategies.insert("issue_date".to_string(), issue_date.strategy.to_string());
        let issue_date = issue_date.value;

        let found_items = extract_items(lines, issue_date);
        if found_items.is_empty() {
            warnings.push("Could not extract line items".to_string());
        }
        let mut items = Vec::with_capacity(found_items.len());
        for (i, found) in found_items.into_iter().enumerate() {
            strategies.insert(format!("items[{}]", i), found.strategy.to_string());
            items.push(found.value);
        }

        let warranty = extract_warranty(full_text, issue_date);
        match &warranty {
            Some(found) => {
                strategies.insert("warranty".to_string(), found.strategy.to_string());
            }
            None => debug!("No invoice-level warranty stated"),
        }
        let warranty = warranty.map(|m| m.value).unwrap_or_default();

        let expiration_date = expiration_with_default(issue_date, &items, self.default_warranty_days);

        let metadata = ExtractedInvoiceMetadata {
            title: title.value,
            provider: provider.value,
            issue_date,
            expiration_date,
            warranty_duration_days: warranty.duration_days,
            warranty_valid_until: warranty.valid_until,
            items,
        };

        if metadata.max_item_warranty_days().is_none() {
            warnings.push(format!(
                "No item states a warranty; expiration uses the {}-day default",
                self.default_warranty_days
            ));
        }

        warnings.extend(
            metadata
                .validate()
                .into_iter()
                .filter(|issue| !is_reported_fallback(issue)),
        );

        debug!(
            "Assembled {:?} from {:?}: {} items, expires {}",
            metadata.title,
            metadata.provider,
            metadata.items.len(),
            metadata.expiration_date
        );

        Ok(ExtractionReport {
            metadata,
            backend: None,
            lines: lines.to_vec(),
            strategies,
            warnings,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Validation issues already reported as extraction warnings.
fn is_reported_fallback(issue: &str) -> bool {
    matches!(
        issue,
        "Title could not be identified" | "Provider could not be identified" | "No line items"
    )
}

impl Default for MetadataAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractionError;
    use crate::models::invoice::{DEFAULT_PROVIDER, DEFAULT_TITLE};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_assemble_basic_invoice() {
        let text = "FACTURA #123\nComercial XYZ S.A.\nFecha: 01/03/2024\nPantalla LCD 45.00 2 90.00\nGarantía de 6 meses";
        let report = MetadataAssembler::new().assemble_text(text).unwrap();
        let metadata = &report.metadata;

        assert_eq!(metadata.title, "Comercial XYZ S.A.");
        assert_eq!(metadata.provider, "Comercial XYZ S.A.");
        assert_eq!(metadata.issue_date, date(2024, 3, 1));
        assert_eq!(metadata.items.len(), 1);
        assert_eq!(metadata.expiration_date, date(2024, 8, 28));
        assert_eq!(metadata.warranty_duration_days, Some(180));
        assert_eq!(report.strategies["title"], "legal-suffix");
        assert_eq!(report.strategies["items[0]"], "classic");
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn test_missing_date_aborts() {
        let err = MetadataAssembler::new()
            .assemble_text("FACTURA\nComercial XYZ S.A.\nPantalla LCD 45.00 2 90.00")
            .unwrap_err();
        assert_eq!(err, ExtractionError::DateNotFound);
    }

    #[test]
    fn test_degrades_without_items() {
        let report = MetadataAssembler::new()
            .assemble_text("  \n2024-05-10\n\nGracias por su compra\n")
            .unwrap();
        let metadata = &report.metadata;

        assert_eq!(metadata.title, DEFAULT_TITLE);
        assert_eq!(metadata.provider, DEFAULT_PROVIDER);
        assert!(metadata.items.is_empty());
        assert_eq!(metadata.warranty_duration_days, None);
        assert_eq!(metadata.expiration_date, date(2024, 11, 6));
        assert_eq!(report.lines, vec!["2024-05-10", "Gracias por su compra"]);
        assert_eq!(report.warnings.len(), 4);
    }

    #[test]
    fn test_configured_default_window() {
        let report = MetadataAssembler::new()
            .with_default_warranty_days(30)
            .assemble_text("Fecha 01/03/2024")
            .unwrap();
        assert_eq!(report.metadata.expiration_date, date(2024, 3, 31));
    }
}
