//! Output formatting shared by `process`, `batch` and `parse`.

use std::fmt::Write as _;

use facturo_core::{ExtractedInvoiceMetadata, ExtractionReport};

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output, one row per line item
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    /// File extension for outputs written to a directory.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

/// Render a report. `full` keeps strategies and warnings in JSON output.
pub fn format_report(report: &ExtractionReport, format: OutputFormat, full: bool) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json if full => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&report.metadata)?),
        OutputFormat::Csv => format_csv(&report.metadata),
        OutputFormat::Text => Ok(format_text(report, full)),
    }
}

fn format_csv(metadata: &ExtractedInvoiceMetadata) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "title",
        "provider",
        "issue_date",
        "expiration_date",
        "item_description",
        "item_code",
        "quantity",
        "unit_price",
        "total",
        "warranty_days",
        "warranty_valid_until",
    ])?;

    let invoice = [
        metadata.title.clone(),
        metadata.provider.clone(),
        metadata.issue_date.to_string(),
        metadata.expiration_date.to_string(),
    ];

    if metadata.items.is_empty() {
        let mut row = invoice.to_vec();
        row.resize(11, String::new());
        wtr.write_record(&row)?;
    }

    for item in &metadata.items {
        let mut row = invoice.to_vec();
        row.extend([
            item.description.clone(),
            item.code.clone().unwrap_or_default(),
            item.quantity.to_string(),
            item.unit_price.to_string(),
            item.total.to_string(),
            item.warranty_duration_days.map(|d| d.to_string()).unwrap_or_default(),
            item.warranty_valid_until.map(|d| d.to_string()).unwrap_or_default(),
        ]);
        wtr.write_record(&row)?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(report: &ExtractionReport, full: bool) -> String {
    let metadata = &report.metadata;
    let mut output = String::new();

    let _ = writeln!(output, "Title:    {}", metadata.title);
    let _ = writeln!(output, "Provider: {}", metadata.provider);
    let _ = writeln!(output, "Issued:   {}", metadata.issue_date);
    let _ = writeln!(output, "Expires:  {}", metadata.expiration_date);
    match (metadata.warranty_duration_days, metadata.warranty_valid_until) {
        (Some(days), Some(until)) => {
            let _ = writeln!(output, "Warranty: {} days (until {})", days, until);
        }
        _ => output.push_str("Warranty: none stated\n"),
    }
    output.push('\n');

    let _ = writeln!(output, "Items ({}):", metadata.items.len());
    for (i, item) in metadata.items.iter().enumerate() {
        let _ = write!(
            output,
            "  {}. {}  {} x {} = {}",
            i + 1,
            item.description,
            item.quantity,
            item.unit_price,
            item.total
        );
        match (item.warranty_duration_days, item.warranty_valid_until) {
            (Some(days), Some(until)) if days > 0 => {
                let _ = writeln!(output, "  ({} days, until {})", days, until);
            }
            _ => output.push('\n'),
        }
    }

    if full {
        if let Some(backend) = report.backend {
            let _ = writeln!(output, "\nBackend: {}", backend);
        }
        if !report.warnings.is_empty() {
            output.push_str("\nWarnings:\n");
            for warning in &report.warnings {
                let _ = writeln!(output, "  - {}", warning);
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use facturo_core::MetadataAssembler;

    fn report() -> ExtractionReport {
        MetadataAssembler::new()
            .assemble_text("Comercial XYZ S.A.\nFecha: 01/03/2024\nPantalla LCD 45.00 2 90.00\nGarantía de 6 meses")
            .unwrap()
    }

    #[test]
    fn test_csv_has_row_per_item() {
        let csv = format_report(&report(), OutputFormat::Csv, false).unwrap();
        let rows: Vec<&str> = csv.lines().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[1].starts_with("Comercial XYZ S.A.,Comercial XYZ S.A.,2024-03-01,2024-08-28,Pantalla LCD,,2,45.00,90.00,180,2024-08-28"));
    }

    #[test]
    fn test_json_without_report_is_metadata_only() {
        let json = format_report(&report(), OutputFormat::Json, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["provider"], "Comercial XYZ S.A.");
        assert!(value.get("strategies").is_none());
    }

    #[test]
    fn test_text_summary() {
        let text = format_report(&report(), OutputFormat::Text, true).unwrap();
        assert!(text.contains("Warranty: 180 days (until 2024-08-28)"));
        assert!(text.contains("1. Pantalla LCD  2 x 45.00 = 90.00  (180 days, until 2024-08-28)"));
    }
}
