//! Common regex patterns for Spanish invoice extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Document titles
    pub static ref TITLE_KEYWORD: Regex = Regex::new(
        r"(?i)\b(?:factura|boleta|recibo|comprobante|nota\s+de\s+venta|ticket|proforma|cotizaci[oó]n)\b"
    ).unwrap();

    /// A title keyword followed only by a document number ("FACTURA #123", "Factura N° 001-123").
    pub static ref INVOICE_NUMBER_LINE: Regex = Regex::new(
        r"(?i)^(?:factura|boleta|recibo|comprobante|nota\s+de\s+venta|ticket|proforma|cotizaci[oó]n)\s*(?:electr[oó]nica\s*)?(?:#|n[°ºo]\.?|nro\.?|no\.?|n[uú]mero)?\s*[:#]?\s*[\w\-/]*\d[\w\-/]*$"
    ).unwrap();

    // Legal-entity suffixes (S.A., S.L., S.R.L., Ltda., ...)
    pub static ref LEGAL_SUFFIX: Regex = Regex::new(
        r"(?i)(?:^|\s)(?:S\.?\s?A\.?\s?C\.?|S\.?\s?A\.?\s?S\.?|S\.?\s?R\.?\s?L\.?|E\.?\s?I\.?\s?R\.?\s?L\.?|S\.\s?L\.?|S\.?\s?A\.?|Ltda\.?|C\.\s?A\.?|C[ií]a\.?|Inc\.?|LLC)(?:\s|,|;|$)"
    ).unwrap();

    /// An issuer label followed by `:` or `-` ("Razón social: ...").
    pub static ref PROVIDER_LABEL: Regex = Regex::new(
        r"(?i)^(?:raz[oó]n\s+social|nombre\s+del\s+emisor|proveedor|emisor|vendedor|empresa)\s*[:\-]\s*(.*)$"
    ).unwrap();

    // Dates: ISO first so "2024-03-01" is not read as day-month-year
    pub static ref DATE_CANDIDATE: Regex = Regex::new(
        r"\b(?P<iso>\d{4}-\d{1,2}-\d{1,2})\b|\b(?P<dmy>\d{1,2}[/\-.]\d{1,2}[/\-.](?P<year>\d{4}|\d{2}))\b"
    ).unwrap();

    // Warranty terms
    pub static ref WARRANTY_KEYWORD: Regex = Regex::new(
        r"(?i)\b(?:garant[ií]as?|validez|vigencia|cobertura)\b"
    ).unwrap();

    pub static ref WARRANTY_PHRASE: Regex = Regex::new(
        r"(?i)\b(?:garant[ií]as?|validez|vigencia|cobertura)\b[^\d\n]{0,30}?(\d+)\s*(d[ií]as?|mes(?:es)?|a[ñn]os?)\b"
    ).unwrap();

    pub static ref DURATION: Regex = Regex::new(
        r"(?i)\b(\d+)\s*(d[ií]as?|mes(?:es)?|a[ñn]os?)\b"
    ).unwrap();

    /// A line holding only a duration, optionally labeled ("Plazo: 12 meses").
    pub static ref DURATION_LINE: Regex = Regex::new(
        r"(?i)^(?:[^\d:\n]{1,20}[:\-]\s*)?(\d+)\s*(d[ií]as?|mes(?:es)?|a[ñn]os?)\b[.\s]*$"
    ).unwrap();

    // Line items
    /// `description price qty total`
    pub static ref ITEM_CLASSIC: Regex = Regex::new(
        r"^(.+?)\s+(?:S/\.?|\$|€)?\s*(\d+(?:[.,]\d{3})*[.,]\d{2})\s+(\d+)\s+(?:S/\.?|\$|€)?\s*(\d+(?:[.,]\d{3})*[.,]\d{2})$"
    ).unwrap();

    /// `qty CODE description price total`
    pub static ref ITEM_STRUCTURED: Regex = Regex::new(
        r"^(\d+)\s+([A-Za-z0-9][A-Za-z0-9\-_/]*)\s+(.+?)\s+(?:S/\.?|\$|€)?\s*(\d+(?:[.,]\d+)*)\s+(?:S/\.?|\$|€)?\s*(\d+(?:[.,]\d+)*)$"
    ).unwrap();

    pub static ref DECIMAL_SPACING: Regex = Regex::new(
        r"(\d)\s*([.,])\s*(\d)"
    ).unwrap();

    pub static ref PRODUCT_CATEGORY: Regex = Regex::new(
        r"(?i)\b(?:pantalla|monitor|laptop|port[aá]til|computadora|impresora|televisor|celular|tel[eé]fono|tablet|teclado|mouse|disco|memoria|bater[ií]a|cargador|refrigeradora?|lavadora|microondas|aire\s+acondicionado|equipo|repuesto|servicio|reparaci[oó]n|mantenimiento|instalaci[oó]n)\b"
    ).unwrap();

    /// Summary rows that look like items but are totals.
    pub static ref SUMMARY_ROW: Regex = Regex::new(
        r"(?i)^(?:sub\s*total|total|igv|iva|importe|descuento|op\.?\s+gravada)\b"
    ).unwrap();
}
