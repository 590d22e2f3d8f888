//! Core library for scanned-invoice OCR processing.
//!
//! This crate provides:
//! - Document loading (image bytes, or the raster of a scanned PDF)
//! - Page normalization and pluggable text recognition (Cloud Vision, Tesseract)
//! - Reading-order line reconstruction from positioned words
//! - Spanish invoice field extraction (title, provider, issue date, items, warranty)
//! - An end-to-end [`OcrPipeline`] with step-tagged errors

pub mod error;
pub mod models;
pub mod pdf;
pub mod ocr;
pub mod invoice;
pub mod pipeline;

pub use error::{ExtractionError, FacturoError, OcrError, PdfError, PipelineError, PipelineStep, Result};
pub use models::config::FacturoConfig;
pub use models::invoice::{ExtractedInvoiceMetadata, InvoiceLineItem, WarrantyTerms};
pub use pdf::DocumentLoader;
pub use ocr::{BackendKind, LineReconstructor, RawRecognition, RecognizedWord, TextRecognizer};
pub use invoice::{ExtractionReport, MetadataAssembler};
pub use pipeline::{OcrPipeline, OcrPipelineBuilder};
