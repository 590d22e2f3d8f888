//! Error types for the facturo-core library.

use std::fmt;

use thiserror::Error;

use crate::ocr::BackendKind;

/// Main error type for the facturo library.
#[derive(Error, Debug)]
pub enum FacturoError {
    /// The configured backend selector names no known recognizer.
    #[error("unsupported recognition backend: {0:?}")]
    UnsupportedBackend(String),

    /// A recognition backend could not be initialized.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// A pipeline step failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF input.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// The first page carries no decodable raster image.
    #[error("PDF page {0} has no decodable scanned image")]
    NoRaster(u32),
}

/// Errors related to preprocessing and text recognition.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Input bytes could not be interpreted as an image.
    #[error("could not decode image: {0}")]
    ImageDecode(String),

    /// The backend ran but produced no usable text.
    #[error("no text detected by {backend}")]
    NoTextDetected { backend: &'static str },

    /// The backend reported a recognition failure.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// The remote recognition service could not be reached.
    #[error("recognition request failed: {0}")]
    Request(String),

    /// A local recognition worker could not be created.
    #[error("failed to initialize recognition worker: {0}")]
    WorkerInit(String),
}

impl From<image::ImageError> for OcrError {
    fn from(err: image::ImageError) -> Self {
        OcrError::ImageDecode(err.to_string())
    }
}

/// Errors related to invoice field extraction.
///
/// Only the issue date is mandatory; every other field falls back to a default.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// No date-shaped substring exists in the text.
    #[error("no issue date found in text")]
    DateNotFound,

    /// A date-shaped substring matched none of the known formats.
    #[error("could not parse issue date from {value:?}")]
    DateParse { value: String },
}

/// Pipeline step in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    /// Detecting PDF input and pulling its page raster.
    LoadDocument,
    /// Image normalization.
    Preprocess,
    /// Running the recognition backend.
    Recognize,
    /// Issue-date extraction during metadata assembly.
    ExtractIssueDate,
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStep::LoadDocument => "load-document",
            PipelineStep::Preprocess => "preprocess",
            PipelineStep::Recognize => "recognize",
            PipelineStep::ExtractIssueDate => "extract-issue-date",
        };
        f.write_str(name)
    }
}

/// Cause of a pipeline failure.
#[derive(Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// A step failure wrapped with the backend and step it happened in.
#[derive(Error, Debug)]
#[error("{step} failed (backend: {backend}): {source}")]
pub struct PipelineError {
    /// Backend the pipeline was built with.
    pub backend: BackendKind,
    /// Step that failed.
    pub step: PipelineStep,
    /// Original cause.
    #[source]
    pub source: StageError,
}

impl PipelineError {
    pub fn new(backend: BackendKind, step: PipelineStep, source: impl Into<StageError>) -> Self {
        Self {
            backend,
            step,
            source: source.into(),
        }
    }
}

/// Result type for the facturo library.
pub type Result<T> = std::result::Result<T, FacturoError>;
