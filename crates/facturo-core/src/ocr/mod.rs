//! Text recognition: page normalization, recognition backends and line
//! reconstruction.

mod lines;
mod pool;
mod preprocessing;
mod recognizer;
#[cfg(feature = "tesseract")]
mod tesseract;
mod vision;

pub use lines::LineReconstructor;
pub use pool::{WorkerFactory, WorkerPool};
pub use preprocessing::{ImagePreprocessor, PagePreprocessor};
pub use recognizer::TextRecognizer;
#[cfg(feature = "tesseract")]
pub use tesseract::{TesseractRecognizer, TesseractWorkerFactory};
pub use vision::{words_from_response, AnnotateResponse, VisionRecognizer};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FacturoError;

/// A word recognized by a position-aware backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedWord {
    /// Word text.
    pub text: String,

    /// Recognition confidence (0.0 - 1.0).
    pub confidence: f32,

    /// Left edge of the word's first vertex.
    pub x: f32,

    /// Top edge of the word's first vertex.
    pub y: f32,
}

impl RecognizedWord {
    pub fn new(text: impl Into<String>, confidence: f32, x: f32, y: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
            x,
            y,
        }
    }
}

/// Raw output of a recognition backend.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecognition {
    /// Plain text that already carries line breaks.
    Text(String),
    /// Positioned words that still need grouping into lines.
    Words(Vec<RecognizedWord>),
}

/// Recognition backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Remote document text detection (Google Cloud Vision).
    #[serde(rename = "vision")]
    CloudVision,
    /// Local Tesseract engine.
    Tesseract,
}

impl BackendKind {
    /// Canonical selector name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::CloudVision => "vision",
            BackendKind::Tesseract => "tesseract",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = FacturoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vision" | "google-vision" | "cloud" => Ok(BackendKind::CloudVision),
            "tesseract" | "local" => Ok(BackendKind::Tesseract),
            _ => Err(FacturoError::UnsupportedBackend(s.to_string())),
        }
    }
}
