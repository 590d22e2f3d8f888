//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable consulted when no Vision API key is configured.
pub const VISION_API_KEY_ENV: &str = "GOOGLE_VISION_API_KEY";

/// Main configuration for the facturo pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FacturoConfig {
    /// Backend selection and line reconstruction.
    pub ocr: OcrConfig,

    /// Image normalization.
    pub preprocessing: PreprocessConfig,

    /// Cloud vision backend.
    pub vision: VisionConfig,

    /// Local Tesseract backend.
    pub tesseract: TesseractConfig,

    /// Field extraction.
    pub extraction: ExtractionConfig,
}

/// OCR backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Active backend selector ("vision" or "tesseract").
    pub backend: String,

    /// Words below this confidence are dropped before line grouping.
    pub min_word_confidence: f32,

    /// Maximum vertical distance (pixels) between a word and a line anchor.
    pub line_tolerance_px: f32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: "vision".to_string(),
            min_word_confidence: 0.6,
            line_tolerance_px: 10.0,
        }
    }
}

/// Image preprocessing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Width every page is resized to (aspect ratio preserved).
    pub target_width: u32,

    /// Linear contrast multiplier.
    pub contrast: f32,

    /// Linear brightness offset added after the multiplier.
    pub brightness: f32,

    /// Binarization cutoff (0-255).
    pub threshold: u8,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            target_width: 1200,
            contrast: 1.2,
            brightness: -10.0,
            threshold: 128,
        }
    }
}

/// Cloud vision (Google Vision `images:annotate`) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Annotation endpoint.
    pub endpoint: String,

    /// API key. Falls back to the `GOOGLE_VISION_API_KEY` environment variable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Language hints sent with the request.
    pub language_hints: Vec<String>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://vision.googleapis.com/v1/images:annotate".to_string(),
            api_key: None,
            timeout_secs: 60,
            language_hints: vec!["es".to_string()],
        }
    }
}

impl VisionConfig {
    /// Configured API key, or the one from the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(VISION_API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// Local Tesseract configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractConfig {
    /// Directory containing `*.traineddata` (system default when unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tessdata_dir: Option<PathBuf>,

    /// Language model.
    pub language: String,

    /// Page segmentation mode (6 = single uniform block).
    pub page_seg_mode: u8,

    /// Maximum number of concurrently checked-out workers.
    pub max_workers: usize,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            tessdata_dir: None,
            language: "spa".to_string(),
            page_seg_mode: 6,
            max_workers: 4,
        }
    }
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Expiration window (days) when no item states a warranty.
    pub default_warranty_days: u32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            default_warranty_days: crate::models::invoice::DEFAULT_WARRANTY_DAYS,
        }
    }
}

impl FacturoConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
