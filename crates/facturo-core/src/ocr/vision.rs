//! Google Cloud Vision document text detection backend.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::VisionConfig;

use super::{RawRecognition, RecognizedWord, TextRecognizer};

const BACKEND_NAME: &str = "vision";

/// Remote recognizer calling the `images:annotate` endpoint.
pub struct VisionRecognizer {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    language_hints: Vec<String>,
}

impl VisionRecognizer {
    /// Create a recognizer from configuration.
    ///
    /// Fails when no API key is configured or present in the environment.
    pub fn from_config(config: &VisionConfig) -> Result<Self, OcrError> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            OcrError::WorkerInit(format!(
                "no Vision API key configured (set vision.api_key or {})",
                crate::models::config::VISION_API_KEY_ENV
            ))
        })?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OcrError::WorkerInit(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            language_hints: config.language_hints.clone(),
        })
    }

    fn request_body(&self, image_bytes: &[u8]) -> serde_json::Value {
        json!({
            "requests": [{
                "image": { "content": BASE64.encode(image_bytes) },
                "features": [{ "type": "DOCUMENT_TEXT_DETECTION" }],
                "imageContext": { "languageHints": self.language_hints },
            }]
        })
    }
}

impl TextRecognizer for VisionRecognizer {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn recognize(&self, image_bytes: &[u8]) -> Result<RawRecognition, OcrError> {
        debug!("Sending {} bytes to {}", image_bytes.len(), self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(image_bytes))
            .send()
            .map_err(|e| OcrError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OcrError::Request(format!("HTTP {}: {}", status, body.trim())));
        }

        let parsed: AnnotateResponse = response
            .json()
            .map_err(|e| OcrError::Recognition(format!("invalid response: {}", e)))?;

        let words = words_from_response(&parsed)?;
        info!("Vision returned {} words", words.len());
        Ok(RawRecognition::Words(words))
    }
}

/// Body of an `images:annotate` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnotateResponse {
    #[serde(default)]
    pub responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateImageResponse {
    pub full_text_annotation: Option<TextAnnotation>,
    pub error: Option<Status>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextAnnotation {
    #[serde(default)]
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Paragraph {
    #[serde(default)]
    pub words: Vec<Word>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub bounding_box: Option<BoundingPoly>,
    #[serde(default)]
    pub symbols: Vec<Symbol>,
    #[serde(default)]
    pub confidence: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoundingPoly {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
}

/// Vision omits zero coordinates from vertices.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Vertex {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Symbol {
    #[serde(default)]
    pub text: String,
}

/// Flatten an annotate response into positioned words.
///
/// A word's text is the concatenation of its symbols and its position is the
/// first vertex of its bounding box. Words without text are skipped; an
/// annotation left with no words is [`OcrError::NoTextDetected`].
pub fn words_from_response(response: &AnnotateResponse) -> Result<Vec<RecognizedWord>, OcrError> {
    let first = response
        .responses
        .first()
        .ok_or(OcrError::NoTextDetected { backend: BACKEND_NAME })?;

    if let Some(status) = &first.error {
        return Err(OcrError::Recognition(format!(
            "Vision error {}: {}",
            status.code, status.message
        )));
    }

    let annotation = first
        .full_text_annotation
        .as_ref()
        .ok_or(OcrError::NoTextDetected { backend: BACKEND_NAME })?;

    let words: Vec<RecognizedWord> = annotation
        .pages
        .iter()
        .flat_map(|p| &p.blocks)
        .flat_map(|b| &b.paragraphs)
        .flat_map(|p| &p.words)
        .map(|word| {
            let text: String = word.symbols.iter().map(|s| s.text.as_str()).collect();
            let origin = word
                .bounding_box
                .as_ref()
                .and_then(|b| b.vertices.first().copied())
                .unwrap_or_default();
            RecognizedWord::new(text, word.confidence, origin.x, origin.y)
        })
        .filter(|word| !word.text.trim().is_empty())
        .collect();

    if words.is_empty() {
        return Err(OcrError::NoTextDetected { backend: BACKEND_NAME });
    }

    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FIXTURE: &str = r#"{
      "responses": [{
        "fullTextAnnotation": {
          "pages": [{
            "blocks": [{
              "paragraphs": [{
                "words": [
                  {
                    "boundingBox": { "vertices": [{"x": 10, "y": 12}, {"x": 90, "y": 12}] },
                    "symbols": [{"text": "F"}, {"text": "A"}, {"text": "C"}, {"text": "T"}],
                    "confidence": 0.97
                  },
                  {
                    "boundingBox": { "vertices": [{"y": 40}] },
                    "symbols": [{"text": "1"}, {"text": "2"}],
                    "confidence": 0.4
                  }
                ]
              }]
            }]
          }],
          "text": "FACT\n12"
        }
      }]
    }"#;

    #[test]
    fn test_words_from_response() {
        let response: AnnotateResponse = serde_json::from_str(FIXTURE).unwrap();
        let words = words_from_response(&response).unwrap();

        assert_eq!(
            words,
            vec![
                RecognizedWord::new("FACT", 0.97, 10.0, 12.0),
                RecognizedWord::new("12", 0.4, 0.0, 40.0),
            ]
        );
    }

    #[test]
    fn test_missing_annotation_is_no_text() {
        let response: AnnotateResponse = serde_json::from_str(r#"{"responses": [{}]}"#).unwrap();
        let err = words_from_response(&response).unwrap_err();
        assert!(matches!(err, OcrError::NoTextDetected { backend: "vision" }));

        let empty = AnnotateResponse::default();
        assert!(matches!(
            words_from_response(&empty),
            Err(OcrError::NoTextDetected { .. })
        ));
    }

    #[test]
    fn test_annotation_without_words_is_no_text() {
        let response: AnnotateResponse = serde_json::from_str(
            r#"{"responses": [{"fullTextAnnotation": {"text": ""}}]}"#,
        )
        .unwrap();
        assert!(matches!(
            words_from_response(&response),
            Err(OcrError::NoTextDetected { backend: "vision" })
        ));

        let blank_symbols: AnnotateResponse = serde_json::from_str(
            r#"{"responses": [{"fullTextAnnotation": {"pages": [{"blocks": [{"paragraphs": [{"words": [{"symbols": [{"text": " "}]}]}]}]}]}}]}"#,
        )
        .unwrap();
        assert!(matches!(
            words_from_response(&blank_symbols),
            Err(OcrError::NoTextDetected { .. })
        ));
    }

    #[test]
    fn test_embedded_error_status() {
        let response: AnnotateResponse = serde_json::from_str(
            r#"{"responses": [{"error": {"code": 3, "message": "Bad image data."}}]}"#,
        )
        .unwrap();
        let err = words_from_response(&response).unwrap_err();
        assert!(err.to_string().contains("Bad image data."));
    }

    #[test]
    fn test_request_body_shape() {
        let recognizer = VisionRecognizer::from_config(&VisionConfig {
            api_key: Some("test-key".to_string()),
            ..Default::default()
        })
        .unwrap();

        let body = recognizer.request_body(b"abc");
        assert_eq!(body["requests"][0]["image"]["content"], "YWJj");
        assert_eq!(
            body["requests"][0]["features"][0]["type"],
            "DOCUMENT_TEXT_DETECTION"
        );
    }
}
