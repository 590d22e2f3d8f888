//! End-to-end invoice processing: document loading, preprocessing,
//! recognition, line reconstruction and metadata assembly.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use crate::error::{FacturoError, OcrError, PipelineError, PipelineStep, Result};
use crate::invoice::{ExtractionReport, MetadataAssembler};
use crate::models::config::FacturoConfig;
use crate::models::invoice::ExtractedInvoiceMetadata;
use crate::ocr::{
    BackendKind, ImagePreprocessor, LineReconstructor, PagePreprocessor, RawRecognition,
    TextRecognizer, VisionRecognizer,
};
use crate::pdf::DocumentLoader;

/// Scanned-invoice pipeline bound to one recognition backend.
///
/// The backend is resolved when the pipeline is built, so an unknown
/// selector fails before any input is touched. A built pipeline is
/// `Send + Sync` and can be shared across threads.
pub struct OcrPipeline {
    backend: BackendKind,
    recognizer: Box<dyn TextRecognizer>,
    loader: DocumentLoader,
    preprocessor: Box<dyn PagePreprocessor>,
    lines: LineReconstructor,
    assembler: MetadataAssembler,
}

/// Builder for [`OcrPipeline`].
pub struct OcrPipelineBuilder {
    selector: String,
    recognizers: HashMap<BackendKind, Box<dyn TextRecognizer>>,
    preprocessor: Option<Box<dyn PagePreprocessor>>,
    lines: Option<LineReconstructor>,
    assembler: Option<MetadataAssembler>,
}

impl OcrPipelineBuilder {
    pub fn new() -> Self {
        Self {
            selector: BackendKind::CloudVision.as_str().to_string(),
            recognizers: HashMap::new(),
            preprocessor: None,
            lines: None,
            assembler: None,
        }
    }

    /// Select the backend by name ("vision", "tesseract", ...).
    pub fn backend(mut self, selector: impl Into<String>) -> Self {
        self.selector = selector.into();
        self
    }

    /// Register the recognizer used when `kind` is selected.
    pub fn with_recognizer(mut self, kind: BackendKind, recognizer: Box<dyn TextRecognizer>) -> Self {
        self.recognizers.insert(kind, recognizer);
        self
    }

    /// Override the page preprocessor.
    pub fn with_preprocessor(mut self, preprocessor: Box<dyn PagePreprocessor>) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    /// Override line grouping settings.
    pub fn with_line_reconstructor(mut self, lines: LineReconstructor) -> Self {
        self.lines = Some(lines);
        self
    }

    /// Override the metadata assembler.
    pub fn with_assembler(mut self, assembler: MetadataAssembler) -> Self {
        self.assembler = Some(assembler);
        self
    }

    /// Build the pipeline.
    ///
    /// Fails with [`FacturoError::UnsupportedBackend`] when the selector names
    /// no known backend, and with [`FacturoError::Config`] when no recognizer
    /// was registered for the selected one.
    pub fn build(mut self) -> Result<OcrPipeline> {
        let backend: BackendKind = self.selector.parse()?;
        let recognizer = self.recognizers.remove(&backend).ok_or_else(|| {
            FacturoError::Config(format!("no recognizer registered for backend {}", backend))
        })?;

        debug!("Built pipeline with {} backend ({})", backend, recognizer.name());

        Ok(OcrPipeline {
            backend,
            recognizer,
            loader: DocumentLoader::new(),
            preprocessor: self
                .preprocessor
                .unwrap_or_else(|| Box::new(ImagePreprocessor::new())),
            lines: self.lines.unwrap_or_default(),
            assembler: self.assembler.unwrap_or_default(),
        })
    }
}

impl Default for OcrPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrPipeline {
    /// Create a new builder.
    pub fn builder() -> OcrPipelineBuilder {
        OcrPipelineBuilder::new()
    }

    /// Build the pipeline described by a configuration.
    pub fn from_config(config: &FacturoConfig) -> Result<Self> {
        let backend: BackendKind = config.ocr.backend.parse()?;
        let recognizer = recognizer_for(backend, config)?;

        Self::builder()
            .backend(backend.as_str())
            .with_recognizer(backend, recognizer)
            .with_preprocessor(Box::new(ImagePreprocessor::from_config(&config.preprocessing)))
            .with_line_reconstructor(
                LineReconstructor::new()
                    .with_min_confidence(config.ocr.min_word_confidence)
                    .with_tolerance(config.ocr.line_tolerance_px),
            )
            .with_assembler(MetadataAssembler::from_config(&config.extraction))
            .build()
    }

    /// Backend this pipeline recognizes text with.
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Extract invoice metadata from image or PDF bytes.
    pub fn process(&self, bytes: &[u8]) -> Result<ExtractedInvoiceMetadata> {
        self.process_report(bytes).map(|report| report.metadata)
    }

    /// Read an invoice file and extract its report.
    ///
    /// A file that cannot be read is [`FacturoError::Io`], outside any
    /// pipeline step.
    pub fn process_file(&self, path: &Path) -> Result<ExtractionReport> {
        let data = std::fs::read(path)?;
        debug!("Read {} bytes from {}", data.len(), path.display());
        self.process_report(&data)
    }

    /// Extract invoice metadata together with strategies and warnings.
    pub fn process_report(&self, bytes: &[u8]) -> Result<ExtractionReport> {
        let start = Instant::now();
        info!("Processing {} bytes with {} backend", bytes.len(), self.backend);

        let page = self
            .loader
            .load(bytes)
            .map_err(|e| self.fail(PipelineStep::LoadDocument, e))?;

        let normalized = self
            .preprocessor
            .preprocess(&page)
            .map_err(|e| self.fail(PipelineStep::Preprocess, e))?;
        debug!("Preprocessed page: {} bytes", normalized.len());

        let recognition = self
            .recognizer
            .recognize(&normalized)
            .map_err(|e| self.fail(PipelineStep::Recognize, e))?;

        let (lines, full_text) = match recognition {
            RawRecognition::Words(words) => {
                debug!("Recognized {} words", words.len());
                let lines = self.lines.reconstruct(&words);
                let text = lines.join("\n");
                (lines, text)
            }
            RawRecognition::Text(text) => {
                let lines = text
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect();
                (lines, text)
            }
        };
        debug!("Reconstructed {} lines", lines.len());

        // Every word dropped below the confidence cutoff counts as no text
        if lines.is_empty() {
            let backend = self.recognizer.name();
            return Err(self.fail(PipelineStep::Recognize, OcrError::NoTextDetected { backend }));
        }

        let mut report = self
            .assembler
            .assemble(&lines, &full_text)
            .map_err(|e| self.fail(PipelineStep::ExtractIssueDate, e))?;
        report.backend = Some(self.backend);
        report.processing_time_ms = start.elapsed().as_millis() as u64;

        info!(
            "Extracted invoice from {:?} in {}ms",
            report.metadata.provider, report.processing_time_ms
        );
        Ok(report)
    }

    fn fail(&self, step: PipelineStep, source: impl Into<crate::error::StageError>) -> FacturoError {
        PipelineError::new(self.backend, step, source).into()
    }
}

fn recognizer_for(backend: BackendKind, config: &FacturoConfig) -> Result<Box<dyn TextRecognizer>> {
    match backend {
        BackendKind::CloudVision => Ok(Box::new(VisionRecognizer::from_config(&config.vision)?)),
        #[cfg(feature = "tesseract")]
        BackendKind::Tesseract => Ok(Box::new(crate::ocr::TesseractRecognizer::from_config(
            &config.tesseract,
        ))),
        #[cfg(not(feature = "tesseract"))]
        BackendKind::Tesseract => Err(FacturoError::UnsupportedBackend(format!(
            "{} (built without the `tesseract` feature)",
            backend
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExtractionError, OcrError, StageError};
    use crate::ocr::RecognizedWord;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedText(&'static str);

    impl TextRecognizer for FixedText {
        fn name(&self) -> &'static str {
            "fixed-text"
        }

        fn recognize(&self, _image_bytes: &[u8]) -> std::result::Result<RawRecognition, OcrError> {
            Ok(RawRecognition::Text(self.0.to_string()))
        }
    }

    struct FixedWords(Vec<RecognizedWord>);

    impl TextRecognizer for FixedWords {
        fn name(&self) -> &'static str {
            "fixed-words"
        }

        fn recognize(&self, _image_bytes: &[u8]) -> std::result::Result<RawRecognition, OcrError> {
            Ok(RawRecognition::Words(self.0.clone()))
        }
    }

    struct Blank;

    impl TextRecognizer for Blank {
        fn name(&self) -> &'static str {
            "blank"
        }

        fn recognize(&self, _image_bytes: &[u8]) -> std::result::Result<RawRecognition, OcrError> {
            Err(OcrError::NoTextDetected { backend: "blank" })
        }
    }

    #[derive(Default)]
    struct CountingPreprocessor {
        calls: Arc<AtomicUsize>,
    }

    impl PagePreprocessor for CountingPreprocessor {
        fn preprocess(&self, image_bytes: &[u8]) -> std::result::Result<Vec<u8>, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(image_bytes.to_vec())
        }
    }

    fn pipeline(backend: &str, recognizer: Box<dyn TextRecognizer>) -> OcrPipeline {
        OcrPipeline::builder()
            .backend(backend)
            .with_recognizer(BackendKind::Tesseract, recognizer)
            .with_preprocessor(Box::new(CountingPreprocessor::default()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_text_backend_end_to_end() {
        let text = "FACTURA #123\nComercial XYZ S.A.\nFecha: 01/03/2024\nPantalla LCD 45.00 2 90.00\nGarantía de 6 meses\n";
        let report = pipeline("tesseract", Box::new(FixedText(text)))
            .process_report(b"page")
            .unwrap();

        assert_eq!(report.backend, Some(BackendKind::Tesseract));
        assert_eq!(report.metadata.provider, "Comercial XYZ S.A.");
        assert_eq!(report.metadata.issue_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(report.lines.len(), 5);
    }

    #[test]
    fn test_word_backend_reconstructs_lines() {
        let words = vec![
            RecognizedWord::new("01/03/2024", 0.95, 120.0, 41.0),
            RecognizedWord::new("Comercial", 0.95, 10.0, 10.0),
            RecognizedWord::new("Fecha:", 0.95, 10.0, 40.0),
            RecognizedWord::new("S.A.", 0.95, 190.0, 12.0),
            RecognizedWord::new("XYZ", 0.95, 100.0, 11.0),
            RecognizedWord::new("borroso", 0.2, 300.0, 10.0),
        ];
        let report = OcrPipeline::builder()
            .with_recognizer(BackendKind::CloudVision, Box::new(FixedWords(words)))
            .with_preprocessor(Box::new(CountingPreprocessor::default()))
            .build()
            .unwrap()
            .process_report(b"page")
            .unwrap();

        assert_eq!(report.lines, vec!["Comercial XYZ S.A.", "Fecha: 01/03/2024"]);
        assert_eq!(report.metadata.title, "Comercial XYZ S.A.");
        assert_eq!(report.backend, Some(BackendKind::CloudVision));
    }

    #[test]
    fn test_missing_date_is_wrapped() {
        let err = pipeline("tesseract", Box::new(FixedText("FACTURA\nComercial XYZ S.A.")))
            .process(b"page")
            .unwrap_err();

        match err {
            FacturoError::Pipeline(PipelineError { backend, step, source }) => {
                assert_eq!(backend, BackendKind::Tesseract);
                assert_eq!(step, PipelineStep::ExtractIssueDate);
                assert!(matches!(source, StageError::Extraction(ExtractionError::DateNotFound)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_recognition_failure_is_wrapped() {
        let err = pipeline("local", Box::new(Blank)).process(b"page").unwrap_err();
        assert!(matches!(
            err,
            FacturoError::Pipeline(PipelineError {
                step: PipelineStep::Recognize,
                source: StageError::Ocr(OcrError::NoTextDetected { .. }),
                ..
            })
        ));
    }

    #[test]
    fn test_low_confidence_page_is_no_text() {
        let words = vec![RecognizedWord::new("01/03/2024", 0.3, 10.0, 10.0)];
        let err = pipeline("tesseract", Box::new(FixedWords(words)))
            .process(b"page")
            .unwrap_err();

        match err {
            FacturoError::Pipeline(PipelineError { step, source, .. }) => {
                assert_eq!(step, PipelineStep::Recognize);
                assert!(matches!(
                    source,
                    StageError::Ocr(OcrError::NoTextDetected { backend: "fixed-words" })
                ));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_blank_text_is_no_text() {
        let err = pipeline("tesseract", Box::new(FixedText("  \n\n ")))
            .process(b"page")
            .unwrap_err();
        assert!(matches!(
            err,
            FacturoError::Pipeline(PipelineError {
                step: PipelineStep::Recognize,
                source: StageError::Ocr(OcrError::NoTextDetected { .. }),
                ..
            })
        ));
    }

    #[test]
    fn test_unreadable_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = pipeline("tesseract", Box::new(FixedText("2024-01-01")))
            .process_file(&dir.path().join("missing.png"))
            .unwrap_err();
        assert!(matches!(err, FacturoError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    }

    #[test]
    fn test_bad_pdf_fails_in_load_step() {
        let err = pipeline("tesseract", Box::new(FixedText("2024-01-01")))
            .process(b"%PDF-1.4 broken")
            .unwrap_err();
        assert!(matches!(
            err,
            FacturoError::Pipeline(PipelineError {
                step: PipelineStep::LoadDocument,
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_backend_rejected_before_preprocessing() {
        let preprocessor = CountingPreprocessor::default();
        let calls = Arc::clone(&preprocessor.calls);

        let result = OcrPipeline::builder()
            .backend("")
            .with_recognizer(BackendKind::Tesseract, Box::new(FixedText("2024-01-01")))
            .with_preprocessor(Box::new(preprocessor))
            .build();

        assert!(matches!(result, Err(FacturoError::UnsupportedBackend(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_selected_backend_needs_recognizer() {
        let result = OcrPipeline::builder()
            .backend("vision")
            .with_recognizer(BackendKind::Tesseract, Box::new(FixedText("2024-01-01")))
            .build();
        assert!(matches!(result, Err(FacturoError::Config(_))));
    }

    #[test]
    fn test_from_config_rejects_unknown_backend() {
        let mut config = FacturoConfig::default();
        config.ocr.backend = "paddle".to_string();
        assert!(matches!(
            OcrPipeline::from_config(&config),
            Err(FacturoError::UnsupportedBackend(_))
        ));
    }

    #[test]
    fn test_pipeline_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OcrPipeline>();
    }
}
