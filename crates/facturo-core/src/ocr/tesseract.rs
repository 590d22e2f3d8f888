//! Local Tesseract backend (via leptess).

use std::path::PathBuf;

use leptess::{LepTess, Variable};
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::TesseractConfig;

use super::{RawRecognition, TextRecognizer, WorkerFactory, WorkerPool};

const BACKEND_NAME: &str = "tesseract";

/// Creates initialized Tesseract engines.
pub struct TesseractWorkerFactory {
    data_path: Option<PathBuf>,
    language: String,
    page_seg_mode: u8,
}

impl TesseractWorkerFactory {
    pub fn from_config(config: &TesseractConfig) -> Self {
        Self {
            data_path: config.tessdata_dir.clone(),
            language: config.language.clone(),
            page_seg_mode: config.page_seg_mode,
        }
    }
}

impl WorkerFactory for TesseractWorkerFactory {
    type Worker = LepTess;

    fn create(&self) -> Result<LepTess, OcrError> {
        let data_path = self
            .data_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());

        let mut engine = LepTess::new(data_path.as_deref(), &self.language).map_err(|e| {
            OcrError::WorkerInit(format!(
                "Tesseract ({}) could not start: {}",
                self.language, e
            ))
        })?;

        engine
            .set_variable(Variable::TesseditPagesegMode, &self.page_seg_mode.to_string())
            .map_err(|e| OcrError::WorkerInit(e.to_string()))?;

        info!("Initialized Tesseract worker ({})", self.language);
        Ok(engine)
    }
}

/// Recognizer backed by a bounded pool of Tesseract engines.
pub struct TesseractRecognizer {
    pool: WorkerPool<TesseractWorkerFactory>,
}

impl TesseractRecognizer {
    pub fn from_config(config: &TesseractConfig) -> Self {
        Self {
            pool: WorkerPool::new(
                TesseractWorkerFactory::from_config(config),
                config.max_workers,
            ),
        }
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn recognize(&self, image_bytes: &[u8]) -> Result<RawRecognition, OcrError> {
        let text = self.pool.run(|engine| {
            engine
                .set_image_from_mem(image_bytes)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            engine
                .get_utf8_text()
                .map_err(|e| OcrError::Recognition(e.to_string()))
        })?;

        debug!("Tesseract returned {} characters", text.len());

        if text.trim().is_empty() {
            return Err(OcrError::NoTextDetected { backend: BACKEND_NAME });
        }

        Ok(RawRecognition::Text(text))
    }
}
