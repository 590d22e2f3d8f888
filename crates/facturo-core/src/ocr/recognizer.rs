//! Recognition backend seam.

use crate::error::OcrError;

use super::RawRecognition;

/// A text recognition backend.
///
/// Implementations receive normalized page image bytes and return either
/// plain text or positioned words. Positioned words are grouped into lines
/// by [`super::LineReconstructor`].
pub trait TextRecognizer: Send + Sync {
    /// Short backend name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Recognize the text on one page.
    fn recognize(&self, image_bytes: &[u8]) -> Result<RawRecognition, OcrError>;
}

impl<R: TextRecognizer + ?Sized> TextRecognizer for Box<R> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn recognize(&self, image_bytes: &[u8]) -> Result<RawRecognition, OcrError> {
        (**self).recognize(image_bytes)
    }
}
