//! Reading-order reconstruction from positioned words.

use std::cmp::Ordering;

use tracing::debug;

use super::RecognizedWord;

/// Groups positioned words into text lines.
///
/// A word joins the first existing line whose anchor (its first accepted word)
/// lies strictly closer than `tolerance_px` on the vertical axis; otherwise it
/// starts a new line. Lines are ordered by anchor position, words within a
/// line by horizontal position.
#[derive(Debug, Clone)]
pub struct LineReconstructor {
    min_confidence: f32,
    tolerance_px: f32,
}

struct LineGroup<'a> {
    anchor_y: f32,
    words: Vec<&'a RecognizedWord>,
}

impl LineReconstructor {
    pub fn new() -> Self {
        Self {
            min_confidence: 0.6,
            tolerance_px: 10.0,
        }
    }

    /// Set the minimum word confidence.
    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Set the vertical grouping tolerance in pixels.
    pub fn with_tolerance(mut self, tolerance_px: f32) -> Self {
        self.tolerance_px = tolerance_px;
        self
    }

    /// Rebuild text lines from words, top to bottom.
    pub fn reconstruct(&self, words: &[RecognizedWord]) -> Vec<String> {
        let mut groups: Vec<LineGroup<'_>> = Vec::new();
        let mut dropped = 0usize;

        for word in words {
            if word.confidence < self.min_confidence {
                dropped += 1;
                continue;
            }

            match groups
                .iter_mut()
                .find(|g| (g.anchor_y - word.y).abs() < self.tolerance_px)
            {
                Some(group) => group.words.push(word),
                None => groups.push(LineGroup {
                    anchor_y: word.y,
                    words: vec![word],
                }),
            }
        }

        debug!(
            "Grouped {} words into {} lines ({} below confidence)",
            words.len() - dropped,
            groups.len(),
            dropped
        );

        groups.sort_by(|a, b| a.anchor_y.partial_cmp(&b.anchor_y).unwrap_or(Ordering::Equal));

        groups
            .into_iter()
            .filter_map(|mut group| {
                group
                    .words
                    .sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
                let line = group
                    .words
                    .iter()
                    .map(|w| w.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                let line = line.trim();
                (!line.is_empty()).then(|| line.to_string())
            })
            .collect()
    }

    /// Rebuild the words into newline-joined text.
    pub fn reconstruct_text(&self, words: &[RecognizedWord]) -> String {
        self.reconstruct(words).join("\n")
    }
}

impl Default for LineReconstructor {
    fn default() -> Self {
        Self::new()
    }
}
