//! # Multi-Pass Text Extraction
//!
//! Book spines defeat any single page-layout assumption, so the extractor
//! runs the recognition engine once per configured page segmentation mode
//! over the same normalized image and keeps every result. The aggregated
//! output labels each block with its mode so downstream consumers can
//! weigh the variants themselves.

use image::GrayImage;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::PageSegMode;
use crate::engine::RecognitionEngine;
use crate::errors::{SpineError, SpineResult};

/// Text recognized under one page segmentation mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeText {
    pub mode: PageSegMode,
    /// Recognized text, whitespace-trimmed. May be empty.
    pub text: String,
}

/// Runs an engine across a fixed sequence of segmentation modes and
/// aggregates the results.
pub struct TextExtractor {
    engine: Arc<dyn RecognitionEngine>,
    modes: Vec<PageSegMode>,
}

impl TextExtractor {
    pub fn new(engine: Arc<dyn RecognitionEngine>, modes: Vec<PageSegMode>) -> Self {
        Self { engine, modes }
    }

    /// Segmentation modes this extractor runs, in execution order.
    pub fn modes(&self) -> &[PageSegMode] {
        &self.modes
    }

    pub fn engine(&self) -> &Arc<dyn RecognitionEngine> {
        &self.engine
    }

    /// Runs every configured mode over the image, in order.
    ///
    /// Each block's text is whitespace-trimmed; empty results are kept so
    /// the output always has one block per mode. The first engine failure
    /// aborts the pass.
    ///
    /// # Errors
    ///
    /// Returns `SpineError::Engine` wrapping the first recognition failure.
    pub fn extract_blocks(&self, image: &GrayImage) -> SpineResult<Vec<ModeText>> {
        let mut blocks = Vec::with_capacity(self.modes.len());
        for &mode in &self.modes {
            let text = self
                .engine
                .recognize(image, mode)
                .map_err(|e| SpineError::Engine(e.to_string()))?;
            let text = text.trim().to_string();
            debug!(
                "Extraction pass {}: {} characters",
                mode.label(),
                text.chars().count()
            );
            blocks.push(ModeText { mode, text });
        }
        Ok(blocks)
    }

    /// Aggregated multi-pass extraction.
    ///
    /// Each block is rendered as "PSM {n}: {text}" and blocks are joined
    /// with a blank line. A recognition failure does not propagate as an
    /// error here: the failure message itself becomes the extraction
    /// output, so a report is always produced for a readable image.
    pub fn extract(&self, image: &GrayImage) -> String {
        match self.extract_blocks(image) {
            Ok(blocks) => render_blocks(&blocks),
            Err(e) => {
                warn!("Text extraction failed: {}", e);
                format!("Error during OCR: {}", e)
            }
        }
    }

    /// Report-facing extraction with empty-result normalization.
    ///
    /// Distinguishes "engine ran but found nothing" from "engine failed":
    /// when every pass came back empty the result is `None` (the mode
    /// labels alone carry no recognized text); otherwise the labeled
    /// aggregate, or the contained error string on engine failure.
    pub fn extract_text(&self, image: &GrayImage) -> Option<String> {
        match self.extract_blocks(image) {
            Ok(blocks) => {
                if blocks.iter().all(|block| block.text.is_empty()) {
                    debug!("All extraction passes came back empty");
                    None
                } else {
                    Some(render_blocks(&blocks))
                }
            }
            Err(e) => {
                warn!("Text extraction failed: {}", e);
                Some(format!("Error during OCR: {}", e))
            }
        }
    }
}

fn render_blocks(blocks: &[ModeText]) -> String {
    blocks
        .iter()
        .map(|block| format!("{}: {}", block.mode.label(), block.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}
