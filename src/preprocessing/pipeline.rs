//! # Preprocessing Pipeline
//!
//! Runs the full normalization sequence on a decoded image: grayscale
//! conversion, optional deskewing, thresholding, median denoising, and
//! morphological refinement, in that fixed order. The normalized binary
//! image is also written to disk as an inspection artifact; a failed write
//! is logged and non-fatal.

use image::DynamicImage;
use std::path::Path;
use tracing;

use super::deskewing::deskew_image;
use super::filtering::{apply_morphology, denoise};
use super::thresholding::apply_threshold;
use super::types::{NormalizedImageResult, PreprocessingError};
use crate::config::PipelineConfig;

/// Normalizes a decoded image for text recognition.
///
/// Stage order is a fixed contract: grayscale, optional deskew (on the
/// grayscale image, before binarization destroys gradient information),
/// threshold, denoise, morphology. Each stage consumes the previous
/// stage's output buffer; the input image is never mutated.
///
/// The final binary image is written to `intermediate_path` so operators
/// can inspect what the recognition engine actually saw. Write failure
/// does not fail the run; the in-memory buffer is returned either way and
/// `written` records the outcome.
///
/// # Errors
///
/// Propagates `PreprocessingError` from any stage (empty buffers, invalid
/// kernel or window parameters).
pub fn normalize_for_ocr(
    image: &DynamicImage,
    config: &PipelineConfig,
    intermediate_path: &Path,
) -> Result<NormalizedImageResult, PreprocessingError> {
    let start_time = std::time::Instant::now();

    let gray = image.to_luma8();

    let gray = match config.deskew {
        Some(strategy) => deskew_image(gray, strategy)?.image,
        None => gray,
    };

    let thresholded = apply_threshold(&gray, &config.threshold)?;
    let denoised = denoise(&thresholded.image, config.denoise_kernel)?;
    let refined = apply_morphology(&denoised.image, config.morphology)?;

    let written = match refined.image.save(intermediate_path) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                target: "ocr_preprocessing",
                "Failed to write intermediate image to {}: {}",
                intermediate_path.display(),
                e
            );
            false
        }
    };

    let processing_time = start_time.elapsed();

    tracing::info!(
        target: "ocr_preprocessing",
        "Pipeline normalization completed in {}ms: {}x{} -> {}x{}, threshold={:?}, written={}",
        processing_time.as_millis(),
        image.width(),
        image.height(),
        refined.image.width(),
        refined.image.height(),
        config.threshold,
        written
    );

    Ok(NormalizedImageResult {
        image: refined.image,
        intermediate_path: intermediate_path.to_path_buf(),
        written,
        processing_time_ms: processing_time.as_millis() as u32,
    })
}
