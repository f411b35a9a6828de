//! # Shared Types for Image Preprocessing
//!
//! Shared error and result types used across the preprocessing sub-modules.
//! Every stage consumes one buffer and produces a new one; the result
//! structs carry the output buffer plus stage metadata.

use image::GrayImage;
use std::path::PathBuf;

/// Errors that can occur during image preprocessing operations.
#[derive(Debug, Clone)]
pub enum PreprocessingError {
    /// Malformed buffer or parameter (precondition violation, not a
    /// recoverable runtime condition)
    InvalidInput { message: String },
    /// Image processing operation failed
    ProcessingFailed { message: String },
}

impl std::fmt::Display for PreprocessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreprocessingError::InvalidInput { message } => {
                write!(f, "Invalid input buffer: {}", message)
            }
            PreprocessingError::ProcessingFailed { message } => {
                write!(f, "Image processing failed: {}", message)
            }
        }
    }
}

impl std::error::Error for PreprocessingError {}

/// Types of morphological refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphologicalOperation {
    /// Dilation only (grows foreground to reconnect broken strokes)
    Dilation,
    /// Erosion only (shrinks foreground)
    Erosion,
    /// Dilation followed by erosion (keeps stroke reconnection while
    /// reversing unwanted growth)
    DilateErode,
}

/// Skew estimation strategy. Callers choose one explicitly; there is no
/// implicit fallback between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkewStrategy {
    /// Minimum-area bounding rectangle of foreground pixels
    MinAreaRect,
    /// Median angle of Hough-detected straight lines
    HoughLines,
}

/// Result of a thresholding operation.
#[derive(Debug, Clone)]
pub struct ThresholdedImageResult {
    /// The binary image (samples are exactly 0 or 255)
    pub image: GrayImage,
    /// Global cutoff chosen by the algorithm, where one exists. Adaptive
    /// methods compute a per-pixel cutoff and report `None`.
    pub cutoff: Option<u8>,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Result of a median denoising operation.
#[derive(Debug, Clone)]
pub struct DenoisedImageResult {
    /// The denoised image
    pub image: GrayImage,
    /// Kernel side length used
    pub kernel: u32,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Result of a morphological refinement.
#[derive(Debug, Clone)]
pub struct MorphologicalImageResult {
    /// The refined image
    pub image: GrayImage,
    /// Operation applied
    pub operation: MorphologicalOperation,
    /// Structuring element side length (3 for a 3x3 kernel)
    pub kernel_size: u32,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Result of a deskewing operation.
#[derive(Debug, Clone)]
pub struct DeskewResult {
    /// The (possibly rotated) image
    pub image: GrayImage,
    /// Estimated skew angle in degrees, normalized to (-90, 90]
    pub angle_degrees: f32,
    /// Whether a rotation was actually applied (false for negligible skew)
    pub rotated: bool,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Result of a full pipeline normalization run.
#[derive(Debug, Clone)]
pub struct NormalizedImageResult {
    /// The normalized binary image, ready for recognition
    pub image: GrayImage,
    /// Path the intermediate image was written to (or attempted)
    pub intermediate_path: PathBuf,
    /// Whether the intermediate write succeeded. A failed write is logged
    /// and non-fatal; the in-memory buffer is still usable.
    pub written: bool,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}
