//! # Image Preprocessing Module
//!
//! This module provides image preprocessing functionality for OCR accuracy
//! improvement on book spine and cover photographs. It includes binary
//! thresholding, noise reduction, morphological refinement, and deskewing.
//!
//! The module is organized into focused sub-modules:
//! - `thresholding`: Binary thresholding (fixed, adaptive, and histogram methods)
//! - `filtering`: Median denoising and morphological operations
//! - `deskewing`: Skew estimation and rotation correction
//! - `pipeline`: The full normalization sequence
//! - `types`: Shared types and error definitions

pub mod deskewing;
pub mod filtering;
pub mod pipeline;
pub mod thresholding;
pub mod types;

// Re-export commonly used types and functions for convenience
pub use types::{
    DenoisedImageResult, DeskewResult, MorphologicalImageResult, MorphologicalOperation,
    NormalizedImageResult, PreprocessingError, SkewStrategy, ThresholdedImageResult,
};

// Re-export main functions from sub-modules
pub use deskewing::{correct_skew, deskew_image, estimate_skew};
pub use filtering::{apply_morphology, denoise};
pub use pipeline::normalize_for_ocr;
pub use thresholding::{apply_threshold, ThresholdMethod};
