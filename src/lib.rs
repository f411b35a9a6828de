//! # SpineScan
//!
//! Text extraction from book spine and cover photographs. Images are
//! normalized through a configurable preprocessing pipeline (thresholding,
//! denoising, morphological refinement, optional deskewing), then read by
//! Tesseract under several page segmentation modes, and every pass's
//! result is aggregated into a JSON report.

pub mod batch;
pub mod config;
pub mod engine;
pub mod errors;
pub mod extraction;
pub mod preprocessing;
pub mod report;

// Re-export types for easier access
pub use config::{EngineConfig, PageSegMode, PipelineConfig};
pub use engine::{RecognitionEngine, TesseractEngine};
pub use errors::{SpineError, SpineResult};
pub use extraction::TextExtractor;
pub use report::{build_report, Report};
