//! # Pipeline and Engine Configuration
//!
//! This module defines configuration structures for the preprocessing
//! pipeline and the recognition engine, including segmentation modes and
//! validation. All tunables are explicit configuration passed into the
//! pipeline and extractor constructors; nothing is read from ambient state.

use crate::errors::{SpineError, SpineResult};
use crate::preprocessing::types::{MorphologicalOperation, SkewStrategy};
use crate::preprocessing::thresholding::ThresholdMethod;

// Constants for engine configuration
pub const DEFAULT_LANGUAGES: &str = "eng";

/// Default median-filter kernel side length (pixels)
pub const DEFAULT_DENOISE_KERNEL: u32 = 5;

/// Page Segmentation Mode for Tesseract OCR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PageSegMode {
    /// Orientation and script detection (OSD) only
    OsdOnly = 0,
    /// Automatic page segmentation with OSD
    AutoOsd = 1,
    /// Automatic page segmentation, no OSD
    AutoNoOsd = 2,
    /// Fully automatic page segmentation
    #[default]
    Auto = 3,
    /// Assume a single column of text
    SingleColumn = 4,
    /// Assume a single uniform block of vertically aligned text
    SingleBlockVert = 5,
    /// Assume a single uniform block of text
    SingleBlock = 6,
    /// Treat the image as a single text line
    SingleLine = 7,
    /// Treat the image as a single word
    SingleWord = 8,
    /// Treat the image as a single word in a circle
    WordInCircle = 9,
    /// Treat the image as a single character
    SingleChar = 10,
    /// Find as much text as possible in no particular order
    SparseText = 11,
    /// Sparse text with OSD
    SparseTextOsd = 12,
    /// Treat the image as a single text line, bypassing hacks that are Tesseract-specific
    RawLine = 13,
}

impl PageSegMode {
    /// Convert PSM mode to string value for Tesseract
    pub fn as_str(&self) -> &'static str {
        match self {
            PageSegMode::OsdOnly => "0",
            PageSegMode::AutoOsd => "1",
            PageSegMode::AutoNoOsd => "2",
            PageSegMode::Auto => "3",
            PageSegMode::SingleColumn => "4",
            PageSegMode::SingleBlockVert => "5",
            PageSegMode::SingleBlock => "6",
            PageSegMode::SingleLine => "7",
            PageSegMode::SingleWord => "8",
            PageSegMode::WordInCircle => "9",
            PageSegMode::SingleChar => "10",
            PageSegMode::SparseText => "11",
            PageSegMode::SparseTextOsd => "12",
            PageSegMode::RawLine => "13",
        }
    }

    /// Label used to prefix this mode's text block in the aggregated output
    pub fn label(&self) -> String {
        format!("PSM {}", self.as_str())
    }

    /// Segmentation-mode order used for spine extraction by default.
    ///
    /// Auto, single column, single block, sparse text, sparse text with OSD.
    /// Spine photographs vary wildly in layout, so several assumptions are
    /// tried and every result is kept.
    pub fn default_extraction_modes() -> Vec<PageSegMode> {
        vec![
            PageSegMode::Auto,
            PageSegMode::SingleColumn,
            PageSegMode::SingleBlock,
            PageSegMode::SparseText,
            PageSegMode::SparseTextOsd,
        ]
    }
}

/// Configuration for the Tesseract recognition engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// OCR language codes (e.g., "eng", "eng+fra", "deu")
    pub languages: String,
    /// Explicit tessdata directory; `None` uses the system default
    pub tessdata_path: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            languages: DEFAULT_LANGUAGES.to_string(),
            tessdata_path: None,
        }
    }
}

impl EngineConfig {
    /// Validate engine configuration parameters
    pub fn validate(&self) -> SpineResult<()> {
        if self.languages.trim().is_empty() {
            return Err(SpineError::Config(
                "languages cannot be empty".to_string(),
            ));
        }
        if let Some(path) = &self.tessdata_path {
            if path.trim().is_empty() {
                return Err(SpineError::Config(
                    "tessdata_path cannot be an empty string".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Configuration for the preprocessing pipeline.
///
/// The stage *order* (grayscale, optional deskew, threshold, denoise,
/// morphology) is a fixed contract; this struct only selects the parameters
/// of each stage.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Thresholding algorithm and its parameters
    pub threshold: ThresholdMethod,
    /// Median-filter kernel side length (odd, >= 3)
    pub denoise_kernel: u32,
    /// Morphological refinement applied after denoising
    pub morphology: MorphologicalOperation,
    /// Optional skew estimation/correction applied to the grayscale image
    /// before thresholding. `None` disables deskewing.
    pub deskew: Option<SkewStrategy>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: ThresholdMethod::AdaptiveMean {
                window: 11,
                offset: 2.0,
            },
            denoise_kernel: DEFAULT_DENOISE_KERNEL,
            morphology: MorphologicalOperation::Dilation,
            deskew: None,
        }
    }
}

impl PipelineConfig {
    /// Validate pipeline configuration parameters
    pub fn validate(&self) -> SpineResult<()> {
        if self.denoise_kernel < 3 || self.denoise_kernel % 2 == 0 {
            return Err(SpineError::Config(format!(
                "denoise_kernel must be odd and >= 3, got {}",
                self.denoise_kernel
            )));
        }
        match self.threshold {
            ThresholdMethod::AdaptiveMean { window, .. } => {
                if window < 3 || window % 2 == 0 {
                    return Err(SpineError::Config(format!(
                        "adaptive threshold window must be odd and >= 3, got {}",
                        window
                    )));
                }
            }
            ThresholdMethod::Sauvola { window, k } => {
                if window < 3 || window % 2 == 0 {
                    return Err(SpineError::Config(format!(
                        "Sauvola window must be odd and >= 3, got {}",
                        window
                    )));
                }
                if k <= 0.0 {
                    return Err(SpineError::Config(format!(
                        "Sauvola sensitivity k must be positive, got {}",
                        k
                    )));
                }
            }
            ThresholdMethod::Fixed { .. }
            | ThresholdMethod::Otsu
            | ThresholdMethod::Triangle
            | ThresholdMethod::Isodata => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_seg_mode_strings() {
        assert_eq!(PageSegMode::Auto.as_str(), "3");
        assert_eq!(PageSegMode::SingleColumn.as_str(), "4");
        assert_eq!(PageSegMode::SingleBlock.as_str(), "6");
        assert_eq!(PageSegMode::SparseText.as_str(), "11");
        assert_eq!(PageSegMode::SparseTextOsd.as_str(), "12");
        assert_eq!(PageSegMode::Auto.label(), "PSM 3");
    }

    #[test]
    fn test_default_extraction_modes_order() {
        let modes = PageSegMode::default_extraction_modes();
        assert_eq!(
            modes,
            vec![
                PageSegMode::Auto,
                PageSegMode::SingleColumn,
                PageSegMode::SingleBlock,
                PageSegMode::SparseText,
                PageSegMode::SparseTextOsd,
            ]
        );
    }

    #[test]
    fn test_engine_config_validation() {
        assert!(EngineConfig::default().validate().is_ok());

        let empty_langs = EngineConfig {
            languages: "  ".to_string(),
            ..Default::default()
        };
        assert!(empty_langs.validate().is_err());

        let empty_tessdata = EngineConfig {
            tessdata_path: Some(String::new()),
            ..Default::default()
        };
        assert!(empty_tessdata.validate().is_err());
    }

    #[test]
    fn test_pipeline_config_validation() {
        assert!(PipelineConfig::default().validate().is_ok());

        let even_kernel = PipelineConfig {
            denoise_kernel: 4,
            ..Default::default()
        };
        assert!(even_kernel.validate().is_err());

        let even_window = PipelineConfig {
            threshold: ThresholdMethod::AdaptiveMean {
                window: 10,
                offset: 2.0,
            },
            ..Default::default()
        };
        assert!(even_window.validate().is_err());

        let bad_sauvola = PipelineConfig {
            threshold: ThresholdMethod::Sauvola {
                window: 15,
                k: -0.5,
            },
            ..Default::default()
        };
        assert!(bad_sauvola.validate().is_err());
    }
}
