//! # Extraction Report
//!
//! Assembles the per-image extraction report: image metadata, engine
//! introspection, and the aggregated multi-pass text. A missing input file
//! yields no report (`None`) rather than an error, mirroring how a batch
//! run skips unreadable entries; an unreadable or undecodable file that
//! *does* exist is a real error.

use image::{ColorType, ImageReader};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::errors::{SpineError, SpineResult};
use crate::extraction::TextExtractor;
use crate::preprocessing::normalize_for_ocr;

/// Metadata describing the input image and the recognition engine.
#[derive(Debug, Clone, Serialize)]
pub struct ImageMetadata {
    pub image_path: String,
    /// Container format, uppercase (e.g. "PNG", "JPEG"), or "UNKNOWN"
    pub image_format: String,
    pub image_width: u32,
    pub image_height: u32,
    /// Color layout of the decoded image (e.g. "L", "RGB", "RGBA")
    pub image_mode: String,
    pub engine_version: String,
    pub engine_languages: Vec<String>,
}

/// Recognition results section of the report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportResults {
    /// Aggregated multi-pass text, or `None` when every pass came back
    /// empty
    pub extracted_text: Option<String>,
}

/// Complete extraction report for one image.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ImageMetadata,
    pub results: ReportResults,
}

/// Short color-layout name for a decoded image.
fn color_mode_name(color: ColorType) -> String {
    match color {
        ColorType::L8 | ColorType::L16 => "L".to_string(),
        ColorType::La8 | ColorType::La16 => "LA".to_string(),
        ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => "RGB".to_string(),
        ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => "RGBA".to_string(),
        other => format!("{:?}", other),
    }
}

/// Builds the full extraction report for one image.
///
/// The normalized intermediate image is written to `output_path`. Returns
/// `Ok(None)` when the input file does not exist; when every recognition
/// pass comes back empty the results section carries
/// `extracted_text: None`, as distinct from the embedded error string of
/// a failed engine.
///
/// # Errors
///
/// - `SpineError::Decode` when the file exists but cannot be read or
///   decoded
/// - `SpineError::Engine` when engine introspection fails
/// - `SpineError::InvalidInput` propagated from the preprocessing pipeline
pub fn build_report(
    image_path: &Path,
    output_path: &Path,
    config: &PipelineConfig,
    extractor: &TextExtractor,
) -> SpineResult<Option<Report>> {
    if !image_path.exists() {
        warn!("Input image not found: {}", image_path.display());
        return Ok(None);
    }

    let reader = ImageReader::open(image_path)
        .map_err(|e| SpineError::Decode(format!("{}: {}", image_path.display(), e)))?
        .with_guessed_format()
        .map_err(|e| SpineError::Decode(format!("{}: {}", image_path.display(), e)))?;

    let image_format = reader
        .format()
        .map(|f| format!("{:?}", f).to_uppercase())
        .unwrap_or_else(|| "UNKNOWN".to_string());

    let image = reader
        .decode()
        .map_err(|e| SpineError::Decode(format!("{}: {}", image_path.display(), e)))?;

    let engine = extractor.engine();
    let engine_version = engine
        .version()
        .map_err(|e| SpineError::Engine(e.to_string()))?;
    let engine_languages = engine
        .languages()
        .map_err(|e| SpineError::Engine(e.to_string()))?;

    let metadata = ImageMetadata {
        image_path: image_path.display().to_string(),
        image_format,
        image_width: image.width(),
        image_height: image.height(),
        image_mode: color_mode_name(image.color()),
        engine_version,
        engine_languages,
    };

    let normalized = normalize_for_ocr(&image, config, output_path)?;
    let extracted_text = extractor.extract_text(&normalized.image);

    info!(
        "Extraction report built for {}: {} characters of text",
        image_path.display(),
        extracted_text.as_deref().map_or(0, |t| t.chars().count())
    );

    Ok(Some(Report {
        metadata,
        results: ReportResults { extracted_text },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageSegMode;
    use crate::engine::RecognitionEngine;
    use image::GrayImage;
    use std::sync::Arc;

    struct FixedEngine {
        text: String,
    }

    impl RecognitionEngine for FixedEngine {
        fn recognize(&self, _image: &GrayImage, _mode: PageSegMode) -> anyhow::Result<String> {
            Ok(self.text.clone())
        }

        fn version(&self) -> anyhow::Result<String> {
            Ok("5.0-test".to_string())
        }

        fn languages(&self) -> anyhow::Result<Vec<String>> {
            Ok(vec!["eng".to_string(), "fra".to_string()])
        }
    }

    struct FailingEngine;

    impl RecognitionEngine for FailingEngine {
        fn recognize(&self, _image: &GrayImage, _mode: PageSegMode) -> anyhow::Result<String> {
            Err(anyhow::anyhow!("no text for you"))
        }

        fn version(&self) -> anyhow::Result<String> {
            Ok("5.0-test".to_string())
        }

        fn languages(&self) -> anyhow::Result<Vec<String>> {
            Ok(vec!["eng".to_string()])
        }
    }

    fn extractor_with(engine: Arc<dyn RecognitionEngine>) -> TextExtractor {
        TextExtractor::new(engine, vec![PageSegMode::Auto, PageSegMode::SparseText])
    }

    fn write_test_png(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("spine.png");
        let img = GrayImage::from_pixel(40, 30, image::Luma([200]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_missing_file_yields_no_report() {
        let extractor = extractor_with(Arc::new(FixedEngine {
            text: "x".to_string(),
        }));
        let result = build_report(
            Path::new("/no/such/image.png"),
            Path::new("/tmp/out.png"),
            &PipelineConfig::default(),
            &extractor,
        )
        .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_report_metadata_fields() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_test_png(dir.path());
        let output = dir.path().join("normalized.png");
        let extractor = extractor_with(Arc::new(FixedEngine {
            text: "Moby Dick".to_string(),
        }));

        let report = build_report(&input, &output, &PipelineConfig::default(), &extractor)
            .unwrap()
            .unwrap();

        assert_eq!(report.metadata.image_format, "PNG");
        assert_eq!(report.metadata.image_width, 40);
        assert_eq!(report.metadata.image_height, 30);
        assert_eq!(report.metadata.image_mode, "L");
        assert_eq!(report.metadata.engine_version, "5.0-test");
        assert_eq!(report.metadata.engine_languages, vec!["eng", "fra"]);

        let text = report.results.extracted_text.unwrap();
        assert_eq!(text, "PSM 3: Moby Dick\n\nPSM 11: Moby Dick");
    }

    #[test]
    fn test_textless_image_yields_null_extracted_text() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_test_png(dir.path());
        let output = dir.path().join("normalized.png");
        // Engine runs fine but finds nothing on any pass.
        let extractor = extractor_with(Arc::new(FixedEngine {
            text: String::new(),
        }));

        let report = build_report(&input, &output, &PipelineConfig::default(), &extractor)
            .unwrap()
            .unwrap();

        assert!(report.results.extracted_text.is_none());

        let json: serde_json::Value =
            serde_json::to_value(&report).unwrap();
        assert!(json["results"]["extracted_text"].is_null());
    }

    #[test]
    fn test_engine_failure_becomes_error_text_not_report_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_test_png(dir.path());
        let output = dir.path().join("normalized.png");
        let extractor = extractor_with(Arc::new(FailingEngine));

        let report = build_report(&input, &output, &PipelineConfig::default(), &extractor)
            .unwrap()
            .unwrap();

        let text = report.results.extracted_text.unwrap();
        assert!(text.starts_with("Error during OCR: "));
    }

    #[test]
    fn test_report_serializes_to_expected_shape() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_test_png(dir.path());
        let output = dir.path().join("normalized.png");
        let extractor = extractor_with(Arc::new(FixedEngine {
            text: "Dune".to_string(),
        }));

        let report = build_report(&input, &output, &PipelineConfig::default(), &extractor)
            .unwrap()
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&serde_json::to_string(&report).unwrap())
            .unwrap();

        assert!(json["metadata"]["image_path"].is_string());
        assert_eq!(json["metadata"]["image_format"], "PNG");
        assert!(json["results"]["extracted_text"].is_string());
    }
}
