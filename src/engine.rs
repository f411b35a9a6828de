//! # Recognition Engine
//!
//! The `RecognitionEngine` trait is the seam between the extraction layer
//! and the actual OCR backend, so tests can substitute deterministic mock
//! engines. The production implementation wraps Tesseract through the
//! `leptess` bindings, holding one lazily-created instance behind a mutex
//! and switching the page segmentation mode per call.
//!
//! ## External Dependencies
//!
//! - `leptess`: Rust bindings for Tesseract OCR and Leptonica
//! - `image`: PNG encoding of in-memory buffers for Tesseract ingestion

use image::GrayImage;
use leptess::LepTess;
use std::io::Cursor;
use std::process::Command;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::config::{EngineConfig, PageSegMode};

/// Text recognition backend.
///
/// Implementations must be shareable across worker tasks; recognition is
/// a blocking call and is expected to run on a blocking-capable thread.
pub trait RecognitionEngine: Send + Sync {
    /// Runs recognition over a grayscale image with the given page
    /// segmentation mode and returns the raw recognized text.
    fn recognize(&self, image: &GrayImage, mode: PageSegMode) -> anyhow::Result<String>;

    /// Engine version string (e.g. "5.3.0").
    fn version(&self) -> anyhow::Result<String>;

    /// Language packs available to the engine.
    fn languages(&self) -> anyhow::Result<Vec<String>>;
}

/// Tesseract-backed recognition engine.
///
/// The underlying Tesseract instance is created on first use and reused
/// for subsequent calls; creation takes a few hundred milliseconds while
/// reuse is effectively free. The mutex serializes recognition calls, so
/// concurrent callers queue rather than each paying initialization cost.
pub struct TesseractEngine {
    config: EngineConfig,
    instance: Mutex<Option<LepTess>>,
}

impl TesseractEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            instance: Mutex::new(None),
        }
    }

    /// Runs `f` against the (lazily created) Tesseract instance.
    fn with_instance<T>(
        &self,
        f: impl FnOnce(&mut LepTess) -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        let mut guard = self
            .instance
            .lock()
            .map_err(|_| anyhow::anyhow!("Tesseract instance lock poisoned"))?;

        if guard.is_none() {
            info!(
                "Creating new OCR instance for languages: {}",
                self.config.languages
            );
            let tess = LepTess::new(self.config.tessdata_path.as_deref(), &self.config.languages)
                .map_err(|e| {
                    anyhow::anyhow!("Failed to initialize Tesseract OCR instance: {}", e)
                })?;
            *guard = Some(tess);
        }

        let tess = guard.as_mut().unwrap();
        f(tess)
    }
}

impl RecognitionEngine for TesseractEngine {
    fn recognize(&self, image: &GrayImage, mode: PageSegMode) -> anyhow::Result<String> {
        // Tesseract ingests encoded image bytes, not raw buffers; PNG is
        // lossless so the binary image survives unchanged.
        let mut png_bytes: Vec<u8> = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png_bytes), image::ImageFormat::Png)
            .map_err(|e| anyhow::anyhow!("Failed to encode image for recognition: {}", e))?;

        self.with_instance(|tess| {
            tess.set_variable(leptess::Variable::TesseditPagesegMode, mode.as_str())
                .map_err(|e| anyhow::anyhow!("Failed to set PSM mode: {}", e))?;

            tess.set_image_from_mem(&png_bytes)
                .map_err(|e| anyhow::anyhow!("Failed to load image into Tesseract: {}", e))?;

            let text = tess
                .get_utf8_text()
                .map_err(|e| anyhow::anyhow!("Failed to extract text from image: {}", e))?;

            debug!(
                "Recognition with {} produced {} bytes of text",
                mode.label(),
                text.len()
            );
            Ok(text)
        })
    }

    fn version(&self) -> anyhow::Result<String> {
        // leptess does not expose version introspection; the tesseract CLI
        // prints "tesseract X.Y.Z" as the first line of --version.
        let output = Command::new("tesseract")
            .arg("--version")
            .output()
            .map_err(|e| anyhow::anyhow!("Failed to invoke tesseract --version: {}", e))?;

        // Older builds print the banner to stderr.
        let text = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            String::from_utf8_lossy(&output.stdout).into_owned()
        };

        let first_line = text.lines().next().unwrap_or_default();
        let version = first_line
            .strip_prefix("tesseract")
            .unwrap_or(first_line)
            .trim()
            .to_string();
        if version.is_empty() {
            return Err(anyhow::anyhow!(
                "Could not parse tesseract version from: {:?}",
                first_line
            ));
        }
        Ok(version)
    }

    fn languages(&self) -> anyhow::Result<Vec<String>> {
        let output = Command::new("tesseract")
            .arg("--list-langs")
            .output()
            .map_err(|e| anyhow::anyhow!("Failed to invoke tesseract --list-langs: {}", e))?;

        let text = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            String::from_utf8_lossy(&output.stdout).into_owned()
        };

        // The first line is a "List of available languages ..." header.
        let languages: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with("List of"))
            .map(str::to_string)
            .collect();
        Ok(languages)
    }
}
