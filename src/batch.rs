//! # Batch Directory Processing
//!
//! Runs the full extraction pipeline over every supported image in a
//! directory. Images are independent, so each one is processed on its own
//! blocking task; a failure on one image is logged and recorded as a
//! missing report without aborting the rest of the batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::errors::{SpineError, SpineResult};
use crate::extraction::TextExtractor;
use crate::report::{build_report, Report};

/// File extensions treated as images during directory scans.
pub const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff", "gif"];

/// Whether a path has a supported image extension (case-insensitive).
pub fn is_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let lowered = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&lowered.as_str())
        })
        .unwrap_or(false)
}

/// Output path for an input image's normalized intermediate:
/// `{output_dir}/{stem}-normalized.png`.
pub fn normalized_output_path(image_path: &Path, output_dir: &Path) -> PathBuf {
    let stem = image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    output_dir.join(format!("{}-normalized.png", stem))
}

/// Processes every supported image in `input_dir`, writing normalized
/// intermediates into `output_dir`.
///
/// Recognition is CPU-bound and the engine serializes its calls, so each
/// image runs on a blocking task and results are collected as they finish.
/// Per-image failures are downgraded to a warning and a `None` report;
/// the returned list has one entry per eligible file.
///
/// # Errors
///
/// Returns `SpineError::InvalidInput` only when the directory itself
/// cannot be read.
pub async fn process_directory(
    input_dir: &Path,
    output_dir: &Path,
    config: PipelineConfig,
    extractor: Arc<TextExtractor>,
) -> SpineResult<Vec<(PathBuf, Option<Report>)>> {
    let entries = std::fs::read_dir(input_dir).map_err(|e| {
        SpineError::InvalidInput(format!(
            "cannot read directory {}: {}",
            input_dir.display(),
            e
        ))
    })?;

    let mut image_paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_supported_extension(path))
        .collect();
    image_paths.sort();

    info!(
        "Batch processing {} images from {}",
        image_paths.len(),
        input_dir.display()
    );

    let mut tasks: JoinSet<(PathBuf, Option<Report>)> = JoinSet::new();
    for image_path in image_paths {
        let output_path = normalized_output_path(&image_path, output_dir);
        let config = config.clone();
        let extractor = Arc::clone(&extractor);

        tasks.spawn_blocking(move || {
            let report = match build_report(&image_path, &output_path, &config, &extractor) {
                Ok(report) => report,
                Err(e) => {
                    warn!("Skipping {}: {}", image_path.display(), e);
                    None
                }
            };
            (image_path, report)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(entry) => results.push(entry),
            Err(e) => warn!("Batch worker task failed: {}", e),
        }
    }
    results.sort_by(|a, b| a.0.cmp(&b.0));

    Ok(results)
}
