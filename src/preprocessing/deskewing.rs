//! # Image Deskewing Module
//!
//! Skew detection and rotation correction for tilted spine photographs.
//! Two independent estimation strategies are provided: the rotation angle
//! of the minimum-area rectangle enclosing the foreground pixels, and the
//! median angle of Hough-detected straight lines. Correction rotates about
//! the image center with bicubic resampling, replicating edge pixels into
//! the borders so rotation never introduces false foreground.

use image::GrayImage;
use imageproc::edges::canny;
use imageproc::hough::{detect_lines, LineDetectionOptions};
use tracing;

use super::types::{DeskewResult, PreprocessingError, SkewStrategy};

/// Angles below this magnitude are treated as no skew. This is an explicit
/// fast-path policy: sub-degree rotation costs resampling blur for no
/// recognition benefit.
pub const NEGLIGIBLE_SKEW_DEGREES: f32 = 1.0;

/// Intensity below which a pixel counts as foreground (dark text) for the
/// minimum-area-rectangle estimator.
const FOREGROUND_CUTOFF: u8 = 100;

/// Canny thresholds feeding the Hough transform.
const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;

/// Fixed vote threshold for Hough line detection.
const HOUGH_VOTE_THRESHOLD: u32 = 200;

/// Estimates the skew angle of a grayscale image in degrees, normalized to
/// (-90, 90].
///
/// The two strategies have distinct documented fallbacks and are never
/// silently substituted for one another:
/// - `MinAreaRect`: sub-degree corrected angles are reported as 0.
/// - `HoughLines`: when no lines clear the vote threshold the estimate
///   is 0 (a blank page has no skew worth correcting).
///
/// # Errors
///
/// Returns `PreprocessingError::InvalidInput` for an empty buffer.
pub fn estimate_skew(
    image: &GrayImage,
    strategy: SkewStrategy,
) -> Result<f32, PreprocessingError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PreprocessingError::InvalidInput {
            message: format!(
                "empty buffer ({}x{}) passed to skew estimation",
                image.width(),
                image.height()
            ),
        });
    }

    let angle = match strategy {
        SkewStrategy::MinAreaRect => estimate_skew_min_area_rect(image),
        SkewStrategy::HoughLines => estimate_skew_hough(image),
    };

    tracing::debug!(
        target: "ocr_preprocessing",
        "Skew estimation: strategy={:?}, angle={:.2}°",
        strategy,
        angle
    );

    Ok(angle)
}

/// Detects and corrects skew in one step.
pub fn deskew_image(
    image: GrayImage,
    strategy: SkewStrategy,
) -> Result<DeskewResult, PreprocessingError> {
    let start_time = std::time::Instant::now();

    let angle = estimate_skew(&image, strategy)?;
    let rotated = angle.abs() >= NEGLIGIBLE_SKEW_DEGREES;
    let corrected = correct_skew(image, angle);

    let processing_time = start_time.elapsed();

    if rotated {
        tracing::debug!(
            target: "ocr_preprocessing",
            "Deskewing completed in {}ms: corrected {:.2}° skew",
            processing_time.as_millis(),
            angle
        );
    }

    Ok(DeskewResult {
        image: corrected,
        angle_degrees: angle,
        rotated,
        processing_time_ms: processing_time.as_millis() as u32,
    })
}

/// Applies rotation correction for the given estimated angle.
///
/// Below the negligible threshold the buffer is returned unmodified
/// (ownership passes straight through, no copy). Otherwise the image is
/// rotated about its center at unit scale with bicubic resampling, and
/// border pixels uncovered by the rotation replicate the nearest edge
/// pixel rather than being black-filled.
pub fn correct_skew(image: GrayImage, angle_degrees: f32) -> GrayImage {
    if angle_degrees.abs() < NEGLIGIBLE_SKEW_DEGREES {
        return image;
    }
    rotate_about_center_replicate(&image, angle_degrees)
}

/// Strategy A: angle of the minimum-area rectangle enclosing all
/// foreground pixel coordinates.
///
/// The raw rectangle angle is folded into (-90, 0] (the rectangle's axis
/// is ambiguous modulo 90°), then unfolded to the text-line direction:
/// below -45° the measured edge was the perpendicular one, so the
/// corrected angle is 90 + raw; otherwise raw itself. Corrected
/// magnitudes under 1° are negligible and reported as 0.
fn estimate_skew_min_area_rect(image: &GrayImage) -> f32 {
    let mut points: Vec<(f64, f64)> = Vec::new();
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[0] < FOREGROUND_CUTOFF {
            points.push((x as f64, y as f64));
        }
    }
    if points.len() < 3 {
        // Degenerate point set, nothing to align
        return 0.0;
    }

    let raw = min_area_rect_angle(&points);
    let corrected = if raw < -45.0 { 90.0 + raw } else { raw };

    if corrected.abs() < NEGLIGIBLE_SKEW_DEGREES {
        0.0
    } else {
        corrected
    }
}

/// Strategy B: median angle of Hough-detected straight lines.
///
/// Edges are detected first, then lines via a parameter-space voting
/// transform with a fixed vote threshold. Each line's angle parameter is
/// converted to degrees and shifted by -90° to align with the expected
/// horizontal baseline; the median of the per-line angles (robust to
/// outlier lines) is the estimate. No lines detected means zero skew,
/// never an error.
fn estimate_skew_hough(image: &GrayImage) -> f32 {
    let edges = canny(image, CANNY_LOW, CANNY_HIGH);
    let options = LineDetectionOptions {
        vote_threshold: HOUGH_VOTE_THRESHOLD,
        suppression_radius: 8,
    };
    let lines = detect_lines(&edges, options);

    if lines.is_empty() {
        tracing::debug!(
            target: "ocr_preprocessing",
            "No Hough lines above vote threshold; treating skew as zero"
        );
        return 0.0;
    }

    let mut angles: Vec<f32> = lines
        .iter()
        .map(|line| line.angle_in_degrees as f32 - 90.0)
        .collect();
    median(&mut angles)
}

/// Median of a non-empty slice. For an even count, the mean of the two
/// middle values.
fn median(values: &mut [f32]) -> f32 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}

/// Rotation angle in degrees, folded into (-90, 0], of the minimum-area
/// rectangle enclosing the point set.
///
/// Rotating calipers over the convex hull: the minimum-area enclosing
/// rectangle has one side collinear with a hull edge, so every hull edge
/// is tried as the base orientation.
fn min_area_rect_angle(points: &[(f64, f64)]) -> f32 {
    let hull = convex_hull(points);
    if hull.len() < 3 {
        return 0.0;
    }

    let mut best_area = f64::MAX;
    let mut best_angle = 0f64;

    let n = hull.len();
    for i in 0..n {
        let (x1, y1) = hull[i];
        let (x2, y2) = hull[(i + 1) % n];
        let edge_x = x2 - x1;
        let edge_y = y2 - y1;
        let edge_length = (edge_x * edge_x + edge_y * edge_y).sqrt();
        if edge_length < f64::EPSILON {
            continue;
        }

        // Unit edge direction and its perpendicular
        let ux = edge_x / edge_length;
        let uy = edge_y / edge_length;

        let mut min_along = f64::MAX;
        let mut max_along = f64::MIN;
        let mut min_perp = f64::MAX;
        let mut max_perp = f64::MIN;
        for &(px, py) in &hull {
            let along = px * ux + py * uy;
            let perp = -px * uy + py * ux;
            min_along = min_along.min(along);
            max_along = max_along.max(along);
            min_perp = min_perp.min(perp);
            max_perp = max_perp.max(perp);
        }

        let area = (max_along - min_along) * (max_perp - min_perp);
        if area < best_area {
            best_area = area;
            best_angle = edge_y.atan2(edge_x).to_degrees();
        }
    }

    fold_to_quarter_turn(best_angle)
}

/// Folds an arbitrary angle in degrees into (-90, 0]. A rectangle's
/// orientation is ambiguous modulo 90°, so this canonical range matches
/// the normalization contract of the min-area-rect estimator.
fn fold_to_quarter_turn(angle_degrees: f64) -> f32 {
    let mut angle = angle_degrees % 90.0;
    if angle > 0.0 {
        angle -= 90.0;
    }
    angle as f32
}

/// Convex hull by Andrew's monotone chain, counter-clockwise order.
fn convex_hull(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut sorted: Vec<(f64, f64)> = points.to_vec();
    sorted.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    });
    sorted.dedup();
    if sorted.len() < 3 {
        return sorted;
    }

    let cross = |o: (f64, f64), a: (f64, f64), b: (f64, f64)| -> f64 {
        (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
    };

    let mut lower: Vec<(f64, f64)> = Vec::new();
    for &p in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<(f64, f64)> = Vec::new();
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Rotates an image about its center by the given angle (degrees, unit
/// scale) with bicubic resampling. Output dimensions equal input
/// dimensions; uncovered border samples replicate the nearest edge pixel.
fn rotate_about_center_replicate(image: &GrayImage, angle_degrees: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    let theta = angle_degrees.to_radians();
    let (sin_t, cos_t) = theta.sin_cos();
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;

    let mut rotated = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            // Inverse mapping back into the source image
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let src_x = cos_t * dx - sin_t * dy + cx;
            let src_y = sin_t * dx + cos_t * dy + cy;
            let value = bicubic_sample(image, src_x, src_y);
            rotated.put_pixel(x, y, image::Luma([value]));
        }
    }
    rotated
}

/// Bicubic (Catmull-Rom) sample at fractional coordinates, with source
/// coordinates clamped to the image bounds (edge replication).
fn bicubic_sample(image: &GrayImage, x: f32, y: f32) -> u8 {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let mut accumulator = 0f32;
    for j in -1i64..=2 {
        let wy = cubic_weight(fy - j as f32);
        if wy == 0.0 {
            continue;
        }
        for i in -1i64..=2 {
            let wx = cubic_weight(fx - i as f32);
            if wx == 0.0 {
                continue;
            }
            let sample = clamped_pixel(image, x0 as i64 + i, y0 as i64 + j) as f32;
            accumulator += wx * wy * sample;
        }
    }
    accumulator.round().clamp(0.0, 255.0) as u8
}

/// Catmull-Rom cubic kernel (a = -0.5). Weights over a 4-tap window sum
/// to 1.
fn cubic_weight(t: f32) -> f32 {
    const A: f32 = -0.5;
    let t = t.abs();
    if t <= 1.0 {
        (A + 2.0) * t * t * t - (A + 3.0) * t * t + 1.0
    } else if t < 2.0 {
        A * t * t * t - 5.0 * A * t * t + 8.0 * A * t - 4.0 * A
    } else {
        0.0
    }
}

/// Pixel lookup with coordinates clamped to the image bounds.
fn clamped_pixel(image: &GrayImage, x: i64, y: i64) -> u8 {
    let cx = x.clamp(0, image.width() as i64 - 1) as u32;
    let cy = y.clamp(0, image.height() as i64 - 1) as u32;
    image.get_pixel(cx, cy)[0]
}
