//! # Image Thresholding Module
//!
//! Binary thresholding for OCR preprocessing. Several competing algorithms
//! with distinct statistical derivations are supported behind a single
//! [`ThresholdMethod`] selector: a fixed cutoff, a local-mean adaptive
//! method, Otsu's variance-optimal global method, the triangle method,
//! iterative isodata convergence, and Sauvola's local mean/deviation
//! method.
//!
//! Every algorithm is a pure function of the input buffer and its own
//! parameters; the output is always the same size as the input and every
//! sample is exactly 0 or 255.

use image::GrayImage;
use tracing;

use super::types::{PreprocessingError, ThresholdedImageResult};

/// Normalizing constant for Sauvola's dynamic-range term.
const SAUVOLA_R: f64 = 128.0;

/// Maximum isodata iterations. Convergence is typically reached within a
/// handful of steps; the bound guards against oscillation on pathological
/// histograms.
const ISODATA_MAX_ITERATIONS: u32 = 100;

/// Thresholding algorithm selector plus algorithm-specific parameters.
///
/// Immutable once constructed; consumed by one [`apply_threshold`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdMethod {
    /// Fixed global cutoff: sample >= cutoff is foreground
    Fixed { cutoff: u8 },
    /// Local mean over an odd square window minus a constant offset
    AdaptiveMean { window: u32, offset: f32 },
    /// Global cutoff maximizing between-class variance
    Otsu,
    /// Histogram-geometric cutoff (peak-to-far-end diagonal)
    Triangle,
    /// Iterative mean-convergence cutoff
    Isodata,
    /// Local mean and standard deviation with sensitivity k
    Sauvola { window: u32, k: f32 },
}

impl Default for ThresholdMethod {
    fn default() -> Self {
        ThresholdMethod::AdaptiveMean {
            window: 11,
            offset: 2.0,
        }
    }
}

/// Applies the selected thresholding algorithm to a grayscale buffer.
///
/// Returns a same-size binary buffer where every sample is 0 or 255,
/// along with the chosen global cutoff where the algorithm has one.
///
/// # Errors
///
/// Returns `PreprocessingError::InvalidInput` for an empty or
/// zero-dimension buffer, or for an even/degenerate window size.
/// Well-formed input never fails.
pub fn apply_threshold(
    image: &GrayImage,
    method: &ThresholdMethod,
) -> Result<ThresholdedImageResult, PreprocessingError> {
    let start_time = std::time::Instant::now();

    validate_buffer(image)?;

    let (binary, cutoff) = match *method {
        ThresholdMethod::Fixed { cutoff } => (apply_global_cutoff(image, cutoff), Some(cutoff)),
        ThresholdMethod::AdaptiveMean { window, offset } => {
            validate_window(window)?;
            (adaptive_mean_threshold(image, window, offset), None)
        }
        ThresholdMethod::Otsu => {
            let histogram = intensity_histogram(image);
            let total_pixels = (image.width() * image.height()) as f64;
            let cutoff = find_otsu_cutoff(&histogram, total_pixels);
            (apply_global_cutoff(image, cutoff), Some(cutoff))
        }
        ThresholdMethod::Triangle => {
            let histogram = intensity_histogram(image);
            let cutoff = find_triangle_cutoff(&histogram);
            (apply_global_cutoff(image, cutoff), Some(cutoff))
        }
        ThresholdMethod::Isodata => {
            let histogram = intensity_histogram(image);
            let cutoff = find_isodata_cutoff(&histogram);
            (apply_global_cutoff(image, cutoff), Some(cutoff))
        }
        ThresholdMethod::Sauvola { window, k } => {
            validate_window(window)?;
            (sauvola_threshold(image, window, k), None)
        }
    };

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "ocr_preprocessing",
        "Thresholding completed in {}ms: method={:?}, cutoff={:?}, dimensions={}x{}",
        processing_time.as_millis(),
        method,
        cutoff,
        image.width(),
        image.height()
    );

    Ok(ThresholdedImageResult {
        image: binary,
        cutoff,
        processing_time_ms: processing_time.as_millis() as u32,
    })
}

fn validate_buffer(image: &GrayImage) -> Result<(), PreprocessingError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PreprocessingError::InvalidInput {
            message: format!(
                "empty buffer ({}x{}) passed to thresholding",
                image.width(),
                image.height()
            ),
        });
    }
    Ok(())
}

fn validate_window(window: u32) -> Result<(), PreprocessingError> {
    if window < 3 || window % 2 == 0 {
        return Err(PreprocessingError::InvalidInput {
            message: format!("window size must be odd and >= 3, got {}", window),
        });
    }
    Ok(())
}

/// Builds the 256-bin intensity histogram of a grayscale buffer.
fn intensity_histogram(image: &GrayImage) -> [u32; 256] {
    let mut histogram = [0u32; 256];
    for pixel in image.pixels() {
        histogram[pixel[0] as usize] += 1;
    }
    histogram
}

/// Applies a single global cutoff: sample >= cutoff becomes 255, else 0.
fn apply_global_cutoff(image: &GrayImage, cutoff: u8) -> GrayImage {
    let mut binary = GrayImage::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        let value = if pixel[0] >= cutoff { 255u8 } else { 0u8 };
        binary.put_pixel(x, y, image::Luma([value]));
    }
    binary
}

/// Finds the cutoff maximizing between-class variance (Otsu's method).
///
/// The histogram is scanned once to build cumulative pixel counts and
/// cumulative weighted sums, then every candidate cutoff is scored by the
/// between-class variance w0*w1*(mu0 - mu1)^2. The scored split matches
/// the inclusive binarization rule: background is pixels strictly below
/// the cutoff, foreground is pixels at or above it.
fn find_otsu_cutoff(histogram: &[u32; 256], total_pixels: f64) -> u8 {
    let mut cumulative_sums = [0f64; 256];
    let mut cumulative_weighted_sums = [0f64; 256];

    let mut cumulative_sum = 0f64;
    let mut cumulative_weighted_sum = 0f64;
    for i in 0..256 {
        let pixel_count = histogram[i] as f64;
        cumulative_sum += pixel_count;
        cumulative_weighted_sum += (i as f64) * pixel_count;
        cumulative_sums[i] = cumulative_sum;
        cumulative_weighted_sums[i] = cumulative_weighted_sum;
    }

    let total_weighted_sum = cumulative_weighted_sums[255];

    let mut max_variance = 0f64;
    let mut optimal_cutoff = 128u8; // Fallback for degenerate histograms

    for cutoff in 1..=255usize {
        // Background class: pixels < cutoff; foreground: pixels >= cutoff
        let below = cumulative_sums[cutoff - 1];
        let below_weighted = cumulative_weighted_sums[cutoff - 1];
        let w0 = below / total_pixels;
        let w1 = 1.0 - w0;
        if w0 == 0.0 || w1 == 0.0 {
            continue;
        }

        let mu0 = below_weighted / below;
        let mu1 = (total_weighted_sum - below_weighted) / (cumulative_sums[255] - below);

        let variance = w0 * w1 * (mu0 - mu1).powi(2);
        if variance > max_variance {
            max_variance = variance;
            optimal_cutoff = cutoff as u8;
        }
    }

    optimal_cutoff
}

/// Finds the cutoff by the triangle method.
///
/// A line is drawn from the histogram peak to the far end of the occupied
/// intensity range (whichever end is furthest from the peak); the cutoff
/// is the bin with maximum perpendicular distance from that line.
fn find_triangle_cutoff(histogram: &[u32; 256]) -> u8 {
    let peak = histogram
        .iter()
        .enumerate()
        .max_by_key(|(_, &count)| count)
        .map(|(bin, _)| bin)
        .unwrap_or(0);

    let first_occupied = histogram.iter().position(|&c| c > 0).unwrap_or(0);
    let last_occupied = histogram.iter().rposition(|&c| c > 0).unwrap_or(255);

    // Far end of the range relative to the peak
    let far_end = if peak - first_occupied >= last_occupied - peak {
        first_occupied
    } else {
        last_occupied
    };
    if far_end == peak {
        return peak as u8;
    }

    // Perpendicular distance to the peak->far_end line; the denominator is
    // constant so comparing numerators is enough.
    let (x1, y1) = (peak as f64, histogram[peak] as f64);
    let (x2, y2) = (far_end as f64, histogram[far_end] as f64);

    let (lo, hi) = if peak < far_end {
        (peak, far_end)
    } else {
        (far_end, peak)
    };

    let mut best_bin = peak;
    let mut best_distance = 0f64;
    for bin in lo..=hi {
        let (x0, y0) = (bin as f64, histogram[bin] as f64);
        let distance = ((y2 - y1) * x0 - (x2 - x1) * y0 + x2 * y1 - y2 * x1).abs();
        if distance > best_distance {
            best_distance = distance;
            best_bin = bin;
        }
    }

    best_bin as u8
}

/// Finds the cutoff by iterative mean convergence (isodata).
///
/// Starts from the global mean and repeatedly recomputes the cutoff as the
/// average of the below-cutoff and above-cutoff population means until
/// successive cutoffs differ by less than one intensity unit. An empty
/// population's mean is treated as 0.
fn find_isodata_cutoff(histogram: &[u32; 256]) -> u8 {
    let total_count: f64 = histogram.iter().map(|&c| c as f64).sum();
    let total_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(bin, &c)| bin as f64 * c as f64)
        .sum();
    if total_count == 0.0 {
        return 0;
    }

    let mut cutoff = total_sum / total_count;
    for _ in 0..ISODATA_MAX_ITERATIONS {
        let mut lower_sum = 0f64;
        let mut lower_count = 0f64;
        let mut upper_sum = 0f64;
        let mut upper_count = 0f64;
        for (bin, &count) in histogram.iter().enumerate() {
            if (bin as f64) < cutoff {
                lower_sum += bin as f64 * count as f64;
                lower_count += count as f64;
            } else {
                upper_sum += bin as f64 * count as f64;
                upper_count += count as f64;
            }
        }
        let lower_mean = if lower_count > 0.0 {
            lower_sum / lower_count
        } else {
            0.0
        };
        let upper_mean = if upper_count > 0.0 {
            upper_sum / upper_count
        } else {
            0.0
        };
        let new_cutoff = (lower_mean + upper_mean) / 2.0;
        if (cutoff - new_cutoff).abs() < 1.0 {
            cutoff = new_cutoff;
            break;
        }
        cutoff = new_cutoff;
    }

    cutoff.round().clamp(0.0, 255.0) as u8
}

/// Adaptive local-mean thresholding.
///
/// Each pixel is compared against the mean of the odd-sized square window
/// centered on it, minus a constant offset; windows are clamped at the
/// borders. Foreground iff value > local mean - offset.
fn adaptive_mean_threshold(image: &GrayImage, window: u32, offset: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    let (sums, _) = build_integral_images(image);
    let stride = width as usize + 1;
    let radius = (window / 2) as i64;

    let mut binary = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let (x0, y0, x1, y1) = clamped_window(x, y, radius, width, height);
            let count = ((x1 - x0) * (y1 - y0)) as f64;
            let local_mean = window_total(&sums, stride, x0, y0, x1, y1) / count;
            let value = image.get_pixel(x, y)[0] as f64;
            let on = value > local_mean - offset as f64;
            binary.put_pixel(x, y, image::Luma([if on { 255u8 } else { 0u8 }]));
        }
    }
    binary
}

/// Sauvola thresholding.
///
/// Per-pixel cutoff m * (1 + k * (s / R - 1)) where m and s are the local
/// window mean and standard deviation and R = 128. Foreground iff
/// value >= cutoff.
fn sauvola_threshold(image: &GrayImage, window: u32, k: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    let (sums, squared_sums) = build_integral_images(image);
    let stride = width as usize + 1;
    let radius = (window / 2) as i64;

    let mut binary = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let (x0, y0, x1, y1) = clamped_window(x, y, radius, width, height);
            let count = ((x1 - x0) * (y1 - y0)) as f64;
            let mean = window_total(&sums, stride, x0, y0, x1, y1) / count;
            let mean_sq = window_total(&squared_sums, stride, x0, y0, x1, y1) / count;
            let stddev = (mean_sq - mean * mean).max(0.0).sqrt();
            let cutoff = mean * (1.0 + k as f64 * (stddev / SAUVOLA_R - 1.0));
            let value = image.get_pixel(x, y)[0] as f64;
            let on = value >= cutoff;
            binary.put_pixel(x, y, image::Luma([if on { 255u8 } else { 0u8 }]));
        }
    }
    binary
}

/// Builds summed-area tables of pixel values and squared pixel values,
/// each (width+1) x (height+1) with a zero first row and column.
fn build_integral_images(image: &GrayImage) -> (Vec<f64>, Vec<f64>) {
    let (width, height) = image.dimensions();
    let stride = width as usize + 1;
    let size = stride * (height as usize + 1);
    let mut sums = vec![0f64; size];
    let mut squared_sums = vec![0f64; size];

    for y in 0..height as usize {
        for x in 0..width as usize {
            let value = image.get_pixel(x as u32, y as u32)[0] as f64;
            let idx = (y + 1) * stride + (x + 1);
            sums[idx] = value + sums[idx - 1] + sums[idx - stride] - sums[idx - stride - 1];
            squared_sums[idx] = value * value + squared_sums[idx - 1]
                + squared_sums[idx - stride]
                - squared_sums[idx - stride - 1];
        }
    }
    (sums, squared_sums)
}

/// Clamps the window centered on (x, y) to the image bounds, returning the
/// half-open rectangle [x0, x1) x [y0, y1) in integral-image coordinates.
fn clamped_window(
    x: u32,
    y: u32,
    radius: i64,
    width: u32,
    height: u32,
) -> (usize, usize, usize, usize) {
    let x0 = (x as i64 - radius).max(0) as usize;
    let y0 = (y as i64 - radius).max(0) as usize;
    let x1 = ((x as i64 + radius + 1).min(width as i64)) as usize;
    let y1 = ((y as i64 + radius + 1).min(height as i64)) as usize;
    (x0, y0, x1, y1)
}

/// Sums a half-open rectangle from a summed-area table.
fn window_total(table: &[f64], stride: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> f64 {
    table[y1 * stride + x1] - table[y0 * stride + x1] - table[y1 * stride + x0]
        + table[y0 * stride + x0]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bimodal_image(width: u32, height: u32, dark: u8, light: u8) -> GrayImage {
        let mut img = GrayImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let value = if x < width / 2 { dark } else { light };
                img.put_pixel(x, y, image::Luma([value]));
            }
        }
        img
    }

    fn uniform_image(width: u32, height: u32, intensity: u8) -> GrayImage {
        GrayImage::from_pixel(width, height, image::Luma([intensity]))
    }

    fn assert_binary(image: &GrayImage) {
        for pixel in image.pixels() {
            assert!(
                pixel[0] == 0 || pixel[0] == 255,
                "non-binary sample {} in thresholded output",
                pixel[0]
            );
        }
    }

    #[test]
    fn test_all_methods_produce_binary_output() {
        let img = bimodal_image(20, 20, 30, 220);
        let methods = [
            ThresholdMethod::Fixed { cutoff: 128 },
            ThresholdMethod::AdaptiveMean {
                window: 11,
                offset: 2.0,
            },
            ThresholdMethod::Otsu,
            ThresholdMethod::Triangle,
            ThresholdMethod::Isodata,
            ThresholdMethod::Sauvola { window: 15, k: 0.5 },
        ];
        for method in methods {
            let result = apply_threshold(&img, &method).unwrap();
            assert_eq!(result.image.dimensions(), img.dimensions());
            assert_binary(&result.image);
        }
    }

    #[test]
    fn test_fixed_cutoff_is_inclusive() {
        let mut img = GrayImage::new(3, 1);
        img.put_pixel(0, 0, image::Luma([127]));
        img.put_pixel(1, 0, image::Luma([128]));
        img.put_pixel(2, 0, image::Luma([129]));
        let result = apply_threshold(&img, &ThresholdMethod::Fixed { cutoff: 128 }).unwrap();
        assert_eq!(result.image.get_pixel(0, 0)[0], 0);
        assert_eq!(result.image.get_pixel(1, 0)[0], 255);
        assert_eq!(result.image.get_pixel(2, 0)[0], 255);
        assert_eq!(result.cutoff, Some(128));
    }

    #[test]
    fn test_empty_buffer_is_invalid_input() {
        let img = GrayImage::new(0, 0);
        let result = apply_threshold(&img, &ThresholdMethod::Otsu);
        assert!(matches!(
            result,
            Err(PreprocessingError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_even_window_is_invalid_input() {
        let img = uniform_image(10, 10, 100);
        let result = apply_threshold(
            &img,
            &ThresholdMethod::AdaptiveMean {
                window: 8,
                offset: 2.0,
            },
        );
        assert!(matches!(
            result,
            Err(PreprocessingError::InvalidInput { .. })
        ));
    }

    /// Brute-force check that the Otsu cutoff maximizes between-class
    /// variance over every candidate cutoff.
    #[test]
    fn test_otsu_cutoff_maximizes_between_class_variance() {
        let img = bimodal_image(32, 32, 40, 200);
        let histogram = intensity_histogram(&img);
        let total = (img.width() * img.height()) as f64;
        let chosen = find_otsu_cutoff(&histogram, total);

        // Background = bins strictly below the candidate cutoff, matching
        // the inclusive binarization rule.
        let variance_at = |cutoff: usize| -> f64 {
            let mut w0 = 0f64;
            let mut sum0 = 0f64;
            for bin in 0..cutoff {
                w0 += histogram[bin] as f64;
                sum0 += bin as f64 * histogram[bin] as f64;
            }
            let w1 = total - w0;
            if w0 == 0.0 || w1 == 0.0 {
                return 0.0;
            }
            let sum_total: f64 = histogram
                .iter()
                .enumerate()
                .map(|(bin, &c)| bin as f64 * c as f64)
                .sum();
            let mu0 = sum0 / w0;
            let mu1 = (sum_total - sum0) / w1;
            (w0 / total) * (w1 / total) * (mu0 - mu1).powi(2)
        };

        let chosen_variance = variance_at(chosen as usize);
        for candidate in 0..=255usize {
            assert!(
                chosen_variance >= variance_at(candidate) - 1e-9,
                "cutoff {} has higher variance than chosen {}",
                candidate,
                chosen
            );
        }
    }

    /// The chosen Otsu cutoff must actually separate a bimodal image
    /// under the inclusive binarization rule: the dark mode's own bin
    /// counts as background, not foreground.
    #[test]
    fn test_otsu_separates_bimodal_classes() {
        let img = bimodal_image(20, 20, 30, 220);
        let result = apply_threshold(&img, &ThresholdMethod::Otsu).unwrap();

        let cutoff = result.cutoff.unwrap();
        assert!(cutoff > 30 && cutoff <= 220, "cutoff {} on a class bin", cutoff);
        assert_eq!(result.image.get_pixel(0, 0)[0], 0);
        assert_eq!(result.image.get_pixel(19, 0)[0], 255);
    }

    #[test]
    fn test_isodata_terminates_within_observed_range() {
        let img = bimodal_image(32, 32, 50, 210);
        let histogram = intensity_histogram(&img);
        let cutoff = find_isodata_cutoff(&histogram);
        // With both populations occupied the converged cutoff must sit
        // between the two class means, hence inside the observed range.
        assert!(cutoff >= 50 && cutoff <= 210, "cutoff {} out of range", cutoff);

        let result = apply_threshold(&img, &ThresholdMethod::Isodata).unwrap();
        assert_binary(&result.image);
    }

    #[test]
    fn test_triangle_cutoff_between_peak_and_tail() {
        // Dominant dark peak with a sparse bright tail
        let mut img = GrayImage::new(32, 32);
        for (i, pixel) in img.pixels_mut().enumerate() {
            pixel[0] = if i % 16 == 0 { 230 } else { 20 };
        }
        let histogram = intensity_histogram(&img);
        let cutoff = find_triangle_cutoff(&histogram);
        assert!(cutoff >= 20 && cutoff <= 230);
    }

    #[test]
    fn test_adaptive_mean_separates_gradient_text() {
        // Uneven illumination: a gradient background with darker "text"
        // dots. A global cutoff cannot separate both halves; the local
        // mean can.
        let mut img = GrayImage::new(40, 20);
        for y in 0..20 {
            for x in 0..40 {
                let background = 80 + (x * 3) as u8;
                let value = if x % 7 == 0 && y % 5 == 0 {
                    background.saturating_sub(60)
                } else {
                    background
                };
                img.put_pixel(x, y, image::Luma([value]));
            }
        }
        let result = apply_threshold(
            &img,
            &ThresholdMethod::AdaptiveMean {
                window: 11,
                offset: 2.0,
            },
        )
        .unwrap();
        assert_binary(&result.image);
        // The dark dots must come out as background (off) on both the dim
        // and the bright side of the gradient.
        assert_eq!(result.image.get_pixel(7, 5)[0], 0);
        assert_eq!(result.image.get_pixel(35, 10)[0], 0);
    }

    #[test]
    fn test_sauvola_uniform_image_is_all_foreground() {
        // s = 0 gives cutoff m * (1 - k) below the uniform value, so every
        // pixel passes.
        let img = uniform_image(16, 16, 180);
        let result =
            apply_threshold(&img, &ThresholdMethod::Sauvola { window: 15, k: 0.5 }).unwrap();
        for pixel in result.image.pixels() {
            assert_eq!(pixel[0], 255);
        }
    }

    #[test]
    fn test_sauvola_separates_bimodal_image() {
        let img = bimodal_image(30, 30, 30, 220);
        let result =
            apply_threshold(&img, &ThresholdMethod::Sauvola { window: 15, k: 0.5 }).unwrap();
        assert_binary(&result.image);
        // High local deviation at the class boundary splits the two sides
        // cleanly. (Inside a uniform region s = 0 drops the cutoff below
        // the local value, so interior pixels pass regardless of class.)
        assert_eq!(result.image.get_pixel(14, 15)[0], 0);
        assert_eq!(result.image.get_pixel(15, 15)[0], 255);
    }

    #[test]
    fn test_integral_window_matches_naive_sum() {
        let img = bimodal_image(9, 7, 10, 200);
        let (sums, _) = build_integral_images(&img);
        let stride = img.width() as usize + 1;

        let naive: f64 = (1..4)
            .flat_map(|y| (2..6).map(move |x| (x, y)))
            .map(|(x, y)| img.get_pixel(x, y)[0] as f64)
            .sum();
        assert_eq!(window_total(&sums, stride, 2, 1, 6, 4), naive);
    }
}
