use crate::config::DetectorConfig;
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::{
    contrast::threshold,
    distance_transform::Norm,
    filter::{box_filter, separable_filter_equal},
    map::map_colors,
    morphology::dilate,
};

/// Taps on each side of the centre of the Gaussian kernel (a 21x21 window)
const GAUSSIAN_RADIUS: i32 = 10;

/// Output of foreground extraction for one frame
#[derive(Debug, Clone)]
pub struct Foreground {
    /// Binary mask (0 or 255) that drives blob detection
    pub mask: GrayImage,
    /// Saturating `smoothed - background` difference; informational only
    pub difference: GrayImage,
}

/// Smooths, binarizes and dilates intensity frames.
///
/// The mask is a direct threshold of the smoothed frame. The background
/// difference is computed alongside it but does not gate detection.
#[derive(Debug, Clone)]
pub struct ForegroundExtractor {
    gaussian_kernel: Vec<f32>,
    box_radius: u32,
    binary_threshold: u8,
    dilation_iterations: u8,
}

impl ForegroundExtractor {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            gaussian_kernel: gaussian_kernel(config.gaussian_sigma),
            box_radius: config.box_radius,
            binary_threshold: config.binary_threshold,
            dilation_iterations: config.dilation_iterations,
        }
    }

    /// Gaussian blur followed by a box blur to suppress sensor noise
    pub fn smooth(&self, frame: &GrayImage) -> GrayImage {
        let blurred = gaussian_blur(frame, &self.gaussian_kernel);
        if self.box_radius == 0 {
            blurred
        } else {
            box_filter(&blurred, self.box_radius, self.box_radius)
        }
    }

    /// Derive the foreground mask for a raw grayscale frame
    pub fn extract(&self, frame: &GrayImage, background: &GrayImage) -> Foreground {
        let smoothed = self.smooth(frame);
        self.extract_smoothed(&smoothed, background)
    }

    /// Same as [`ForegroundExtractor::extract`] for a frame that is already smoothed
    pub fn extract_smoothed(&self, smoothed: &GrayImage, background: &GrayImage) -> Foreground {
        let difference = subtract_saturating(smoothed, background);

        let binary = threshold(smoothed, self.binary_threshold);
        let mask = if self.dilation_iterations == 0 {
            binary
        } else {
            // k passes of a 3x3 square equal one L-infinity dilation of radius k
            dilate(&binary, Norm::LInf, self.dilation_iterations)
        };

        Foreground { mask, difference }
    }
}

/// Normalized 1-D Gaussian weights. A non-positive sigma yields the identity kernel.
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    if !(sigma > 0.0) {
        return vec![1.0];
    }

    let two_sigma_sq = 2.0 * f64::from(sigma).powi(2);
    let weights: Vec<f64> = (-GAUSSIAN_RADIUS..=GAUSSIAN_RADIUS)
        .map(|i| (-f64::from(i * i) / two_sigma_sq).exp())
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.iter().map(|w| (w / sum) as f32).collect()
}

/// Separable Gaussian computed in f32, rounded back to u8 once
fn gaussian_blur(frame: &GrayImage, kernel: &[f32]) -> GrayImage {
    let widened: ImageBuffer<Luma<f32>, Vec<f32>> = map_colors(frame, |p| Luma([f32::from(p[0])]));
    let blurred = separable_filter_equal(&widened, kernel);
    map_colors(&blurred, |p| Luma([p[0].round().clamp(0.0, 255.0) as u8]))
}

fn subtract_saturating(frame: &GrayImage, background: &GrayImage) -> GrayImage {
    let (width, height) = frame.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let value = frame.get_pixel(x, y)[0];
        let base = background
            .get_pixel_checked(x, y)
            .map(|p| p[0])
            .unwrap_or(0);
        Luma([value.saturating_sub(base)])
    })
}
