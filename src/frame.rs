use crate::config::RegionOfInterest;
use image::{imageops, GrayImage, RgbImage};
use std::sync::Arc;
use std::time::SystemTime;

/// Color frame as delivered by the frame source
#[derive(Debug, Clone)]
pub struct ColorFrame {
    /// Frame identifier, monotonically increasing per source
    pub id: u64,
    /// Timestamp when the frame was captured
    pub timestamp: SystemTime,
    /// RGB pixel data
    pub image: RgbImage,
}

/// Depth frame as delivered by the frame source. The detector never reads it.
#[derive(Debug, Clone)]
pub struct DepthFrame {
    pub id: u64,
    pub timestamp: SystemTime,
    /// Depth samples in sensor units, row-major
    pub data: Arc<Vec<u16>>,
    pub width: u32,
    pub height: u32,
}

impl DepthFrame {
    /// Create an all-zero depth frame for sources without a depth sensor
    pub fn empty(id: u64, timestamp: SystemTime, width: u32, height: u32) -> Self {
        Self {
            id,
            timestamp,
            data: Arc::new(vec![0u16; width as usize * height as usize]),
            width,
            height,
        }
    }

    /// Depth sample at (x, y), if inside the frame
    pub fn sample(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

/// Synchronized depth and color frames from one source poll
#[derive(Debug, Clone)]
pub struct FramePair {
    pub depth: DepthFrame,
    pub color: ColorFrame,
}

impl FramePair {
    pub fn new(depth: DepthFrame, color: ColorFrame) -> Self {
        Self { depth, color }
    }

    /// Build a pair from a color image, with an empty depth frame of the same size
    pub fn from_color(id: u64, timestamp: SystemTime, image: RgbImage) -> Self {
        let depth = DepthFrame::empty(id, timestamp, image.width(), image.height());
        Self {
            depth,
            color: ColorFrame {
                id,
                timestamp,
                image,
            },
        }
    }

    /// Both halves must share the color frame's dimensions
    pub fn is_coherent(&self) -> bool {
        let (width, height) = self.color.image.dimensions();
        self.depth.width == width
            && self.depth.height == height
            && self.depth.data.len() == width as usize * height as usize
    }

    /// Frame identifier (taken from the color frame)
    pub fn id(&self) -> u64 {
        self.color.id
    }
}

/// Crop a color frame to the region of interest and convert it to grayscale.
///
/// The region is clamped to the frame so a partially out-of-bounds region
/// yields the overlapping part instead of failing.
pub fn preprocess(frame: &ColorFrame, roi: &RegionOfInterest) -> GrayImage {
    let (width, height) = frame.image.dimensions();
    let x = roi.x.min(width);
    let y = roi.y.min(height);
    let crop_width = roi.width.min(width - x);
    let crop_height = roi.height.min(height - y);

    let cropped = imageops::crop_imm(&frame.image, x, y, crop_width, crop_height).to_image();
    imageops::grayscale(&cropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn roi(x: u32, y: u32, width: u32, height: u32) -> RegionOfInterest {
        RegionOfInterest {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn test_preprocess_crops_to_region() {
        let mut image = RgbImage::new(64, 48);
        image.put_pixel(20, 10, Rgb([255, 255, 255]));
        let frame = ColorFrame {
            id: 1,
            timestamp: SystemTime::now(),
            image,
        };

        let gray = preprocess(&frame, &roi(10, 5, 30, 20));

        assert_eq!(gray.dimensions(), (30, 20));
        assert_eq!(gray.get_pixel(10, 5)[0], 255);
        assert_eq!(gray.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_preprocess_clamps_region() {
        let frame = ColorFrame {
            id: 1,
            timestamp: SystemTime::now(),
            image: RgbImage::new(64, 48),
        };

        let gray = preprocess(&frame, &roi(50, 40, 30, 30));
        assert_eq!(gray.dimensions(), (14, 8));
    }

    #[test]
    fn test_frame_pair_coherence() {
        let pair = FramePair::from_color(3, SystemTime::now(), RgbImage::new(8, 6));
        assert!(pair.is_coherent());
        assert_eq!(pair.id(), 3);
        assert_eq!(pair.depth.sample(7, 5), Some(0));
        assert_eq!(pair.depth.sample(8, 0), None);

        let mismatched = FramePair::new(
            DepthFrame::empty(3, SystemTime::now(), 4, 4),
            pair.color.clone(),
        );
        assert!(!mismatched.is_coherent());
    }
}
