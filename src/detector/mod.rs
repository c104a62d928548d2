mod background;
mod blob;
mod debounce;
mod foreground;
#[cfg(test)]
mod tests;

pub use background::BackgroundModel;
pub use blob::{largest_by_area, polygon_area, Blob, BlobDetector};
pub use debounce::{DetectionState, PunchDebouncer, PunchEvent};
pub use foreground::{Foreground, ForegroundExtractor};

use crate::config::{DetectorConfig, RegionOfInterest};
use crate::frame::{preprocess, ColorFrame};
use image::GrayImage;
use tracing::{debug, info};

/// Result of running one frame through the detector
#[derive(Debug, Clone)]
pub enum FrameAnalysis {
    /// Frame folded into the background; no detection output yet
    Calibrating { observed: u32, required: u32 },
    /// Calibration finished with this frame
    CalibrationComplete { frames: u32 },
    /// Detection ran on a calibrated frame
    Analyzed(Detection),
}

/// Detection output for one calibrated frame
#[derive(Debug, Clone)]
pub struct Detection {
    pub foreground: Foreground,
    pub blob: Option<Blob>,
}

impl Detection {
    pub fn has_qualifying_blob(&self) -> bool {
        self.blob.is_some()
    }
}

/// Background calibration, foreground extraction and blob detection for a
/// stream of color frames
pub struct MotionDetector {
    roi: RegionOfInterest,
    background: BackgroundModel,
    extractor: ForegroundExtractor,
    blobs: BlobDetector,
    frames_processed: u64,
}

impl MotionDetector {
    pub fn new(config: &DetectorConfig, roi: RegionOfInterest) -> Self {
        info!(
            "Initializing motion detector: calibration {} frames, threshold {}, min area {:.0}",
            config.calibration_frames, config.binary_threshold, config.area_threshold
        );

        Self {
            roi,
            background: BackgroundModel::new(config.calibration_frames),
            extractor: ForegroundExtractor::new(config),
            blobs: BlobDetector::new(config.area_threshold),
            frames_processed: 0,
        }
    }

    /// Crop, convert and analyze one color frame
    pub fn process(&mut self, frame: &ColorFrame) -> FrameAnalysis {
        let gray = preprocess(frame, &self.roi);
        debug!(
            "Processing frame {} ({}x{} region)",
            frame.id,
            gray.width(),
            gray.height()
        );
        self.process_gray(&gray)
    }

    /// Analyze an already cropped grayscale frame
    pub fn process_gray(&mut self, gray: &GrayImage) -> FrameAnalysis {
        self.frames_processed += 1;
        let smoothed = self.extractor.smooth(gray);

        let Some(background) = self.background.estimate() else {
            if self.background.observe(&smoothed) {
                return FrameAnalysis::CalibrationComplete {
                    frames: self.background.samples(),
                };
            }
            return FrameAnalysis::Calibrating {
                observed: self.background.samples(),
                required: self.background.required_samples(),
            };
        };

        let foreground = self.extractor.extract_smoothed(&smoothed, background);
        let blob = self.blobs.detect(&foreground.mask);

        if let Some(blob) = &blob {
            debug!(
                "Qualifying blob: area {:.0}, {} contour points, {} hull points",
                blob.area,
                blob.contour.len(),
                blob.hull.len()
            );
        }

        FrameAnalysis::Analyzed(Detection { foreground, blob })
    }

    pub fn is_calibrated(&self) -> bool {
        self.background.is_calibrated()
    }

    /// Start a fresh background calibration, e.g. after a scene change
    pub fn recalibrate(&mut self) {
        self.background.reset();
    }

    pub fn background(&self) -> &BackgroundModel {
        &self.background
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }
}
