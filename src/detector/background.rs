use image::GrayImage;
use tracing::{debug, info, warn};

/// Static scene estimate built from the first frames after start.
///
/// The first observed frame seeds the estimate; each later frame is blended
/// 50/50 into it. Once `required_samples` frames have been observed the buffer
/// is frozen until [`BackgroundModel::reset`] is called.
#[derive(Debug, Clone)]
pub struct BackgroundModel {
    estimate: Option<GrayImage>,
    samples: u32,
    required_samples: u32,
    calibrated: bool,
}

impl BackgroundModel {
    pub fn new(required_samples: u32) -> Self {
        Self {
            estimate: None,
            samples: 0,
            required_samples: required_samples.max(1),
            calibrated: false,
        }
    }

    /// Fold a frame into the estimate. Returns whether the model is calibrated.
    pub fn observe(&mut self, frame: &GrayImage) -> bool {
        if self.calibrated {
            return true;
        }

        match self.estimate.as_mut() {
            Some(current) if current.dimensions() == frame.dimensions() => {
                for (bg, px) in current.pixels_mut().zip(frame.pixels()) {
                    bg[0] = (0.5 * px[0] as f32 + 0.5 * bg[0] as f32).round() as u8;
                }
                self.samples += 1;
            }
            Some(current) => {
                warn!(
                    "Frame size changed during calibration ({:?} -> {:?}), reseeding background",
                    current.dimensions(),
                    frame.dimensions()
                );
                self.estimate = Some(frame.clone());
                self.samples = 1;
            }
            None => {
                debug!("Seeding background model with first frame");
                self.estimate = Some(frame.clone());
                self.samples = 1;
            }
        }

        if self.samples >= self.required_samples {
            self.calibrated = true;
            info!(
                "Background model calibrated after {} frames",
                self.samples
            );
        }

        self.calibrated
    }

    /// The frozen background, once calibration has completed
    pub fn estimate(&self) -> Option<&GrayImage> {
        if self.calibrated {
            self.estimate.as_ref()
        } else {
            None
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    /// Frames folded into the estimate so far
    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn required_samples(&self) -> u32 {
        self.required_samples
    }

    /// Discard the estimate and start a fresh calibration
    pub fn reset(&mut self) {
        info!("Background model reset, recalibrating");
        self.estimate = None;
        self.samples = 0;
        self.calibrated = false;
    }
}
