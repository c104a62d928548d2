use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PunchcamConfig {
    pub source: SourceConfig,
    pub detector: DetectorConfig,
    pub round: RoundConfig,
    pub display: DisplayConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourceConfig {
    /// Frame resolution (width, height) delivered by the source
    #[serde(default = "default_source_resolution")]
    pub resolution: (u32, u32),

    /// Frames per second delivered by the source
    #[serde(default = "default_source_fps")]
    pub fps: u32,

    /// Region of the color frame the detector looks at
    #[serde(default = "default_roi")]
    pub roi: RegionOfInterest,

    /// Restart an image sequence from the beginning once it is exhausted
    #[serde(default)]
    pub loop_sequence: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct RegionOfInterest {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DetectorConfig {
    /// Number of frames folded into the background before detection starts
    #[serde(default = "default_calibration_frames")]
    pub calibration_frames: u32,

    /// Gaussian blur sigma applied before binarization
    #[serde(default = "default_gaussian_sigma")]
    pub gaussian_sigma: f32,

    /// Radius of the box blur applied after the Gaussian blur
    #[serde(default = "default_box_radius")]
    pub box_radius: u32,

    /// Intensity cutoff for the binary mask (0-255)
    #[serde(default = "default_binary_threshold")]
    pub binary_threshold: u8,

    /// Number of 3x3 dilation passes applied to the binary mask
    #[serde(default = "default_dilation_iterations")]
    pub dilation_iterations: u8,

    /// Minimum contour area (px^2) for a blob to qualify
    #[serde(default = "default_area_threshold")]
    pub area_threshold: f64,

    /// A blob must persist for more than this many frames to count as a punch
    #[serde(default = "default_detect_threshold")]
    pub detect_threshold: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RoundConfig {
    /// Seconds granted per punch in the goal
    #[serde(default = "default_difficulty")]
    pub difficulty: f64,

    /// Smallest punch goal that can be drawn
    #[serde(default = "default_goal_min")]
    pub goal_min: u32,

    /// Largest punch goal that can be drawn
    #[serde(default = "default_goal_max")]
    pub goal_max: u32,

    /// Pause between the end of one round and the start of the next
    #[serde(default = "default_pause_seconds")]
    pub pause_seconds: u64,

    /// Countdown tick interval in milliseconds
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,

    /// Seed for goal selection; random when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DisplayConfig {
    /// TrueType font used for the counters; text is omitted when absent
    #[serde(default)]
    pub font_path: Option<String>,

    /// Font size for the counters
    #[serde(default = "default_font_size")]
    pub font_size: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl PunchcamConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("punchcam.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let roi = default_roi();
        let settings = Config::builder()
            .set_default(
                "source.resolution",
                vec![default_source_resolution().0, default_source_resolution().1],
            )?
            .set_default("source.fps", default_source_fps())?
            .set_default("source.roi.x", roi.x)?
            .set_default("source.roi.y", roi.y)?
            .set_default("source.roi.width", roi.width)?
            .set_default("source.roi.height", roi.height)?
            .set_default("source.loop_sequence", false)?
            .set_default("detector.calibration_frames", default_calibration_frames())?
            .set_default(
                "detector.gaussian_sigma",
                default_gaussian_sigma() as f64,
            )?
            .set_default("detector.box_radius", default_box_radius())?
            .set_default(
                "detector.binary_threshold",
                default_binary_threshold() as u32,
            )?
            .set_default(
                "detector.dilation_iterations",
                default_dilation_iterations() as u32,
            )?
            .set_default("detector.area_threshold", default_area_threshold())?
            .set_default("detector.detect_threshold", default_detect_threshold())?
            .set_default("round.difficulty", default_difficulty())?
            .set_default("round.goal_min", default_goal_min())?
            .set_default("round.goal_max", default_goal_max())?
            .set_default("round.pause_seconds", default_pause_seconds())?
            .set_default("round.tick_millis", default_tick_millis())?
            .set_default("display.font_size", default_font_size() as f64)?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables, e.g. PUNCHCAM__ROUND__GOAL_MIN=5
            .add_source(
                Environment::with_prefix("PUNCHCAM")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: PunchcamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (width, height) = self.source.resolution;
        if width == 0 || height == 0 {
            return Err(ConfigError::Message(
                "Source resolution must be greater than 0".to_string(),
            ));
        }

        if self.source.fps == 0 {
            return Err(ConfigError::Message(
                "Source fps must be greater than 0".to_string(),
            ));
        }

        let roi = &self.source.roi;
        if roi.width == 0 || roi.height == 0 {
            return Err(ConfigError::Message(
                "Region of interest must not be empty".to_string(),
            ));
        }

        let right = roi.x.checked_add(roi.width);
        let bottom = roi.y.checked_add(roi.height);
        let inside = matches!((right, bottom), (Some(r), Some(b)) if r <= width && b <= height);
        if !inside {
            return Err(ConfigError::Message(format!(
                "Region of interest {}x{}+{}+{} exceeds source resolution {}x{}",
                roi.width, roi.height, roi.x, roi.y, width, height
            )));
        }

        if self.detector.calibration_frames == 0 {
            return Err(ConfigError::Message(
                "Calibration frame count must be greater than 0".to_string(),
            ));
        }

        if !(self.detector.gaussian_sigma > 0.0) {
            return Err(ConfigError::Message(
                "Gaussian sigma must be positive".to_string(),
            ));
        }

        if self.detector.area_threshold < 0.0 {
            return Err(ConfigError::Message(
                "Area threshold must not be negative".to_string(),
            ));
        }

        if self.round.goal_min == 0 {
            return Err(ConfigError::Message(
                "Minimum punch goal must be greater than 0".to_string(),
            ));
        }

        if self.round.goal_min > self.round.goal_max {
            return Err(ConfigError::Message(format!(
                "Goal range is empty: {} > {}",
                self.round.goal_min, self.round.goal_max
            )));
        }

        if !(self.round.difficulty > 0.0) {
            return Err(ConfigError::Message(
                "Difficulty must be positive".to_string(),
            ));
        }

        if self.round.tick_millis == 0 {
            return Err(ConfigError::Message(
                "Timer tick interval must be greater than 0".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for PunchcamConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            detector: DetectorConfig::default(),
            round: RoundConfig::default(),
            display: DisplayConfig {
                font_path: None,
                font_size: default_font_size(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
            },
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            resolution: default_source_resolution(),
            fps: default_source_fps(),
            roi: default_roi(),
            loop_sequence: false,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            calibration_frames: default_calibration_frames(),
            gaussian_sigma: default_gaussian_sigma(),
            box_radius: default_box_radius(),
            binary_threshold: default_binary_threshold(),
            dilation_iterations: default_dilation_iterations(),
            area_threshold: default_area_threshold(),
            detect_threshold: default_detect_threshold(),
        }
    }
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            goal_min: default_goal_min(),
            goal_max: default_goal_max(),
            pause_seconds: default_pause_seconds(),
            tick_millis: default_tick_millis(),
            seed: None,
        }
    }
}

// Default value functions
fn default_source_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_source_fps() -> u32 {
    30
}
fn default_roi() -> RegionOfInterest {
    RegionOfInterest {
        x: 150,
        y: 50,
        width: 350,
        height: 380,
    }
}

fn default_calibration_frames() -> u32 {
    30
}
// Sigma matching the 21-tap smoothing kernel
fn default_gaussian_sigma() -> f32 {
    3.5
}
fn default_box_radius() -> u32 {
    2
}
fn default_binary_threshold() -> u8 {
    190
}
fn default_dilation_iterations() -> u8 {
    2
}
fn default_area_threshold() -> f64 {
    1500.0
}
fn default_detect_threshold() -> u32 {
    5
}

fn default_difficulty() -> f64 {
    1.5
}
fn default_goal_min() -> u32 {
    10
}
fn default_goal_max() -> u32 {
    30
}
fn default_pause_seconds() -> u64 {
    2
}
fn default_tick_millis() -> u64 {
    1000
}

fn default_font_size() -> f32 {
    28.0
}

fn default_event_bus_capacity() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = PunchcamConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.detector.detect_threshold, 5);
        assert_eq!(config.detector.area_threshold, 1500.0);
        assert_eq!(config.detector.binary_threshold, 190);
        assert_eq!(config.detector.dilation_iterations, 2);
        assert_eq!(config.detector.calibration_frames, 30);
        assert_eq!(config.round.difficulty, 1.5);
        assert_eq!((config.round.goal_min, config.round.goal_max), (10, 30));
        assert_eq!(config.round.pause_seconds, 2);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[round]\ngoal_min = 3\ngoal_max = 4\n\n[detector]\narea_threshold = 200.0"
        )
        .unwrap();

        let config = PunchcamConfig::load_from_file(file.path()).unwrap();

        assert_eq!(config.round.goal_min, 3);
        assert_eq!(config.round.goal_max, 4);
        assert_eq!(config.detector.area_threshold, 200.0);
        // Untouched sections keep their defaults
        assert_eq!(config.source.resolution, (640, 480));
        assert_eq!(config.source.roi, default_roi());
        assert_eq!(config.detector.detect_threshold, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PunchcamConfig::load_from_file(dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.detector.calibration_frames, 30);
        assert_eq!(config.round.tick_millis, 1000);
        assert!(config.round.seed.is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = PunchcamConfig::default();

        config.round.goal_min = 40;
        assert!(config.validate().is_err());
        config.round.goal_min = 10;

        config.source.roi.width = 600;
        assert!(config.validate().is_err());
        config.source.roi = default_roi();

        config.detector.calibration_frames = 0;
        assert!(config.validate().is_err());
        config.detector.calibration_frames = 30;

        config.round.difficulty = 0.0;
        assert!(config.validate().is_err());
        config.round.difficulty = 1.5;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_roi_offset_overflow_is_rejected() {
        let mut config = PunchcamConfig::default();

        config.source.roi.x = u32::MAX;
        assert!(config.validate().is_err());
        config.source.roi = default_roi();

        config.source.roi.y = u32::MAX - 10;
        config.source.roi.height = 20;
        assert!(config.validate().is_err());
        config.source.roi = default_roi();

        // ROI touching the right and bottom edges is still inside
        config.source.roi = RegionOfInterest {
            x: 290,
            y: 100,
            width: 350,
            height: 380,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_serializes_to_toml() {
        let rendered = toml::to_string_pretty(&PunchcamConfig::default()).unwrap();
        assert!(rendered.contains("binary_threshold = 190"));

        let parsed: PunchcamConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.source.roi, default_roi());
    }
}
