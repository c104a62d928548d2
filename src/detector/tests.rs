use super::*;
use crate::frame::ColorFrame;
use image::{Luma, Rgb, RgbImage};
use std::time::SystemTime;

fn create_test_config() -> DetectorConfig {
    DetectorConfig {
        calibration_frames: 3,
        ..DetectorConfig::default()
    }
}

fn full_frame_roi(width: u32, height: u32) -> RegionOfInterest {
    RegionOfInterest {
        x: 0,
        y: 0,
        width,
        height,
    }
}

fn dark_gray(width: u32, height: u32) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([20]))
}

fn gray_with_square(width: u32, height: u32, x0: u32, y0: u32, side: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        if x >= x0 && x < x0 + side && y >= y0 && y < y0 + side {
            Luma([250])
        } else {
            Luma([20])
        }
    })
}

#[test]
fn test_calibration_precedes_detection() {
    let mut detector = MotionDetector::new(&create_test_config(), full_frame_roi(160, 120));

    for expected in 1..=2 {
        match detector.process_gray(&dark_gray(160, 120)) {
            FrameAnalysis::Calibrating { observed, required } => {
                assert_eq!(observed, expected);
                assert_eq!(required, 3);
            }
            other => panic!("Expected calibration, got {:?}", other),
        }
    }

    assert!(matches!(
        detector.process_gray(&dark_gray(160, 120)),
        FrameAnalysis::CalibrationComplete { frames: 3 }
    ));
    assert!(detector.is_calibrated());

    // A bright blob during calibration would have been ignored; now it is found
    match detector.process_gray(&gray_with_square(160, 120, 40, 20, 70)) {
        FrameAnalysis::Analyzed(detection) => {
            assert!(detection.has_qualifying_blob());
            assert!(detection.blob.unwrap().area > 1500.0);
        }
        other => panic!("Expected analysis, got {:?}", other),
    }

    assert_eq!(detector.frames_processed(), 4);
}

#[test]
fn test_dark_frame_has_no_blob() {
    let mut detector = MotionDetector::new(&create_test_config(), full_frame_roi(160, 120));
    for _ in 0..3 {
        detector.process_gray(&dark_gray(160, 120));
    }

    match detector.process_gray(&dark_gray(160, 120)) {
        FrameAnalysis::Analyzed(detection) => {
            assert!(!detection.has_qualifying_blob());
            assert!(detection.foreground.mask.pixels().all(|p| p[0] == 0));
        }
        other => panic!("Expected analysis, got {:?}", other),
    }
}

#[test]
fn test_small_bright_spot_does_not_qualify() {
    let mut detector = MotionDetector::new(&create_test_config(), full_frame_roi(160, 120));
    for _ in 0..3 {
        detector.process_gray(&dark_gray(160, 120));
    }

    match detector.process_gray(&gray_with_square(160, 120, 60, 40, 20)) {
        FrameAnalysis::Analyzed(detection) => assert!(!detection.has_qualifying_blob()),
        other => panic!("Expected analysis, got {:?}", other),
    }
}

#[test]
fn test_recalibrate_returns_to_calibration() {
    let mut detector = MotionDetector::new(&create_test_config(), full_frame_roi(160, 120));
    for _ in 0..3 {
        detector.process_gray(&dark_gray(160, 120));
    }
    assert!(detector.is_calibrated());

    detector.recalibrate();

    assert!(!detector.is_calibrated());
    assert!(matches!(
        detector.process_gray(&dark_gray(160, 120)),
        FrameAnalysis::Calibrating { observed: 1, .. }
    ));
}

#[test]
fn test_process_color_frame_uses_region_of_interest() {
    let roi = RegionOfInterest {
        x: 100,
        y: 0,
        width: 160,
        height: 120,
    };
    let mut detector = MotionDetector::new(&create_test_config(), roi);

    let dark = RgbImage::from_pixel(320, 120, Rgb([20, 20, 20]));
    for id in 0..3 {
        detector.process(&ColorFrame {
            id,
            timestamp: SystemTime::now(),
            image: dark.clone(),
        });
    }

    // Bright square outside the region of interest is invisible
    let mut outside = dark.clone();
    for y in 20..100 {
        for x in 10..90 {
            outside.put_pixel(x, y, Rgb([250, 250, 250]));
        }
    }
    match detector.process(&ColorFrame {
        id: 3,
        timestamp: SystemTime::now(),
        image: outside,
    }) {
        FrameAnalysis::Analyzed(detection) => {
            assert!(!detection.has_qualifying_blob());
            assert_eq!(detection.foreground.mask.dimensions(), (160, 120));
        }
        other => panic!("Expected analysis, got {:?}", other),
    }

    let mut inside = dark;
    for y in 20..100 {
        for x in 140..220 {
            inside.put_pixel(x, y, Rgb([250, 250, 250]));
        }
    }
    match detector.process(&ColorFrame {
        id: 4,
        timestamp: SystemTime::now(),
        image: inside,
    }) {
        FrameAnalysis::Analyzed(detection) => assert!(detection.has_qualifying_blob()),
        other => panic!("Expected analysis, got {:?}", other),
    }
}
