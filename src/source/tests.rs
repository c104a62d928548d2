use super::*;
use crate::config::SourceConfig;
use crate::error::{PunchcamError, SourceError};
use image::{Rgb, RgbImage};
use std::sync::atomic::Ordering;

fn create_test_config(loop_sequence: bool) -> SourceConfig {
    SourceConfig {
        resolution: (32, 24),
        fps: 1000,
        loop_sequence,
        ..SourceConfig::default()
    }
}

fn write_frame(dir: &std::path::Path, name: &str, width: u32, height: u32, value: u8) {
    RgbImage::from_pixel(width, height, Rgb([value, value, value]))
        .save(dir.join(name))
        .unwrap();
}

#[tokio::test]
async fn test_scripted_source_replays_script() {
    let mut source = ScriptedFrameSource::new();
    source.push_frame(solid_frame(0, 8, 8, 10));
    source.push_gap();
    source.push_repeated(&square_frame(1, 16, 16, 4, 4, 8), 2);
    assert_eq!(source.remaining(), 4);

    assert_eq!(source.wait_for_frame_pair().await.unwrap().unwrap().id(), 0);
    assert!(source.wait_for_frame_pair().await.unwrap().is_none());
    assert!(source.wait_for_frame_pair().await.unwrap().is_some());
    assert!(source.wait_for_frame_pair().await.unwrap().is_some());

    match source.wait_for_frame_pair().await {
        Err(PunchcamError::Source(SourceError::Disconnected { .. })) => {}
        other => panic!("Expected disconnect, got {:?}", other.map(|p| p.is_some())),
    }
}

#[tokio::test]
async fn test_scripted_source_release() {
    let mut source = ScriptedFrameSource::default();
    source.push_frame(solid_frame(0, 8, 8, 10));
    let released = source.release_flag();

    source.release().await.unwrap();

    assert!(released.load(Ordering::Acquire));
    assert!(source.wait_for_frame_pair().await.is_err());
}

#[tokio::test]
async fn test_image_sequence_plays_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    write_frame(dir.path(), "frame_002.png", 32, 24, 200);
    write_frame(dir.path(), "frame_001.png", 32, 24, 100);
    std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

    let mut source = ImageSequenceSource::open(dir.path(), &create_test_config(false)).unwrap();
    assert_eq!(source.len(), 2);

    let first = source.wait_for_frame_pair().await.unwrap().unwrap();
    assert_eq!(first.color.image.get_pixel(0, 0)[0], 100);
    assert!(first.is_coherent());

    let second = source.wait_for_frame_pair().await.unwrap().unwrap();
    assert_eq!(second.color.image.get_pixel(0, 0)[0], 200);
    assert_eq!(second.id(), 1);

    let end = source.wait_for_frame_pair().await.unwrap_err();
    assert!(end.is_end_of_stream());
}

#[tokio::test]
async fn test_image_sequence_skips_bad_frames() {
    let dir = tempfile::tempdir().unwrap();
    write_frame(dir.path(), "a.png", 32, 24, 50);
    write_frame(dir.path(), "b.png", 16, 16, 50);
    std::fs::write(dir.path().join("c.png"), b"definitely not a png").unwrap();
    write_frame(dir.path(), "d.png", 32, 24, 60);

    let mut source = ImageSequenceSource::open(dir.path(), &create_test_config(false)).unwrap();

    assert!(source.wait_for_frame_pair().await.unwrap().is_some());
    assert!(source.wait_for_frame_pair().await.unwrap().is_none());
    assert!(source.wait_for_frame_pair().await.unwrap().is_none());
    let last = source.wait_for_frame_pair().await.unwrap().unwrap();
    assert_eq!(last.color.image.get_pixel(0, 0)[0], 60);
}

#[tokio::test]
async fn test_image_sequence_loops_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    write_frame(dir.path(), "only.png", 32, 24, 70);

    let mut source = ImageSequenceSource::open(dir.path(), &create_test_config(true)).unwrap();

    for expected_id in 0..3 {
        let pair = source.wait_for_frame_pair().await.unwrap().unwrap();
        assert_eq!(pair.id(), expected_id);
    }

    source.release().await.unwrap();
    assert!(source.wait_for_frame_pair().await.is_err());
}

#[test]
fn test_image_sequence_requires_images() {
    let dir = tempfile::tempdir().unwrap();
    let result = ImageSequenceSource::open(dir.path(), &create_test_config(false));
    assert!(matches!(
        result,
        Err(PunchcamError::Source(SourceError::Read { .. }))
    ));
}
