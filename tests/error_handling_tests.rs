//! Error handling tests for all modules

use opencv::core::{Mat, Scalar, Size, CV_8UC3};
use opencv::prelude::*;
use posture_analyzer::{
    aggregator::FrameSink,
    app::analyze_video,
    config::Config,
    joints::{Joint, JointSet},
    pose_detection::{decode_landmarks, OnnxPoseDetector, PoseOracle},
    utils::safe_cast::{f64_to_i32, u32_to_i32, usize_to_i32},
    video::{VideoAnnotator, VideoReader},
    Error, Result,
};
use std::path::{Path, PathBuf};

/// Oracle that never finds a body
struct EmptyOracle;

impl PoseOracle for EmptyOracle {
    type Frame = Mat;

    fn detect(&mut self, _frame: &Mat) -> Result<Option<JointSet>> {
        Ok(None)
    }
}

/// Oracle whose model fails on every frame
struct FailingOracle;

impl PoseOracle for FailingOracle {
    type Frame = Mat;

    fn detect(&mut self, _frame: &Mat) -> Result<Option<JointSet>> {
        Err(Error::ModelError("inference failed".to_string()))
    }
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("posture_analyzer_{}_{name}", std::process::id()))
}

#[test]
fn test_missing_video_is_unreadable() {
    let result = VideoReader::open("definitely/not/here.mp4");
    assert!(matches!(result, Err(Error::InputUnreadable(_))));

    let result = analyze_video(
        Path::new("definitely/not/here.mp4"),
        None,
        &mut EmptyOracle,
        &Config::default(),
    );
    assert!(matches!(result, Err(Error::InputUnreadable(_))));
}

#[test]
fn test_directory_is_unreadable() {
    let result = VideoReader::open(std::env::temp_dir());
    assert!(matches!(result, Err(Error::InputUnreadable(_))));
}

#[test]
fn test_garbage_video_is_unreadable() {
    let path = temp_path("garbage.mp4");
    std::fs::write(&path, b"this is not a video container").unwrap();

    // Either no decoder accepts the file or it yields no frames
    let result = analyze_video(&path, None, &mut EmptyOracle, &Config::default());
    std::fs::remove_file(&path).unwrap();

    assert!(matches!(result, Err(Error::InputUnreadable(_))), "got {result:?}");
}

#[test]
fn test_invalid_fourcc_is_unwritable() {
    let path = temp_path("out.avi");
    let result = VideoAnnotator::create(&path, "MPEG4", 30.0, Size::new(64, 48), 1.0, true);
    assert!(matches!(result, Err(Error::OutputUnwritable(_))));

    let result = VideoAnnotator::create(&path, "", 30.0, Size::new(64, 48), 1.0, true);
    assert!(matches!(result, Err(Error::OutputUnwritable(_))));
}

#[test]
fn test_failed_analysis_removes_annotated_output() -> Result<()> {
    let input = temp_path("failing_input.avi");
    let output = temp_path("failing_output.avi");

    let mut writer = VideoAnnotator::create(&input, "MJPG", 10.0, Size::new(64, 48), 1.0, false)?;
    let frame = Mat::new_rows_cols_with_default(48, 64, CV_8UC3, Scalar::all(90.0))?;
    assert!(!frame.empty());
    for _ in 0..5 {
        writer.write_frame(&frame, None, None)?;
    }
    drop(writer);

    let result = analyze_video(&input, Some(&output), &mut FailingOracle, &Config::default());
    let output_left = output.exists();
    std::fs::remove_file(&input)?;
    if output_left {
        std::fs::remove_file(&output)?;
    }

    assert!(matches!(result, Err(Error::ModelError(_))), "got {result:?}");
    assert!(!output_left, "partial output was left on disk");
    Ok(())
}

#[test]
fn test_config_errors() {
    // Missing file surfaces as an IO error
    let result = Config::from_file("definitely/not/here.yaml");
    assert!(matches!(result, Err(Error::Io(_))));

    // Malformed YAML
    let path = temp_path("bad_config.yaml");
    std::fs::write(&path, "aggregation: [not, a, map").unwrap();
    let result = Config::from_file(&path);
    std::fs::remove_file(&path).unwrap();
    match result {
        Err(Error::ConfigError(msg)) => assert!(msg.contains("Failed to parse config")),
        other => panic!("Expected ConfigError, got {other:?}"),
    }

    // Well formed but out of range
    let mut config = Config::default();
    config.detection.min_visibility = 2.0;
    assert!(matches!(config.validate(), Err(Error::ConfigError(_))));
}

#[test]
fn test_landmark_errors() {
    let result = JointSet::from_landmarks(&[Joint::new(0.5, 0.5); 10]);
    match result {
        Err(Error::InvalidInput(msg)) => assert!(msg.contains("33")),
        other => panic!("Expected InvalidInput, got {other:?}"),
    }

    let result = decode_landmarks(&[0.0; 99], (256, 256));
    assert!(matches!(result, Err(Error::ModelOutputError(_))));

    assert!(decode_landmarks(&[], (256, 256)).is_err());
}

#[test]
fn test_missing_model_is_model_error() {
    let result = OnnxPoseDetector::new("assets/does_not_exist.onnx", 0.5);
    assert!(matches!(result, Err(Error::ModelError(_))));
}

#[test]
fn test_safe_cast_errors() {
    assert!(f64_to_i32(f64::NAN).is_err());
    assert!(f64_to_i32(1e12).is_err());
    assert!(usize_to_i32(usize::MAX).is_err());
    assert!(u32_to_i32(u32::MAX).is_err());
    assert_eq!(f64_to_i32(640.0).unwrap(), 640);
}
