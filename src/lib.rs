//! Posture assessment for short videos of a person sitting or squatting.
//!
//! The analysis pipeline consists of:
//! 1. Body landmark detection on every decoded frame (ONNX Runtime)
//! 2. Joint angle computation on the detected landmarks
//! 3. Per-frame posture classification and correctness checks
//! 4. Reduction of all frame verdicts into a single video verdict
//!
//! # Examples
//!
//! ## Analyzing a Video
//!
//! ```no_run
//! use posture_analyzer::{app::analyze_video, config::Config, pose_detection::OnnxPoseDetector};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let mut detector = OnnxPoseDetector::new("assets/pose_landmark_full.onnx", 0.5)?;
//!
//! let verdict = analyze_video(
//!     Path::new("squat.mp4"),
//!     Some(Path::new("squat_annotated.avi")),
//!     &mut detector,
//!     &config,
//! )?;
//! println!("{verdict}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Classifying a Single Frame
//!
//! ```no_run
//! use posture_analyzer::{classifier::PostureRules, joints::JointSet};
//!
//! # fn classify(joints: &JointSet) {
//! let rules = PostureRules::default();
//! let verdict = rules.assess(joints);
//! println!("{}", verdict.feedback());
//! for reason in verdict.assessment.iter().flat_map(|a| a.reasons()) {
//!     println!("  {reason}");
//! }
//! # }
//! ```
//!
//! ## Custom Frame Sources
//!
//! Anything implementing [`pose_detection::PoseOracle`] can drive the
//! analyzer, which makes it possible to replay precomputed landmarks:
//!
//! ```no_run
//! use posture_analyzer::{
//!     aggregator::{NullSink, PostureAnalyzer},
//!     joints::JointSet,
//!     pose_detection::PoseOracle,
//!     Result,
//! };
//!
//! struct Replay;
//!
//! impl PoseOracle for Replay {
//!     type Frame = Option<JointSet>;
//!
//!     fn detect(&mut self, frame: &Self::Frame) -> Result<Option<JointSet>> {
//!         Ok(*frame)
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let frames: Vec<Result<Option<JointSet>>> = vec![Ok(None)];
//! let verdict = PostureAnalyzer::default().analyze(frames, &mut Replay, &mut NullSink)?;
//! println!("{verdict}");
//! # Ok(())
//! # }
//! ```

/// Angle primitives on normalized 2-D points
pub mod geometry;

/// Named body joints extracted from pose landmarks
pub mod joints;

/// Per-frame posture classification and correctness checks
pub mod classifier;

/// Video-level tally and verdict
pub mod aggregator;

/// Pose landmark detection using ONNX Runtime
pub mod pose_detection;

/// Video decoding and annotated output
pub mod video;

/// Utility functions for coordinate transformations
pub mod utils;

/// Error types and result handling
pub mod error;

/// Main application module
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
