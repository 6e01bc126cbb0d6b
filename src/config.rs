//! Configuration management for the posture analyzer

use crate::{
    constants::{
        DEFAULT_FOURCC, DEFAULT_MIN_CORRECT_RATIO, DEFAULT_MIN_DETECTION_CONFIDENCE, DEFAULT_SIT_MAX_NECK_ANGLE,
        DEFAULT_SIT_MAX_TORSO_DEVIATION, DEFAULT_SQUATTING_KNEE_ANGLE, DEFAULT_SQUAT_MIN_TORSO_TILT,
        DEFAULT_STANDING_KNEE_ANGLE,
    },
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model configuration
    pub models: ModelConfig,

    /// Pose detection configuration
    pub detection: DetectionConfig,

    /// Posture type thresholds
    pub classification: ClassificationConfig,

    /// Correctness check thresholds
    pub assessment: AssessmentConfig,

    /// Video-level reduction
    pub aggregation: AggregationConfig,

    /// Annotated output video
    pub output: OutputConfig,
}

/// Model file paths configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the pose landmark ONNX model
    pub pose_landmarks: PathBuf,
}

/// Pose detection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum pose presence score (0.0-1.0)
    pub min_detection_confidence: f32,

    /// Joints below this visibility are ignored by the correctness checks (0.0-1.0)
    pub min_visibility: f64,
}

/// Knee angle thresholds, in degrees
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    pub standing_knee_angle: f64,
    pub squatting_knee_angle: f64,
}

/// Correctness thresholds, in degrees
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentConfig {
    pub squat_min_torso_tilt: f64,
    pub sit_max_neck_angle: f64,
    pub sit_max_torso_deviation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Share of correct frames needed for an overall correct verdict (0.0-1.0)
    pub min_correct_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Four character codec code
    pub fourcc: String,

    /// Feedback text scale
    pub font_scale: f64,

    /// Draw detected joints and bones
    pub draw_skeleton: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            pose_landmarks: PathBuf::from("assets/pose_landmark_full.onnx"),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_detection_confidence: DEFAULT_MIN_DETECTION_CONFIDENCE,
            min_visibility: 0.0,
        }
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            standing_knee_angle: DEFAULT_STANDING_KNEE_ANGLE,
            squatting_knee_angle: DEFAULT_SQUATTING_KNEE_ANGLE,
        }
    }
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            squat_min_torso_tilt: DEFAULT_SQUAT_MIN_TORSO_TILT,
            sit_max_neck_angle: DEFAULT_SIT_MAX_NECK_ANGLE,
            sit_max_torso_deviation: DEFAULT_SIT_MAX_TORSO_DEVIATION,
        }
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            min_correct_ratio: DEFAULT_MIN_CORRECT_RATIO,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            fourcc: DEFAULT_FOURCC.to_string(),
            font_scale: 1.0,
            draw_skeleton: true,
        }
    }
}

fn check_angle(name: &str, value: f64) -> Result<()> {
    if (0.0..=180.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::ConfigError(format!("{name} must be between 0 and 180 degrees")))
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate thresholds and output settings
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.detection.min_detection_confidence) {
            return Err(Error::ConfigError(
                "Detection confidence must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.detection.min_visibility) {
            return Err(Error::ConfigError(
                "Minimum visibility must be between 0.0 and 1.0".to_string(),
            ));
        }

        check_angle("Standing knee angle", self.classification.standing_knee_angle)?;
        check_angle("Squatting knee angle", self.classification.squatting_knee_angle)?;
        if self.classification.squatting_knee_angle > self.classification.standing_knee_angle {
            return Err(Error::ConfigError(
                "Squatting knee angle must not exceed the standing knee angle".to_string(),
            ));
        }

        check_angle("Squat torso tilt", self.assessment.squat_min_torso_tilt)?;
        check_angle("Sitting neck angle", self.assessment.sit_max_neck_angle)?;
        check_angle("Sitting torso deviation", self.assessment.sit_max_torso_deviation)?;

        if !(0.0..=1.0).contains(&self.aggregation.min_correct_ratio) {
            return Err(Error::ConfigError(
                "Minimum correct ratio must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.output.fourcc.chars().count() != 4 {
            return Err(Error::ConfigError(format!(
                "Codec must be a four character code, got {:?}",
                self.output.fourcc
            )));
        }
        if self.output.font_scale <= 0.0 {
            return Err(Error::ConfigError("Font scale must be positive".to_string()));
        }

        Ok(())
    }

    /// Check that the model file exists
    pub fn validate_model_paths(&self) -> Result<()> {
        if !self.models.pose_landmarks.exists() {
            return Err(Error::ConfigError(format!(
                "Pose landmark model not found: {}",
                self.models.pose_landmarks.display()
            )));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Posture Analyzer Configuration

# Model paths
models:
  pose_landmarks: "assets/pose_landmark_full.onnx"

# Pose detection
detection:
  min_detection_confidence: 0.5
  min_visibility: 0.0

# Posture type (knee angle, degrees)
classification:
  standing_knee_angle: 170.0
  squatting_knee_angle: 150.0

# Correctness checks (degrees)
assessment:
  squat_min_torso_tilt: 140.0
  sit_max_neck_angle: 30.0
  sit_max_torso_deviation: 30.0

# Whole-video verdict
aggregation:
  min_correct_ratio: 0.7

# Annotated output video
output:
  fourcc: "MJPG"
  font_scale: 1.0
  draw_skeleton: true
"#;
