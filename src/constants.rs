//! Constants used throughout the application

/// Number of body landmarks produced by the BlazePose topology
pub const NUM_POSE_LANDMARKS: usize = 33;

/// Minimum values per landmark in the model output (x, y, z, visibility)
pub const MIN_LANDMARK_STRIDE: usize = 4;

/// BlazePose landmark indices for the joints the classifier reads
pub const NOSE: usize = 0;
pub const LEFT_EAR: usize = 7;
pub const RIGHT_EAR: usize = 8;
pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_HIP: usize = 23;
pub const RIGHT_HIP: usize = 24;
pub const LEFT_KNEE: usize = 25;
pub const RIGHT_KNEE: usize = 26;
pub const LEFT_ANKLE: usize = 27;
pub const RIGHT_ANKLE: usize = 28;

/// Default pose landmark model input edge length
pub const DEFAULT_POSE_INPUT_SIZE: i32 = 256;

/// Default minimum pose presence score for a frame to count as a detection
pub const DEFAULT_MIN_DETECTION_CONFIDENCE: f32 = 0.5;

/// Knee angle (degrees) at or above which an upright ordering is standing
pub const DEFAULT_STANDING_KNEE_ANGLE: f64 = 170.0;

/// Knee angle (degrees) below which an upright ordering is a squat
pub const DEFAULT_SQUATTING_KNEE_ANGLE: f64 = 150.0;

/// Smallest torso tilt (180 = upright) accepted in a squat
pub const DEFAULT_SQUAT_MIN_TORSO_TILT: f64 = 140.0;

/// Largest shoulder-hip-ear angle accepted while sitting
pub const DEFAULT_SIT_MAX_NECK_ANGLE: f64 = 30.0;

/// Largest deviation of the torso from vertical accepted while sitting
pub const DEFAULT_SIT_MAX_TORSO_DEVIATION: f64 = 30.0;

/// Share of correct frames required for an overall correct verdict
pub const DEFAULT_MIN_CORRECT_RATIO: f64 = 0.7;

/// Codec used for the annotated output video
pub const DEFAULT_FOURCC: &str = "MJPG";

/// Default frames per second assumption when the container reports none
pub const DEFAULT_FPS: f64 = 30.0;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;
