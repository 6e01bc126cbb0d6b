//! Typed body joints for a single frame.

use crate::{
    constants::{
        LEFT_ANKLE, LEFT_EAR, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER, NOSE, NUM_POSE_LANDMARKS, RIGHT_ANKLE,
        RIGHT_EAR, RIGHT_HIP, RIGHT_KNEE, RIGHT_SHOULDER,
    },
    geometry::Point,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single landmark in normalized frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    /// Horizontal position (0 = left edge, 1 = right edge)
    pub x: f64,
    /// Vertical position (0 = top edge, 1 = bottom edge)
    pub y: f64,
    /// Probability that the landmark is visible, in `[0, 1]`
    #[serde(default = "full_visibility")]
    pub visibility: f64,
}

fn full_visibility() -> f64 {
    1.0
}

impl Joint {
    /// Create a fully visible joint
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y, visibility: 1.0 }
    }

    #[must_use]
    pub const fn with_visibility(self, visibility: f64) -> Self {
        Self { visibility, ..self }
    }

    #[must_use]
    pub const fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Body side as reported by the pose model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Both sides, left first
    pub const BOTH: [Self; 2] = [Self::Left, Self::Right];
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

/// The joints of one body side, top to bottom
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideJoints {
    pub ear: Joint,
    pub shoulder: Joint,
    pub hip: Joint,
    pub knee: Joint,
    pub ankle: Joint,
}

/// Every joint the classifier reads for one detected body.
///
/// A frame without a detected body is represented as `Option::<JointSet>::None`,
/// never as a zero-filled set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointSet {
    pub nose: Joint,
    pub left_ear: Joint,
    pub right_ear: Joint,
    pub left_shoulder: Joint,
    pub right_shoulder: Joint,
    pub left_hip: Joint,
    pub right_hip: Joint,
    pub left_knee: Joint,
    pub right_knee: Joint,
    pub left_ankle: Joint,
    pub right_ankle: Joint,
}

impl JointSet {
    /// A set where every joint sits at the same position
    #[must_use]
    pub const fn uniform(joint: Joint) -> Self {
        Self {
            nose: joint,
            left_ear: joint,
            right_ear: joint,
            left_shoulder: joint,
            right_shoulder: joint,
            left_hip: joint,
            right_hip: joint,
            left_knee: joint,
            right_knee: joint,
            left_ankle: joint,
            right_ankle: joint,
        }
    }

    /// Pick the named joints out of a full BlazePose landmark list
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than 33 landmarks are supplied
    pub fn from_landmarks(landmarks: &[Joint]) -> Result<Self> {
        if landmarks.len() < NUM_POSE_LANDMARKS {
            return Err(Error::InvalidInput(format!(
                "Expected {NUM_POSE_LANDMARKS} landmarks, got {}",
                landmarks.len()
            )));
        }

        Ok(Self {
            nose: landmarks[NOSE],
            left_ear: landmarks[LEFT_EAR],
            right_ear: landmarks[RIGHT_EAR],
            left_shoulder: landmarks[LEFT_SHOULDER],
            right_shoulder: landmarks[RIGHT_SHOULDER],
            left_hip: landmarks[LEFT_HIP],
            right_hip: landmarks[RIGHT_HIP],
            left_knee: landmarks[LEFT_KNEE],
            right_knee: landmarks[RIGHT_KNEE],
            left_ankle: landmarks[LEFT_ANKLE],
            right_ankle: landmarks[RIGHT_ANKLE],
        })
    }

    /// Joints of one body side
    #[must_use]
    pub const fn side(&self, side: Side) -> SideJoints {
        match side {
            Side::Left => SideJoints {
                ear: self.left_ear,
                shoulder: self.left_shoulder,
                hip: self.left_hip,
                knee: self.left_knee,
                ankle: self.left_ankle,
            },
            Side::Right => SideJoints {
                ear: self.right_ear,
                shoulder: self.right_shoulder,
                hip: self.right_hip,
                knee: self.right_knee,
                ankle: self.right_ankle,
            },
        }
    }

    /// Apply `f` to every joint
    #[must_use]
    pub fn map(&self, f: impl Fn(Joint) -> Joint) -> Self {
        Self {
            nose: f(self.nose),
            left_ear: f(self.left_ear),
            right_ear: f(self.right_ear),
            left_shoulder: f(self.left_shoulder),
            right_shoulder: f(self.right_shoulder),
            left_hip: f(self.left_hip),
            right_hip: f(self.right_hip),
            left_knee: f(self.left_knee),
            right_knee: f(self.right_knee),
            left_ankle: f(self.left_ankle),
            right_ankle: f(self.right_ankle),
        }
    }

    /// All joints, for drawing
    #[must_use]
    pub const fn joints(&self) -> [Joint; 11] {
        [
            self.nose,
            self.left_ear,
            self.right_ear,
            self.left_shoulder,
            self.right_shoulder,
            self.left_hip,
            self.right_hip,
            self.left_knee,
            self.right_knee,
            self.left_ankle,
            self.right_ankle,
        ]
    }

    /// Skeleton segments connecting the joints, for drawing
    #[must_use]
    pub fn bones(&self) -> [(Joint, Joint); 11] {
        let ear_center = Joint {
            x: (self.left_ear.x + self.right_ear.x) / 2.0,
            y: (self.left_ear.y + self.right_ear.y) / 2.0,
            visibility: self.left_ear.visibility.min(self.right_ear.visibility),
        };

        [
            (self.left_ear, self.left_shoulder),
            (self.right_ear, self.right_shoulder),
            (self.left_shoulder, self.right_shoulder),
            (self.left_shoulder, self.left_hip),
            (self.right_shoulder, self.right_hip),
            (self.left_hip, self.right_hip),
            (self.left_hip, self.left_knee),
            (self.right_hip, self.right_knee),
            (self.left_knee, self.left_ankle),
            (self.right_knee, self.right_ankle),
            (self.nose, ear_center),
        ]
    }
}
