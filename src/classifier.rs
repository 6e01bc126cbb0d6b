//! Per-frame posture classification and correctness checks.
//!
//! A frame is first labelled with a coarse [`Posture`]. Sitting and squatting
//! frames are then checked against joint-angle thresholds, producing an
//! [`Assessment`] with typed [`Fault`]s explaining any incorrect posture.

use crate::{
    config::Config,
    constants::{
        DEFAULT_SIT_MAX_NECK_ANGLE, DEFAULT_SIT_MAX_TORSO_DEVIATION, DEFAULT_SQUATTING_KNEE_ANGLE,
        DEFAULT_SQUAT_MIN_TORSO_TILT, DEFAULT_STANDING_KNEE_ANGLE,
    },
    geometry::{angle_at_vertex, torso_tilt_from_vertical},
    joints::{Joint, JointSet, Side},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse posture label for a single frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Posture {
    Sitting,
    Squatting,
    Standing,
    Other,
}

impl Posture {
    /// Whether frames with this label receive a correctness check
    #[must_use]
    pub const fn is_assessed(self) -> bool {
        matches!(self, Self::Sitting | Self::Squatting)
    }
}

impl fmt::Display for Posture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Sitting => "Sitting",
            Self::Squatting => "Squatting",
            Self::Standing => "Standing",
            Self::Other => "Other",
        };
        f.write_str(label)
    }
}

/// A reason a sitting or squatting frame was judged incorrect
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fault {
    /// Knee extends horizontally past the ankle during a squat
    KneeOverToe { side: Side },
    /// Torso tilted too far forward during a squat
    ForwardLean { torso_tilt: f64 },
    /// Head pushed forward while sitting
    ForwardHeadTilt { neck_angle: f64 },
    /// Back rounded or leaning while sitting
    Slouching { deviation: f64 },
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KneeOverToe { side } => write!(f, "{side} knee extends past the toes"),
            Self::ForwardLean { torso_tilt } => {
                write!(f, "torso leans too far forward (tilt {torso_tilt:.1}°)")
            }
            Self::ForwardHeadTilt { neck_angle } => {
                write!(f, "head tilted forward (neck angle {neck_angle:.1}°)")
            }
            Self::Slouching { deviation } => {
                write!(f, "back is slouched ({deviation:.1}° from vertical)")
            }
        }
    }
}

/// Outcome of a correctness check
#[derive(Debug, Clone, PartialEq)]
pub enum Assessment {
    Correct,
    Incorrect(Vec<Fault>),
    /// Too few usable joints to judge the frame either way
    InsufficientData,
}

impl Assessment {
    fn from_faults(evaluated: bool, faults: Vec<Fault>) -> Self {
        if !evaluated {
            Self::InsufficientData
        } else if faults.is_empty() {
            Self::Correct
        } else {
            Self::Incorrect(faults)
        }
    }

    #[must_use]
    pub const fn is_incorrect(&self) -> bool {
        matches!(self, Self::Incorrect(_))
    }

    /// Reasons for an incorrect assessment, empty otherwise
    #[must_use]
    pub fn faults(&self) -> &[Fault] {
        match self {
            Self::Incorrect(faults) => faults,
            _ => &[],
        }
    }

    /// Human-readable reasons for an incorrect assessment
    #[must_use]
    pub fn reasons(&self) -> Vec<String> {
        self.faults().iter().map(ToString::to_string).collect()
    }
}

/// Classification of one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameVerdict {
    pub posture: Posture,
    /// Present only for sitting and squatting frames
    pub assessment: Option<Assessment>,
}

impl FrameVerdict {
    /// Short overlay text, e.g. "Correct Sitting"
    #[must_use]
    pub fn feedback(&self) -> String {
        match &self.assessment {
            Some(Assessment::Correct) => format!("Correct {}", self.posture),
            Some(Assessment::Incorrect(_)) => format!("Incorrect {}", self.posture),
            Some(Assessment::InsufficientData) => format!("{} (insufficient data)", self.posture),
            None => self.posture.to_string(),
        }
    }
}

/// Thresholds used to classify and check individual frames
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostureRules {
    /// Knee angle at or above which an upright ordering counts as standing
    pub standing_knee_angle: f64,
    /// Knee angle below which an upright ordering counts as squatting
    pub squatting_knee_angle: f64,
    /// Smallest torso tilt accepted in a squat
    pub squat_min_torso_tilt: f64,
    /// Largest neck angle accepted while sitting
    pub sit_max_neck_angle: f64,
    /// Largest torso deviation from vertical accepted while sitting
    pub sit_max_torso_deviation: f64,
    /// Joints below this visibility are ignored by the correctness checks
    pub min_visibility: f64,
}

impl Default for PostureRules {
    fn default() -> Self {
        Self {
            standing_knee_angle: DEFAULT_STANDING_KNEE_ANGLE,
            squatting_knee_angle: DEFAULT_SQUATTING_KNEE_ANGLE,
            squat_min_torso_tilt: DEFAULT_SQUAT_MIN_TORSO_TILT,
            sit_max_neck_angle: DEFAULT_SIT_MAX_NECK_ANGLE,
            sit_max_torso_deviation: DEFAULT_SIT_MAX_TORSO_DEVIATION,
            min_visibility: 0.0,
        }
    }
}

impl PostureRules {
    /// Build rules from the loaded configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            standing_knee_angle: config.classification.standing_knee_angle,
            squatting_knee_angle: config.classification.squatting_knee_angle,
            squat_min_torso_tilt: config.assessment.squat_min_torso_tilt,
            sit_max_neck_angle: config.assessment.sit_max_neck_angle,
            sit_max_torso_deviation: config.assessment.sit_max_torso_deviation,
            min_visibility: config.detection.min_visibility,
        }
    }

    fn usable(&self, joint: &Joint) -> bool {
        joint.visibility >= self.min_visibility
    }

    /// Torso tilt, if the shoulders and hips are usable and the torso has length
    fn torso_tilt(&self, joints: &JointSet) -> Option<f64> {
        let torso = [
            &joints.left_shoulder,
            &joints.right_shoulder,
            &joints.left_hip,
            &joints.right_hip,
        ];
        if torso.into_iter().all(|joint| self.usable(joint)) {
            torso_tilt_from_vertical(joints)
        } else {
            None
        }
    }

    /// Label the frame as sitting, squatting, standing or other.
    ///
    /// The shoulders, hips and knees must be stacked top to bottom; the mean
    /// knee angle then separates standing, sitting and squatting. A frame
    /// with any shoulder, hip, knee or ankle below the visibility threshold
    /// is other.
    #[must_use]
    pub fn classify_posture_type(&self, joints: &JointSet) -> Posture {
        let stance = [
            &joints.left_shoulder,
            &joints.right_shoulder,
            &joints.left_hip,
            &joints.right_hip,
            &joints.left_knee,
            &joints.right_knee,
            &joints.left_ankle,
            &joints.right_ankle,
        ];
        if !stance.into_iter().all(|joint| self.usable(joint)) {
            return Posture::Other;
        }

        let knee_angle = Side::BOTH
            .iter()
            .map(|&side| {
                let s = joints.side(side);
                angle_at_vertex(s.hip.position(), s.knee.position(), s.ankle.position())
            })
            .sum::<f64>()
            / 2.0;

        let shoulder_y = (joints.left_shoulder.y + joints.right_shoulder.y) / 2.0;
        let hip_y = (joints.left_hip.y + joints.right_hip.y) / 2.0;
        let knee_y = (joints.left_knee.y + joints.right_knee.y) / 2.0;

        if !(shoulder_y < hip_y && hip_y < knee_y) {
            return Posture::Other;
        }

        if knee_angle >= self.standing_knee_angle {
            Posture::Standing
        } else if knee_angle < self.squatting_knee_angle {
            Posture::Squatting
        } else {
            Posture::Sitting
        }
    }

    /// Check a squatting frame for knees past the toes and forward lean
    #[must_use]
    pub fn check_squat_correctness(&self, joints: &JointSet) -> Assessment {
        let mut evaluated = false;
        let mut faults = Vec::new();

        for side in Side::BOTH {
            let s = joints.side(side);
            if self.usable(&s.knee) && self.usable(&s.ankle) {
                evaluated = true;
                if s.knee.x > s.ankle.x {
                    faults.push(Fault::KneeOverToe { side });
                }
            }
        }

        if let Some(torso_tilt) = self.torso_tilt(joints) {
            evaluated = true;
            if torso_tilt < self.squat_min_torso_tilt {
                faults.push(Fault::ForwardLean { torso_tilt });
            }
        }

        Assessment::from_faults(evaluated, faults)
    }

    /// Neck angle averaged over the sides with usable shoulder, hip and ear
    fn neck_angle(&self, joints: &JointSet) -> Option<f64> {
        let angles: Vec<f64> = Side::BOTH
            .iter()
            .map(|&side| joints.side(side))
            .filter(|s| self.usable(&s.shoulder) && self.usable(&s.hip) && self.usable(&s.ear))
            .map(|s| angle_at_vertex(s.shoulder.position(), s.hip.position(), s.ear.position()))
            .collect();

        if angles.is_empty() {
            None
        } else {
            Some(angles.iter().sum::<f64>() / angles.len() as f64)
        }
    }

    /// Check a sitting frame for forward head tilt and slouching
    #[must_use]
    pub fn check_sit_correctness(&self, joints: &JointSet) -> Assessment {
        let mut evaluated = false;
        let mut faults = Vec::new();

        if let Some(neck_angle) = self.neck_angle(joints) {
            evaluated = true;
            if neck_angle > self.sit_max_neck_angle {
                faults.push(Fault::ForwardHeadTilt { neck_angle });
            }
        }

        if let Some(torso_tilt) = self.torso_tilt(joints) {
            evaluated = true;
            let deviation = (torso_tilt - 180.0).abs();
            if deviation > self.sit_max_torso_deviation {
                faults.push(Fault::Slouching { deviation });
            }
        }

        Assessment::from_faults(evaluated, faults)
    }

    /// Classify a frame and run the matching correctness check
    #[must_use]
    pub fn assess(&self, joints: &JointSet) -> FrameVerdict {
        let posture = self.classify_posture_type(joints);
        let assessment = match posture {
            Posture::Sitting => Some(self.check_sit_correctness(joints)),
            Posture::Squatting => Some(self.check_squat_correctness(joints)),
            Posture::Standing | Posture::Other => None,
        };

        log::debug!("Frame classified as {posture} ({assessment:?})");
        FrameVerdict { posture, assessment }
    }
}

/// [`PostureRules::classify_posture_type`] with default thresholds
#[must_use]
pub fn classify_posture_type(joints: &JointSet) -> Posture {
    PostureRules::default().classify_posture_type(joints)
}

/// [`PostureRules::check_squat_correctness`] with default thresholds
#[must_use]
pub fn check_squat_correctness(joints: &JointSet) -> Assessment {
    PostureRules::default().check_squat_correctness(joints)
}

/// [`PostureRules::check_sit_correctness`] with default thresholds
#[must_use]
pub fn check_sit_correctness(joints: &JointSet) -> Assessment {
    PostureRules::default().check_sit_correctness(joints)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Side view: shoulder above hip above knee, knee bent to `knee_angle`
    /// by swinging the ankle around the knee.
    fn body(knee_angle: f64) -> JointSet {
        let hip = (0.5, 0.5);
        let knee = (0.5, 0.7);
        // thigh points up from the knee; rotate by the knee angle for the shin
        let theta = knee_angle.to_radians();
        let ankle = (knee.0 - 0.2 * theta.sin(), knee.1 - 0.2 * theta.cos());

        let at = |x: f64, y: f64| Joint::new(x, y);
        JointSet {
            nose: at(0.5, 0.12),
            left_ear: at(0.5, 0.15),
            right_ear: at(0.5, 0.15),
            left_shoulder: at(0.5, 0.25),
            right_shoulder: at(0.5, 0.25),
            left_hip: at(hip.0, hip.1),
            right_hip: at(hip.0, hip.1),
            left_knee: at(knee.0, knee.1),
            right_knee: at(knee.0, knee.1),
            left_ankle: at(ankle.0, ankle.1),
            right_ankle: at(ankle.0, ankle.1),
        }
    }

    #[test]
    fn test_body_helper_produces_requested_knee_angle() {
        let joints = body(120.0);
        let s = joints.side(Side::Left);
        let angle = angle_at_vertex(s.hip.position(), s.knee.position(), s.ankle.position());
        assert!((angle - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_knee_thresholds() {
        assert_eq!(classify_posture_type(&body(180.0)), Posture::Standing);
        assert_eq!(classify_posture_type(&body(170.5)), Posture::Standing);
        assert_eq!(classify_posture_type(&body(160.0)), Posture::Sitting);
        assert_eq!(classify_posture_type(&body(150.5)), Posture::Sitting);
        assert_eq!(classify_posture_type(&body(149.0)), Posture::Squatting);
        assert_eq!(classify_posture_type(&body(90.0)), Posture::Squatting);
    }

    #[test]
    fn test_broken_vertical_ordering_is_other() {
        // lying down: everything at the same height
        let flat = body(180.0).map(|j| Joint { y: 0.5, ..j });
        assert_eq!(classify_posture_type(&flat), Posture::Other);

        // hips above shoulders
        let inverted = JointSet {
            left_shoulder: Joint::new(0.5, 0.6),
            right_shoulder: Joint::new(0.5, 0.6),
            ..body(160.0)
        };
        assert_eq!(classify_posture_type(&inverted), Posture::Other);
    }

    #[test]
    fn test_custom_thresholds() {
        let rules = PostureRules {
            squatting_knee_angle: 100.0,
            ..PostureRules::default()
        };
        assert_eq!(rules.classify_posture_type(&body(120.0)), Posture::Sitting);
    }

    #[test]
    fn test_squat_with_knees_behind_toes_is_correct() {
        // ankles ahead of the knees
        let joints = JointSet {
            left_ankle: Joint::new(0.7, 0.7),
            right_ankle: Joint::new(0.7, 0.7),
            ..body(90.0)
        };
        assert_eq!(check_squat_correctness(&joints), Assessment::Correct);
    }

    #[test]
    fn test_squat_knee_over_toe() {
        let joints = JointSet {
            right_knee: Joint::new(0.6, 0.7),
            right_ankle: Joint::new(0.4, 0.9),
            left_knee: Joint::new(0.4, 0.7),
            left_ankle: Joint::new(0.45, 0.9),
            ..body(90.0)
        };
        let assessment = check_squat_correctness(&joints);
        assert_eq!(assessment.faults(), &[Fault::KneeOverToe { side: Side::Right }]);
        assert!(assessment.reasons()[0].contains("right knee"));
    }

    #[test]
    fn test_squat_forward_lean() {
        let joints = JointSet {
            left_shoulder: Joint::new(0.8, 0.4),
            right_shoulder: Joint::new(0.8, 0.4),
            left_ankle: Joint::new(0.7, 0.7),
            right_ankle: Joint::new(0.7, 0.7),
            ..body(90.0)
        };
        match check_squat_correctness(&joints) {
            Assessment::Incorrect(faults) => {
                assert!(matches!(faults[0], Fault::ForwardLean { torso_tilt } if torso_tilt < 140.0));
            }
            other => panic!("Expected forward lean, got {other:?}"),
        }
    }

    #[test]
    fn test_squat_insufficient_data() {
        let rules = PostureRules {
            min_visibility: 0.5,
            ..PostureRules::default()
        };
        let hidden = body(90.0).map(|j| j.with_visibility(0.1));
        assert_eq!(rules.check_squat_correctness(&hidden), Assessment::InsufficientData);
    }

    #[test]
    fn test_upright_sitting_is_correct() {
        assert_eq!(check_sit_correctness(&body(160.0)), Assessment::Correct);
    }

    #[test]
    fn test_sitting_head_forward() {
        let joints = JointSet {
            left_ear: Joint::new(0.7, 0.2),
            right_ear: Joint::new(0.7, 0.2),
            ..body(160.0)
        };
        let assessment = check_sit_correctness(&joints);
        assert!(matches!(
            assessment.faults(),
            [Fault::ForwardHeadTilt { neck_angle }] if *neck_angle > 30.0
        ));
    }

    #[test]
    fn test_sitting_slouch() {
        let joints = JointSet {
            left_shoulder: Joint::new(0.75, 0.3),
            right_shoulder: Joint::new(0.75, 0.3),
            left_ear: Joint::new(0.8, 0.2),
            right_ear: Joint::new(0.8, 0.2),
            ..body(160.0)
        };
        let assessment = check_sit_correctness(&joints);
        assert!(assessment
            .faults()
            .iter()
            .any(|f| matches!(f, Fault::Slouching { deviation } if *deviation > 30.0)));
    }

    #[test]
    fn test_sitting_uses_single_visible_side() {
        let rules = PostureRules {
            min_visibility: 0.5,
            ..PostureRules::default()
        };
        let joints = JointSet {
            left_ear: Joint::new(0.9, 0.3).with_visibility(0.1),
            ..body(160.0)
        };
        assert_eq!(rules.check_sit_correctness(&joints), Assessment::Correct);
        assert!(check_sit_correctness(&joints).is_incorrect());
    }

    #[test]
    fn test_assess_dispatches_by_posture() {
        let rules = PostureRules::default();
        assert_eq!(rules.assess(&body(180.0)).assessment, None);
        assert_eq!(rules.assess(&body(160.0)).feedback(), "Correct Sitting");
        assert_eq!(rules.assess(&body(90.0)).posture, Posture::Squatting);
    }

    #[test]
    fn test_hidden_legs_are_other() {
        let rules = PostureRules {
            min_visibility: 0.5,
            ..PostureRules::default()
        };
        let hidden = |j: Joint| j.with_visibility(0.05);
        let seated = body(160.0);
        let joints = JointSet {
            left_knee: hidden(seated.left_knee),
            right_knee: hidden(seated.right_knee),
            left_ankle: hidden(seated.left_ankle),
            right_ankle: hidden(seated.right_ankle),
            ..seated
        };

        assert_eq!(rules.classify_posture_type(&joints), Posture::Other);
        assert_eq!(rules.assess(&joints).assessment, None);

        // one hidden shoulder is enough
        let joints = JointSet {
            right_shoulder: hidden(seated.right_shoulder),
            ..seated
        };
        assert_eq!(rules.classify_posture_type(&joints), Posture::Other);

        // hidden ears do not affect the label
        let joints = JointSet {
            left_ear: hidden(seated.left_ear),
            right_ear: hidden(seated.right_ear),
            ..seated
        };
        assert_eq!(rules.classify_posture_type(&joints), Posture::Sitting);
    }

    /// Mean knee angle exactly as the classifier measures it
    fn knee_angle(joints: &JointSet) -> f64 {
        Side::BOTH
            .iter()
            .map(|&side| {
                let s = joints.side(side);
                angle_at_vertex(s.hip.position(), s.knee.position(), s.ankle.position())
            })
            .sum::<f64>()
            / 2.0
    }

    const NUDGE: f64 = 1e-9;

    #[test]
    fn test_standing_threshold_is_inclusive() {
        let joints = body(165.0);
        let angle = knee_angle(&joints);

        let at = PostureRules {
            standing_knee_angle: angle,
            ..PostureRules::default()
        };
        assert_eq!(at.classify_posture_type(&joints), Posture::Standing);

        let above = PostureRules {
            standing_knee_angle: angle + NUDGE,
            ..PostureRules::default()
        };
        assert_eq!(above.classify_posture_type(&joints), Posture::Sitting);
    }

    #[test]
    fn test_squatting_threshold_is_exclusive() {
        let joints = body(140.0);
        let angle = knee_angle(&joints);

        let at = PostureRules {
            squatting_knee_angle: angle,
            ..PostureRules::default()
        };
        assert_eq!(at.classify_posture_type(&joints), Posture::Sitting);

        let above = PostureRules {
            squatting_knee_angle: angle + NUDGE,
            ..PostureRules::default()
        };
        assert_eq!(above.classify_posture_type(&joints), Posture::Squatting);
    }

    #[test]
    fn test_squat_torso_tilt_threshold_is_inclusive() {
        let joints = JointSet {
            left_shoulder: Joint::new(0.8, 0.4),
            right_shoulder: Joint::new(0.8, 0.4),
            left_ankle: Joint::new(0.7, 0.7),
            right_ankle: Joint::new(0.7, 0.7),
            ..body(90.0)
        };
        let tilt = torso_tilt_from_vertical(&joints).unwrap();

        let at = PostureRules {
            squat_min_torso_tilt: tilt,
            ..PostureRules::default()
        };
        assert_eq!(at.check_squat_correctness(&joints), Assessment::Correct);

        let above = PostureRules {
            squat_min_torso_tilt: tilt + NUDGE,
            ..PostureRules::default()
        };
        assert_eq!(
            above.check_squat_correctness(&joints).faults(),
            &[Fault::ForwardLean { torso_tilt: tilt }]
        );
    }

    #[test]
    fn test_sit_neck_threshold_is_inclusive() {
        let joints = JointSet {
            left_ear: Joint::new(0.7, 0.2),
            right_ear: Joint::new(0.7, 0.2),
            ..body(160.0)
        };
        let left = joints.side(Side::Left);
        let neck = angle_at_vertex(left.shoulder.position(), left.hip.position(), left.ear.position());

        let at = PostureRules {
            sit_max_neck_angle: neck,
            ..PostureRules::default()
        };
        assert_eq!(at.check_sit_correctness(&joints), Assessment::Correct);

        let below = PostureRules {
            sit_max_neck_angle: neck - NUDGE,
            ..PostureRules::default()
        };
        assert_eq!(
            below.check_sit_correctness(&joints).faults(),
            &[Fault::ForwardHeadTilt { neck_angle: neck }]
        );
    }

    #[test]
    fn test_sit_torso_deviation_threshold_is_inclusive() {
        let joints = JointSet {
            left_shoulder: Joint::new(0.75, 0.3),
            right_shoulder: Joint::new(0.75, 0.3),
            left_ear: Joint::new(0.8, 0.2),
            right_ear: Joint::new(0.8, 0.2),
            ..body(160.0)
        };
        let deviation = (torso_tilt_from_vertical(&joints).unwrap() - 180.0).abs();

        let at = PostureRules {
            sit_max_neck_angle: 180.0,
            sit_max_torso_deviation: deviation,
            ..PostureRules::default()
        };
        assert_eq!(at.check_sit_correctness(&joints), Assessment::Correct);

        let below = PostureRules {
            sit_max_torso_deviation: deviation - NUDGE,
            ..at
        };
        assert_eq!(below.check_sit_correctness(&joints).faults(), &[Fault::Slouching { deviation }]);
    }
}
