//! Planar geometry over normalized joint coordinates.
//!
//! Coordinates follow image conventions: `x` grows to the right and `y`
//! grows downward, both normalized to the frame size.

use crate::{constants::EPSILON, joints::JointSet};

/// A point or vector in normalized frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Horizontal component
    pub x: f64,
    /// Vertical component, growing downward
    pub y: f64,
}

impl Point {
    /// Create a point from its components
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Midpoint between two points
    #[must_use]
    pub fn midpoint(self, other: Self) -> Self {
        Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Vector from `origin` to `self`
    #[must_use]
    pub fn sub(self, origin: Self) -> Self {
        Self::new(self.x - origin.x, self.y - origin.y)
    }

    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    #[must_use]
    pub fn norm(self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// Upward direction in frame coordinates
const VERTICAL: Point = Point::new(0.0, -1.0);

/// Angle in degrees between two vectors, or `None` if either has zero length
fn angle_between(v1: Point, v2: Point) -> Option<f64> {
    let (n1, n2) = (v1.norm(), v2.norm());
    if n1 < EPSILON || n2 < EPSILON {
        return None;
    }

    let cos_theta = (v1.dot(v2) / (n1 * n2)).clamp(-1.0, 1.0);
    Some(cos_theta.acos().to_degrees())
}

/// Angle in degrees at vertex `b` formed by the rays `b→a` and `b→c`.
///
/// A zero-length ray yields `0.0`. The result lies in `[0, 180]`.
#[must_use]
pub fn angle_at_vertex(a: Point, b: Point, c: Point) -> f64 {
    angle_between(a.sub(b), c.sub(b)).unwrap_or(0.0)
}

/// Deviation of the torso from vertical, expressed so that an upright torso
/// reads `180`, a horizontal torso `90` and an inverted torso `0`.
///
/// The torso axis runs from the hip midpoint to the shoulder midpoint.
/// Returns `None` when that axis has zero length.
#[must_use]
pub fn torso_tilt_from_vertical(joints: &JointSet) -> Option<f64> {
    let shoulders = joints.left_shoulder.position().midpoint(joints.right_shoulder.position());
    let hips = joints.left_hip.position().midpoint(joints.right_hip.position());

    angle_between(shoulders.sub(hips), VERTICAL).map(|angle| 180.0 - angle)
}
