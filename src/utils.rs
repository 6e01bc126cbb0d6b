//! Utility functions for coordinate conversions.

pub mod safe_cast;

use opencv::core::Point as PixelPoint;
use safe_cast::f64_to_i32_clamp;

/// Map a normalized `(x, y)` position onto a frame of `width` x `height` pixels.
///
/// Positions outside the frame are clamped to its border.
#[must_use]
pub fn normalized_to_pixel(x: f64, y: f64, width: i32, height: i32) -> PixelPoint {
    let max_x = (width - 1).max(0);
    let max_y = (height - 1).max(0);
    PixelPoint::new(
        f64_to_i32_clamp(x * f64::from(width), 0, max_x),
        f64_to_i32_clamp(y * f64::from(height), 0, max_y),
    )
}
