//! Mathematical structs and functions.

use cgmath::prelude::*;
use cgmath::Point2;

/// A 2D point
pub type Point2d = Point2<f64>;

/// Moves from `from` toward `to` by at most `max_step`, never passing `to`.
///
/// # Parameters
/// * `from` - The starting point
/// * `to` - The point to move towards
/// * `max_step` - The maximum distance to travel, in the same units as the points
pub fn step_toward(from: Point2d, to: Point2d, max_step: f64) -> Point2d {
    let delta = to - from;
    let dist = delta.magnitude();
    if dist <= max_step {
        return to;
    }
    if max_step <= 0.0 {
        return from;
    }
    from + delta * (max_step / dist)
}
