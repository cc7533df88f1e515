//! Angle and cardinal-orientation helpers shared by hitboxes and the
//! obstacle/door state machine.

use glam::Vec2;

/// Cardinal orientation: 0 = up, then clockwise quarter turns.
///
/// Axis-aligned rectangles stay axis-aligned under these four rotations;
/// anything finer requires a polygon hitbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Up,
    Right,
    Down,
    Left,
}

impl Orientation {
    #[must_use]
    pub fn from_index(i: u8) -> Self {
        match i % 4 {
            0 => Self::Up,
            1 => Self::Right,
            2 => Self::Down,
            _ => Self::Left,
        }
    }

    #[must_use]
    pub fn index(self) -> u8 {
        match self {
            Self::Up => 0,
            Self::Right => 1,
            Self::Down => 2,
            Self::Left => 3,
        }
    }

    /// Rotate a local-space vector into this orientation's frame.
    #[inline]
    #[must_use]
    pub fn rotate(self, v: Vec2) -> Vec2 {
        match self {
            Self::Up => v,
            Self::Right => Vec2::new(-v.y, v.x),
            Self::Down => Vec2::new(-v.x, -v.y),
            Self::Left => Vec2::new(v.y, -v.x),
        }
    }
}

/// Offset `base` by `offset` rotated into `orientation`'s frame.
#[inline]
#[must_use]
pub fn add_adjust(base: Vec2, offset: Vec2, orientation: Orientation) -> Vec2 {
    base + orientation.rotate(offset)
}

/// Map an angle onto [-pi, pi).
#[inline]
#[must_use]
pub fn normalize_angle(angle: f32) -> f32 {
    let tau = std::f32::consts::TAU;
    let a = angle.rem_euclid(tau);
    if a >= std::f32::consts::PI { a - tau } else { a }
}

/// Angle of the vector from `a` to `b`.
#[inline]
#[must_use]
pub fn angle_between_points(a: Vec2, b: Vec2) -> f32 {
    (a.y - b.y).atan2(a.x - b.x)
}

/// Unit direction for a rotation angle.
#[inline]
#[must_use]
pub fn direction(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn normalize_angle_wraps_into_half_open_range() {
        assert!((normalize_angle(PI + 0.1) - (-PI + 0.1)).abs() < 1e-5);
        assert!((normalize_angle(-PI - 0.1) - (PI - 0.1)).abs() < 1e-5);
        assert!((normalize_angle(0.25) - 0.25).abs() < 1e-6);
        // pi itself maps to -pi (half-open upper bound)
        assert!((normalize_angle(PI) + PI).abs() < 1e-5);
    }

    #[test]
    fn orientation_rotation_is_quarter_turns() {
        let v = Vec2::new(1.0, 0.0);
        assert_eq!(Orientation::Up.rotate(v), v);
        let r = Orientation::Right.rotate(v);
        assert!((r - Vec2::new(0.0, 1.0)).length() < 1e-6);
        let d = Orientation::Down.rotate(v);
        assert!((d - Vec2::new(-1.0, 0.0)).length() < 1e-6);
        let l = Orientation::Left.rotate(v);
        assert!((l - Vec2::new(0.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn four_quarter_turns_compose_to_identity() {
        let v = Vec2::new(0.3, -1.7);
        let once = Orientation::Right.rotate(v);
        let twice = Orientation::Right.rotate(once);
        let thrice = Orientation::Right.rotate(twice);
        let full = Orientation::Right.rotate(thrice);
        assert!((full - v).length() < 1e-6);
    }

    #[test]
    fn direction_matches_axes() {
        assert!((direction(0.0) - Vec2::X).length() < 1e-6);
        assert!((direction(FRAC_PI_2) - Vec2::Y).length() < 1e-6);
    }
}
