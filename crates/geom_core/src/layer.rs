//! Discrete vertical strata (floors/basements) used to filter collisions and
//! visibility independent of 2-D position.
//!
//! Ground levels sit at multiples of 3; the two indices between adjacent
//! ground levels are stair transitions. Melee and interaction checks accept
//! adjacent-or-equal layers so targets on a stair step still qualify.

pub const GROUND_LAYER: i32 = 0;
pub const FIRST_FLOOR: i32 = 3;
pub const FIRST_BASEMENT: i32 = -3;

#[inline]
#[must_use]
pub fn is_ground_layer(layer: i32) -> bool {
    layer % 3 == 0
}

#[inline]
#[must_use]
pub fn is_stair_layer(layer: i32) -> bool {
    layer % 3 != 0
}

#[inline]
#[must_use]
pub fn equal_layer(reference: i32, eval: i32) -> bool {
    reference == eval
}

#[inline]
#[must_use]
pub fn adjacent_layer(reference: i32, eval: i32) -> bool {
    reference - 1 == eval || reference + 1 == eval
}

#[inline]
#[must_use]
pub fn adjacent_or_equal_layer(reference: i32, eval: i32) -> bool {
    (reference - eval).abs() <= 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ground_and_stair_partition() {
        assert!(is_ground_layer(GROUND_LAYER));
        assert!(is_ground_layer(FIRST_FLOOR));
        assert!(is_ground_layer(FIRST_BASEMENT));
        assert!(is_stair_layer(1));
        assert!(is_stair_layer(-2));
    }

    #[test]
    fn adjacency_is_symmetric_and_tight() {
        assert!(adjacent_or_equal_layer(0, 0));
        assert!(adjacent_or_equal_layer(0, 1));
        assert!(adjacent_or_equal_layer(1, 0));
        assert!(!adjacent_or_equal_layer(0, 2));
        assert!(adjacent_layer(0, -1));
        assert!(!adjacent_layer(0, 0));
    }
}
