//! Stateless random and vector helpers.

use glam::Vec2;
use rand::Rng;

/// Draws a uniform value between `min` and `max`.
///
/// Inverted ranges are accepted and sample between the two bounds.
pub fn rand_range<R: Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> f32 {
    rng.gen::<f32>() * (max - min) + min
}

/// Picks a uniformly random element, or `None` when the slice is empty.
pub fn pick<'a, T, R: Rng + ?Sized>(rng: &mut R, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(rng.gen_range(0..items.len()))
}

/// Rotates a vector counter-clockwise by `theta` radians.
#[must_use]
pub fn rotate(vector: Vec2, theta: f32) -> Vec2 {
    Vec2::from_angle(theta).rotate(vector)
}

/// Rescales a vector to the provided length while keeping its direction.
///
/// A zero vector stays zero.
#[must_use]
pub fn with_length(vector: Vec2, length: f32) -> Vec2 {
    let current = vector.length();
    let divisor = if current > 0.0 { current } else { 1.0 };
    vector / divisor * length
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn rand_range_stays_within_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..1_000 {
            let value = rand_range(&mut rng, -3.0, 5.0);
            assert!((-3.0..5.0).contains(&value), "{value} escaped the range");
        }
    }

    #[test]
    fn rand_range_accepts_inverted_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        for _ in 0..100 {
            let value = rand_range(&mut rng, 300.0, 100.0);
            assert!((100.0..=300.0).contains(&value));
        }
    }

    #[test]
    fn pick_returns_none_for_empty_sets() {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let empty: [&str; 0] = [];
        assert!(pick(&mut rng, &empty).is_none());
        assert_eq!(pick(&mut rng, &["only"]), Some(&"only"));
    }

    #[test]
    fn rotate_quarter_turn_swaps_axes() {
        let rotated = rotate(Vec2::new(1.0, 0.0), FRAC_PI_2);
        assert!(rotated.abs_diff_eq(Vec2::new(0.0, 1.0), 1e-6));
    }

    #[test]
    fn with_length_preserves_direction() {
        let scaled = with_length(Vec2::new(3.0, 4.0), 10.0);
        assert!(scaled.abs_diff_eq(Vec2::new(6.0, 8.0), 1e-5));
        assert_eq!(with_length(Vec2::ZERO, 10.0), Vec2::ZERO);
    }
}
