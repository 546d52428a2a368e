//! Circular-range helpers for wrapped setpoints.

/// Positive modulo: the representative of `x` in `[0, range)`.
///
/// # Examples
///
/// ```
/// use openservo_control::fmod_pos;
///
/// assert!((fmod_pos(2.5, 1.0) - 0.5).abs() < 1e-6);
/// assert!((fmod_pos(-0.25, 1.0) - 0.75).abs() < 1e-6);
/// ```
#[inline]
pub fn fmod_pos(x: f32, range: f32) -> f32 {
    x.rem_euclid(range)
}

/// The representative of `x` in `[-range/2, range/2)`.
///
/// Used for circular position deltas: the shortest signed distance
/// around a wrap of length `range`.
///
/// # Examples
///
/// ```
/// use openservo_control::wrap_pm;
///
/// assert!((wrap_pm(0.75, 1.0) - (-0.25)).abs() < 1e-6);
/// assert!((wrap_pm(-0.75, 1.0) - 0.25).abs() < 1e-6);
/// ```
#[inline]
pub fn wrap_pm(x: f32, range: f32) -> f32 {
    let wrapped = x.rem_euclid(range);
    if wrapped >= 0.5 * range {
        wrapped - range
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmod_pos_range() {
        for x in [-3.7f32, -1.0, -0.1, 0.0, 0.4, 1.0, 2.9] {
            let wrapped = fmod_pos(x, 1.0);
            assert!((0.0..1.0).contains(&wrapped), "fmod_pos({x}) = {wrapped}");
        }
    }

    #[test]
    fn test_fmod_pos_idempotent() {
        for x in [-5.3f32, -0.5, 0.0, 0.7, 12.1] {
            let once = fmod_pos(x, 2.5);
            let twice = fmod_pos(once, 2.5);
            assert!((once - twice).abs() < 1e-6);
        }
    }

    #[test]
    fn test_wrap_pm_range() {
        for x in [-3.7f32, -0.5, 0.0, 0.49, 0.5, 0.99, 7.3] {
            let wrapped = wrap_pm(x, 1.0);
            assert!((-0.5..0.5).contains(&wrapped), "wrap_pm({x}) = {wrapped}");
        }
    }

    #[test]
    fn test_wrap_pm_shortest_delta() {
        // 0.9 forward is 0.1 backward on a unit circle
        assert!((wrap_pm(0.9, 1.0) - (-0.1)).abs() < 1e-6);
        // Half the range maps to the negative boundary
        assert!((wrap_pm(0.5, 1.0) - (-0.5)).abs() < 1e-6);
    }

    #[test]
    fn test_wrap_pm_idempotent() {
        for x in [-2.3f32, -0.49, 0.0, 0.49, 5.5] {
            let once = wrap_pm(x, 1.0);
            let twice = wrap_pm(once, 1.0);
            assert!((once - twice).abs() < 1e-6);
        }
    }
}
