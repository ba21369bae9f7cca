//! Angular math for reference-frame estimation.
//!
//! The estimator contract is specified in degrees, so everything here works
//! in degrees. Angles are normalized to the half-open interval (-180, 180].

/// Normalize an angle in degrees to (-180, 180].
///
/// # Example
/// ```
/// use marga_nav::core::math::normalize_deg;
///
/// assert!((normalize_deg(540.0) - 180.0).abs() < 1e-6);
/// assert!((normalize_deg(-180.0) - 180.0).abs() < 1e-6);
/// ```
#[inline]
pub fn normalize_deg(angle: f32) -> f32 {
    let mut a = angle % 360.0;
    if a > 180.0 {
        a -= 360.0;
    } else if a <= -180.0 {
        a += 360.0;
    }
    a
}

/// Bearing of a planar delta in degrees: `atan2(dy, dx)`.
#[inline]
pub fn bearing_deg(dx: f32, dy: f32) -> f32 {
    dy.atan2(dx).to_degrees()
}

/// Rotate a planar vector counter-clockwise by `angle_deg` degrees.
#[inline]
pub fn rotate_deg(x: f32, y: f32, angle_deg: f32) -> (f32, f32) {
    let (sin_t, cos_t) = angle_deg.to_radians().sin_cos();
    (x * cos_t - y * sin_t, x * sin_t + y * cos_t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_deg_identity() {
        assert_relative_eq!(normalize_deg(0.0), 0.0);
        assert_relative_eq!(normalize_deg(45.0), 45.0);
        assert_relative_eq!(normalize_deg(-90.0), -90.0);
    }

    #[test]
    fn test_normalize_deg_wraps() {
        assert_relative_eq!(normalize_deg(360.0), 0.0, epsilon = 1e-6);
        assert_relative_eq!(normalize_deg(-360.0), 0.0, epsilon = 1e-6);
        assert_relative_eq!(normalize_deg(450.0), 90.0, epsilon = 1e-6);
        assert_relative_eq!(normalize_deg(-450.0), -90.0, epsilon = 1e-6);
    }

    #[test]
    fn test_normalize_deg_half_open_boundary() {
        // 180 stays, -180 wraps to +180
        assert_relative_eq!(normalize_deg(180.0), 180.0, epsilon = 1e-6);
        assert_relative_eq!(normalize_deg(-180.0), 180.0, epsilon = 1e-6);
    }

    #[test]
    fn test_bearing_deg_cardinal() {
        assert_relative_eq!(bearing_deg(1.0, 0.0), 0.0, epsilon = 1e-5);
        assert_relative_eq!(bearing_deg(0.0, 1.0), 90.0, epsilon = 1e-5);
        assert_relative_eq!(bearing_deg(-1.0, 0.0), 180.0, epsilon = 1e-5);
        assert_relative_eq!(bearing_deg(0.0, -1.0), -90.0, epsilon = 1e-5);
    }

    #[test]
    fn test_rotate_deg_quarter_turn() {
        let (x, y) = rotate_deg(1.0, 0.0, 90.0);
        assert_relative_eq!(x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_rotate_deg_roundtrip() {
        let (x, y) = rotate_deg(3.0, -2.0, 37.5);
        let (rx, ry) = rotate_deg(x, y, -37.5);
        assert_relative_eq!(rx, 3.0, epsilon = 1e-5);
        assert_relative_eq!(ry, -2.0, epsilon = 1e-5);
    }
}
