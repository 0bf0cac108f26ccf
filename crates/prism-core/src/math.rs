//! Shared pixel math.

/// Rec. 601 luma weights used for every gray conversion in the engine.
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Weighted gray value of an RGB triple.
pub fn luminance(r: f32, g: f32, b: f32) -> f32 {
    LUMA_WEIGHTS[0] * r + LUMA_WEIGHTS[1] * g + LUMA_WEIGHTS[2] * b
}

/// Round and saturate to an 8-bit channel.
pub fn to_u8(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(0.0, 255.0) as u8
}

/// Linear interpolation between `neutral` and `value` by `t` in [0, 1].
///
/// Used to scale a filter parameter's deviation from its neutral point.
pub fn toward(neutral: f32, value: f32, t: f32) -> f32 {
    neutral + (value - neutral) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luminance_weights_sum_to_one() {
        assert!((luminance(255.0, 255.0, 255.0) - 255.0).abs() < 1e-3);
        assert_eq!(luminance(0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_to_u8_saturates() {
        assert_eq!(to_u8(-3.0), 0);
        assert_eq!(to_u8(254.6), 255);
        assert_eq!(to_u8(300.0), 255);
        assert_eq!(to_u8(f32::NAN), 0);
    }

    #[test]
    fn test_toward() {
        assert_eq!(toward(100.0, 150.0, 0.0), 100.0);
        assert_eq!(toward(100.0, 150.0, 0.5), 125.0);
        assert_eq!(toward(0.0, 40.0, 1.0), 40.0);
    }
}
