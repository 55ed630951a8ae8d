//! Effective playback speed of a voice event.

use crate::types::SpeedSuffix;

/// Speeds a speaker slider can produce. Values outside are still honored but
/// reported as warnings by the pipeline.
pub const SLIDER_RANGE: std::ops::RangeInclusive<f32> = 0.7..=1.3;

/// Resolve the speed for a voice event.
///
/// Precedence, highest first: the global override, the tag suffix, the
/// slot's slider value, `default_speed`.
pub fn resolve(
    slot: usize,
    suffix: Option<SpeedSuffix>,
    slider_speeds: &[f32],
    ignore_speed: bool,
    default_speed: f32,
) -> f32 {
    if ignore_speed {
        return default_speed;
    }

    if let Some(suffix) = suffix {
        return suffix.factor();
    }

    slot.checked_sub(1)
        .and_then(|i| slider_speeds.get(i))
        .copied()
        .filter(|s| s.is_finite())
        .unwrap_or(default_speed)
}

/// Check whether a speed lies outside the slider range.
pub fn is_out_of_slider_range(speed: f32) -> bool {
    !SLIDER_RANGE.contains(&speed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_ignore_flag_wins() {
        let speeds = [1.0; 30];
        assert!(close(
            resolve(1, Some(SpeedSuffix::Fast), &speeds, true, 0.88),
            0.88
        ));
    }

    #[test]
    fn test_suffix_over_slider() {
        let speeds = [1.0; 30];
        assert!(close(
            resolve(2, Some(SpeedSuffix::Slow), &speeds, false, 0.88),
            0.80
        ));
        assert!(close(
            resolve(2, Some(SpeedSuffix::Fast), &speeds, false, 0.88),
            1.20
        ));
        assert!(close(
            resolve(3, Some(SpeedSuffix::FastPercent(110)), &speeds, false, 0.88),
            1.10
        ));
        assert!(close(
            resolve(3, Some(SpeedSuffix::SlowPercent(75)), &speeds, false, 0.88),
            0.75
        ));
    }

    #[test]
    fn test_slider_value() {
        let speeds: Vec<f32> = (0..30).map(|i| 0.7 + i as f32 * 0.02).collect();
        assert!(close(resolve(5, None, &speeds, false, 0.88), speeds[4]));
    }

    #[test]
    fn test_default_when_no_slider() {
        assert!(close(resolve(5, None, &[1.0, 1.0], false, 0.88), 0.88));
        assert!(close(resolve(0, None, &[1.0], false, 0.88), 0.88));
        assert!(close(resolve(1, None, &[f32::NAN], false, 0.88), 0.88));
    }

    #[test]
    fn test_slider_range() {
        assert!(!is_out_of_slider_range(1.0));
        assert!(!is_out_of_slider_range(0.7));
        assert!(is_out_of_slider_range(1.5));
        assert!(is_out_of_slider_range(0.5));
    }
}
