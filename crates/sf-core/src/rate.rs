//! Numeric policy shared by every derived ratio.

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Rounds to two decimal places, resolving exact ties to the even digit.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// `part / whole * 100`, or `0` when `whole` is not positive.
pub fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

/// Units per hour over `seconds`, or `0` when no time elapsed.
#[allow(clippy::cast_precision_loss)]
pub fn per_hour(units: u64, seconds: f64) -> f64 {
    let hours = seconds / SECONDS_PER_HOUR;
    if hours > 0.0 {
        units as f64 / hours
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_keeps_two_decimals() {
        assert!((round2(66.666_666) - 66.67).abs() < 1e-9);
        assert!((round2(12.0) - 12.0).abs() < 1e-9);
        assert!((round2(0.004) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn round2_sends_ties_to_even() {
        assert!((round2(0.125) - 0.12).abs() < 1e-9);
        assert!((round2(0.375) - 0.38).abs() < 1e-9);
    }

    #[test]
    fn zero_denominators_resolve_to_zero() {
        assert!(percent(10.0, 0.0).abs() < f64::EPSILON);
        assert!(percent(10.0, -5.0).abs() < f64::EPSILON);
        assert!(per_hour(10, 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn per_hour_scales_by_elapsed_hours() {
        assert!((per_hour(9, 1800.0) - 18.0).abs() < 1e-9);
    }
}
