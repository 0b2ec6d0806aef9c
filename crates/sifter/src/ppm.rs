// Standard Library Imports
use std::ops::RangeInclusive;

// Public API ==========================================================================================================

/// Relative error of `observed` against `theoretical`, in parts per million
#[must_use]
pub fn ppm_error(observed: f64, theoretical: f64) -> f64 {
    (observed - theoretical) / theoretical * 1e6
}

/// Every theoretical m/z that `observed` could be within `ppm` of
///
/// Since [`ppm_error`] divides by the theoretical value, this window is slightly lopsided around `observed`. It is
/// also widened by a hair so that floating-point rounding never hides a candidate; callers must still check the exact
/// ppm error of whatever falls inside.
#[must_use]
pub fn theoretical_window(observed: f64, ppm: f64) -> RangeInclusive<f64> {
    const SLACK: f64 = 1e-9;
    let tolerance = ppm / 1e6;
    let lo = observed / (1.0 + tolerance);
    let hi = if tolerance < 1.0 { observed / (1.0 - tolerance) } else { f64::INFINITY };
    (lo * (1.0 - SLACK))..=(hi * (1.0 + SLACK))
}

// Module Tests ========================================================================================================
