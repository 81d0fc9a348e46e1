//! Angle normalization helpers
//!
//! Neither helper is applied by the decoder; callers that need a canonical yaw
//! range apply them to decoded boxes.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

/// Map `val` into the half-open interval `[-offset * period, (1 - offset) * period)`.
pub fn limit_period(val: f32, offset: f32, period: f32) -> f32 {
    val - (val / period + offset).floor() * period
}

/// [`limit_period`] with `offset = 0.5` and `period = π`, i.e. `[-π/2, π/2)`.
pub fn limit_period_default(val: f32) -> f32 {
    limit_period(val, 0.5, PI)
}

/// Rotate a yaw back by a quarter turn and wrap it into `(-π, π]`.
///
/// Non-finite values are returned unchanged.
pub fn inverse_yaw(yaw: f32) -> f32 {
    if !yaw.is_finite() {
        return yaw;
    }

    let wrapped = (yaw - FRAC_PI_2 + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}
