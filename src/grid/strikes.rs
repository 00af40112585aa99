use crate::errors::{EngineError, EngineResult};

/// Upper bound on grid size; a grid is a table for humans, not a sweep.
pub const MAX_STRIKES: usize = 10_000;

/// Tolerance (in steps) for deciding whether the end strike is on the grid.
/// An end within this distance of a grid point is not rounded up past it.
const END_TOLERANCE: f64 = 1e-9;

/// Ascending strikes start, start + step, ... up to and including `end`.
/// An `end` that is off the step grid is rounded up to the next grid point.
///
/// Each value is `start + i * step`, never a running sum, so binary float
/// steps can neither drop an on-grid end nor add a spurious extra strike.
pub fn strike_progression(start: f64, end: f64, step: f64) -> EngineResult<Vec<f64>> {
    if !step.is_finite() || step <= 0.0 {
        return Err(EngineError::InvalidGrid(format!("strike step must be > 0, got {step}")));
    }
    if !start.is_finite() || start <= 0.0 {
        return Err(EngineError::InvalidGrid(format!("strike start must be > 0, got {start}")));
    }
    if !end.is_finite() || end < start {
        return Err(EngineError::InvalidGrid(format!(
            "strike end {end} must not be below start {start}"
        )));
    }

    let intervals = ((end - start) / step - END_TOLERANCE).ceil().max(0.0);
    if intervals >= MAX_STRIKES as f64 {
        return Err(EngineError::InvalidGrid(format!(
            "{} strikes requested, limit is {MAX_STRIKES}",
            intervals + 1.0
        )));
    }

    let count = intervals as usize + 1;
    Ok((0..count).map(|i| start + i as f64 * step).collect())
}

/// Floors a strike to a multiple of `step`.
#[inline]
pub fn round_strike(strike: f64, step: f64) -> f64 {
    step * (strike / step).floor()
}

/// Default strike window around the last price: 80% to 120%, floored to the step.
pub fn default_strike_range(last_price: f64, step: f64) -> (f64, f64) {
    (round_strike(last_price * 0.8, step), round_strike(last_price * 1.2, step))
}
