use std::f64::consts::PI;

use crate::error::{LfcaError, Result};

/// Tap weights for a Lanczos-windowed low-pass filter
///
/// Returns `window` symmetric taps approximating an ideal low-pass response
/// with cutoff `cutoff` (cycles per time step). The ideal sinc response is
/// multiplied by the Lanczos sigma factor, which suppresses Gibbs ringing.
/// The taps sum to approximately 1, so the zero-frequency gain is unity.
///
/// # Arguments
/// * `window` - Number of taps, odd and at least 3
/// * `cutoff` - Cutoff frequency in cycles per time step, in (0, 0.5)
///
/// # Errors
/// Returns `LfcaError::InvalidParameter` for an even or too-short window, or
/// a cutoff outside (0, 0.5).
pub fn low_pass_weights(window: usize, cutoff: f64) -> Result<Vec<f64>> {
    if window < 3 {
        return Err(LfcaError::invalid_parameter(
            "window",
            window,
            "Lanczos window must have at least 3 taps",
        ));
    }
    if window.is_multiple_of(2) {
        return Err(LfcaError::invalid_parameter(
            "window",
            window,
            "Lanczos window length must be odd",
        ));
    }
    if !cutoff.is_finite() || cutoff <= 0.0 || cutoff >= 0.5 {
        return Err(LfcaError::invalid_parameter(
            "cutoff",
            cutoff,
            "cutoff frequency must lie in (0, 0.5) cycles per step",
        ));
    }

    // The sigma factor reaches zero one step beyond the outermost returned tap.
    let half = (window - 1) / 2;
    let n = half + 1;
    let mut taps = vec![0.0; window];
    taps[half] = 2.0 * cutoff;

    for k in 1..n {
        let kf = k as f64;
        let sigma = (PI * kf / n as f64).sin() * n as f64 / (PI * kf);
        let sinc = (2.0 * PI * cutoff * kf).sin() / (PI * kf);
        let w = sinc * sigma;
        taps[half - k] = w;
        taps[half + k] = w;
    }

    Ok(taps)
}
