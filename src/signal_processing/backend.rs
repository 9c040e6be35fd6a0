use iir_filters::filter::{DirectForm2Transposed, Filter};
use iir_filters::filter_design::{FilterType, butter};
use iir_filters::sos::zpk2sos;

use crate::error::{LfcaError, Result};

/// Filtering primitives the low-pass stage is built from
///
/// Implemented by [`DspBackend`]. Tests substitute their own implementation
/// to observe or replace the filtering without a numeric backend.
pub trait SignalFilter: Send + Sync {
    /// Convolve `signal` with `taps`, keeping the centred `signal.len()` samples.
    fn convolve_same(&self, signal: &[f64], taps: &[f64]) -> Vec<f64>;

    /// Zero-phase Butterworth low-pass of `order` with cutoff `cutoff`
    /// (cycles per sample), run forward then backward.
    fn lowpass_zero_phase(&self, signal: &[f64], order: usize, cutoff: f64) -> Result<Vec<f64>>;
}

/// Default filtering backend: direct FIR convolution and `iir_filters`
/// Butterworth sections.
#[derive(Debug, Clone, Copy, Default)]
pub struct DspBackend;

impl SignalFilter for DspBackend {
    fn convolve_same(&self, signal: &[f64], taps: &[f64]) -> Vec<f64> {
        let n = signal.len();
        let m = taps.len();
        if n == 0 || m == 0 {
            return vec![0.0; n];
        }
        let offset = (m - 1) / 2;

        (0..n)
            .map(|i| {
                // Full-convolution index of this output sample
                let j = i + offset;
                let k_lo = j.saturating_sub(n - 1);
                let k_hi = j.min(m - 1);
                (k_lo..=k_hi).map(|k| taps[k] * signal[j - k]).sum()
            })
            .collect()
    }

    fn lowpass_zero_phase(&self, signal: &[f64], order: usize, cutoff: f64) -> Result<Vec<f64>> {
        if signal.is_empty() {
            return Ok(Vec::new());
        }

        let zpk = butter(order as u32, FilterType::LowPass(cutoff), 1.0).map_err(|e| {
            LfcaError::invalid_parameter(
                "cutoff",
                cutoff,
                format!("Butterworth design failed: {:?}", e),
            )
        })?;
        let sos = zpk2sos(&zpk, None).map_err(|e| {
            LfcaError::invalid_parameter(
                "cutoff",
                cutoff,
                format!("Butterworth sections failed: {:?}", e),
            )
        })?;

        // Each pass filters the deviation from its first sample; a unit-DC-gain
        // low-pass passes that offset unchanged, so no start-up transient.
        let run_pass = |input: &[f64]| -> Vec<f64> {
            let mut filter = DirectForm2Transposed::new(&sos);
            let x0 = input[0];
            input.iter().map(|&x| filter.filter(x - x0) + x0).collect()
        };

        let mut forward = run_pass(signal);
        forward.reverse();
        let mut output = run_pass(&forward);
        output.reverse();
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn rms(x: &[f64]) -> f64 {
        (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt()
    }

    #[test]
    fn test_convolve_same_identity_kernel() {
        let signal = [1.0, -2.0, 3.5, 4.0];
        let out = DspBackend.convolve_same(&signal, &[0.0, 1.0, 0.0]);
        assert_eq!(out, signal.to_vec());
    }

    #[test]
    fn test_convolve_same_matches_full_convolution_centre() {
        // full([1,2,3] * [1,1,1]) = [1,3,6,5,3]; centred "same" part is [3,6,5]
        let out = DspBackend.convolve_same(&[1.0, 2.0, 3.0], &[1.0, 1.0, 1.0]);
        assert_eq!(out, vec![3.0, 6.0, 5.0]);
    }

    #[test]
    fn test_convolve_same_asymmetric_kernel() {
        // full([1,2,3,4] * [1,0,-1]) = [1,2,2,2,-3,-4]
        let out = DspBackend.convolve_same(&[1.0, 2.0, 3.0, 4.0], &[1.0, 0.0, -1.0]);
        assert_eq!(out, vec![2.0, 2.0, 2.0, -3.0]);
    }

    #[test]
    fn test_butterworth_passes_constant() {
        let signal = vec![2.5; 200];
        let out = DspBackend.lowpass_zero_phase(&signal, 4, 1.0 / 50.0).unwrap();
        assert_eq!(out.len(), signal.len());
        for v in out {
            assert_abs_diff_eq!(v, 2.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_butterworth_separates_slow_and_fast() {
        let slow: Vec<f64> = (0..2000)
            .map(|i| (2.0 * PI * i as f64 / 400.0).sin())
            .collect();
        let fast: Vec<f64> = (0..2000)
            .map(|i| 0.5 * (2.0 * PI * i as f64 / 6.0).sin())
            .collect();
        let mixed: Vec<f64> = slow.iter().zip(&fast).map(|(a, b)| a + b).collect();

        let out = DspBackend.lowpass_zero_phase(&mixed, 4, 1.0 / 60.0).unwrap();

        // Compare away from the edges, where the single-sided transients live
        let err: Vec<f64> = out[300..1700]
            .iter()
            .zip(&slow[300..1700])
            .map(|(a, b)| a - b)
            .collect();
        assert!(rms(&err) < 0.05, "residual rms {}", rms(&err));
    }

    #[test]
    fn test_butterworth_zero_phase() {
        let slow: Vec<f64> = (0..3000)
            .map(|i| (2.0 * PI * i as f64 / 500.0).sin())
            .collect();
        let out = DspBackend.lowpass_zero_phase(&slow, 4, 1.0 / 50.0).unwrap();

        // The rising zero crossing of the input at 1500 must not move
        let rising = |x: &[f64]| (1400..1600).find(|&i| x[i] < 0.0 && x[i + 1] >= 0.0);
        let crossing = rising(&out).unwrap();
        let expected = rising(&slow).unwrap();
        assert!((1499..=1500).contains(&expected));
        assert!((crossing as i64 - expected as i64).abs() <= 1);
    }
}
