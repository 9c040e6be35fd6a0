use crate::config::{FilterConfig, FilterKind, validate_cutoff};
use crate::error::{LfcaError, Result};
use crate::signal_processing::backend::{DspBackend, SignalFilter};
use crate::signal_processing::detrend::detrend;
use crate::signal_processing::lanczos::low_pass_weights;
use crate::signal_processing::padding::{pad, trim};

/// Low-pass filter for a single time series
///
/// The cutoff is given as a period in time steps; both filter kinds place
/// their cutoff at `1 / period` cycles per step. Each call:
///
/// 1. optionally removes a polynomial trend,
/// 2. pads both ends (mirror or periodic) by the Lanczos window length,
/// 3. re-adds the trend over the padded index range,
/// 4. filters (Lanczos convolution or zero-phase Butterworth),
/// 5. trims the padding, returning a series of the input length.
pub struct LowPassFilter<'a, S: SignalFilter + ?Sized = DspBackend> {
    cutoff: usize,
    config: FilterConfig,
    taps: Vec<f64>,
    pad: usize,
    backend: &'a S,
}

impl<'a, S: SignalFilter + ?Sized> LowPassFilter<'a, S> {
    /// Create a low-pass filter
    ///
    /// # Arguments
    /// * `cutoff` - Cutoff period in time steps (at least 3)
    /// * `config` - Filter kind, padding and detrending options
    /// * `backend` - Convolution / IIR implementation
    ///
    /// # Errors
    /// Returns `LfcaError::InvalidParameter` if the cutoff or config is invalid
    pub fn new(cutoff: usize, config: &FilterConfig, backend: &'a S) -> Result<Self> {
        validate_cutoff(cutoff)?;
        config.validate()?;

        let window = 2 * cutoff + 1;
        let taps = match config.kind {
            FilterKind::Lanczos => {
                let mut taps = low_pass_weights(window, 1.0 / cutoff as f64)?;
                // Exact unit DC gain so constants pass unchanged
                let sum: f64 = taps.iter().sum();
                taps.iter_mut().for_each(|t| *t /= sum);
                taps
            }
            FilterKind::Butterworth => Vec::new(),
        };

        Ok(Self {
            cutoff,
            config: config.clone(),
            taps,
            pad: window,
            backend,
        })
    }

    /// Filter a series, returning a smoothed series of the same length.
    ///
    /// # Errors
    /// Returns `LfcaError::InvalidInput` for an empty series, and
    /// `LfcaError::InvalidParameter` if the detrend degree does not fit the series.
    pub fn apply(&self, series: &[f64]) -> Result<Vec<f64>> {
        if series.is_empty() {
            return Err(LfcaError::InvalidInput(
                "cannot filter an empty series".to_string(),
            ));
        }

        let (base, trend) = if self.config.detrend {
            let (residual, trend) = detrend(series, self.config.detrend_degree)?;
            (residual, Some(trend))
        } else {
            (series.to_vec(), None)
        };

        let mut padded = pad(&base, self.pad, self.config.padding);
        if let Some(trend) = &trend {
            let start = -(self.pad as isize);
            for (i, sample) in padded.iter_mut().enumerate() {
                *sample += trend.evaluate(start + i as isize);
            }
        }

        let filtered = match self.config.kind {
            FilterKind::Lanczos => self.backend.convolve_same(&padded, &self.taps),
            FilterKind::Butterworth => self.backend.lowpass_zero_phase(
                &padded,
                self.config.butterworth_order,
                1.0 / self.cutoff as f64,
            )?,
        };

        Ok(trim(&filtered, self.pad))
    }

    /// Samples added to each end before filtering
    pub fn pad_len(&self) -> usize {
        self.pad
    }

    pub fn cutoff(&self) -> usize {
        self.cutoff
    }
}

/// Filter one series with the default backend.
pub fn filter_series(series: &[f64], cutoff: usize, config: &FilterConfig) -> Result<Vec<f64>> {
    LowPassFilter::new(cutoff, config, &DspBackend)?.apply(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaddingKind;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn all_configs() -> Vec<FilterConfig> {
        let mut configs = Vec::new();
        for kind in [FilterKind::Lanczos, FilterKind::Butterworth] {
            for padding in [PaddingKind::Mirror, PaddingKind::Periodic] {
                for detrend in [false, true] {
                    configs.push(FilterConfig {
                        kind,
                        padding,
                        detrend,
                        ..FilterConfig::default()
                    });
                }
            }
        }
        configs
    }

    fn correlation(a: &[f64], b: &[f64]) -> f64 {
        let n = a.len() as f64;
        let ma = a.iter().sum::<f64>() / n;
        let mb = b.iter().sum::<f64>() / n;
        let cov: f64 = a.iter().zip(b).map(|(x, y)| (x - ma) * (y - mb)).sum();
        let va: f64 = a.iter().map(|x| (x - ma).powi(2)).sum();
        let vb: f64 = b.iter().map(|y| (y - mb).powi(2)).sum();
        cov / (va * vb).sqrt()
    }

    #[test]
    fn test_constant_series_unchanged() {
        let series = vec![-3.25; 150];
        for config in all_configs() {
            let out = filter_series(&series, 24, &config).unwrap();
            for v in &out {
                assert_abs_diff_eq!(*v, -3.25, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn test_output_length_matches_input() {
        for len in [1, 2, 7, 60, 241] {
            let series: Vec<f64> = (0..len).map(|i| (i as f64 * 0.37).sin()).collect();
            for config in all_configs() {
                if config.detrend && len < 2 {
                    continue;
                }
                let out = filter_series(&series, 12, &config).unwrap();
                assert_eq!(out.len(), len, "config {:?}", config);
            }
        }
    }

    #[test]
    fn test_high_frequency_attenuated() {
        let slow: Vec<f64> = (0..480)
            .map(|i| (2.0 * PI * i as f64 / 240.0).sin())
            .collect();
        let noisy: Vec<f64> = slow
            .iter()
            .enumerate()
            .map(|(i, s)| s + 0.8 * (2.0 * PI * i as f64 / 5.0).sin())
            .collect();

        for config in all_configs() {
            let out = filter_series(&noisy, 24, &config).unwrap();
            let r = correlation(&out, &slow);
            assert!(r > 0.98, "config {:?}: correlation {}", config, r);
        }
    }

    #[test]
    fn test_linear_trend_preserved_with_detrend() {
        let series: Vec<f64> = (0..200).map(|i| 0.05 * i as f64).collect();
        let config = FilterConfig {
            detrend: true,
            ..FilterConfig::default()
        };
        let out = filter_series(&series, 30, &config).unwrap();
        for (o, s) in out.iter().zip(&series) {
            assert_abs_diff_eq!(*o, *s, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_pad_length_is_window_length() {
        let filter = LowPassFilter::new(60, &FilterConfig::default(), &DspBackend).unwrap();
        assert_eq!(filter.pad_len(), 121);
        assert_eq!(filter.cutoff(), 60);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            filter_series(&[1.0, 2.0, 3.0], 2, &FilterConfig::default()),
            Err(LfcaError::InvalidParameter { name: "cutoff", .. })
        ));
        assert!(matches!(
            filter_series(&[], 12, &FilterConfig::default()),
            Err(LfcaError::InvalidInput(_))
        ));

        let config = FilterConfig {
            kind: FilterKind::Butterworth,
            butterworth_order: 0,
            ..FilterConfig::default()
        };
        assert!(matches!(
            filter_series(&[1.0, 2.0, 3.0], 12, &config),
            Err(LfcaError::InvalidParameter {
                name: "butterworth_order",
                ..
            })
        ));
    }
}
