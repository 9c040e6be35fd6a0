//! Low-frequency component analysis
//!
//! Finds the linear combinations of the leading EOFs of a weighted anomaly
//! field that maximize the ratio of low-pass-filtered variance to total
//! variance. The leading components isolate slowly evolving (forced) signal
//! from high-frequency internal variability.

mod eof;
pub mod normalize;
mod result;

use nalgebra::{DMatrix, DVector};

use crate::config::{FilterConfig, LfcaConfig};
use crate::error::{LfcaError, Result};
use crate::linalg::{LinearAlgebra, NalgebraBackend, center_columns, sample_covariance};
use crate::signal_processing::{DspBackend, LowPassFilter, SignalFilter};

pub use result::LowFrequencyResult;

use eof::{descending_order, weighted_eofs};

/// LFCA engine
///
/// Holds the run configuration and the two numeric backends. It keeps no
/// state between calls, so one engine can serve many realizations, including
/// from several threads at once.
///
/// # Example
/// ```
/// use lfca::{Lfca, LfcaConfig};
/// use nalgebra::DMatrix;
///
/// let mut config = LfcaConfig::default();
/// config.cutoff = 12;
/// config.truncation = 2;
///
/// let x = DMatrix::from_fn(48, 3, |t, j| ((t * (j + 1)) as f64 * 0.3).sin());
/// let result = Lfca::new(config).unwrap().analyze(&x, &[1.0, 1.0, 1.0]).unwrap();
/// assert_eq!(result.lfcs.shape(), (48, 2));
/// assert_eq!(result.lfps.shape(), (2, 3));
/// ```
pub struct Lfca<L = NalgebraBackend, S = DspBackend> {
    config: LfcaConfig,
    linalg: L,
    signal: S,
}

impl Lfca {
    /// Create an engine with the default `nalgebra` and DSP backends.
    ///
    /// # Errors
    /// Returns `LfcaError::InvalidParameter` if the configuration is invalid.
    pub fn new(config: LfcaConfig) -> Result<Self> {
        Self::with_backends(config, NalgebraBackend, DspBackend)
    }
}

impl<L: LinearAlgebra, S: SignalFilter> Lfca<L, S> {
    /// Create an engine with explicit backends.
    pub fn with_backends(config: LfcaConfig, linalg: L, signal: S) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            linalg,
            signal,
        })
    }

    pub fn config(&self) -> &LfcaConfig {
        &self.config
    }

    /// Run LFCA on one realization.
    ///
    /// # Arguments
    /// * `x` - Data matrix, rows are time steps and columns spatial points.
    ///   Need not be centred. Must not contain NaN.
    /// * `weights` - Non-negative weight per column (e.g. cosine of latitude)
    ///
    /// # Errors
    /// * `LfcaError::InvalidInput` for fewer than 2 time steps, no columns,
    ///   non-finite data, or a weight vector of the wrong length
    /// * `LfcaError::InvalidParameter` for a truncation exceeding
    ///   `min(T, N)`, or negative, non-finite or all-zero weights
    /// * `LfcaError::NumericFailure` if a decomposition does not converge
    pub fn analyze(&self, x: &DMatrix<f64>, weights: &[f64]) -> Result<LowFrequencyResult> {
        validate_data(x)?;
        let scale = scale_factors(weights, x.ncols())?;

        let (t, n) = x.shape();
        let k = self.config.truncation;
        if k > t.min(n) {
            return Err(LfcaError::invalid_parameter(
                "truncation",
                k,
                format!("exceeds the available rank min({}, {})", t, n),
            ));
        }
        log::debug!(
            "LFCA on {}x{} field: cutoff={} truncation={} filter={} padding={}",
            t,
            n,
            self.config.cutoff,
            k,
            self.config.filter.kind,
            self.config.filter.padding
        );

        let centered = center_columns(x);
        let mut xs = centered.clone();
        for (mut column, s) in xs.column_iter_mut().zip(scale.iter()) {
            column.scale_mut(*s);
        }

        let modes = weighted_eofs(&xs, k, self.config.eof_method, &self.linalg)?;

        let filter = LowPassFilter::new(self.config.cutoff, &self.config.filter, &self.signal)?;
        let mut filtered = DMatrix::zeros(t, k);
        for j in 0..k {
            let pc: Vec<f64> = modes.pcs.column(j).iter().copied().collect();
            let smoothed = filter.apply(&pc)?;
            log::trace!("Filtered PC {} of {}", j + 1, k);
            filtered.set_column(j, &DVector::from_vec(smoothed));
        }

        let low_cov = sample_covariance(&filtered)?;
        let eig = self.linalg.symmetric_eigen(&low_cov)?;
        let order = descending_order(&eig.values);
        let ratios: Vec<f64> = order.iter().map(|&i| eig.values[i]).collect();
        let rotation = DMatrix::from_fn(k, k, |r, c| eig.vectors[(r, order[c])]);

        let mut patterns = modes.scaled_eofs() * &rotation;
        let mut components = &modes.pcs * &rotation;

        normalize::apply_sign_convention(&mut patterns, &mut components, &scale);
        let lfps = normalize::unweight_patterns(&patterns, &scale, &centered, &components);

        log::debug!(
            "Low-frequency ratios: {:?}",
            ratios.iter().map(|r| format!("{:.3}", r)).collect::<Vec<_>>()
        );

        Ok(LowFrequencyResult {
            lfcs: components,
            lfps,
            ratios,
            eof_variances: modes.eigenvalues.iter().copied().collect(),
            scale: scale.iter().copied().collect(),
        })
    }
}

/// Run LFCA with the default backends.
///
/// # Arguments
/// * `x` - Data matrix (time steps × spatial points)
/// * `cutoff` - Cutoff period in time steps
/// * `truncation` - Number of EOFs retained
/// * `weights` - Non-negative weight per column
/// * `filter` - Low-pass filter options
pub fn lfca(
    x: &DMatrix<f64>,
    cutoff: usize,
    truncation: usize,
    weights: &[f64],
    filter: &FilterConfig,
) -> Result<LowFrequencyResult> {
    let config = LfcaConfig {
        cutoff,
        truncation,
        filter: filter.clone(),
        ..LfcaConfig::default()
    };
    Lfca::new(config)?.analyze(x, weights)
}

fn validate_data(x: &DMatrix<f64>) -> Result<()> {
    let (t, n) = x.shape();
    if t < 2 || n == 0 {
        return Err(LfcaError::InvalidInput(format!(
            "data matrix must have at least 2 time steps and 1 spatial point, got {}x{}",
            t, n
        )));
    }
    for (j, column) in x.column_iter().enumerate() {
        if let Some(i) = column.iter().position(|v| !v.is_finite()) {
            return Err(LfcaError::InvalidInput(format!(
                "non-finite value {} at time step {}, column {}; mask missing columns first",
                column[i], i, j
            )));
        }
    }
    Ok(())
}

/// `sqrt(w / sum(w))` per column.
fn scale_factors(weights: &[f64], columns: usize) -> Result<DVector<f64>> {
    if weights.len() != columns {
        return Err(LfcaError::InvalidInput(format!(
            "weight vector has {} entries for {} columns",
            weights.len(),
            columns
        )));
    }
    if let Some((i, w)) = weights
        .iter()
        .enumerate()
        .find(|(_, w)| !w.is_finite() || **w < 0.0)
    {
        return Err(LfcaError::invalid_parameter(
            "weights",
            w,
            format!("weight at column {} must be finite and non-negative", i),
        ));
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(LfcaError::invalid_parameter(
            "weights",
            total,
            "weights sum to zero",
        ));
    }
    Ok(DVector::from_iterator(
        columns,
        weights.iter().map(|w| (w / total).sqrt()),
    ))
}
