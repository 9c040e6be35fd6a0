//! Numeric constants for decomposition and filtering stability
//!
//! These constants define tolerances and solver limits used throughout
//! the LFCA pipeline.

/// Relative eigenvalue tolerance below which an EOF is treated as carrying
/// no variance. Compared against the largest eigenvalue of the same field.
pub const RELATIVE_VARIANCE_EPSILON: f64 = 1e-12;

/// Absolute variance floor for fields that are identically zero.
pub const ABSOLUTE_VARIANCE_EPSILON: f64 = 1e-300;

/// Convergence tolerance handed to the iterative symmetric eigen and SVD solvers.
pub const SOLVER_EPSILON: f64 = f64::EPSILON;

/// Iteration cap for the iterative solvers. Exceeding it is reported as a
/// numeric failure.
pub const SOLVER_MAX_ITERATIONS: usize = 10_000;

/// Default Butterworth order used by the zero-phase low-pass.
pub const DEFAULT_BUTTERWORTH_ORDER: usize = 4;

/// Shortest cutoff period (in time steps) whose frequency stays below Nyquist.
pub const MIN_CUTOFF_PERIOD: usize = 3;
