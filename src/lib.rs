pub mod analysis;
pub mod config;
pub mod constants;
pub mod error;
pub mod grid;
pub mod io;
pub mod linalg;
pub mod signal_processing;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use analysis::{Lfca, LowFrequencyResult, lfca};
pub use config::{EofMethod, FilterConfig, FilterKind, LfcaConfig, PaddingKind};
pub use error::{LfcaError, Result};
