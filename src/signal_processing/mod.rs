pub mod backend;
pub mod detrend;
pub mod lanczos;
pub mod lowpass;
pub mod padding;

pub use backend::{DspBackend, SignalFilter};
pub use detrend::{PolynomialTrend, detrend};
pub use lanczos::low_pass_weights;
pub use lowpass::{LowPassFilter, filter_series};
pub use padding::{pad, trim};
