#![allow(dead_code)]

use lfca::simulation::SyntheticField;
use nalgebra::DMatrix;

pub use lfca::simulation::correlation;

/// (240, 50) field: the same period-200 sinusoid at every point plus unit
/// white noise
pub fn forced_sinusoid_field(seed: u64) -> (DMatrix<f64>, Vec<f64>) {
    SyntheticField::new(240, 50)
        .with_sinusoid(200.0, 1.0)
        .with_noise(1.0)
        .with_uniform_loading()
        .with_seed(seed)
        .generate()
        .expect("valid synthetic field")
}

/// As `forced_sinusoid_field`, with loadings falling from 1.5 to 0.5 across
/// the points
pub fn loaded_sinusoid_field(seed: u64) -> (DMatrix<f64>, Vec<f64>) {
    SyntheticField::new(240, 50)
        .with_sinusoid(200.0, 1.0)
        .with_noise(1.0)
        .with_seed(seed)
        .generate()
        .expect("valid synthetic field")
}

/// Smaller red-noise field for tests that run the engine many times
pub fn small_field(seed: u64) -> (DMatrix<f64>, Vec<f64>) {
    SyntheticField::new(96, 12)
        .with_sinusoid(80.0, 1.0)
        .with_red_noise(0.8, 0.3)
        .with_seed(seed)
        .generate()
        .expect("valid synthetic field")
}

pub fn uniform_weights(n: usize) -> Vec<f64> {
    vec![1.0; n]
}

pub fn column(m: &DMatrix<f64>, j: usize) -> Vec<f64> {
    m.column(j).iter().copied().collect()
}

pub fn row(m: &DMatrix<f64>, i: usize) -> Vec<f64> {
    m.row(i).iter().copied().collect()
}
