//! Spatial bookkeeping around the engine.
//!
//! ## Flattening order
//!
//! A latitude × longitude grid is flattened **row-major, latitude-major**: the
//! cell at latitude index `i` and longitude index `j` of an `nlat × nlon` grid
//! is data column `i * nlon + j`. Weight vectors, masks and output patterns all
//! use this order.

use nalgebra::DMatrix;

use crate::error::{LfcaError, Result};

/// Shape of a regular latitude × longitude grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    pub nlat: usize,
    pub nlon: usize,
}

impl GridShape {
    pub fn new(nlat: usize, nlon: usize) -> Self {
        Self { nlat, nlon }
    }

    /// Number of flattened cells
    pub fn len(&self) -> usize {
        self.nlat * self.nlon
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flattened column of cell (lat, lon)
    pub fn flat_index(&self, lat: usize, lon: usize) -> usize {
        lat * self.nlon + lon
    }

    /// Grid cell (lat, lon) of a flattened column, or `None` if the column
    /// lies outside the grid
    pub fn unflatten(&self, index: usize) -> Option<(usize, usize)> {
        if index >= self.len() {
            return None;
        }
        Some((index / self.nlon, index % self.nlon))
    }
}

/// Cosine-of-latitude area weight for every cell of a grid.
///
/// `lats_deg` gives one latitude in degrees per grid row; each is repeated
/// across `nlon` longitudes in flattening order. Weights are clamped at zero.
pub fn area_weights(lats_deg: &[f64], nlon: usize) -> Vec<f64> {
    lats_deg
        .iter()
        .flat_map(|lat| std::iter::repeat_n(lat.to_radians().cos().max(0.0), nlon))
        .collect()
}

/// Columns excluded from the analysis because they contain missing values
///
/// Built from a full-width data matrix; `compress` removes the masked columns
/// before the engine runs and `expand` reinserts them as NaN afterwards.
#[derive(Debug, Clone)]
pub struct SpatialMask {
    valid: Vec<bool>,
}

impl SpatialMask {
    /// Mask every column holding at least one non-finite value.
    pub fn from_matrix(x: &DMatrix<f64>) -> Self {
        Self {
            valid: x
                .column_iter()
                .map(|c| c.iter().all(|v| v.is_finite()))
                .collect(),
        }
    }

    /// Build a mask from explicit validity flags, one per full-width column.
    pub fn from_valid(valid: Vec<bool>) -> Self {
        Self { valid }
    }

    /// Full width, masked columns included
    pub fn width(&self) -> usize {
        self.valid.len()
    }

    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|v| **v).count()
    }

    pub fn is_valid(&self, column: usize) -> bool {
        self.valid.get(column).copied().unwrap_or(false)
    }

    /// Full-width indices of the retained columns
    pub fn valid_indices(&self) -> Vec<usize> {
        self.valid
            .iter()
            .enumerate()
            .filter(|(_, v)| **v)
            .map(|(i, _)| i)
            .collect()
    }

    /// Drop masked columns from a full-width matrix.
    pub fn compress(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        self.check_width("data matrix", x.ncols())?;
        Ok(x.select_columns(&self.valid_indices()))
    }

    /// Drop masked entries from a full-width weight vector.
    pub fn compress_weights(&self, weights: &[f64]) -> Result<Vec<f64>> {
        self.check_width("weight vector", weights.len())?;
        Ok(weights
            .iter()
            .zip(&self.valid)
            .filter(|(_, v)| **v)
            .map(|(w, _)| *w)
            .collect())
    }

    /// Widen a matrix over retained columns back to full width, NaN in masked columns.
    pub fn expand(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if x.ncols() != self.valid_count() {
            return Err(LfcaError::InvalidInput(format!(
                "matrix has {} columns, mask retains {}",
                x.ncols(),
                self.valid_count()
            )));
        }
        let mut out = DMatrix::from_element(x.nrows(), self.width(), f64::NAN);
        for (src, dst) in self.valid_indices().into_iter().enumerate() {
            out.set_column(dst, &x.column(src));
        }
        Ok(out)
    }

    fn check_width(&self, what: &str, width: usize) -> Result<()> {
        if width != self.width() {
            return Err(LfcaError::InvalidInput(format!(
                "{} has {} columns, mask covers {}",
                what,
                width,
                self.width()
            )));
        }
        Ok(())
    }
}
