//! Configuration for low-frequency component analysis.
//!
//! Every value has a default matching the usual monthly-data setup (10-year
//! cutoff, Lanczos filter with mirror padding). Configurations can be built in
//! code, loaded from TOML, or overridden from the command line:
//!
//! ```toml
//! cutoff = 120
//! truncation = 30
//! eof_method = "covariance"
//!
//! [filter]
//! kind = "butterworth"
//! padding = "periodic"
//! detrend = true
//! detrend_degree = 1
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::{DEFAULT_BUTTERWORTH_ORDER, MIN_CUTOFF_PERIOD};
use crate::error::{LfcaError, Result};

/// Low-pass filter applied to each principal component series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    /// Lanczos-windowed sinc FIR, convolved in "same" mode
    Lanczos,
    /// Butterworth IIR run forward then backward (zero phase)
    Butterworth,
}

/// How a series is extended past its ends before filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PaddingKind {
    /// Reflect about the boundary, repeating the edge sample
    Mirror,
    /// Wrap around, treating the series as one period
    Periodic,
}

/// How the leading EOFs of the weighted field are computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EofMethod {
    /// Symmetric eigen-decomposition of the smaller of the covariance and Gram matrices
    Covariance,
    /// Truncated singular value decomposition of the weighted field
    Svd,
}

fn parse_kind<T: Copy>(name: &'static str, s: &str, choices: &[(&str, T)]) -> Result<T> {
    let key = s.trim().to_ascii_lowercase();
    choices
        .iter()
        .find(|(label, _)| *label == key)
        .map(|(_, kind)| *kind)
        .ok_or_else(|| {
            let expected: Vec<&str> = choices.iter().map(|(label, _)| *label).collect();
            LfcaError::invalid_parameter(
                name,
                s,
                format!("unsupported, expected one of: {}", expected.join(", ")),
            )
        })
}

impl FromStr for FilterKind {
    type Err = LfcaError;

    fn from_str(s: &str) -> Result<Self> {
        parse_kind(
            "filter_kind",
            s,
            &[
                ("lanczos", FilterKind::Lanczos),
                ("butterworth", FilterKind::Butterworth),
            ],
        )
    }
}

impl FromStr for PaddingKind {
    type Err = LfcaError;

    fn from_str(s: &str) -> Result<Self> {
        parse_kind(
            "padding_kind",
            s,
            &[
                ("mirror", PaddingKind::Mirror),
                ("periodic", PaddingKind::Periodic),
            ],
        )
    }
}

impl FromStr for EofMethod {
    type Err = LfcaError;

    fn from_str(s: &str) -> Result<Self> {
        parse_kind(
            "eof_method",
            s,
            &[("covariance", EofMethod::Covariance), ("svd", EofMethod::Svd)],
        )
    }
}

/// Deserialize a kind through its `FromStr`, so TOML accepts the same spellings
/// as the command line.
fn deserialize_kind<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr<Err = LfcaError>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

impl<'de> Deserialize<'de> for FilterKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserialize_kind(deserializer)
    }
}

impl<'de> Deserialize<'de> for PaddingKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserialize_kind(deserializer)
    }
}

impl<'de> Deserialize<'de> for EofMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserialize_kind(deserializer)
    }
}

/// Parse the kind names of a TOML document up front, so an unsupported kind
/// reports which parameter and value were rejected.
fn check_kind_names(document: &toml::Table) -> Result<()> {
    fn check<T: FromStr<Err = LfcaError>>(value: Option<&toml::Value>) -> Result<()> {
        if let Some(name) = value.and_then(toml::Value::as_str) {
            name.parse::<T>()?;
        }
        Ok(())
    }

    check::<EofMethod>(document.get("eof_method"))?;
    if let Some(filter) = document.get("filter").and_then(toml::Value::as_table) {
        check::<FilterKind>(filter.get("kind"))?;
        check::<PaddingKind>(filter.get("padding"))?;
    }
    Ok(())
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKind::Lanczos => write!(f, "lanczos"),
            FilterKind::Butterworth => write!(f, "butterworth"),
        }
    }
}

impl fmt::Display for PaddingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaddingKind::Mirror => write!(f, "mirror"),
            PaddingKind::Periodic => write!(f, "periodic"),
        }
    }
}

impl fmt::Display for EofMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EofMethod::Covariance => write!(f, "covariance"),
            EofMethod::Svd => write!(f, "svd"),
        }
    }
}

/// Time-series low-pass filter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Filter family
    pub kind: FilterKind,
    /// Edge padding applied before filtering
    pub padding: PaddingKind,
    /// Remove a polynomial trend before padding and restore it afterwards
    pub detrend: bool,
    /// Degree of the removed trend (0 removes the mean, 1 a line)
    pub detrend_degree: usize,
    /// Butterworth order of a single pass (the zero-phase response is squared)
    pub butterworth_order: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            kind: FilterKind::Lanczos,
            padding: PaddingKind::Mirror,
            detrend: false,
            detrend_degree: 1,
            butterworth_order: DEFAULT_BUTTERWORTH_ORDER,
        }
    }
}

/// LFCA run configuration
///
/// # Example
/// ```
/// use lfca::config::{FilterKind, LfcaConfig};
///
/// let mut config = LfcaConfig::default();
/// config.truncation = 5;
/// config.filter.kind = FilterKind::Butterworth;
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LfcaConfig {
    /// Cutoff period in time steps (120 = 10 years of monthly data)
    pub cutoff: usize,
    /// Number of leading EOFs retained before the low-frequency rotation
    pub truncation: usize,
    /// Filter applied to each principal component
    pub filter: FilterConfig,
    /// EOF solver path
    pub eof_method: EofMethod,
}

impl Default for LfcaConfig {
    fn default() -> Self {
        Self {
            cutoff: 120,
            truncation: 30,
            filter: FilterConfig::default(),
            eof_method: EofMethod::Covariance,
        }
    }
}

impl LfcaConfig {
    /// Parse a configuration from TOML text. Missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns `LfcaError::InvalidParameter` for an unsupported filter, padding
    /// or EOF method name or an invalid value, and `LfcaError::Config` for
    /// malformed TOML.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let document: toml::Table =
            toml::from_str(text).map_err(|e| LfcaError::Config(e.to_string()))?;
        check_kind_names(&document)?;
        let config: Self = toml::from_str(text).map_err(|e| LfcaError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text).map_err(|e| match e {
            LfcaError::Config(msg) => LfcaError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Check the shape-independent parameters.
    ///
    /// Truncation against the data shape is checked when the engine runs.
    pub fn validate(&self) -> Result<()> {
        validate_cutoff(self.cutoff)?;
        if self.truncation == 0 {
            return Err(LfcaError::invalid_parameter(
                "truncation",
                self.truncation,
                "must retain at least one EOF",
            ));
        }
        self.filter.validate()
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.kind == FilterKind::Butterworth && self.butterworth_order == 0 {
            return Err(LfcaError::invalid_parameter(
                "butterworth_order",
                self.butterworth_order,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_cutoff(cutoff: usize) -> Result<()> {
    if cutoff < MIN_CUTOFF_PERIOD {
        return Err(LfcaError::invalid_parameter(
            "cutoff",
            cutoff,
            format!(
                "cutoff period must be at least {} time steps",
                MIN_CUTOFF_PERIOD
            ),
        ));
    }
    Ok(())
}
