use crate::config::PaddingKind;

/// Map a (possibly out-of-range) sample index onto the series.
///
/// Mirror padding reflects about each end with the edge sample repeated
/// (`... x1 x0 | x0 x1 ... xn | xn xn-1 ...`); periodic padding wraps.
/// Indices more than one series length outside keep reflecting or wrapping.
fn source_index(index: isize, len: usize, kind: PaddingKind) -> usize {
    let len = len as isize;
    match kind {
        PaddingKind::Periodic => index.rem_euclid(len) as usize,
        PaddingKind::Mirror => {
            let m = index.rem_euclid(2 * len);
            if m < len {
                m as usize
            } else {
                (2 * len - 1 - m) as usize
            }
        }
    }
}

/// Extend `series` by `pad` samples on both ends.
///
/// The result has length `series.len() + 2 * pad`; the original samples sit
/// at `pad..pad + series.len()`. An empty series pads to an empty vector.
pub fn pad(series: &[f64], pad: usize, kind: PaddingKind) -> Vec<f64> {
    if series.is_empty() {
        return Vec::new();
    }
    let len = series.len();
    (-(pad as isize)..(len + pad) as isize)
        .map(|i| series[source_index(i, len, kind)])
        .collect()
}

/// Remove `pad` samples from both ends of a padded series.
pub fn trim(padded: &[f64], pad: usize) -> Vec<f64> {
    if padded.len() < 2 * pad {
        return Vec::new();
    }
    padded[pad..padded.len() - pad].to_vec()
}
