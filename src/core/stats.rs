//! Order statistics and dispersion over price-per-area samples
//!
//! Empty samples are not errors here: percentiles fall back to 0 and the
//! dispersion to zeros. Callers check the sample size before trusting them.

use serde::Serialize;

/// Linearly interpolated order statistic of `values` at quantile `q`
///
/// `q` is clamped to `[0, 1]`. The input is copied, never reordered.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let base = pos.floor() as usize;
    let rest = pos - base as f64;

    match sorted.get(base + 1) {
        Some(next) => sorted[base] + rest * (next - sorted[base]),
        None => sorted[base],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quartiles {
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
}

pub fn quartiles(values: &[f64]) -> Quartiles {
    Quartiles {
        p25: percentile(values, 0.25),
        median: percentile(values, 0.5),
        p75: percentile(values, 0.75),
    }
}

/// Mean, population variance and relative spread of a sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dispersion {
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
    /// `100 * std_dev / mean`; `None` when the mean is zero
    pub dispersion_pct: Option<f64>,
}

pub fn dispersion(values: &[f64]) -> Dispersion {
    if values.is_empty() {
        return Dispersion {
            mean: 0.0,
            variance: 0.0,
            std_dev: 0.0,
            dispersion_pct: None,
        };
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    let dispersion_pct = if mean != 0.0 {
        Some(100.0 * std_dev / mean)
    } else {
        None
    };

    Dispersion {
        mean,
        variance,
        std_dev,
        dispersion_pct,
    }
}
