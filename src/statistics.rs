//! Pure statistical kernels shared by the detection algorithms
//!
//! All functions are total over arbitrary `f64` slices: degenerate inputs
//! (empty series, constant series, zero denominators) return 0 rather than
//! NaN or infinity, so downstream scoring never has to re-validate.

/// Arithmetic mean. Returns 0 for an empty series.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance: `sum((x - mean)^2) / n`. Returns 0 for an empty series.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Coefficient of variation: `stddev / mean`, 0 when the mean is 0.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if m == 0.0 {
        return 0.0;
    }
    std_dev(values) / m
}

/// Result of an ordinary-least-squares fit of value against index position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTrend {
    /// Slope of the fitted line (value units per sample).
    pub slope: f64,
    /// Pearson correlation between index and value.
    pub correlation: f64,
}

/// Least-squares linear trend of a series against its index (0..n-1).
///
/// Constant or too-short series yield `{slope: 0, correlation: 0}`.
pub fn linear_trend(values: &[f64]) -> LinearTrend {
    let n = values.len();
    if n < 2 {
        return LinearTrend { slope: 0.0, correlation: 0.0 };
    }

    let n_f = n as f64;
    let sum_x: f64 = (0..n).map(|i| i as f64).sum();
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values.iter().enumerate().map(|(i, v)| i as f64 * v).sum();
    let sum_x2: f64 = (0..n).map(|i| (i * i) as f64).sum();
    let sum_y2: f64 = values.iter().map(|v| v * v).sum();

    let slope_denom = n_f * sum_x2 - sum_x * sum_x;
    let slope = if slope_denom == 0.0 {
        0.0
    } else {
        (n_f * sum_xy - sum_x * sum_y) / slope_denom
    };

    let corr_denom =
        ((n_f * sum_x2 - sum_x * sum_x) * (n_f * sum_y2 - sum_y * sum_y)).sqrt();
    let correlation = if corr_denom == 0.0 {
        0.0
    } else {
        (n_f * sum_xy - sum_x * sum_y) / corr_denom
    };

    LinearTrend { slope, correlation }
}

/// Pearson correlation coefficient over the overlapping prefix of two series.
///
/// Returns 0 when fewer than two overlapping samples exist or either series
/// is constant over the overlap.
pub fn pearson_correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }

    let n_f = n as f64;
    let sum_a: f64 = a[..n].iter().sum();
    let sum_b: f64 = b[..n].iter().sum();
    let sum_ab: f64 = a[..n].iter().zip(&b[..n]).map(|(x, y)| x * y).sum();
    let sum_a2: f64 = a[..n].iter().map(|x| x * x).sum();
    let sum_b2: f64 = b[..n].iter().map(|y| y * y).sum();

    let denom = ((n_f * sum_a2 - sum_a * sum_a) * (n_f * sum_b2 - sum_b * sum_b)).sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    (n_f * sum_ab - sum_a * sum_b) / denom
}
