//! Summary statistics, histograms, correlation and regression
//!
//! All functions are pure. Degenerate input (empty series, zero variance,
//! fewer than two pairs) yields `None` or an empty result instead of NaN or
//! infinity.

use serde::{Deserialize, Serialize};

/// Smallest and largest allowed histogram bin counts
pub const MIN_BINS: usize = 2;
pub const MAX_BINS: usize = 100;

/// Significant digits used for histogram bin labels
pub const DEFAULT_LABEL_PRECISION: usize = 4;

/// Summary statistics of a value series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation (divides by `count`)
    pub std_dev: f64,
}

/// Count, min, max, mean and population standard deviation, ignoring NaN.
///
/// Returns `None` when no numeric values remain.
pub fn compute_stats(values: &[f64]) -> Option<Stats> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if finite.is_empty() {
        return None;
    }

    let count = finite.len();
    let (min, max) = finite
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let mean = finite.iter().sum::<f64>() / count as f64;
    let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

    Some(Stats {
        count,
        min,
        max,
        mean,
        std_dev: variance.sqrt(),
    })
}

/// One histogram bin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    /// Inclusive lower edge
    pub lower: f64,
    /// Upper edge; inclusive only for the last bin
    pub upper: f64,
    /// Lower edge formatted to a fixed number of significant digits
    pub label: String,
    /// Positions of the member values in the input slice
    pub indices: Vec<usize>,
}

impl HistogramBin {
    pub fn count(&self) -> usize {
        self.indices.len()
    }
}

/// Histogram with default label precision, see [`compute_histogram_with_precision`]
pub fn compute_histogram(values: &[f64], bin_count: usize) -> Vec<HistogramBin> {
    compute_histogram_with_precision(values, bin_count, DEFAULT_LABEL_PRECISION)
}

/// Equal-width histogram over the non-NaN values.
///
/// `bin_count` is clamped to `2..=100`. If all values are equal the result is
/// a single bin holding every value. The maximum value lands in the last bin
/// rather than an extra one. Bins keep the input indices of their members.
pub fn compute_histogram_with_precision(
    values: &[f64],
    bin_count: usize,
    precision: usize,
) -> Vec<HistogramBin> {
    let Some(stats) = compute_stats(values) else {
        return Vec::new();
    };
    let members = values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .map(|(i, &v)| (i, v));

    if stats.min == stats.max {
        return vec![HistogramBin {
            lower: stats.min,
            upper: stats.max,
            label: format_significant(stats.min, precision),
            indices: members.map(|(i, _)| i).collect(),
        }];
    }

    let bins = bin_count.clamp(MIN_BINS, MAX_BINS);
    let width = (stats.max - stats.min) / bins as f64;

    let mut histogram: Vec<HistogramBin> = (0..bins)
        .map(|b| {
            let lower = stats.min + b as f64 * width;
            HistogramBin {
                lower,
                upper: if b + 1 == bins {
                    stats.max
                } else {
                    lower + width
                },
                label: format_significant(lower, precision),
                indices: Vec::new(),
            }
        })
        .collect();

    for (i, v) in members {
        let bin = (((v - stats.min) / width).floor() as usize).min(bins - 1);
        histogram[bin].indices.push(i);
    }

    histogram
}

/// Format with `digits` significant digits, switching to exponent notation
/// for very small or very large magnitudes
pub fn format_significant(value: f64, digits: usize) -> String {
    let digits = digits.max(1);
    if value == 0.0 || !value.is_finite() {
        return format!("{}", value);
    }

    let sci = format!("{:.*e}", digits - 1, value);
    let exponent = sci
        .split_once('e')
        .and_then(|(_, exp)| exp.parse::<i32>().ok())
        .unwrap_or(0);

    if exponent < -6 || exponent >= digits as i32 {
        sci
    } else {
        let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
        format!("{:.*}", decimals, value)
    }
}

/// Least-squares line `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
}

impl Regression {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

struct PairSums {
    mean_x: f64,
    mean_y: f64,
    sxx: f64,
    syy: f64,
    sxy: f64,
}

/// Centered sums over the finite pairs, `None` below two pairs
fn pair_sums(xs: &[f64], ys: &[f64]) -> Option<PairSums> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys.iter())
        .map(|(&x, &y)| (x, y))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    Some(PairSums {
        mean_x,
        mean_y,
        sxx,
        syy,
        sxy,
    })
}

/// Pearson correlation coefficient of paired samples.
///
/// `None` with fewer than two pairs or when either variable is constant.
pub fn pearson_r(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let s = pair_sums(xs, ys)?;
    let denom = (s.sxx * s.syy).sqrt();
    if denom == 0.0 {
        return None;
    }
    let r = (s.sxy / denom).clamp(-1.0, 1.0);
    r.is_finite().then_some(r)
}

/// Ordinary least-squares fit of `ys` on `xs`.
///
/// `None` with fewer than two pairs or when `xs` is constant.
pub fn linear_regression(xs: &[f64], ys: &[f64]) -> Option<Regression> {
    let s = pair_sums(xs, ys)?;
    if s.sxx == 0.0 {
        return None;
    }
    let slope = s.sxy / s.sxx;
    let intercept = s.mean_y - slope * s.mean_x;
    (slope.is_finite() && intercept.is_finite()).then_some(Regression { slope, intercept })
}
