//! Point-string decoding
//!
//! The `<points>` element of a curve is read as raw text instead of being
//! expanded into thousands of XML nodes. This module pulls the ordered
//! `x="…" y="…"` pairs back out of that text.

use regex::Regex;
use std::sync::LazyLock;

static POINT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"x="([^"]*)"\s+y="([^"]*)""#).expect("valid point pattern"));

/// Decoded X/Y series, always of equal length
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSeries {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl PointSeries {
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }
}

/// Extract up to `declared` point pairs from `raw`.
///
/// Stops at `declared` pairs or when the text runs out. A shorter result is
/// returned as-is (never padded); pairs whose numbers do not parse are
/// skipped. Absent text or `declared == 0` yields an empty series.
pub fn decode_points(raw: Option<&str>, declared: usize) -> PointSeries {
    let Some(raw) = raw else {
        return PointSeries::default();
    };
    if declared == 0 {
        return PointSeries::default();
    }

    let mut series = PointSeries {
        xs: Vec::with_capacity(declared),
        ys: Vec::with_capacity(declared),
    };

    for caps in POINT_PATTERN.captures_iter(raw) {
        if series.len() >= declared {
            break;
        }
        let x = caps[1].trim().parse::<f64>();
        let y = caps[2].trim().parse::<f64>();
        if let (Ok(x), Ok(y)) = (x, y) {
            series.xs.push(x);
            series.ys.push(y);
        }
    }

    if series.len() != declared {
        tracing::debug!(
            "Point count mismatch: declared {}, decoded {}",
            declared,
            series.len()
        );
    }

    series
}
