//! Set/actual value rows across files
//!
//! Rows are identified by `(kind, row_number)`. Within one file a repeated
//! row number is resolved by last write; deactivated rows never contribute to
//! trends or correlations.

use super::stats::{
    compute_histogram, compute_stats, linear_regression, pearson_r, HistogramBin, Regression,
    Stats,
};
use crate::cancel::{CancelToken, Progress};
use crate::types::{FileId, ImportedFile, ValueRow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Which value table a row lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Set,
    Actual,
}

impl ValueKind {
    fn rows(self, file: &ImportedFile) -> &[ValueRow] {
        match self {
            ValueKind::Set => &file.set_values,
            ValueKind::Actual => &file.actual_values,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Set => f.write_str("set"),
            ValueKind::Actual => f.write_str("actual"),
        }
    }
}

impl FromStr for ValueKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "set" => Ok(ValueKind::Set),
            "actual" => Ok(ValueKind::Actual),
            other => Err(format!("unknown value kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueRowKey {
    pub kind: ValueKind,
    pub row_number: i64,
}

impl ValueRowKey {
    pub fn new(kind: ValueKind, row_number: i64) -> Self {
        Self { kind, row_number }
    }
}

impl fmt::Display for ValueRowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.row_number)
    }
}

/// Union of the active rows of every file, keyed by row number.
///
/// Later files overwrite earlier ones, so the map carries the most recent
/// description and unit for each row.
pub fn collect_value_rows(files: &[ImportedFile], kind: ValueKind) -> BTreeMap<i64, ValueRow> {
    let mut rows = BTreeMap::new();
    for file in files {
        for row in kind.rows(file) {
            if row.is_deactivated() {
                continue;
            }
            rows.insert(row.row_number, row.clone());
        }
    }
    rows
}

/// Last row of `file` with the key's row number, unless that row is deactivated
pub fn lookup_row<'a>(file: &'a ImportedFile, key: ValueRowKey) -> Option<&'a ValueRow> {
    key.kind
        .rows(file)
        .iter()
        .rev()
        .find(|row| row.row_number == key.row_number)
        .filter(|row| !row.is_deactivated())
}

/// One file's numeric value for a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub file_id: FileId,
    pub filename: String,
    /// `None` when the row is missing, deactivated or not numeric
    pub value: Option<f64>,
}

/// Per-file values of one row, in file order
pub fn value_series(files: &[ImportedFile], key: ValueRowKey) -> Vec<TrendPoint> {
    files
        .iter()
        .map(|file| TrendPoint {
            file_id: file.id.clone(),
            filename: file.filename.clone(),
            value: lookup_row(file, key).and_then(ValueRow::numeric_value),
        })
        .collect()
}

/// Paired values of two rows and their relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    /// `(a, b, file)` for every file with a numeric value in both rows
    pub pairs: Vec<(f64, f64, FileId)>,
    pub r: Option<f64>,
    pub regression: Option<Regression>,
}

impl Correlation {
    pub fn xs(&self) -> Vec<f64> {
        self.pairs.iter().map(|p| p.0).collect()
    }

    pub fn ys(&self) -> Vec<f64> {
        self.pairs.iter().map(|p| p.1).collect()
    }
}

/// Correlate row `a` (X) against row `b` (Y) across files
pub fn correlate(files: &[ImportedFile], a: ValueRowKey, b: ValueRowKey) -> Correlation {
    let pairs: Vec<(f64, f64, FileId)> = files
        .iter()
        .filter_map(|file| {
            let va = lookup_row(file, a)?.numeric_value()?;
            let vb = lookup_row(file, b)?.numeric_value()?;
            Some((va, vb, file.id.clone()))
        })
        .collect();

    let xs: Vec<f64> = pairs.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = pairs.iter().map(|p| p.1).collect();
    Correlation {
        r: pearson_r(&xs, &ys),
        regression: linear_regression(&xs, &ys),
        pairs,
    }
}

/// Statistics of one row across files
#[derive(Debug, Clone, PartialEq)]
pub struct RowTrend {
    pub key: ValueRowKey,
    pub description: String,
    pub unit: String,
    pub series: Vec<TrendPoint>,
    pub stats: Option<Stats>,
    /// Bin indices refer to `series`
    pub histogram: Vec<HistogramBin>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendBatch {
    pub rows: Vec<RowTrend>,
    pub cancelled: bool,
}

/// Trend of a single row; missing values are kept as NaN so histogram
/// indices line up with the series
pub fn row_trend(files: &[ImportedFile], key: ValueRowKey, row: &ValueRow, bins: usize) -> RowTrend {
    let series = value_series(files, key);
    let values: Vec<f64> = series.iter().map(|p| p.value.unwrap_or(f64::NAN)).collect();
    RowTrend {
        key,
        description: row.description.clone(),
        unit: row.unit.clone(),
        stats: compute_stats(&values),
        histogram: compute_histogram(&values, bins),
        series,
    }
}

/// Trends for every active row of `kind`.
///
/// Progress is reported before each row; cancellation is checked between
/// rows and the rows already computed are returned.
pub fn row_trends(
    files: &[ImportedFile],
    kind: ValueKind,
    bins: usize,
    mut on_progress: impl FnMut(Progress),
    cancel: &CancelToken,
) -> TrendBatch {
    let rows = collect_value_rows(files, kind);
    let total = rows.len();
    let mut batch = TrendBatch::default();

    for (index, (row_number, row)) in rows.iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::info!("Trend computation cancelled after {} of {} rows", index, total);
            batch.cancelled = true;
            break;
        }
        on_progress(Progress {
            current: index + 1,
            total,
            label: row.description.clone(),
        });
        let key = ValueRowKey::new(kind, *row_number);
        batch.rows.push(row_trend(files, key, row, bins));
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RAW_STATUS_DEACTIVATED;
    use crate::types::{map_value_status, STATUS_DEACTIVATED};

    fn row(number: i64, value: &str) -> ValueRow {
        ValueRow {
            description: format!("row {number}"),
            row_number: number,
            value: value.to_string(),
            ..Default::default()
        }
    }

    fn deactivated(number: i64, value: &str) -> ValueRow {
        ValueRow {
            status: map_value_status(RAW_STATUS_DEACTIVATED),
            ..row(number, value)
        }
    }

    fn file(id: &str, set: Vec<ValueRow>, actual: Vec<ValueRow>) -> ImportedFile {
        ImportedFile {
            id: FileId::from(id),
            filename: format!("{id}.xml"),
            set_values: set,
            actual_values: actual,
            ..Default::default()
        }
    }

    #[test]
    fn test_collect_union_skips_deactivated() {
        let files = [
            file("a", vec![row(1, "1"), deactivated(2, "2")], vec![]),
            file("b", vec![row(3, "3")], vec![row(9, "9")]),
        ];
        let rows = collect_value_rows(&files, ValueKind::Set);
        assert_eq!(rows.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
        let actual = collect_value_rows(&files, ValueKind::Actual);
        assert_eq!(actual.keys().copied().collect::<Vec<_>>(), vec![9]);
    }

    #[test]
    fn test_deactivated_status_is_normalized() {
        assert_eq!(deactivated(1, "1").status, STATUS_DEACTIVATED);
    }

    #[test]
    fn test_lookup_last_write_wins() {
        let f = file("a", vec![row(1, "10"), row(1, "20")], vec![]);
        let key = ValueRowKey::new(ValueKind::Set, 1);
        assert_eq!(lookup_row(&f, key).map(|r| r.value.as_str()), Some("20"));
    }

    #[test]
    fn test_lookup_deactivated_last_hides_row() {
        let f = file("a", vec![row(1, "10"), deactivated(1, "20")], vec![]);
        assert!(lookup_row(&f, ValueRowKey::new(ValueKind::Set, 1)).is_none());
    }

    #[test]
    fn test_value_series_non_numeric() {
        let files = [
            file("a", vec![row(1, "1.5")], vec![]),
            file("b", vec![row(1, "n/a")], vec![]),
            file("c", vec![], vec![]),
        ];
        let series = value_series(&files, ValueRowKey::new(ValueKind::Set, 1));
        let values: Vec<_> = series.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![Some(1.5), None, None]);
        assert_eq!(series[1].filename, "b.xml");
    }

    #[test]
    fn test_correlate_perfect_line() {
        let files: Vec<_> = (1..=3)
            .map(|i| {
                file(
                    &format!("f{i}"),
                    vec![row(1, &i.to_string())],
                    vec![row(2, &(2 * i).to_string())],
                )
            })
            .collect();
        let c = correlate(
            &files,
            ValueRowKey::new(ValueKind::Set, 1),
            ValueRowKey::new(ValueKind::Actual, 2),
        );
        assert_eq!(c.pairs.len(), 3);
        assert!((c.r.unwrap() - 1.0).abs() < 1e-12);
        let reg = c.regression.unwrap();
        assert!((reg.slope - 2.0).abs() < 1e-12);
        assert!(reg.intercept.abs() < 1e-12);
    }

    #[test]
    fn test_correlate_skips_incomplete_files() {
        let files = [
            file("a", vec![row(1, "1"), row(2, "2")], vec![]),
            file("b", vec![row(1, "2")], vec![]),
            file("c", vec![row(1, "3"), deactivated(2, "5")], vec![]),
        ];
        let c = correlate(
            &files,
            ValueRowKey::new(ValueKind::Set, 1),
            ValueRowKey::new(ValueKind::Set, 2),
        );
        assert_eq!(c.pairs.len(), 1);
        assert_eq!(c.pairs[0].2, FileId::from("a"));
        assert!(c.r.is_none());
        assert!(c.regression.is_none());
    }

    #[test]
    fn test_row_trends_stats_and_histogram() {
        let files = [
            file("a", vec![row(1, "1"), row(2, "x")], vec![]),
            file("b", vec![row(1, "3")], vec![]),
            file("c", vec![], vec![]),
        ];
        let batch = row_trends(&files, ValueKind::Set, 2, |_| {}, &CancelToken::new());
        assert!(!batch.cancelled);
        assert_eq!(batch.rows.len(), 2);

        let first = &batch.rows[0];
        let stats = first.stats.unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean, 2.0);
        let total: usize = first.histogram.iter().map(HistogramBin::count).sum();
        assert_eq!(total, 2);
        assert!(first.histogram.iter().all(|b| b.indices.iter().all(|&i| i < 2)));

        let second = &batch.rows[1];
        assert!(second.stats.is_none());
        assert!(second.histogram.is_empty());
    }

    #[test]
    fn test_row_trends_cancel_between_rows() {
        let files = [file("a", vec![row(1, "1"), row(2, "2"), row(3, "3")], vec![])];
        let cancel = CancelToken::new();
        let batch = row_trends(
            &files,
            ValueKind::Set,
            10,
            |p| {
                if p.current == 1 {
                    cancel.cancel();
                }
            },
            &cancel,
        );
        assert!(batch.cancelled);
        assert_eq!(batch.rows.len(), 1);
    }

    #[test]
    fn test_value_kind_parse() {
        assert_eq!("Actual".parse::<ValueKind>().unwrap(), ValueKind::Actual);
        assert!("other".parse::<ValueKind>().is_err());
        assert_eq!(ValueRowKey::new(ValueKind::Set, 4).to_string(), "set#4");
    }
}
