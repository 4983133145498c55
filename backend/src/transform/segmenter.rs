//! Equal-frequency (quantile) segmentation of a numeric column.
//!
//! # Cut method
//!
//! For `n` segments the cut points are the sample quantiles at
//! `p = 0, 1/n, …, 1` of the non-missing values, computed with linear
//! interpolation between closest ranks (Hyndman & Fan type 7):
//!
//! ```text
//! h = (m - 1) * p,  j = ⌊h⌋,  q(p) = x[j] + (h - j) * (x[j+1] - x[j])
//! ```
//!
//! Segment `i` covers `(c[i], c[i+1]]`; the first segment also includes
//! `c[0]`. A value equal to a cut point therefore belongs to the lower
//! segment. Repeated cut points are rejected rather than merged.

use crate::error::{SegmentationError, SegmentationResult};
use crate::models::{Column, Table};

/// Quantile of **sorted** data by linear interpolation (type 7).
///
/// Returns `None` for empty data or `p` outside `[0, 1]`.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 || !(0.0..=1.0).contains(&p) {
        return None;
    }
    if n == 1 {
        return Some(sorted[0]);
    }

    let h = (n - 1) as f64 * p;
    let j = h.floor() as usize;
    let g = h - h.floor();

    if j + 1 >= n {
        Some(sorted[n - 1])
    } else {
        Some(sorted[j] + g * (sorted[j + 1] - sorted[j]))
    }
}

/// Sorted copy of the non-missing, non-NaN values.
pub(crate) fn sorted_values(values: &[Option<f64>]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().flatten().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Cut points splitting `values` into `n_segments` equal-frequency groups.
pub fn quantile_cuts(values: &[Option<f64>], n_segments: usize) -> SegmentationResult<Vec<f64>> {
    if n_segments < 2 {
        return Err(SegmentationError::InvalidSegmentCount(format!(
            "need at least 2 segments, got {}",
            n_segments
        )));
    }

    let sorted = sorted_values(values);
    if sorted.is_empty() {
        return Err(SegmentationError::InvalidSegmentCount(
            "target column has no values".to_string(),
        ));
    }

    let mut distinct = sorted.clone();
    distinct.dedup();
    if distinct.len() < n_segments {
        return Err(SegmentationError::InvalidSegmentCount(format!(
            "{} distinct values cannot form {} segments",
            distinct.len(),
            n_segments
        )));
    }

    let cuts: Vec<f64> = (0..=n_segments)
        .filter_map(|i| quantile_sorted(&sorted, i as f64 / n_segments as f64))
        .collect();

    if let Some(pair) = cuts.windows(2).find(|w| w[0] >= w[1]) {
        return Err(SegmentationError::InvalidSegmentCount(format!(
            "duplicate cut point {} (too many tied values for {} segments)",
            pair[1], n_segments
        )));
    }

    Ok(cuts)
}

/// Segment index of `value` given ascending cut points.
fn locate(cuts: &[f64], value: f64) -> Option<usize> {
    if value.is_nan() || value < cuts[0] || value > cuts[cuts.len() - 1] {
        return None;
    }
    let idx = cuts.partition_point(|&c| c < value);
    Some(idx.saturating_sub(1))
}

/// Add a categorical column `new_column` with the quantile segment of `target`.
///
/// `labels[0]` names the lowest segment; labels are used in the given order.
pub fn assign_segments<S: AsRef<str>>(
    table: &Table,
    target: &str,
    n_segments: usize,
    labels: &[S],
    new_column: &str,
) -> SegmentationResult<Table> {
    if labels.len() != n_segments {
        return Err(SegmentationError::InvalidSegmentCount(format!(
            "{} segments need {} labels, got {}",
            n_segments,
            n_segments,
            labels.len()
        )));
    }

    let values = table.numeric(target)?;
    let cuts = quantile_cuts(values, n_segments)?;

    let codes = values
        .iter()
        .map(|v| v.and_then(|v| locate(&cuts, v)))
        .collect();
    let levels = labels.iter().map(|l| l.as_ref().to_string()).collect();

    table.with_column(Column::categorical(new_column, levels, codes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;

    const LABELS: [&str; 4] = ["D", "C", "B", "A"];

    fn prices(values: &[f64]) -> Table {
        Table::new(vec![Column::from_numbers("Price", values.iter().copied())]).unwrap()
    }

    fn segment_of(table: &Table, row: usize) -> Cell<'_> {
        table.column("Segment").unwrap().cell(row)
    }

    #[test]
    fn test_quantile_sorted() {
        let data = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(quantile_sorted(&data, 0.0), Some(10.0));
        assert_eq!(quantile_sorted(&data, 0.25), Some(17.5));
        assert_eq!(quantile_sorted(&data, 0.5), Some(25.0));
        assert_eq!(quantile_sorted(&data, 1.0), Some(40.0));
        assert_eq!(quantile_sorted(&[], 0.5), None);
        assert_eq!(quantile_sorted(&data, 1.5), None);
    }

    #[test]
    fn test_four_prices_four_segments() {
        let out = assign_segments(&prices(&[10.0, 20.0, 30.0, 40.0]), "Price", 4, &LABELS, "Segment").unwrap();

        assert_eq!(segment_of(&out, 0), Cell::Text("D"));
        assert_eq!(segment_of(&out, 1), Cell::Text("C"));
        assert_eq!(segment_of(&out, 2), Cell::Text("B"));
        assert_eq!(segment_of(&out, 3), Cell::Text("A"));
    }

    #[test]
    fn test_labels_not_reordered() {
        let out = assign_segments(&prices(&[40.0, 10.0]), "Price", 2, &["low", "high"], "Segment").unwrap();
        assert_eq!(segment_of(&out, 0), Cell::Text("high"));
        assert_eq!(segment_of(&out, 1), Cell::Text("low"));
    }

    #[test]
    fn test_boundary_value_goes_to_lower_segment() {
        // cuts: 1, 3, 5 -> the value 3 sits on the boundary
        let out = assign_segments(&prices(&[1.0, 2.0, 3.0, 4.0, 5.0]), "Price", 2, &["low", "high"], "Segment").unwrap();
        assert_eq!(segment_of(&out, 2), Cell::Text("low"));
        assert_eq!(segment_of(&out, 3), Cell::Text("high"));
    }

    #[test]
    fn test_balanced_counts_on_distinct_values() {
        for n in [8usize, 13, 40, 101] {
            let values: Vec<f64> = (0..n).map(|i| (i * 37 % n) as f64 + 0.5).collect();
            let out = assign_segments(&prices(&values), "Price", 4, &LABELS, "Segment").unwrap();
            let seg = out.column("Segment").unwrap();

            let mut counts = [0usize; 4];
            for row in 0..n {
                let label = seg.cell(row).to_string();
                let idx = LABELS.iter().position(|l| *l == label).unwrap();
                counts[idx] += 1;
            }
            let max = *counts.iter().max().unwrap();
            let min = *counts.iter().min().unwrap();
            assert!(max - min <= 1, "n={} counts={:?}", n, counts);
        }
    }

    #[test]
    fn test_segment_rank_follows_value() {
        let values: Vec<f64> = (1..=20).map(|i| f64::from(i) * 3.5).collect();
        let out = assign_segments(&prices(&values), "Price", 4, &LABELS, "Segment").unwrap();
        let seg = out.column("Segment").unwrap();

        let rank = |row: usize| {
            let label = seg.cell(row).to_string();
            LABELS.iter().position(|l| *l == label).unwrap()
        };
        for row in 1..values.len() {
            assert!(rank(row - 1) <= rank(row));
        }
    }

    #[test]
    fn test_missing_target_left_undefined() {
        let table = Table::new(vec![Column::numeric(
            "Price",
            vec![Some(1.0), None, Some(2.0), Some(3.0), Some(4.0)],
        )])
        .unwrap();
        let out = assign_segments(&table, "Price", 2, &["low", "high"], "Segment").unwrap();
        assert!(segment_of(&out, 1).is_null());
    }

    #[test]
    fn test_too_few_distinct_values() {
        let err = assign_segments(&prices(&[5.0, 5.0, 5.0, 7.0]), "Price", 4, &LABELS, "Segment").unwrap_err();
        assert!(matches!(err, SegmentationError::InvalidSegmentCount(_)));
    }

    #[test]
    fn test_tied_cut_points_rejected() {
        // three distinct values but the lower quartiles coincide
        let err = assign_segments(
            &prices(&[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 3.0]),
            "Price",
            3,
            &["low", "mid", "high"],
            "Segment",
        )
        .unwrap_err();
        assert!(matches!(err, SegmentationError::InvalidSegmentCount(_)));
    }

    #[test]
    fn test_label_count_mismatch() {
        let err = assign_segments(&prices(&[1.0, 2.0, 3.0]), "Price", 3, &["a", "b"], "Segment").unwrap_err();
        assert!(matches!(err, SegmentationError::InvalidSegmentCount(_)));

        let err = assign_segments(&prices(&[1.0, 2.0]), "Price", 1, &["a"], "Segment").unwrap_err();
        assert!(matches!(err, SegmentationError::InvalidSegmentCount(_)));
    }
}
