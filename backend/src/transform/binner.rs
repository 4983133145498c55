//! Fixed-edge binning of a numeric column into ordered categories.
//!
//! Intervals are right-closed: `labels[i]` covers `(edges[i], edges[i + 1]]`.

use serde::{Deserialize, Serialize};

use crate::error::{SegmentationError, SegmentationResult};
use crate::logs::log_warning;
use crate::models::{Column, Table};

/// What to do with a value outside every bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfRange {
    /// Abort with [`SegmentationError::ValueOutOfBinRange`].
    #[default]
    Fail,
    /// Leave the category undefined and log a warning.
    Undefined,
}

/// Validated bin edges with their labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Bins {
    edges: Vec<f64>,
    labels: Vec<String>,
}

impl Bins {
    /// Check that edges are strictly increasing and that there is one label per interval.
    pub fn new<S: Into<String>>(edges: Vec<f64>, labels: impl IntoIterator<Item = S>) -> SegmentationResult<Self> {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();

        if edges.len() < 2 {
            return Err(SegmentationError::InvalidBinEdges(format!(
                "need at least 2 edges, got {}",
                edges.len()
            )));
        }
        if edges.iter().any(|e| e.is_nan()) {
            return Err(SegmentationError::InvalidBinEdges("edges contain NaN".into()));
        }
        if let Some(pair) = edges.windows(2).find(|w| w[0] >= w[1]) {
            return Err(SegmentationError::InvalidBinEdges(format!(
                "edges must be strictly increasing ({} is followed by {})",
                pair[0], pair[1]
            )));
        }
        if labels.len() != edges.len() - 1 {
            return Err(SegmentationError::InvalidBinEdges(format!(
                "{} edges need {} labels, got {}",
                edges.len(),
                edges.len() - 1,
                labels.len()
            )));
        }

        Ok(Self { edges, labels })
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Index of the interval containing `value`, if any.
    pub fn locate(&self, value: f64) -> Option<usize> {
        if value.is_nan() {
            return None;
        }
        // first edge >= value; the interval ends at that edge
        let idx = self.edges.partition_point(|&e| e < value);
        if idx == 0 || idx == self.edges.len() {
            None
        } else {
            Some(idx - 1)
        }
    }
}

/// Add a categorical column `new_column` holding the bin label of `column`.
///
/// Missing numbers stay undefined. Numbers outside the edges are handled
/// according to `policy`.
pub fn categorize(
    table: &Table,
    column: &str,
    bins: &Bins,
    new_column: &str,
    policy: OutOfRange,
) -> SegmentationResult<Table> {
    let values = table.numeric(column)?;
    let mut codes = Vec::with_capacity(values.len());
    let mut out_of_range = 0;

    for (row, value) in values.iter().enumerate() {
        let value = match value {
            Some(v) if !v.is_nan() => *v,
            _ => {
                codes.push(None);
                continue;
            }
        };

        match bins.locate(value) {
            Some(idx) => codes.push(Some(idx)),
            None => match policy {
                OutOfRange::Fail => {
                    return Err(SegmentationError::ValueOutOfBinRange {
                        column: column.to_string(),
                        row,
                        value,
                        lower: bins.edges[0],
                        upper: bins.edges[bins.edges.len() - 1],
                    });
                }
                OutOfRange::Undefined => {
                    out_of_range += 1;
                    codes.push(None);
                }
            },
        }
    }

    if out_of_range > 0 {
        log_warning(format!(
            "{} value(s) of '{}' fall outside the bin edges; '{}' left undefined for those rows",
            out_of_range, column, new_column
        ));
    }

    table.with_column(Column::categorical(new_column, bins.labels.clone(), codes))
}
