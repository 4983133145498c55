//! Group-level reductions of a numeric target.
//!
//! - [`group_and_aggregate`] - mean of the target per combination of group columns
//! - [`segment_statistics`] - mean/min/max/sum of the target per segment label
//!
//! Groups come out in a fixed order: categorical columns by level order,
//! text columns lexicographically, numeric columns by value. An empty group
//! has a NaN mean (0 / 0); callers decide whether to replace it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::SegmentationResult;
use crate::models::{Column, ColumnData, Table};

/// Options for [`group_and_aggregate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupOptions {
    /// Emit every combination of group levels, including ones with no rows.
    #[serde(default)]
    pub include_unobserved: bool,
}

/// Running count/sum/min/max of one group.
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::NAN,
            max: f64::NAN,
        }
    }

    fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = if self.min.is_nan() { value } else { self.min.min(value) };
        self.max = if self.max.is_nan() { value } else { self.max.max(value) };
    }

    fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

/// Level labels of a column plus the level index of every row.
struct Levels {
    labels: Vec<String>,
    codes: Vec<Option<usize>>,
}

fn levels_of(column: &Column) -> Levels {
    match column.data() {
        ColumnData::Categorical { levels, codes } => Levels {
            labels: levels.clone(),
            codes: codes.clone(),
        },
        ColumnData::Text(values) => {
            let mut labels: Vec<String> = values.iter().flatten().cloned().collect();
            labels.sort();
            labels.dedup();
            let codes = values
                .iter()
                .map(|v| v.as_ref().and_then(|s| labels.binary_search(s).ok()))
                .collect();
            Levels { labels, codes }
        }
        ColumnData::Numeric(values) => {
            let mut distinct: Vec<f64> = values.iter().flatten().copied().filter(|v| !v.is_nan()).collect();
            distinct.sort_by(f64::total_cmp);
            distinct.dedup();
            let codes = values
                .iter()
                .map(|v| {
                    v.filter(|x| !x.is_nan())
                        .and_then(|x| distinct.binary_search_by(|d| d.total_cmp(&x)).ok())
                })
                .collect();
            Levels {
                labels: distinct.iter().map(|d| d.to_string()).collect(),
                codes,
            }
        }
    }
}

/// Every level combination in lexicographic order of level indices.
fn cartesian(sizes: &[usize]) -> Vec<Vec<usize>> {
    let mut combos: Vec<Vec<usize>> = vec![Vec::new()];
    for &size in sizes {
        combos = combos
            .into_iter()
            .flat_map(|prefix| {
                (0..size).map(move |i| {
                    let mut next = prefix.clone();
                    next.push(i);
                    next
                })
            })
            .collect();
    }
    combos
}

/// Mean of `target` for each combination of `group_columns`.
///
/// The result has one categorical column per group column (same name, same
/// level order) followed by a numeric column named after `target`. Rows with
/// a missing group value are left out; missing target values are skipped.
pub fn group_and_aggregate<S: AsRef<str>>(
    table: &Table,
    group_columns: &[S],
    target: &str,
    options: GroupOptions,
) -> SegmentationResult<Table> {
    let values = table.numeric(target)?;
    let levels = group_columns
        .iter()
        .map(|name| table.column(name.as_ref()).map(levels_of))
        .collect::<SegmentationResult<Vec<Levels>>>()?;

    let mut groups: BTreeMap<Vec<usize>, Accumulator> = BTreeMap::new();
    for row in 0..table.n_rows() {
        let key: Option<Vec<usize>> = levels.iter().map(|l| l.codes[row]).collect();
        let Some(key) = key else { continue };

        let acc = groups.entry(key).or_insert_with(Accumulator::new);
        if let Some(v) = values[row].filter(|v| !v.is_nan()) {
            acc.push(v);
        }
    }

    let keys: Vec<Vec<usize>> = if options.include_unobserved {
        let sizes: Vec<usize> = levels.iter().map(|l| l.labels.len()).collect();
        cartesian(&sizes)
    } else {
        groups.keys().cloned().collect()
    };

    let mut columns: Vec<Column> = group_columns
        .iter()
        .zip(&levels)
        .enumerate()
        .map(|(i, (name, l))| {
            let name: &str = name.as_ref();
            let codes = keys.iter().map(|k| Some(k[i])).collect();
            Column::categorical(name, l.labels.clone(), codes)
        })
        .collect();

    let means = keys
        .iter()
        .map(|k| Some(groups.get(k).map(Accumulator::mean).unwrap_or(f64::NAN)))
        .collect();
    columns.push(Column::numeric(target, means));

    Table::new(columns)
}

/// Rows ordered by `column` from largest to smallest; missing and NaN last.
///
/// The sort is stable, so ties keep their group order.
pub fn sort_descending(table: &Table, column: &str) -> SegmentationResult<Table> {
    let values = table.numeric(column)?;
    let mut rows: Vec<usize> = (0..table.n_rows()).collect();
    rows.sort_by(|&a, &b| {
        let key = |r: usize| values[r].filter(|v| !v.is_nan());
        match (key(a), key(b)) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
    });
    Ok(table.select_rows(&rows))
}

/// Replace missing and NaN cells of a numeric column with `value`.
pub fn fill_undefined(table: &Table, column: &str, value: f64) -> SegmentationResult<Table> {
    let filled = table
        .numeric(column)?
        .iter()
        .map(|v| Some(v.filter(|x| !x.is_nan()).unwrap_or(value)))
        .collect();
    table.with_column(Column::numeric(column, filled))
}

// =============================================================================
// Segment statistics
// =============================================================================

/// Target statistics of one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    #[serde(rename = "Segment")]
    pub segment: String,
    #[serde(rename = "Count")]
    pub count: usize,
    #[serde(rename = "Avg_Value")]
    pub avg: f64,
    #[serde(rename = "Min_Value")]
    pub min: f64,
    #[serde(rename = "Max_Value")]
    pub max: f64,
    #[serde(rename = "Total_Value")]
    pub total: f64,
}

/// Mean, min, max and sum of `target` for each segment present in the data.
///
/// Summaries follow the segment column's level order (lowest segment first
/// for columns produced by [`super::segmenter::assign_segments`]).
pub fn segment_statistics(
    table: &Table,
    segment_column: &str,
    target: &str,
) -> SegmentationResult<Vec<SegmentSummary>> {
    let values = table.numeric(target)?;
    let levels = levels_of(table.column(segment_column)?);

    let mut groups: BTreeMap<usize, Accumulator> = BTreeMap::new();
    for (row, code) in levels.codes.iter().enumerate() {
        let Some(code) = code else { continue };
        let acc = groups.entry(*code).or_insert_with(Accumulator::new);
        if let Some(v) = values[row].filter(|v| !v.is_nan()) {
            acc.push(v);
        }
    }

    Ok(groups
        .into_iter()
        .map(|(code, acc)| SegmentSummary {
            segment: levels.labels[code].clone(),
            count: acc.count,
            avg: acc.mean(),
            min: acc.min,
            max: acc.max,
            total: acc.sum,
        })
        .collect())
}

/// Summaries ordered by average value, highest first.
pub fn sort_by_avg_desc(mut summaries: Vec<SegmentSummary>) -> Vec<SegmentSummary> {
    summaries.sort_by(|a, b| b.avg.total_cmp(&a.avg));
    summaries
}

/// Tabular form of segment summaries.
pub fn summaries_to_table(summaries: &[SegmentSummary]) -> SegmentationResult<Table> {
    let numbers = |name: &str, field: fn(&SegmentSummary) -> f64| {
        Column::from_numbers(name, summaries.iter().map(field))
    };

    Table::new(vec![
        Column::from_strings("Segment", summaries.iter().map(|s| s.segment.clone())),
        numbers("Count", |s| s.count as f64),
        numbers("Avg_Value", |s| s.avg),
        numbers("Min_Value", |s| s.min),
        numbers("Max_Value", |s| s.max),
        numbers("Total_Value", |s| s.total),
    ])
}
