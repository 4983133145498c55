//! Text reports over tables.
//!
//! Every function returns a `String`; printing is left to the caller.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::SegmentationResult;
use crate::models::{Cell, Column, ColumnKind, Table};
use crate::transform::aggregator::{group_and_aggregate, segment_statistics, GroupOptions};
use crate::transform::segmenter::{quantile_sorted, sorted_values};

/// Probabilities reported by [`check_table`] for numeric columns.
pub const CHECK_QUANTILES: [f64; 6] = [0.0, 0.05, 0.50, 0.95, 0.99, 1.0];

const BANNER: &str = "#####################";

// =============================================================================
// Display options
// =============================================================================

/// Layout limits for [`render_table`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    /// Columns shown before eliding the middle ones; `None` shows all
    pub max_columns: Option<usize>,
    /// Rows shown before eliding the middle ones
    pub max_rows: usize,
    /// Line width in characters; longer lines are cut
    pub width: usize,
    /// Digits after the decimal point for numbers
    pub precision: usize,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            max_columns: None,
            max_rows: 10,
            width: 500,
            precision: 2,
        }
    }
}

// =============================================================================
// Rendering
// =============================================================================

fn format_cell(cell: Cell<'_>, precision: usize) -> String {
    match cell {
        Cell::Null => "NaN".to_string(),
        Cell::Number(v) if v.is_nan() => "NaN".to_string(),
        Cell::Number(v) => format!("{:.*}", precision, v),
        Cell::Text(s) => s.to_string(),
    }
}

/// Indices kept when at most `limit` of `total` may be shown: the first
/// half, `None` as the elision marker, then the last half.
fn visible(total: usize, limit: Option<usize>) -> Vec<Option<usize>> {
    match limit {
        Some(limit) if total > limit => {
            let head = (limit + 1) / 2;
            let tail = limit / 2;
            (0..head)
                .map(Some)
                .chain(std::iter::once(None))
                .chain((total - tail..total).map(Some))
                .collect()
        }
        _ => (0..total).map(Some).collect(),
    }
}

struct RenderedColumn {
    header: String,
    cells: Vec<String>,
    right_align: bool,
}

impl RenderedColumn {
    fn width(&self) -> usize {
        self.cells
            .iter()
            .chain(std::iter::once(&self.header))
            .map(|s| s.chars().count())
            .max()
            .unwrap_or(0)
    }
}

fn pad(text: &str, width: usize, right_align: bool) -> String {
    if right_align {
        format!("{:>width$}", text, width = width)
    } else {
        format!("{:<width$}", text, width = width)
    }
}

fn cut(line: &str, width: usize) -> String {
    if width == 0 {
        line.to_string()
    } else {
        line.chars().take(width).collect::<String>().trim_end().to_string()
    }
}

/// Fixed-width text rendering of a table.
///
/// Numbers are right-aligned with `display.precision` decimals, text is
/// left-aligned and missing cells show as `NaN`. Elided rows or columns are
/// replaced by `...` and the full shape is appended.
pub fn render_table(table: &Table, display: &DisplayOptions) -> String {
    let rows = visible(table.n_rows(), Some(display.max_rows));
    let cols = visible(table.n_cols(), display.max_columns);

    let rendered: Vec<RenderedColumn> = cols
        .iter()
        .map(|col| match col {
            Some(c) => {
                let column = &table.columns()[*c];
                RenderedColumn {
                    header: column.name().to_string(),
                    cells: rows
                        .iter()
                        .map(|r| match r {
                            Some(r) => format_cell(column.cell(*r), display.precision),
                            None => "...".to_string(),
                        })
                        .collect(),
                    right_align: column.kind() == ColumnKind::Numeric,
                }
            }
            None => RenderedColumn {
                header: "...".to_string(),
                cells: vec!["...".to_string(); rows.len()],
                right_align: false,
            },
        })
        .collect();

    let widths: Vec<usize> = rendered.iter().map(RenderedColumn::width).collect();
    let line = |cells: Vec<String>| {
        let joined = cells.join("  ");
        cut(&joined, display.width)
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(line(
        rendered
            .iter()
            .zip(&widths)
            .map(|(c, w)| pad(&c.header, *w, c.right_align))
            .collect(),
    ));
    for i in 0..rows.len() {
        lines.push(line(
            rendered
                .iter()
                .zip(&widths)
                .map(|(c, w)| pad(&c.cells[i], *w, c.right_align))
                .collect(),
        ));
    }

    if rows.contains(&None) || cols.contains(&None) {
        lines.push(String::new());
        lines.push(format!("[{} rows x {} columns]", table.n_rows(), table.n_cols()));
    }

    lines.join("\n")
}

/// Two-column `name  value` listing.
fn render_pairs(pairs: &[(String, String)]) -> String {
    let name_width = pairs.iter().map(|(n, _)| n.chars().count()).max().unwrap_or(0);
    let value_width = pairs.iter().map(|(_, v)| v.chars().count()).max().unwrap_or(0);
    pairs
        .iter()
        .map(|(n, v)| format!("{:<nw$}  {:>vw$}", n, v, nw = name_width, vw = value_width))
        .collect::<Vec<_>>()
        .join("\n")
}

fn section(out: &mut String, title: &str, body: &str) {
    out.push_str(&format!("{} {} {}\n", BANNER, title, BANNER));
    out.push_str(body);
    out.push('\n');
}

// =============================================================================
// Overview
// =============================================================================

/// Per numeric column: count, mean, sample standard deviation, min, the
/// [`CHECK_QUANTILES`] and max.
pub fn describe(table: &Table) -> SegmentationResult<Table> {
    let numeric: Vec<&Column> = table
        .columns()
        .iter()
        .filter(|c| c.kind() == ColumnKind::Numeric)
        .collect();

    let mut stats: Vec<Vec<f64>> = Vec::with_capacity(numeric.len());
    for column in &numeric {
        let sorted = sorted_values(column.as_numeric()?);
        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let std = if n < 2 {
            f64::NAN
        } else {
            (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
        };

        let mut row = vec![n as f64, mean, std, sorted.first().copied().unwrap_or(f64::NAN)];
        row.extend(
            CHECK_QUANTILES
                .iter()
                .map(|&p| quantile_sorted(&sorted, p).unwrap_or(f64::NAN)),
        );
        row.push(sorted.last().copied().unwrap_or(f64::NAN));
        stats.push(row);
    }

    let mut headers: Vec<String> = vec!["count".into(), "mean".into(), "std".into(), "min".into()];
    headers.extend(CHECK_QUANTILES.iter().map(|p| format!("{}%", p * 100.0)));
    headers.push("max".into());

    let mut columns = vec![Column::from_strings("column", numeric.iter().map(|c| c.name().to_string()))];
    for (i, header) in headers.iter().enumerate() {
        columns.push(Column::from_numbers(header.as_str(), stats.iter().map(|row| row[i])));
    }
    Table::new(columns)
}

/// General overview: shape, types, distinct counts, head, tail, missing
/// counts and quantiles of numeric columns.
pub fn check_table(table: &Table, head: usize, display: &DisplayOptions) -> SegmentationResult<String> {
    let mut out = String::new();
    let (rows, cols) = table.shape();

    section(&mut out, "Shape", &format!("({}, {})", rows, cols));

    let per_column = |f: &dyn Fn(&Column) -> String| -> Vec<(String, String)> {
        table.columns().iter().map(|c| (c.name().to_string(), f(c))).collect()
    };
    section(&mut out, "Types", &render_pairs(&per_column(&|c: &Column| c.kind().to_string())));
    section(&mut out, "Value Counts", &render_pairs(&per_column(&|c: &Column| c.distinct_count().to_string())));
    section(&mut out, "Head", &render_table(&table.head(head), display));
    section(&mut out, "Tail", &render_table(&table.tail(head), display));
    section(&mut out, "NA", &render_pairs(&per_column(&|c: &Column| c.null_count().to_string())));
    section(&mut out, "Quantiles", &render_table(&describe(table)?, display));

    Ok(out)
}

/// Value counts and target mean and sum per value of each group column,
/// followed by the mean of `target` per combination of all group columns.
pub fn explore<S: AsRef<str>>(
    table: &Table,
    group_columns: &[S],
    target: &str,
    display: &DisplayOptions,
) -> SegmentationResult<String> {
    let mut out = String::new();

    for name in group_columns {
        let name = name.as_ref();
        let column = table.column(name)?;

        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        for row in 0..column.len() {
            let cell = column.cell(row);
            if cell.is_null() {
                continue;
            }
            let value = cell.to_string();
            let count = counts.entry(value.clone()).or_insert(0);
            if *count == 0 {
                order.push(value);
            }
            *count += 1;
        }
        // most frequent first, ties in first-seen order
        order.sort_by(|a, b| counts[b].cmp(&counts[a]));
        let count_pairs: Vec<(String, String)> =
            order.iter().map(|v| (v.clone(), counts[v].to_string())).collect();

        let stats = segment_statistics(table, name, target)?;
        let mean_pairs: Vec<(String, String)> = stats
            .iter()
            .map(|s| (s.segment.clone(), format_cell(Cell::Number(s.avg), display.precision)))
            .collect();
        let sum_pairs: Vec<(String, String)> = stats
            .iter()
            .map(|s| (s.segment.clone(), format_cell(Cell::Number(s.total), display.precision)))
            .collect();

        out.push_str(&format!("{} counts:\n{}\n\n", name, render_pairs(&count_pairs)));
        out.push_str(&format!("{} mean of {}:\n{}\n\n", name, target, render_pairs(&mean_pairs)));
        out.push_str(&format!("{} sum of {}:\n{}\n\n", name, target, render_pairs(&sum_pairs)));
        out.push_str("######################################################\n");
    }

    let grouped = group_and_aggregate(table, group_columns, target, GroupOptions::default())?;
    out.push_str("Group-wise mean:\n");
    out.push_str(&render_table(&grouped, display));
    out.push('\n');

    Ok(out)
}

// =============================================================================
// Column classification
// =============================================================================

/// Column names grouped by how they behave in an analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnClasses {
    pub observations: usize,
    pub variables: usize,
    /// Text and category columns, plus numeric columns with few values
    pub categorical: Vec<String>,
    pub numerical: Vec<String>,
    /// Text and category columns with too many values to group by
    pub cardinal: Vec<String>,
    /// Numeric columns counted as categorical
    pub numeric_but_categorical: Vec<String>,
}

impl fmt::Display for ColumnClasses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Observations: {}", self.observations)?;
        writeln!(f, "Variables: {}", self.variables)?;
        writeln!(f, "cat_cols: {}", self.categorical.len())?;
        writeln!(f, "num_cols: {}", self.numerical.len())?;
        writeln!(f, "cat_but_car: {}", self.cardinal.len())?;
        write!(f, "num_but_cat: {}", self.numeric_but_categorical.len())
    }
}

/// Split columns into categorical, numerical and cardinal names.
///
/// Numeric columns with fewer than `cat_th` distinct values count as
/// categorical. Text or category columns with more than `car_th` distinct
/// values are cardinal and excluded from `categorical`. Every column lands in
/// exactly one of `categorical`, `numerical` and `cardinal`.
pub fn classify_columns(table: &Table, cat_th: usize, car_th: usize) -> ColumnClasses {
    let mut classes = ColumnClasses {
        observations: table.n_rows(),
        variables: table.n_cols(),
        ..Default::default()
    };

    for column in table.columns() {
        let name = column.name().to_string();
        let distinct = column.distinct_count();
        match column.kind() {
            ColumnKind::Numeric if distinct < cat_th => {
                classes.numeric_but_categorical.push(name.clone());
                classes.categorical.push(name);
            }
            ColumnKind::Numeric => classes.numerical.push(name),
            ColumnKind::Text | ColumnKind::Categorical if distinct > car_th => classes.cardinal.push(name),
            ColumnKind::Text | ColumnKind::Categorical => classes.categorical.push(name),
        }
    }

    classes
}
