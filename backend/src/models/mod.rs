//! In-memory table model for the segmentation pipeline.
//!
//! - [`Table`] - Ordered set of equally long, uniquely named columns
//! - [`Column`] - A named column of one [`ColumnData`] kind
//! - [`ColumnData`] - Numeric, text or categorical cells
//! - [`Cell`] - Borrowed view of a single cell
//!
//! Tables are values: every transformation returns a new table and leaves
//! its input untouched.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::io::Write;

use crate::error::{CsvResult, SegmentationError, SegmentationResult};

// =============================================================================
// Column Kinds
// =============================================================================

/// Storage kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// 64-bit floats
    Numeric,
    /// Free text
    Text,
    /// Ordered set of labels
    Categorical,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Text => "text",
            ColumnKind::Categorical => "category",
        };
        f.write_str(name)
    }
}

/// Cell storage of a column. `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    /// Codes index into `levels`; level order is the category order.
    Categorical {
        levels: Vec<String>,
        codes: Vec<Option<usize>>,
    },
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::Categorical { codes, .. } => codes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Text(_) => ColumnKind::Text,
            ColumnData::Categorical { .. } => ColumnKind::Categorical,
        }
    }

    /// Cell at `row`. NaN numbers read as [`Cell::Null`].
    pub fn cell(&self, row: usize) -> Cell<'_> {
        match self {
            ColumnData::Numeric(v) => match v[row] {
                Some(x) if !x.is_nan() => Cell::Number(x),
                _ => Cell::Null,
            },
            ColumnData::Text(v) => match &v[row] {
                Some(s) => Cell::Text(s),
                None => Cell::Null,
            },
            ColumnData::Categorical { levels, codes } => match codes[row] {
                Some(code) => Cell::Text(&levels[code]),
                None => Cell::Null,
            },
        }
    }

    fn select(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(rows.iter().map(|&r| v[r]).collect()),
            ColumnData::Text(v) => ColumnData::Text(rows.iter().map(|&r| v[r].clone()).collect()),
            ColumnData::Categorical { levels, codes } => ColumnData::Categorical {
                levels: levels.clone(),
                codes: rows.iter().map(|&r| codes[r]).collect(),
            },
        }
    }
}

/// Borrowed view of one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Null,
    Number(f64),
    Text(&'a str),
}

impl Cell<'_> {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

/// Missing cells render as the empty string.
impl fmt::Display for Cell<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Number(v) => write!(f, "{}", v),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

// =============================================================================
// Column
// =============================================================================

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self { name: name.into(), data }
    }

    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self::new(name, ColumnData::Numeric(values))
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self::new(name, ColumnData::Text(values))
    }

    pub fn categorical(name: impl Into<String>, levels: Vec<String>, codes: Vec<Option<usize>>) -> Self {
        Self::new(name, ColumnData::Categorical { levels, codes })
    }

    /// Numeric column without missing cells.
    pub fn from_numbers(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        Self::numeric(name, values.into_iter().map(Some).collect())
    }

    /// Text column without missing cells.
    pub fn from_strings<S: Into<String>>(name: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
        Self::text(name, values.into_iter().map(|s| Some(s.into())).collect())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn kind(&self) -> ColumnKind {
        self.data.kind()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn cell(&self, row: usize) -> Cell<'_> {
        self.data.cell(row)
    }

    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&r| self.cell(r).is_null()).count()
    }

    /// Number of distinct non-missing values.
    pub fn distinct_count(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v
                .iter()
                .flatten()
                .filter(|x| !x.is_nan())
                .map(|x| x.to_bits())
                .collect::<HashSet<_>>()
                .len(),
            ColumnData::Text(v) => v.iter().flatten().collect::<HashSet<_>>().len(),
            ColumnData::Categorical { codes, .. } => codes.iter().flatten().collect::<HashSet<_>>().len(),
        }
    }

    /// Numeric cells, or a [`SegmentationError::ColumnType`] error.
    pub fn as_numeric(&self) -> SegmentationResult<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(v) => Ok(v),
            _ => Err(SegmentationError::ColumnType {
                column: self.name.clone(),
                expected: "numeric",
            }),
        }
    }

    /// Convert to a text column; numbers keep their display form.
    pub fn to_text(&self) -> Column {
        let values = (0..self.len())
            .map(|r| match self.cell(r) {
                Cell::Null => None,
                cell => Some(cell.to_string()),
            })
            .collect();
        Column::text(self.name.clone(), values)
    }
}

// =============================================================================
// Table
// =============================================================================

/// An ordered collection of equally long, uniquely named columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Build a table, checking column lengths and name uniqueness.
    pub fn new(columns: Vec<Column>) -> SegmentationResult<Self> {
        let n_rows = columns.first().map(Column::len).unwrap_or(0);
        let mut seen = HashSet::new();

        for column in &columns {
            if !seen.insert(column.name()) {
                return Err(SegmentationError::DuplicateColumn(column.name().to_string()));
            }
            if column.len() != n_rows {
                return Err(SegmentationError::ColumnLength {
                    column: column.name().to_string(),
                    expected: n_rows,
                    found: column.len(),
                });
            }
        }

        Ok(Self { columns, n_rows })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.columns.len())
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name() == name)
    }

    pub fn column(&self, name: &str) -> SegmentationResult<&Column> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| SegmentationError::MissingColumn(name.to_string()))
    }

    pub fn numeric(&self, name: &str) -> SegmentationResult<&[Option<f64>]> {
        self.column(name)?.as_numeric()
    }

    /// Copy of this table with `column` appended, or replacing the column
    /// of the same name in place.
    pub fn with_column(&self, column: Column) -> SegmentationResult<Table> {
        if !self.columns.is_empty() && column.len() != self.n_rows {
            return Err(SegmentationError::ColumnLength {
                column: column.name().to_string(),
                expected: self.n_rows,
                found: column.len(),
            });
        }

        let mut columns = self.columns.clone();
        match columns.iter().position(|c| c.name() == column.name()) {
            Some(idx) => columns[idx] = column,
            None => columns.push(column),
        }
        Table::new(columns)
    }

    /// Copy of this table with the named columns converted to text.
    pub fn with_text_columns<S: AsRef<str>>(&self, names: &[S]) -> SegmentationResult<Table> {
        let mut table = self.clone();
        for name in names {
            let column = table.column(name.as_ref())?.to_text();
            table = table.with_column(column)?;
        }
        Ok(table)
    }

    /// Rows at the given indices, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(c.name(), c.data().select(rows)))
            .collect();
        Table {
            columns,
            n_rows: rows.len(),
        }
    }

    /// Rows without any missing cell.
    pub fn drop_nulls(&self) -> Table {
        let keep: Vec<usize> = (0..self.n_rows)
            .filter(|&r| self.columns.iter().all(|c| !c.cell(r).is_null()))
            .collect();
        self.select_rows(&keep)
    }

    pub fn head(&self, n: usize) -> Table {
        let rows: Vec<usize> = (0..self.n_rows.min(n)).collect();
        self.select_rows(&rows)
    }

    pub fn tail(&self, n: usize) -> Table {
        let rows: Vec<usize> = (self.n_rows.saturating_sub(n)..self.n_rows).collect();
        self.select_rows(&rows)
    }

    /// Write the table as comma-separated values with a header row.
    pub fn write_csv<W: Write>(&self, writer: W) -> CsvResult<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(self.column_names())?;
        for row in 0..self.n_rows {
            wtr.write_record(self.columns.iter().map(|c| c.cell(row).to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> CsvResult<String> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(vec![
            Column::from_strings("SaleCityName", ["Antalya", "İzmir", "Muğla"]),
            Column::numeric("Price", vec![Some(10.5), None, Some(30.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let err = Table::new(vec![
            Column::from_numbers("a", [1.0, 2.0]),
            Column::from_numbers("b", [1.0]),
        ])
        .unwrap_err();
        assert!(matches!(err, SegmentationError::ColumnLength { found: 1, .. }));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let err = Table::new(vec![
            Column::from_numbers("a", [1.0]),
            Column::from_numbers("a", [2.0]),
        ])
        .unwrap_err();
        assert!(matches!(err, SegmentationError::DuplicateColumn(ref c) if c == "a"));
    }

    #[test]
    fn test_missing_column() {
        let table = sample();
        assert!(matches!(
            table.column("Seasons"),
            Err(SegmentationError::MissingColumn(ref c)) if c == "Seasons"
        ));
    }

    #[test]
    fn test_with_column_leaves_original_untouched() {
        let table = sample();
        let extended = table
            .with_column(Column::from_strings("Seasons", ["High", "Low", "High"]))
            .unwrap();

        assert_eq!(table.n_cols(), 2);
        assert_eq!(extended.n_cols(), 3);
        assert_eq!(extended.column_names(), vec!["SaleCityName", "Price", "Seasons"]);
    }

    #[test]
    fn test_with_column_replaces_same_name() {
        let table = sample();
        let replaced = table
            .with_column(Column::from_numbers("Price", [1.0, 2.0, 3.0]))
            .unwrap();
        assert_eq!(replaced.n_cols(), 2);
        assert_eq!(replaced.column_names(), vec!["SaleCityName", "Price"]);
        assert_eq!(replaced.numeric("Price").unwrap()[1], Some(2.0));
    }

    #[test]
    fn test_drop_nulls() {
        let cleaned = sample().drop_nulls();
        assert_eq!(cleaned.n_rows(), 2);
        assert_eq!(cleaned.column("SaleCityName").unwrap().cell(1), Cell::Text("Muğla"));
    }

    #[test]
    fn test_nan_reads_as_null() {
        let column = Column::numeric("Price", vec![Some(f64::NAN)]);
        assert!(column.cell(0).is_null());
        assert_eq!(column.null_count(), 1);
    }

    #[test]
    fn test_text_conversion_and_distinct() {
        let ids = Column::from_numbers("SaleId", [415122.0, 415103.0, 415122.0]);
        let text = ids.to_text();
        assert_eq!(text.kind(), ColumnKind::Text);
        assert_eq!(text.cell(0), Cell::Text("415122"));
        assert_eq!(ids.distinct_count(), 2);
    }

    #[test]
    fn test_head_tail() {
        let table = sample();
        assert_eq!(table.head(2).n_rows(), 2);
        assert_eq!(table.tail(1).column("Price").unwrap().cell(0), Cell::Number(30.0));
        assert_eq!(table.tail(10).n_rows(), 3);
    }

    #[test]
    fn test_write_csv() {
        let csv = sample().to_csv_string().unwrap();
        assert_eq!(csv, "SaleCityName,Price\nAntalya,10.5\nİzmir,\nMuğla,30\n");
    }
}
