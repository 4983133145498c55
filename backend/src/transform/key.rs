//! Composite identifier built from several columns.
//!
//! ```text
//! SaleCityName  ConceptName    Seasons        sales_level_based
//! Antalya       Herşey Dahil   High     →     Antalya_Herşey Dahil_High
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{SegmentationError, SegmentationResult};
use crate::logs::log_warning;
use crate::models::{Column, Table};

/// Separator placed between consecutive key parts.
pub const KEY_DELIMITER: &str = "_";

/// Case applied to a composed key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCase {
    #[default]
    AsIs,
    Upper,
    Lower,
}

impl KeyCase {
    fn apply(self, key: String) -> String {
        match self {
            KeyCase::AsIs => key,
            KeyCase::Upper => key.to_uppercase(),
            KeyCase::Lower => key.to_lowercase(),
        }
    }
}

/// Add a text column joining `group_columns` with [`KEY_DELIMITER`], in order.
///
/// Missing cells contribute an empty part, so `Antalya__High` means the
/// middle column was missing on that row.
pub fn compose_key<S: AsRef<str>>(
    table: &Table,
    group_columns: &[S],
    new_column: &str,
    case: KeyCase,
) -> SegmentationResult<Table> {
    if group_columns.is_empty() {
        return Err(SegmentationError::MissingColumn("<no key columns>".to_string()));
    }

    let columns = group_columns
        .iter()
        .map(|name| table.column(name.as_ref()))
        .collect::<SegmentationResult<Vec<&Column>>>()?;

    let mut rows_with_gaps = 0;
    let keys: Vec<Option<String>> = (0..table.n_rows())
        .map(|row| {
            if columns.iter().any(|c| c.cell(row).is_null()) {
                rows_with_gaps += 1;
            }
            let key = columns
                .iter()
                .map(|c| c.cell(row).to_string())
                .collect::<Vec<_>>()
                .join(KEY_DELIMITER);
            Some(case.apply(key))
        })
        .collect();

    if rows_with_gaps > 0 {
        log_warning(format!(
            "{} row(s) have a missing part in '{}'",
            rows_with_gaps, new_column
        ));
    }

    table.with_column(Column::text(new_column, keys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;

    fn sales() -> Table {
        Table::new(vec![
            Column::from_strings("SaleCityName", ["Antalya", "İzmir", "Muğla"]),
            Column::from_strings("ConceptName", ["Herşey Dahil", "Yarım Pansiyon", "Oda + Kahvaltı"]),
            Column::from_strings("Seasons", ["High", "Low", "High"]),
            Column::from_numbers("Price", [64.0, 12.5, 30.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_join_in_column_order() {
        let out = compose_key(
            &sales(),
            &["SaleCityName", "ConceptName", "Seasons"],
            "sales_level_based",
            KeyCase::AsIs,
        )
        .unwrap();

        let key = out.column("sales_level_based").unwrap();
        assert_eq!(key.cell(0), Cell::Text("Antalya_Herşey Dahil_High"));
        assert_eq!(key.cell(2), Cell::Text("Muğla_Oda + Kahvaltı_High"));
    }

    #[test]
    fn test_order_is_significant() {
        let out = compose_key(&sales(), &["Seasons", "SaleCityName"], "k", KeyCase::AsIs).unwrap();
        assert_eq!(out.column("k").unwrap().cell(1), Cell::Text("Low_İzmir"));
    }

    #[test]
    fn test_key_splits_back_into_parts() {
        let table = sales();
        let cols = ["SaleCityName", "ConceptName", "Seasons"];
        let out = compose_key(&table, &cols, "k", KeyCase::AsIs).unwrap();
        let key = out.column("k").unwrap();

        for row in 0..table.n_rows() {
            let composed = key.cell(row).to_string();
            let parts: Vec<&str> = composed.split(KEY_DELIMITER).collect();
            let expected: Vec<String> = cols
                .iter()
                .map(|c| table.column(c).unwrap().cell(row).to_string())
                .collect();
            assert_eq!(parts, expected);
        }
    }

    #[test]
    fn test_single_column_has_no_delimiter() {
        let out = compose_key(&sales(), &["Seasons"], "k", KeyCase::AsIs).unwrap();
        assert_eq!(out.column("k").unwrap().cell(0), Cell::Text("High"));
    }

    #[test]
    fn test_numbers_and_upper_case() {
        let out = compose_key(&sales(), &["SaleCityName", "Price"], "k", KeyCase::Upper).unwrap();
        let key = out.column("k").unwrap();
        assert_eq!(key.cell(0), Cell::Text("ANTALYA_64"));
        assert_eq!(key.cell(1), Cell::Text("İZMIR_12.5"));
    }

    #[test]
    fn test_missing_part_renders_empty() {
        let table = Table::new(vec![
            Column::from_strings("SaleCityName", ["Antalya"]),
            Column::text("ConceptName", vec![None]),
            Column::from_strings("Seasons", ["Low"]),
        ])
        .unwrap();

        let out = compose_key(&table, &["SaleCityName", "ConceptName", "Seasons"], "k", KeyCase::AsIs).unwrap();
        assert_eq!(out.column("k").unwrap().cell(0), Cell::Text("Antalya__Low"));
    }

    #[test]
    fn test_missing_column() {
        let err = compose_key(&sales(), &["SaleCityName", "Region"], "k", KeyCase::AsIs).unwrap_err();
        assert!(matches!(err, SegmentationError::MissingColumn(ref c) if c == "Region"));

        let none: [&str; 0] = [];
        assert!(compose_key(&sales(), &none, "k", KeyCase::AsIs).is_err());
    }
}
