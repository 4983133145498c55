//! Identifier to segment lookup.
//!
//! An identifier (for example `antalya_herşey dahil_low`) is matched
//! case-insensitively against the composite key column. The first matching
//! row decides the segment; the statistics then cover every row of that
//! segment, not only the matched rows. Later matches without a segment are
//! counted apart and never count as a disagreement.

use serde::Serialize;

use crate::error::{SegmentationError, SegmentationResult};
use crate::logs::log_warning;
use crate::models::Table;

use super::aggregator::{segment_statistics, SegmentSummary};

/// Result of a segment lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentEstimate {
    /// Identifier as given by the caller
    pub identifier: String,
    /// Segment of the first matching row
    pub segment: String,
    /// Number of rows whose key matched
    pub matched_rows: usize,
    /// Other segments seen among the matched rows, in first-seen order
    pub conflicting_segments: Vec<String>,
    /// Matched rows after the first that carry no segment
    pub unsegmented_matches: usize,
    /// Statistics of the whole segment
    pub summary: SegmentSummary,
}

impl SegmentEstimate {
    /// Whether matched rows disagreed on their segment.
    pub fn is_ambiguous(&self) -> bool {
        !self.conflicting_segments.is_empty()
    }
}

/// Columns a lookup reads from.
#[derive(Debug, Clone, Copy)]
pub struct LookupColumns<'a> {
    pub identifier: &'a str,
    pub segment: &'a str,
    pub target: &'a str,
}

/// Find the segment of `identifier` and summarize that segment.
pub fn lookup(table: &Table, columns: LookupColumns<'_>, identifier: &str) -> SegmentationResult<SegmentEstimate> {
    let keys = table.column(columns.identifier)?;
    let segments = table.column(columns.segment)?;
    let wanted = identifier.to_uppercase();

    let matches: Vec<usize> = (0..table.n_rows())
        .filter(|&row| {
            let key = keys.cell(row);
            !key.is_null() && key.to_string().to_uppercase() == wanted
        })
        .collect();

    let first = *matches
        .first()
        .ok_or_else(|| SegmentationError::IdentifierNotFound(identifier.to_string()))?;

    let segment = match segments.cell(first) {
        cell if cell.is_null() => {
            return Err(SegmentationError::UnsegmentedIdentifier {
                identifier: identifier.to_string(),
                row: first,
            })
        }
        cell => cell.to_string(),
    };

    let mut conflicting_segments: Vec<String> = Vec::new();
    let mut unsegmented_matches = 0;
    for &row in &matches[1..] {
        let cell = segments.cell(row);
        if cell.is_null() {
            unsegmented_matches += 1;
            continue;
        }
        let other = cell.to_string();
        if other != segment && !conflicting_segments.contains(&other) {
            conflicting_segments.push(other);
        }
    }

    if unsegmented_matches > 0 {
        log_warning(format!(
            "'{}' matches {} rows without a segment; ignored",
            identifier, unsegmented_matches
        ));
    }

    if !conflicting_segments.is_empty() {
        log_warning(format!(
            "'{}' matches {} rows spread over segments {} and {}; using {}",
            identifier,
            matches.len(),
            segment,
            conflicting_segments.join(", "),
            segment
        ));
    }

    let summary = segment_statistics(table, columns.segment, columns.target)?
        .into_iter()
        .find(|s| s.segment == segment)
        .ok_or_else(|| SegmentationError::IdentifierNotFound(identifier.to_string()))?;

    Ok(SegmentEstimate {
        identifier: identifier.to_string(),
        segment,
        matched_rows: matches.len(),
        conflicting_segments,
        unsegmented_matches,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::{drain, LogLevel, LOG_BROADCASTER};
    use crate::models::Column;

    const COLUMNS: LookupColumns<'static> = LookupColumns {
        identifier: "sales_level_based",
        segment: "Segment",
        target: "Price",
    };

    fn segmented(keys: &[&str], codes: &[usize], prices: &[f64]) -> Table {
        Table::new(vec![
            Column::from_strings("sales_level_based", keys.iter().copied()),
            Column::categorical(
                "Segment",
                vec!["D".into(), "C".into(), "B".into(), "A".into()],
                codes.iter().map(|&c| Some(c)).collect(),
            ),
            Column::from_numbers("Price", prices.iter().copied()),
        ])
        .unwrap()
    }

    fn quartile_fixture() -> Table {
        segmented(
            &[
                "Antalya_Herşey Dahil_Low",
                "Antalya_Herşey Dahil_High",
                "Muğla_Yarım Pansiyon_High",
                "Girne_Herşey Dahil_High",
            ],
            &[0, 1, 2, 3],
            &[10.0, 20.0, 30.0, 40.0],
        )
    }

    #[test]
    fn test_lookup_returns_segment_and_true_bounds() {
        let estimate = lookup(&quartile_fixture(), COLUMNS, "Girne_Herşey Dahil_High").unwrap();

        assert_eq!(estimate.segment, "A");
        assert_eq!(estimate.summary.min, 40.0);
        assert_eq!(estimate.summary.max, 40.0);
        assert_eq!(estimate.summary.total, 40.0);
        assert_eq!(estimate.matched_rows, 1);
        assert!(!estimate.is_ambiguous());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let estimate = lookup(&quartile_fixture(), COLUMNS, "antalya_herşey dahil_low").unwrap();
        assert_eq!(estimate.segment, "D");
        assert_eq!(estimate.identifier, "antalya_herşey dahil_low");
    }

    #[test]
    fn test_summary_covers_whole_segment() {
        let table = segmented(
            &["x_a", "y_b", "z_c"],
            &[3, 3, 0],
            &[35.0, 45.0, 5.0],
        );
        let estimate = lookup(&table, COLUMNS, "X_A").unwrap();

        assert_eq!(estimate.summary.count, 2);
        assert_eq!(estimate.summary.min, 35.0);
        assert_eq!(estimate.summary.max, 45.0);
        assert_eq!(estimate.summary.avg, 40.0);
    }

    #[test]
    fn test_unknown_identifier() {
        let err = lookup(&quartile_fixture(), COLUMNS, "Bodrum_Herşey Dahil_Low").unwrap_err();
        assert!(matches!(err, SegmentationError::IdentifierNotFound(ref id) if id == "Bodrum_Herşey Dahil_Low"));
    }

    #[test]
    fn test_partial_match_is_not_a_match() {
        let err = lookup(&quartile_fixture(), COLUMNS, "Antalya").unwrap_err();
        assert!(matches!(err, SegmentationError::IdentifierNotFound(_)));
    }

    #[test]
    fn test_duplicate_key_disagreement_is_flagged() {
        let mut rx = LOG_BROADCASTER.subscribe();
        let table = segmented(
            &["Kemer_Oda + Kahvaltı_Low", "Lara_Herşey Dahil_High", "kemer_oda + kahvaltı_low"],
            &[1, 3, 2],
            &[18.0, 44.0, 31.0],
        );

        let estimate = lookup(&table, COLUMNS, "KEMER_ODA + KAHVALTI_LOW").unwrap();

        // first match in table order wins
        assert_eq!(estimate.segment, "C");
        assert_eq!(estimate.matched_rows, 2);
        assert_eq!(estimate.conflicting_segments, vec!["B".to_string()]);
        assert!(estimate.is_ambiguous());

        let flagged = drain(&mut rx).into_iter().any(|entry| {
            entry.level == LogLevel::Warning && entry.message.contains("KEMER_ODA + KAHVALTI_LOW")
        });
        assert!(flagged);
    }

    #[test]
    fn test_duplicate_key_agreement_is_not_ambiguous() {
        let table = segmented(&["a_b", "A_B", "c_d"], &[2, 2, 0], &[30.0, 32.0, 1.0]);
        let estimate = lookup(&table, COLUMNS, "a_b").unwrap();
        assert_eq!(estimate.matched_rows, 2);
        assert!(!estimate.is_ambiguous());
    }

    #[test]
    fn test_unsegmented_duplicate_is_not_a_conflict() {
        let table = Table::new(vec![
            Column::from_strings("sales_level_based", ["a_b", "A_B"]),
            Column::categorical(
                "Segment",
                vec!["D".into(), "C".into(), "B".into(), "A".into()],
                vec![Some(3), None],
            ),
            Column::from_numbers("Price", [40.0, 12.0]),
        ])
        .unwrap();

        let estimate = lookup(&table, COLUMNS, "a_b").unwrap();

        assert_eq!(estimate.segment, "A");
        assert_eq!(estimate.matched_rows, 2);
        assert_eq!(estimate.unsegmented_matches, 1);
        assert!(estimate.conflicting_segments.is_empty());
        assert!(!estimate.is_ambiguous());
    }

    #[test]
    fn test_unsegmented_row() {
        let table = Table::new(vec![
            Column::from_strings("sales_level_based", ["a_b"]),
            Column::categorical("Segment", vec!["low".into()], vec![None]),
            Column::from_numbers("Price", [3.0]),
        ])
        .unwrap();

        let err = lookup(&table, COLUMNS, "a_b").unwrap_err();
        assert!(matches!(err, SegmentationError::UnsegmentedIdentifier { row: 0, .. }));
    }
}
