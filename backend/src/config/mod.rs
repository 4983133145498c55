//! Run configuration.
//!
//! Every field has a default matching the hotel sales dataset, so an empty
//! JSON object `{}` is a complete configuration. Partial files override only
//! the keys they name.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{ConfigResult, SegmentationError};
use crate::report::DisplayOptions;
use crate::transform::binner::{Bins, OutOfRange};
use crate::transform::key::KeyCase;

// =============================================================================
// Sections
// =============================================================================

/// Fixed-edge binning of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinningConfig {
    /// Numeric column to bin
    pub column: String,
    /// Name of the produced category column
    pub new_column: String,
    /// Strictly increasing edges; intervals are right-closed
    pub edges: Vec<f64>,
    /// One label per interval
    pub labels: Vec<String>,
    pub out_of_range: OutOfRange,
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            column: "SaleCheckInDayDiff".to_string(),
            new_column: "EB_Score".to_string(),
            edges: vec![-1.0, 7.0, 30.0, 90.0, 180.0, 900.0],
            labels: strings(&["Last_Minuters", "Potential_Planners", "Planners", "Early_Birds", "Promotioners"]),
            out_of_range: OutOfRange::default(),
        }
    }
}

impl BinningConfig {
    /// Validated bins for [`crate::transform::binner::categorize`].
    pub fn bins(&self) -> Result<Bins, SegmentationError> {
        Bins::new(self.edges.clone(), self.labels.iter().cloned())
    }
}

/// Composite key layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// Columns joined in this order
    pub columns: Vec<String>,
    pub new_column: String,
    pub case: KeyCase,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            columns: strings(&["SaleCityName", "ConceptName", "Seasons"]),
            new_column: "sales_level_based".to_string(),
            case: KeyCase::default(),
        }
    }
}

/// Quantile segmentation of the target column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    pub count: usize,
    /// Labels from the lowest segment to the highest
    pub labels: Vec<String>,
    pub new_column: String,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            count: 4,
            labels: strings(&["D", "C", "B", "A"]),
            new_column: "Segment".to_string(),
        }
    }
}

/// Group-wise mean of the target written as the analysis table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub group_columns: Vec<String>,
    /// Emit every combination of levels, not only those seen in the data
    pub include_unobserved: bool,
    /// Value written over undefined means; `None` keeps them undefined
    pub fill_undefined: Option<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            group_columns: strings(&["SaleCityName", "ConceptName", "EB_Score"]),
            include_unobserved: true,
            fill_undefined: Some(0.0),
        }
    }
}

// =============================================================================
// SegmentationConfig
// =============================================================================

/// Full configuration of a segmentation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Numeric column segmented by quantiles
    pub target_column: String,
    /// Drop every row with a missing cell before processing
    pub drop_missing: bool,
    /// Columns kept as text even when every value looks numeric
    pub text_columns: Vec<String>,
    pub binning: BinningConfig,
    pub key: KeyConfig,
    pub segments: SegmentConfig,
    pub analysis: AnalysisConfig,
    /// Identifier looked up once the run completes
    pub persona: Option<String>,
    pub display: DisplayOptions,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            target_column: "Price".to_string(),
            drop_missing: true,
            text_columns: strings(&["SaleId"]),
            binning: BinningConfig::default(),
            key: KeyConfig::default(),
            segments: SegmentConfig::default(),
            analysis: AnalysisConfig::default(),
            persona: None,
            display: DisplayOptions::default(),
        }
    }
}

impl SegmentationConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject configurations that cannot produce a run.
    ///
    /// Column existence is checked later against the actual table.
    pub fn validate(&self) -> ConfigResult<()> {
        self.binning.bins()?;

        if self.segments.count < 2 {
            return Err(SegmentationError::InvalidSegmentCount(format!(
                "need at least 2 segments, got {}",
                self.segments.count
            ))
            .into());
        }
        if self.segments.labels.len() != self.segments.count {
            return Err(SegmentationError::InvalidSegmentCount(format!(
                "{} segments need {} labels, got {}",
                self.segments.count,
                self.segments.count,
                self.segments.labels.len()
            ))
            .into());
        }
        if self.key.columns.is_empty() {
            return Err(SegmentationError::MissingColumn("<no key columns>".to_string()).into());
        }

        let produced = [
            &self.binning.new_column,
            &self.key.new_column,
            &self.segments.new_column,
        ];
        for (i, name) in produced.iter().enumerate() {
            if produced[..i].contains(name) || **name == self.target_column {
                return Err(SegmentationError::DuplicateColumn((*name).clone()).into());
            }
        }

        Ok(())
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_empty_object_is_default() {
        let config = SegmentationConfig::from_json("{}").unwrap();
        assert_eq!(config, SegmentationConfig::default());
        assert_eq!(config.target_column, "Price");
        assert_eq!(config.segments.labels, vec!["D", "C", "B", "A"]);
        assert_eq!(config.binning.edges.len(), 6);
        assert_eq!(config.analysis.fill_undefined, Some(0.0));
        assert_eq!(config.display.max_rows, 10);
    }

    #[test]
    fn test_partial_override() {
        let raw = json!({
            "targetColumn": "ignored",
            "segments": { "count": 3, "labels": ["low", "mid", "high"] },
            "binning": { "out_of_range": "undefined" },
            "key": { "case": "upper" },
            "persona": "ANTALYA_HERŞEY DAHIL_HIGH"
        });
        let config = SegmentationConfig::from_json(&raw.to_string()).unwrap();

        assert_eq!(config.target_column, "Price");
        assert_eq!(config.segments.count, 3);
        assert_eq!(config.segments.new_column, "Segment");
        assert_eq!(config.binning.out_of_range, OutOfRange::Undefined);
        assert_eq!(config.binning.column, "SaleCheckInDayDiff");
        assert_eq!(config.key.case, KeyCase::Upper);
        assert_eq!(config.persona.as_deref(), Some("ANTALYA_HERŞEY DAHIL_HIGH"));
    }

    #[test]
    fn test_json_round_trip_keeps_values() {
        let mut config = SegmentationConfig::default();
        config.analysis.fill_undefined = None;
        config.display.max_columns = Some(8);

        let back = SegmentationConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_rejects_bad_edges() {
        let raw = json!({ "binning": { "edges": [0.0, 10.0, 5.0], "labels": ["a", "b"] } });
        let err = SegmentationConfig::from_json(&raw.to_string()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(SegmentationError::InvalidBinEdges(_))));
    }

    #[test]
    fn test_rejects_label_count_mismatch() {
        let raw = json!({ "segments": { "count": 5 } });
        let err = SegmentationConfig::from_json(&raw.to_string()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(SegmentationError::InvalidSegmentCount(_))));
    }

    #[test]
    fn test_rejects_clashing_output_columns() {
        let raw = json!({ "segments": { "new_column": "EB_Score" } });
        let err = SegmentationConfig::from_json(&raw.to_string()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(SegmentationError::DuplicateColumn(ref c)) if c == "EB_Score"));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            SegmentationConfig::from_json("{ \"segments\": "),
            Err(ConfigError::JsonError(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", json!({ "drop_missing": false })).unwrap();

        let config = SegmentationConfig::from_file(file.path()).unwrap();
        assert!(!config.drop_missing);

        assert!(matches!(
            SegmentationConfig::from_file("/nonexistent/segmentation.json"),
            Err(ConfigError::IoError(_))
        ));
    }
}
