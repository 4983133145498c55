//! High-level pipeline API for a segmentation run.
//!
//! Combines every step in order: loading, cleaning, binning, key
//! composition, quantile segmentation, aggregation and the optional lookup.
//!
//! # Example
//!
//! ```rust,ignore
//! use hotelseg::config::SegmentationConfig;
//! use hotelseg::transform::pipeline::run_file;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let run = run_file("sales.csv", &SegmentationConfig::default())?;
//!     for summary in &run.segments {
//!         println!("{}: {:.2}", summary.segment, summary.avg);
//!     }
//!     Ok(())
//! }
//! ```

use serde::Serialize;
use std::path::Path;

use crate::config::SegmentationConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::models::Table;
use crate::parser::{parse_bytes_auto, parse_file_auto, ParseResult};

use super::aggregator::{
    fill_undefined, group_and_aggregate, segment_statistics, sort_by_avg_desc, sort_descending, GroupOptions,
    SegmentSummary,
};
use super::binner::categorize;
use super::key::compose_key;
use super::lookup::{lookup, LookupColumns, SegmentEstimate};
use super::segmenter::assign_segments;

/// Loaded file information
#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// Everything produced by one run.
#[derive(Debug, Clone)]
pub struct SegmentationRun {
    /// Input rows with the category, key and segment columns added
    pub table: Table,
    /// Mean target per analysis group, highest first
    pub analysis: Table,
    /// Per-segment statistics, highest average first
    pub segments: Vec<SegmentSummary>,
    /// Lookup result when a persona is configured
    pub estimate: Option<SegmentEstimate>,
    /// Rows before cleaning
    pub rows_before: usize,
    /// Rows after cleaning
    pub rows_after: usize,
    /// Set when the run started from a file or raw bytes
    pub source: Option<SourceInfo>,
}

/// Segment a CSV file.
///
/// Detects encoding and delimiter, then runs [`run_pipeline`].
pub fn run_file<P: AsRef<Path>>(path: P, config: &SegmentationConfig) -> PipelineResult<SegmentationRun> {
    log_info(format!("📖 Reading {}...", path.as_ref().display()));
    let parsed = parse_file_auto(path)?;
    run_parsed(parsed, config)
}

/// Same as [`run_file`] but accepts raw bytes.
pub fn run_bytes(bytes: &[u8], config: &SegmentationConfig) -> PipelineResult<SegmentationRun> {
    let parsed = parse_bytes_auto(bytes)?;
    run_parsed(parsed, config)
}

fn run_parsed(parsed: ParseResult, config: &SegmentationConfig) -> PipelineResult<SegmentationRun> {
    log_success(format!("Detected encoding: {}", parsed.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(parsed.delimiter)));
    log_success(format!("Read {} rows", parsed.table.n_rows()));

    log_info(format!("📋 File has {} columns:", parsed.headers.len()));
    for (i, col) in parsed.headers.iter().enumerate() {
        log_info_indent(format!("[{:2}] {}", i + 1, col), 1);
    }

    let source = SourceInfo {
        encoding: parsed.encoding,
        delimiter: parsed.delimiter,
        headers: parsed.headers,
        row_count: parsed.table.n_rows(),
    };

    let mut run = run_pipeline(&parsed.table, config)?;
    run.source = Some(source);
    Ok(run)
}

/// Run every segmentation step on an in-memory table.
///
/// 1. Force the configured text columns
/// 2. Drop rows with missing cells (when enabled)
/// 3. Bin the day-difference column
/// 4. Compose the level-based key
/// 5. Assign quantile segments of the target
/// 6. Group-wise mean of the target, sorted and filled
/// 7. Segment statistics sorted by average
/// 8. Look up the configured persona
pub fn run_pipeline(table: &Table, config: &SegmentationConfig) -> PipelineResult<SegmentationRun> {
    config.validate()?;
    let rows_before = table.n_rows();

    // Step 1: opaque ids stay text
    let present: Vec<&String> = config
        .text_columns
        .iter()
        .filter(|name| table.has_column(name))
        .collect();
    for name in config.text_columns.iter().filter(|n| !table.has_column(n)) {
        log_warning(format!("Text column '{}' not in input, skipped", name));
    }
    let mut current = table.with_text_columns(&present)?;

    // Step 2: cleaning
    if config.drop_missing {
        current = current.drop_nulls();
        let dropped = rows_before - current.n_rows();
        if dropped > 0 {
            log_warning(format!("Dropped {} row(s) with missing values", dropped));
        }
    }
    let rows_after = current.n_rows();
    if rows_after == 0 {
        return Err(PipelineError::EmptyInput(rows_before));
    }
    log_success(format!("{} rows to segment", rows_after));

    // Step 3: binning
    let binning = &config.binning;
    log_info(format!("🗂️  Binning '{}' into '{}'...", binning.column, binning.new_column));
    current = categorize(&current, &binning.column, &binning.bins()?, &binning.new_column, binning.out_of_range)?;

    // Step 4: composite key
    let key = &config.key;
    log_info(format!("🔑 Composing '{}' from [{}]...", key.new_column, key.columns.join(", ")));
    current = compose_key(&current, &key.columns, &key.new_column, key.case)?;

    // Step 5: segments
    let segments = &config.segments;
    log_info(format!(
        "📊 Splitting '{}' into {} segments...",
        config.target_column, segments.count
    ));
    current = assign_segments(
        &current,
        &config.target_column,
        segments.count,
        &segments.labels,
        &segments.new_column,
    )?;

    // Step 6: analysis table
    let analysis_config = &config.analysis;
    let options = GroupOptions {
        include_unobserved: analysis_config.include_unobserved,
    };
    let mut analysis = group_and_aggregate(&current, &analysis_config.group_columns, &config.target_column, options)?;
    analysis = sort_descending(&analysis, &config.target_column)?;
    if let Some(fill) = analysis_config.fill_undefined {
        analysis = fill_undefined(&analysis, &config.target_column, fill)?;
    }
    log_success(format!("{} analysis groups", analysis.n_rows()));

    // Step 7: segment statistics
    let summaries = sort_by_avg_desc(segment_statistics(&current, &segments.new_column, &config.target_column)?);
    for s in &summaries {
        log_info_indent(
            format!("{}: {} rows, avg {:.2}, min {:.2}, max {:.2}", s.segment, s.count, s.avg, s.min, s.max),
            1,
        );
    }

    // Step 8: persona
    let estimate = match &config.persona {
        Some(persona) => {
            log_info(format!("🔎 Looking up '{}'...", persona));
            let columns = LookupColumns {
                identifier: &key.new_column,
                segment: &segments.new_column,
                target: &config.target_column,
            };
            let estimate = lookup(&current, columns, persona)?;
            log_success(format!("{} → segment {}", persona.to_uppercase(), estimate.segment));
            Some(estimate)
        }
        None => None,
    };

    log_success("Segmentation complete");

    Ok(SegmentationRun {
        table: current,
        analysis,
        segments: summaries,
        estimate,
        rows_before,
        rows_after,
        source: None,
    })
}

/// Format delimiter for display
fn format_delimiter(d: char) -> &'static str {
    match d {
        ';' => ";",
        ',' => ",",
        '\t' => "TAB",
        '|' => "|",
        _ => "?",
    }
}
