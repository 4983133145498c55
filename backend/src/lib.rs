//! # Hotelseg - Rule-based price segmentation of hotel sales
//!
//! Hotelseg reads a table of hotel sales, derives a booking-window category,
//! builds a level-based identifier per city/concept/season and splits prices
//! into quantile segments that can be looked up by identifier.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│  Transform  │────▶│  Segments   │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ (bin, key,  │     │ + analysis  │
//! └─────────────┘     └─────────────┘     │  quantile)  │     │ + lookup    │
//!                                         └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hotelseg::{run_file, SegmentationConfig};
//!
//! fn main() {
//!     let config = SegmentationConfig {
//!         persona: Some("antalya_herşey dahil_low".into()),
//!         ..Default::default()
//!     };
//!     let run = run_file("sales.csv", &config).unwrap();
//!     println!("Segment: {}", run.estimate.unwrap().segment);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`logs`] - Log broadcaster
//! - [`models`] - Table, columns and cells
//! - [`parser`] - CSV parsing with auto-detection
//! - [`config`] - Run configuration
//! - [`transform`] - Binning, keys, segments, aggregation, lookup and pipeline
//! - [`report`] - Text reports

// Core modules
pub mod error;
pub mod logs;
pub mod models;

// Parsing
pub mod parser;

// Configuration
pub mod config;

// Transformation
pub mod transform;

// Reporting
pub mod report;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, ConfigResult, CsvError, CsvResult, PipelineError, PipelineResult, SegmentationError,
    SegmentationResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Cell, Column, ColumnData, ColumnKind, Table};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes_auto, parse_file_auto, parse_table, ParseResult,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{AnalysisConfig, BinningConfig, KeyConfig, SegmentConfig, SegmentationConfig};

// =============================================================================
// Re-exports - Segmentation steps
// =============================================================================

pub use transform::{
    assign_segments, categorize, compose_key, group_and_aggregate, lookup, segment_statistics, Bins, GroupOptions,
    KeyCase, LookupColumns, OutOfRange, SegmentEstimate, SegmentSummary, summaries_to_table,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{run_bytes, run_file, run_pipeline, SegmentationRun, SourceInfo};

// =============================================================================
// Re-exports - Reporting
// =============================================================================

pub use report::{check_table, classify_columns, explore, render_table, ColumnClasses, DisplayOptions};
