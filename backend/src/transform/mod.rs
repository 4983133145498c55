//! Segmentation steps.
//!
//! - Binner: numeric column to ordered categories
//! - Key: composite level-based identifier
//! - Segmenter: quantile segments of the target
//! - Aggregator: group means and segment statistics
//! - Lookup: identifier to segment statistics
//! - Pipeline: every step in order

pub mod aggregator;
pub mod binner;
pub mod key;
pub mod lookup;
pub mod pipeline;
pub mod segmenter;

pub use aggregator::{
    fill_undefined, group_and_aggregate, segment_statistics, sort_by_avg_desc, sort_descending, summaries_to_table,
    GroupOptions, SegmentSummary,
};
pub use binner::{categorize, Bins, OutOfRange};
pub use key::{compose_key, KeyCase, KEY_DELIMITER};
pub use lookup::{lookup, LookupColumns, SegmentEstimate};
pub use pipeline::{run_bytes, run_file, run_pipeline, SegmentationRun, SourceInfo};
pub use segmenter::{assign_segments, quantile_cuts, quantile_sorted};
