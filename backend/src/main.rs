//! Hotelseg CLI - Rule-based segmentation of hotel sales
//!
//! # Main Commands
//!
//! ```bash
//! hotelseg run sales.csv -o segmented.csv       # Full run, annotated CSV out
//! hotelseg lookup sales.csv "antalya_herşey dahil_low"
//! ```
//!
//! # Exploration Commands
//!
//! ```bash
//! hotelseg check sales.csv          # Shape, types, head/tail, quantiles
//! hotelseg explore sales.csv        # Counts and target means per column
//! hotelseg columns sales.csv        # Categorical / numerical / cardinal names
//! hotelseg example-config           # Default configuration as JSON
//! ```

use clap::{Parser, Subcommand};
use hotelseg::logs::log_error;
use hotelseg::{
    check_table, classify_columns, decode_content, detect_encoding, explore, parse_file_auto, parse_table,
    render_table, run_file, run_pipeline, summaries_to_table, ParseResult, SegmentEstimate, SegmentSummary,
    SegmentationConfig, SegmentationRun, SourceInfo,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "hotelseg")]
#[command(about = "Rule-based price segmentation of hotel sales records", long_about = None)]
struct Cli {
    /// Configuration JSON file (defaults apply when absent)
    #[arg(short, long, global = true, env = "SEGMENTATION_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: bin, key, segment, aggregate
    Run {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file for the annotated table (default: summary on stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the analysis table as CSV
        #[arg(short, long)]
        analysis: Option<PathBuf>,

        /// Also write segment statistics as CSV
        #[arg(short, long)]
        segments: Option<PathBuf>,

        /// Identifier to look up after the run
        #[arg(short, long)]
        persona: Option<String>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Segment of an identifier and its statistics
    Lookup {
        /// Input CSV file
        input: PathBuf,

        /// Composite identifier, any case
        identifier: String,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Print the estimate as JSON
        #[arg(long)]
        json: bool,
    },

    /// General overview of a CSV file
    Check {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Rows shown for head and tail
        #[arg(long, default_value = "5")]
        head: usize,
    },

    /// Value counts and target statistics per column
    Explore {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Columns to explore (repeatable)
        #[arg(short, long = "group", default_values_t = ["ConceptName".to_string(), "SaleCityName".to_string()])]
        groups: Vec<String>,

        /// Target column (default: the configured target)
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Classify columns as categorical, numerical or cardinal
    Columns {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Numeric columns with fewer distinct values are categorical
        #[arg(long, default_value = "10")]
        cat_th: usize,

        /// Text columns with more distinct values are cardinal
        #[arg(long, default_value = "20")]
        car_th: usize,

        /// Print the classes as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the default configuration
    ExampleConfig,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Run {
            input,
            delimiter,
            output,
            analysis,
            segments,
            persona,
            json,
        } => {
            let outputs = RunOutputs {
                table: output.as_deref(),
                analysis: analysis.as_deref(),
                segments: segments.as_deref(),
                json,
            };
            cmd_run(&input, delimiter, config, persona, outputs)
        }

        Commands::Lookup {
            input,
            identifier,
            delimiter,
            json,
        } => cmd_lookup(&input, delimiter, config, identifier, json),

        Commands::Check { input, delimiter, head } => cmd_check(&input, delimiter, &config, head),

        Commands::Explore {
            input,
            delimiter,
            groups,
            target,
        } => cmd_explore(&input, delimiter, &config, &groups, target),

        Commands::Columns {
            input,
            delimiter,
            cat_th,
            car_th,
            json,
        } => cmd_columns(&input, delimiter, cat_th, car_th, json),

        Commands::ExampleConfig => cmd_example_config(),
    });

    if let Err(e) = result {
        log_error(format!("Error: {}", e));
        std::process::exit(1);
    }
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

fn load_config(path: Option<&Path>) -> Result<SegmentationConfig, Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            eprintln!("⚙️  Using config: {}", p.display());
            Ok(SegmentationConfig::from_file(p)?)
        }
        None => Ok(SegmentationConfig::default()),
    }
}

/// Parse a CSV file, honoring an explicit delimiter when given.
fn load(input: &Path, delimiter: Option<char>) -> Result<ParseResult, Box<dyn std::error::Error>> {
    let Some(delimiter) = delimiter else {
        return Ok(parse_file_auto(input)?);
    };

    let bytes = fs::read(input)?;
    let encoding = detect_encoding(&bytes);
    let content = decode_content(&bytes, &encoding)?;
    let table = parse_table(&content, delimiter)?;
    let headers = table.column_names().into_iter().map(String::from).collect();
    Ok(ParseResult {
        table,
        encoding,
        delimiter,
        headers,
    })
}

fn segment(
    input: &Path,
    delimiter: Option<char>,
    config: &SegmentationConfig,
) -> Result<SegmentationRun, Box<dyn std::error::Error>> {
    match delimiter {
        None => Ok(run_file(input, config)?),
        Some(_) => {
            let parsed = load(input, delimiter)?;
            Ok(run_pipeline(&parsed.table, config)?)
        }
    }
}

fn write_output(content: &str, path: Option<&Path>) -> CmdResult {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}

struct RunOutputs<'a> {
    table: Option<&'a Path>,
    analysis: Option<&'a Path>,
    segments: Option<&'a Path>,
    json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunSummary<'a> {
    rows_before: usize,
    rows_after: usize,
    segments: &'a [SegmentSummary],
    estimate: Option<&'a SegmentEstimate>,
    source: Option<&'a SourceInfo>,
}

fn cmd_run(
    input: &Path,
    delimiter: Option<char>,
    mut config: SegmentationConfig,
    persona: Option<String>,
    outputs: RunOutputs<'_>,
) -> CmdResult {
    if persona.is_some() {
        config.persona = persona;
    }
    let run = segment(input, delimiter, &config)?;

    if let Some(path) = outputs.table {
        write_output(&run.table.to_csv_string()?, Some(path))?;
    }
    if let Some(path) = outputs.analysis {
        write_output(&run.analysis.to_csv_string()?, Some(path))?;
    }
    if let Some(path) = outputs.segments {
        write_output(&summaries_to_table(&run.segments)?.to_csv_string()?, Some(path))?;
    }

    if outputs.json {
        let summary = RunSummary {
            rows_before: run.rows_before,
            rows_after: run.rows_after,
            segments: &run.segments,
            estimate: run.estimate.as_ref(),
            source: run.source.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if outputs.table.is_none() {
        println!("Rows: {} → {} after cleaning\n", run.rows_before, run.rows_after);
        println!("Segments:");
        println!("{}\n", render_table(&summaries_to_table(&run.segments)?, &config.display));
        println!("Analysis:");
        println!("{}", render_table(&run.analysis, &config.display));
        if let Some(estimate) = &run.estimate {
            println!();
            print_estimate(estimate, &config)?;
        }
    }

    Ok(())
}

fn print_estimate(estimate: &SegmentEstimate, config: &SegmentationConfig) -> CmdResult {
    println!("{}: segment {}", estimate.identifier.to_uppercase(), estimate.segment);
    println!(
        "{}",
        render_table(&summaries_to_table(std::slice::from_ref(&estimate.summary))?, &config.display)
    );
    if estimate.is_ambiguous() {
        println!(
            "⚠️  {} rows matched; other segments seen: {}",
            estimate.matched_rows,
            estimate.conflicting_segments.join(", ")
        );
    }
    Ok(())
}

fn cmd_lookup(
    input: &Path,
    delimiter: Option<char>,
    mut config: SegmentationConfig,
    identifier: String,
    json: bool,
) -> CmdResult {
    config.persona = Some(identifier);
    let run = segment(input, delimiter, &config)?;
    let estimate = run.estimate.ok_or("lookup produced no estimate")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&estimate)?);
    } else {
        print_estimate(&estimate, &config)?;
    }
    Ok(())
}

fn cmd_check(input: &Path, delimiter: Option<char>, config: &SegmentationConfig, head: usize) -> CmdResult {
    eprintln!("📄 Checking: {}", input.display());
    let parsed = load(input, delimiter)?;
    println!("{}", check_table(&parsed.table, head, &config.display)?);
    Ok(())
}

fn cmd_explore(
    input: &Path,
    delimiter: Option<char>,
    config: &SegmentationConfig,
    groups: &[String],
    target: Option<String>,
) -> CmdResult {
    let parsed = load(input, delimiter)?;
    let target = target.unwrap_or_else(|| config.target_column.clone());
    println!("{}", explore(&parsed.table, groups, &target, &config.display)?);
    Ok(())
}

fn cmd_columns(input: &Path, delimiter: Option<char>, cat_th: usize, car_th: usize, json: bool) -> CmdResult {
    let parsed = load(input, delimiter)?;
    let classes = classify_columns(&parsed.table, cat_th, car_th);

    if json {
        println!("{}", serde_json::to_string_pretty(&classes)?);
    } else {
        println!("{}\n", classes);
        println!("cat_cols: {}", classes.categorical.join(", "));
        println!("num_cols: {}", classes.numerical.join(", "));
        println!("cat_but_car: {}", classes.cardinal.join(", "));
    }
    Ok(())
}

fn cmd_example_config() -> CmdResult {
    println!("{}", SegmentationConfig::default().to_json()?);
    Ok(())
}
