use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::expression::LogicalOp;
use crate::header::ConcatMode;

#[derive(Debug, Parser)]
#[command(author, version, about = "Reconcile and filter spreadsheet-shaped data", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compare two CSV files by key using a JSON comparison profile
    Compare(CompareArgs),
    /// Filter rows of a CSV file with a boolean rule expression
    Filter(FilterArgs),
    /// Rank columns of a CSV file by uniqueness as key candidates
    SuggestKeys(SuggestKeysArgs),
    /// Propose a source-to-target column mapping between two CSV files
    MapColumns(MapColumnsArgs),
    /// Score the first rows of a CSV file as header-row candidates
    DetectHeader(DetectHeaderArgs),
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// JSON comparison profile (paths, keys, mapping, flags)
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,
    /// Diff report CSV (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// CSV delimiter character for both inputs (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum RuleOperator {
    And,
    Or,
}

impl From<RuleOperator> for LogicalOp {
    fn from(op: RuleOperator) -> Self {
        match op {
            RuleOperator::And => LogicalOp::And,
            RuleOperator::Or => LogicalOp::Or,
        }
    }
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Input CSV file to filter
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output CSV for matching rows (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// JSON file holding a full filter expression tree
    #[arg(short = 'e', long = "expression")]
    pub expression: Option<PathBuf>,
    /// Flat rules of the form `Column=Value` (repeatable)
    #[arg(long = "rule", action = clap::ArgAction::Append)]
    pub rules: Vec<String>,
    /// Operator conditions such as `City contains York` or `Value > 100`
    #[arg(long = "where", action = clap::ArgAction::Append)]
    pub wheres: Vec<String>,
    /// Operator combining flat rules
    #[arg(long = "operator", value_enum, default_value = "and")]
    pub operator: RuleOperator,
    /// Record the trim flag on assembled rules (matching always trims)
    #[arg(long = "trim")]
    pub trim: bool,
    /// Zero-based header row indices, e.g. `0` or `0,1,2`
    #[arg(long = "header-rows", default_value = "0")]
    pub header_rows: String,
    /// How multi-row headers collapse into column names
    #[arg(long = "concat-mode", value_enum, default_value = "leaf-only")]
    pub concat_mode: ConcatMode,
    /// Separator between breadcrumb header parts
    #[arg(long = "separator", default_value = " | ")]
    pub separator: String,
    /// Also write the rows that did not match
    #[arg(long = "non-matching-output")]
    pub non_matching_output: Option<PathBuf>,
    /// Print the match count instead of writing rows
    #[arg(long = "count-only")]
    pub count_only: bool,
    /// JSON registry of named filters to load from or save into
    #[arg(long = "registry")]
    pub registry: Option<PathBuf>,
    /// Run the named filter from the registry instead of --rule/--expression
    #[arg(long = "use-filter")]
    pub use_filter: Option<String>,
    /// Save the assembled filter into the registry under this name
    #[arg(long = "save-as")]
    pub save_as: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct SuggestKeysArgs {
    /// Input CSV file to profile
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Zero-based header row indices, e.g. `0` or `0,1,2`
    #[arg(long = "header-rows", default_value = "0")]
    pub header_rows: String,
    /// How multi-row headers collapse into column names
    #[arg(long = "concat-mode", value_enum, default_value = "leaf-only")]
    pub concat_mode: ConcatMode,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct MapColumnsArgs {
    /// Source CSV file
    #[arg(long = "source")]
    pub source: PathBuf,
    /// Target CSV file
    #[arg(long = "target")]
    pub target: PathBuf,
    /// Zero-based header row indices for the source file
    #[arg(long = "source-header-rows", default_value = "0")]
    pub source_header_rows: String,
    /// Zero-based header row indices for the target file
    #[arg(long = "target-header-rows", default_value = "0")]
    pub target_header_rows: String,
    /// How multi-row headers collapse into column names
    #[arg(long = "concat-mode", value_enum, default_value = "leaf-only")]
    pub concat_mode: ConcatMode,
    /// CSV delimiter character for both files (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct DetectHeaderArgs {
    /// Input CSV file to scan
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

/// Parses a `0,1,2` style list of zero-based header row indices. An empty or
/// `none` value means the sheet has no header rows.
pub fn parse_header_rows(value: &str) -> Result<Vec<usize>, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return Ok(Vec::new());
    }
    let mut rows = trimmed
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| format!("Invalid header row index '{}'", part.trim()))
        })
        .collect::<Result<Vec<usize>, String>>()?;
    rows.sort_unstable();
    rows.dedup();
    Ok(rows)
}
