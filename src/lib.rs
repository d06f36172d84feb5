pub mod cli;
pub mod compare;
pub mod condition;
pub mod detect;
pub mod error;
pub mod expression;
pub mod filter;
pub mod header;
pub mod io_utils;
pub mod keys;
pub mod mapping;
pub mod normalize;
pub mod process;
pub mod registry;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{LevelFilter, info};

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("gridrecon", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Compare(args) => process::execute_compare(&args),
        Commands::Filter(args) => process::execute_filter(&args),
        Commands::SuggestKeys(args) => handle_suggest_keys(&args),
        Commands::MapColumns(args) => handle_map_columns(&args),
        Commands::DetectHeader(args) => handle_detect_header(&args),
    }
}

fn handle_suggest_keys(args: &cli::SuggestKeysArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let header_rows = cli::parse_header_rows(&args.header_rows).map_err(|e| anyhow!(e))?;
    info!(
        "Ranking key candidates in '{}' with delimiter '{}'",
        args.input.display(),
        printable_delimiter(delimiter)
    );

    let grid = io_utils::read_grid(&args.input, delimiter, encoding)?;
    let header = header::build_canonical_headers(
        &grid,
        &header_rows,
        &[],
        args.concat_mode,
        header::DEFAULT_SEPARATOR,
    );
    let start = filter::data_start_row(&header_rows);
    let rows = grid.get(start..).unwrap_or_default();
    let suggestions = keys::suggest_keys(rows, &header);

    println!(
        "{}",
        serde_json::to_string_pretty(&suggestions).context("Serializing key suggestions")?
    );
    info!("Ranked {} column(s)", suggestions.len());
    Ok(())
}

fn handle_map_columns(args: &cli::MapColumnsArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let source_rows = cli::parse_header_rows(&args.source_header_rows).map_err(|e| anyhow!(e))?;
    let target_rows = cli::parse_header_rows(&args.target_header_rows).map_err(|e| anyhow!(e))?;

    let source_delim = io_utils::resolve_input_delimiter(&args.source, args.delimiter);
    let target_delim = io_utils::resolve_input_delimiter(&args.target, args.delimiter);
    let source_grid = io_utils::read_grid(&args.source, source_delim, encoding)?;
    let target_grid = io_utils::read_grid(&args.target, target_delim, encoding)?;

    let source_header = header::build_canonical_headers(
        &source_grid,
        &source_rows,
        &[],
        args.concat_mode,
        header::DEFAULT_SEPARATOR,
    );
    let target_header = header::build_canonical_headers(
        &target_grid,
        &target_rows,
        &[],
        args.concat_mode,
        header::DEFAULT_SEPARATOR,
    );
    let proposal = mapping::propose_mapping(&source_header, &target_header);

    println!(
        "{}",
        serde_json::to_string_pretty(&proposal).context("Serializing mapping proposal")?
    );
    info!(
        "Proposed {} binding(s); {} source and {} target column(s) unmapped",
        proposal.matches.len(),
        proposal.unmapped_sources.len(),
        proposal.unmapped_targets.len()
    );
    Ok(())
}

fn handle_detect_header(args: &cli::DetectHeaderArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let grid = io_utils::read_grid(&args.input, delimiter, encoding)?;

    // CSV carries no styles or merged regions; the detection runs on content
    // signals alone.
    let detection = detect::detect_header_rows(&grid, &[], &[]);
    println!(
        "{}",
        serde_json::to_string_pretty(&detection).context("Serializing header detection")?
    );
    info!("Proposed header row(s): {:?}", detection.header_rows);
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
