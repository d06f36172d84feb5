//! Executors for the `compare` and `filter` commands.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, anyhow};
use log::info;

use crate::{
    cli::{self, CompareArgs, FilterArgs},
    compare::{CompareConfig, ComparisonResult, MismatchKind, RowStatus},
    condition::{self, ConditionGroup},
    error::CompareError,
    expression::{FilterExpr, FilterRule},
    filter,
    io_utils,
    registry::FilterRegistry,
    table::{Cell, Grid},
};

pub fn execute_compare(args: &CompareArgs) -> Result<()> {
    let config: CompareConfig = {
        let file = File::open(&args.config)
            .with_context(|| format!("Opening comparison profile {:?}", args.config))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing comparison profile {:?}", args.config))?
    };
    config.validate()?;

    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let source_path = Path::new(&config.source.file_path);
    let target_path = Path::new(&config.target.file_path);
    let source_delim = io_utils::resolve_input_delimiter(source_path, args.delimiter);
    let target_delim = io_utils::resolve_input_delimiter(target_path, args.delimiter);
    info!(
        "Comparing '{}' against '{}'",
        source_path.display(),
        target_path.display()
    );

    let source_grid = read_side(source_path, source_delim, encoding)?;
    let target_grid = read_side(target_path, target_delim, encoding)?;
    // CSV inputs carry no merged regions.
    let result = crate::compare::run_compare(&config, &source_grid, &[], &target_grid, &[])?;

    let output_delim = args.delimiter.unwrap_or(io_utils::DEFAULT_CSV_DELIMITER);
    write_comparison_report(args.output.as_deref(), output_delim, &config, &result)?;

    let s = result.summary;
    info!(
        "Summary: {} identical, {} mismatched, {} source-only, {} target-only ({} source / {} target rows)",
        s.identical, s.mismatched, s.source_only, s.target_only, s.total_source_rows, s.total_target_rows
    );
    Ok(())
}

/// Reads one side of the comparison, folding failures into the typed engine
/// error: unreadable files surface as `Io`, anything else (decoding, malformed
/// records) as `Internal`.
fn read_side(
    path: &Path,
    delimiter: u8,
    encoding: &'static encoding_rs::Encoding,
) -> Result<Grid, CompareError> {
    io_utils::read_grid(path, delimiter, encoding).map_err(|err| {
        match err.downcast::<std::io::Error>() {
            Ok(io) => CompareError::Io(io),
            Err(other) => CompareError::Internal(other.to_string()),
        }
    })
}

/// One report line per reconciled row: status, match key, then one column per
/// source header. Differing cells render as `source -> target [KIND]`;
/// target-only rows pull their values through the column mapping.
fn write_comparison_report(
    output: Option<&Path>,
    delimiter: u8,
    config: &CompareConfig,
    result: &ComparisonResult,
) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(output, delimiter)?;

    let mut header = vec!["Status".to_string(), "Key".to_string()];
    header.extend(result.source_header.iter().cloned());
    writer.write_record(&header)?;

    for outcome in &result.outcomes {
        let mut record = vec![status_label(outcome.status).to_string(), outcome.key.clone()];
        for (idx, source_col) in result.source_header.iter().enumerate() {
            if let Some(diff) = outcome.diffs.get(&idx) {
                record.push(format!(
                    "{} -> {} [{}]",
                    diff.source_value,
                    diff.target_value,
                    kind_label(diff.kind)
                ));
                continue;
            }
            let value = match (&outcome.source_row, &outcome.target_row) {
                (Some(row), _) => row.get(idx).map(Cell::to_text).unwrap_or_default(),
                (None, Some(row)) => config
                    .column_mapping
                    .get(source_col)
                    .and_then(|target_col| {
                        result.target_header.iter().position(|h| h == target_col)
                    })
                    .and_then(|target_idx| row.get(target_idx))
                    .map(Cell::to_text)
                    .unwrap_or_default(),
                (None, None) => String::new(),
            };
            record.push(value);
        }
        writer.write_record(&record)?;
    }
    writer.flush().context("Flushing comparison report")?;
    Ok(())
}

fn status_label(status: RowStatus) -> &'static str {
    match status {
        RowStatus::MatchedIdentical => "MATCHED_IDENTICAL",
        RowStatus::MatchedMismatched => "MATCHED_MISMATCHED",
        RowStatus::SourceOnly => "SOURCE_ONLY",
        RowStatus::TargetOnly => "TARGET_ONLY",
    }
}

fn kind_label(kind: MismatchKind) -> &'static str {
    match kind {
        MismatchKind::Numeric => "NUMERIC",
        MismatchKind::String => "STRING",
        MismatchKind::BlankVsNonBlank => "BLANK_VS_NON_BLANK",
        MismatchKind::TypeMismatch => "TYPE_MISMATCH",
    }
}

pub fn execute_filter(args: &FilterArgs) -> Result<()> {
    let header_rows = cli::parse_header_rows(&args.header_rows).map_err(|e| anyhow!(e))?;
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;

    if !args.wheres.is_empty() {
        return execute_filter_conditions(args, &header_rows, delimiter, encoding);
    }

    let expr = assemble_expression(args)?;
    info!("Filter: {}", expr.describe());

    if let Some(name) = &args.save_as {
        let registry_path = args
            .registry
            .as_deref()
            .ok_or_else(|| anyhow!("--save-as requires --registry"))?;
        let mut registry = load_registry(registry_path)?;
        registry.save(name, expr.clone());
        save_registry(registry_path, &registry)?;
        info!("Saved filter '{}' to {:?}", name.trim(), registry_path);
    }

    let grid = io_utils::read_grid(&args.input, delimiter, encoding)?;

    if args.count_only {
        let count = filter::count_matches(
            &grid,
            &header_rows,
            &[],
            args.concat_mode,
            &args.separator,
            &expr,
        );
        println!("{count}");
        return Ok(());
    }

    if let Some(non_matching_path) = &args.non_matching_output {
        let parts = filter::partition(
            &grid,
            &header_rows,
            &[],
            args.concat_mode,
            &args.separator,
            &expr,
        );
        io_utils::write_table(args.output.as_deref(), delimiter, &parts.matching)?;
        io_utils::write_table(Some(non_matching_path), delimiter, &parts.non_matching)?;
        info!(
            "Wrote {} matching and {} non-matching row(s)",
            parts.matching.rows.len(),
            parts.non_matching.rows.len()
        );
        return Ok(());
    }

    let table = filter::filter_grid(
        &grid,
        &header_rows,
        &[],
        args.concat_mode,
        &args.separator,
        &expr,
    );
    io_utils::write_table(args.output.as_deref(), delimiter, &table)?;
    Ok(())
}

fn execute_filter_conditions(
    args: &FilterArgs,
    header_rows: &[usize],
    delimiter: u8,
    encoding: &'static encoding_rs::Encoding,
) -> Result<()> {
    if !args.rules.is_empty() || args.expression.is_some() || args.use_filter.is_some() {
        return Err(anyhow!(
            "--where cannot be combined with --rule, --expression, or --use-filter"
        ));
    }
    let group = ConditionGroup {
        op: Some(args.operator.into()),
        conditions: condition::parse_conditions(&args.wheres)?,
        groups: Vec::new(),
    };
    let grid = io_utils::read_grid(&args.input, delimiter, encoding)?;

    if args.count_only {
        let count = filter::count_where(
            &grid,
            header_rows,
            &[],
            args.concat_mode,
            &args.separator,
            &group,
        );
        println!("{count}");
        return Ok(());
    }

    if let Some(non_matching_path) = &args.non_matching_output {
        let parts = filter::partition_where(
            &grid,
            header_rows,
            &[],
            args.concat_mode,
            &args.separator,
            &group,
        );
        io_utils::write_table(args.output.as_deref(), delimiter, &parts.matching)?;
        io_utils::write_table(Some(non_matching_path), delimiter, &parts.non_matching)?;
        return Ok(());
    }

    let table = filter::filter_where(
        &grid,
        header_rows,
        &[],
        args.concat_mode,
        &args.separator,
        &group,
    );
    io_utils::write_table(args.output.as_deref(), delimiter, &table)?;
    Ok(())
}

/// Builds the filter to run, in precedence order: a named registry filter, a
/// JSON expression file, then flat `--rule` arguments.
fn assemble_expression(args: &FilterArgs) -> Result<FilterExpr> {
    if let Some(name) = &args.use_filter {
        let registry_path = args
            .registry
            .as_deref()
            .ok_or_else(|| anyhow!("--use-filter requires --registry"))?;
        let registry = load_registry(registry_path)?;
        return registry
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("No filter named '{}' in {registry_path:?}", name.trim()));
    }

    if let Some(path) = &args.expression {
        let file = File::open(path).with_context(|| format!("Opening filter expression {path:?}"))?;
        let expr: FilterExpr = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing filter expression {path:?}"))?;
        return Ok(expr);
    }

    let rules = args
        .rules
        .iter()
        .map(|raw| parse_rule(raw, args.trim))
        .collect::<Result<Vec<FilterRule>>>()?;
    Ok(FilterExpr::group(
        args.operator.into(),
        rules.into_iter().map(FilterExpr::rule).collect(),
    ))
}

/// Parses a `Column=Value` rule argument. The value may be empty, which
/// matches blank cells.
fn parse_rule(raw: &str, trim: bool) -> Result<FilterRule> {
    let (column, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Invalid rule '{raw}', expected Column=Value"))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(anyhow!("Invalid rule '{raw}', column name is empty"));
    }
    Ok(FilterRule::by_value(value, column, trim))
}

fn load_registry(path: &Path) -> Result<FilterRegistry> {
    if !path.exists() {
        return Ok(FilterRegistry::new());
    }
    let file = File::open(path).with_context(|| format!("Opening filter registry {path:?}"))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Parsing filter registry {path:?}"))
}

fn save_registry(path: &Path, registry: &FilterRegistry) -> Result<()> {
    let json = serde_json::to_string_pretty(registry)?;
    std::fs::write(path, json).with_context(|| format!("Writing filter registry {path:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_arguments_split_on_first_equals() {
        let rule = parse_rule("City=New York", true).unwrap();
        assert_eq!(rule.target_column, "City");
        assert_eq!(rule.source_value, "New York");
        assert!(rule.trim_whitespace);

        let rule = parse_rule("Formula=a=b", false).unwrap();
        assert_eq!(rule.source_value, "a=b");

        let rule = parse_rule("City=", false).unwrap();
        assert_eq!(rule.source_value, "");

        assert!(parse_rule("no-equals", false).is_err());
        assert!(parse_rule("=value", false).is_err());
    }

    #[test]
    fn status_and_kind_labels_are_stable() {
        assert_eq!(status_label(RowStatus::SourceOnly), "SOURCE_ONLY");
        assert_eq!(kind_label(MismatchKind::BlankVsNonBlank), "BLANK_VS_NON_BLANK");
    }

    #[test]
    fn missing_input_surfaces_as_a_typed_io_error() {
        let err = read_side(Path::new("no-such-dir/missing.csv"), b',', encoding_rs::UTF_8)
            .unwrap_err();
        assert!(matches!(err, CompareError::Io(_)));
        assert!(err.to_string().starts_with("I/O failure:"));
    }
}
