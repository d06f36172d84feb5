//! CSV-side I/O for the command-line host.
//!
//! The engines only ever see in-memory grids; every file touch happens here.
//! Delimiters resolve from the file extension (`.tsv` → tab) unless given
//! explicitly, input decoding goes through `encoding_rs` (UTF-8 by default),
//! and the `-` path convention routes through standard streams. Output is
//! always UTF-8 with every field quoted for round-trip safety.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

use crate::table::{Cell, Grid, Table};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    // Grids keep their header rows in place; row indices in the sheet must
    // line up with row indices in the file.
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(
    path: &Path,
    delimiter: u8,
) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    };
    Ok(open_csv_reader(reader, delimiter))
}

pub fn open_csv_writer(path: Option<&Path>, delimiter: u8) -> Result<csv::Writer<Box<dyn Write>>> {
    let base: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Always)
        .double_quote(true);
    Ok(builder.from_writer(base))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

/// Reads an entire CSV file into a raw grid, typing each field as a sheet
/// reader would (blank, number, or text). Header rows are not sliced off.
pub fn read_grid(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Grid> {
    let mut reader = open_csv_reader_from_path(path, delimiter)?;
    let mut grid = Vec::new();
    for (idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {} of {path:?}", idx + 1))?;
        let row = record
            .iter()
            .map(|field| decode_bytes(field, encoding).map(|text| Cell::from_field(&text)))
            .collect::<Result<Vec<Cell>>>()?;
        grid.push(row);
    }
    Ok(grid)
}

/// Writes a header-plus-rows table as CSV. Cells are written in their raw
/// text form.
pub fn write_table(path: Option<&Path>, delimiter: u8, table: &Table) -> Result<()> {
    let mut writer = open_csv_writer(path, delimiter)?;
    if !table.header.is_empty() {
        writer.write_record(&table.header)?;
    }
    for row in &table.rows {
        let fields: Vec<String> = row.iter().map(Cell::to_text).collect();
        writer.write_record(&fields)?;
    }
    writer.flush().context("Flushing CSV output")?;
    Ok(())
}
