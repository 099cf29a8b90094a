// src/process/mod.rs
pub mod address;
pub mod amount;
pub mod coords;
pub mod date_parser;
pub mod filer_type;
pub mod kind;
pub mod normalize;
pub mod raw_table;
pub mod utils;

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::{collections::HashMap, fs::File, io::Read, path::Path};
use thiserror::Error;
use tracing::debug;

pub use coords::Coordinate;
pub use filer_type::FilerType;
pub use kind::{ColumnHint, DatasetKind, KindSpec};
pub use normalize::{normalize, NormalizedRecord, NormalizedTable, Summary};
pub use raw_table::{RawRecord, RawTable};

/// Why a single field could not be parsed. Always recovered to the missing-sentinel
/// by the normalizer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("amount does not start with '$'")]
    MissingDollarSign,
    #[error("not a number: {0:?}")]
    InvalidNumber(String),
    #[error("not a YYYYMMDD.0 date: {0:?}")]
    InvalidDate(String),
    #[error("no (lat, long) pair found")]
    NoCoordinate,
}

/// Dataset-level failures: the source schema no longer matches the kind's mapping.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("source column {0:?} not found")]
    MissingColumn(String),
    #[error("address span {first:?}..={last:?} runs backwards in the source header")]
    InvertedSpan { first: String, last: String },
}

/// Read a CSV file with a header row into a `RawTable`, applying per-column hints.
#[tracing::instrument(level = "info", skip(path, hints), fields(path = %path.as_ref().display()))]
pub fn load_csv<P: AsRef<Path>>(path: P, hints: &HashMap<String, ColumnHint>) -> Result<RawTable> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path.as_ref()))?;
    read_csv(file, hints).with_context(|| format!("Failed to parse {:?}", path.as_ref()))
}

/// Reader-based variant of [`load_csv`].
pub fn read_csv<R: Read>(reader: R, hints: &HashMap<String, ColumnHint>) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .byte_headers()
        .context("reading CSV header")?
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim().to_string())
        .collect();

    // resolve hints to positions once
    let hinted: Vec<Option<ColumnHint>> = headers.iter().map(|h| hints.get(h).copied()).collect();

    let mut table = RawTable::new(headers);
    for (idx, result) in rdr.byte_records().enumerate() {
        let record = result.with_context(|| format!("CSV parse error at record {}", idx))?;
        let row = record
            .iter()
            .enumerate()
            .map(|(col, bytes)| {
                let cell = utils::clean_cell(&String::from_utf8_lossy(bytes));
                match hinted.get(col).copied().flatten() {
                    Some(hint) => utils::apply_hint(cell, hint),
                    None => cell,
                }
            })
            .collect();
        table.push_row(row);
    }

    debug!(
        columns = table.headers.len(),
        rows = table.len(),
        "loaded csv"
    );
    Ok(table)
}
