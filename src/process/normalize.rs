// src/process/normalize.rs
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::process::{
    address::format_address, amount::amount_to_float, coords::locate, date_parser::format_date,
    Coordinate, DatasetKind, FilerType, KindSpec, NormalizeError, RawRecord, RawTable,
};

/// A source row plus the fields derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    /// Source cells, aligned with `NormalizedTable::headers`.
    pub raw: Vec<Option<String>>,
    pub filer_id: Option<String>,
    pub amount: Option<f64>,
    pub address: String,
    pub location: Option<Coordinate>,
    pub date: Option<NaiveDate>,
    pub filer_type: Option<FilerType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    pub kind: DatasetKind,
    pub headers: Vec<String>,
    pub records: Vec<NormalizedRecord>,
}

/// Per-dataset statistics for logging and inspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub kind: DatasetKind,
    pub rows: usize,
    pub with_amount: usize,
    pub with_date: usize,
    pub with_location: usize,
    pub total_amount: f64,
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub filer_types: BTreeMap<FilerType, usize>,
}

/// Column positions for one kind, resolved against a concrete header.
struct ColumnPlan {
    id: usize,
    date: Option<usize>,
    amount: Option<usize>,
    location: Option<(usize, usize)>,
    address: Vec<usize>,
    filer_type: Option<usize>,
}

impl ColumnPlan {
    fn resolve(spec: &KindSpec, table: &RawTable) -> Result<Self, NormalizeError> {
        let optional = |col: Option<&str>| col.map(|c| table.require_column(c)).transpose();

        let id = table.require_column(spec.id_col)?;
        let date = optional(spec.date_col)?;
        let amount = optional(spec.amount_col)?;
        let location = if spec.geometry {
            let (primary, secondary) = spec.location_cols();
            Some((
                table.require_column(&primary)?,
                table.require_column(&secondary)?,
            ))
        } else {
            None
        };
        let (first, last) = spec.address_bounds();
        let address = table.column_span(&first, &last)?;

        Ok(Self {
            id,
            date,
            amount,
            location,
            address,
            filer_type: optional(spec.type_col)?,
        })
    }

    fn apply(&self, rec: RawRecord<'_>) -> NormalizedRecord {
        NormalizedRecord {
            raw: rec.values().to_vec(),
            filer_id: rec.at(self.id).map(str::to_string),
            amount: self.amount.and_then(|i| amount_to_float(rec.at(i))),
            address: format_address(self.address.iter().map(|&i| rec.at(i))),
            location: self
                .location
                .and_then(|(p, s)| locate(rec.at(p), rec.at(s))),
            date: self.date.and_then(|i| format_date(rec.at(i))),
            filer_type: self.filer_type.map(|i| FilerType::from_raw(rec.at(i))),
        }
    }
}

/// Normalize every row of `table` according to the kind's column mapping.
///
/// Field-level parse failures become missing values; only a header that does
/// not carry the mapped columns is an error.
#[tracing::instrument(level = "info", skip(table), fields(rows = table.len()))]
pub fn normalize(kind: DatasetKind, table: &RawTable) -> Result<NormalizedTable, NormalizeError> {
    let plan = ColumnPlan::resolve(kind.spec(), table)?;

    let records: Vec<NormalizedRecord> = table
        .rows
        .par_iter()
        .map(|values| plan.apply(RawRecord::new(&table.headers, values)))
        .collect();

    let out = NormalizedTable {
        kind,
        headers: table.headers.clone(),
        records,
    };
    let s = out.summary();
    info!(
        kind = %kind,
        rows = s.rows,
        missing_amount = s.rows - s.with_amount,
        missing_date = s.rows - s.with_date,
        missing_location = s.rows - s.with_location,
        "normalized"
    );
    Ok(out)
}

impl NormalizedTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn summary(&self) -> Summary {
        let mut s = Summary {
            kind: self.kind,
            rows: self.records.len(),
            with_amount: 0,
            with_date: 0,
            with_location: 0,
            total_amount: 0.0,
            earliest: None,
            latest: None,
            filer_types: BTreeMap::new(),
        };
        for r in &self.records {
            if let Some(a) = r.amount {
                s.with_amount += 1;
                s.total_amount += a;
            }
            if let Some(d) = r.date {
                s.with_date += 1;
                s.earliest = Some(s.earliest.map_or(d, |e| e.min(d)));
                s.latest = Some(s.latest.map_or(d, |l| l.max(d)));
            }
            if r.location.is_some() {
                s.with_location += 1;
            }
            if let Some(t) = r.filer_type {
                *s.filer_types.entry(t).or_default() += 1;
            }
        }
        s
    }
}
