// src/cache/arrow.rs
use anyhow::{anyhow, bail, Context, Result};
use arrow::{
    array::{Array, ArrayRef, Date32Array, DictionaryArray, Float64Array, StringArray},
    compute::cast,
    datatypes::{DataType, Field, Int8Type, Schema, SchemaRef},
    record_batch::RecordBatch,
};
use chrono::{Datelike, NaiveDate};
use std::{collections::HashMap, sync::Arc};

use crate::process::{
    Coordinate, DatasetKind, FilerType, KindSpec, NormalizedRecord, NormalizedTable,
};

/// Schema metadata key holding the dataset kind.
pub const KIND_METADATA_KEY: &str = "dataset_kind";

pub const FILER_ID: &str = "filer_id";
pub const AMOUNT: &str = "amount";
pub const ADDRESS: &str = "address";
pub const LAT: &str = "lat";
pub const LONG: &str = "long";
pub const DATE: &str = "date";
pub const TYPE: &str = "type";

const DERIVED: [&str; 7] = [FILER_ID, AMOUNT, ADDRESS, LAT, LONG, DATE, TYPE];

/// Days between 0001-01-01 and 1970-01-01.
const UNIX_EPOCH_FROM_CE: i32 = 719_163;

fn date_to_days(d: NaiveDate) -> i32 {
    d.num_days_from_ce() - UNIX_EPOCH_FROM_CE
}

fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_FROM_CE)
}

/// Arrow schema for a normalized dataset: raw columns as Utf8 in source order,
/// then the derived columns the kind produces.
pub fn cache_schema(kind: DatasetKind, headers: &[String]) -> Result<SchemaRef> {
    schema_for(kind.spec(), headers)
}

/// [`cache_schema`] driven by an explicit column mapping.
pub fn schema_for(spec: &KindSpec, headers: &[String]) -> Result<SchemaRef> {
    let mut fields = Vec::with_capacity(headers.len() + DERIVED.len());
    for h in headers {
        if DERIVED.contains(&h.as_str()) {
            bail!("source column {:?} collides with a derived column", h);
        }
        fields.push(Field::new(h, DataType::Utf8, true));
    }

    fields.push(Field::new(FILER_ID, DataType::Utf8, true));
    if spec.amount_col.is_some() {
        fields.push(Field::new(AMOUNT, DataType::Float64, true));
    }
    fields.push(Field::new(ADDRESS, DataType::Utf8, false));
    if spec.geometry {
        fields.push(Field::new(LAT, DataType::Float64, true));
        fields.push(Field::new(LONG, DataType::Float64, true));
    }
    if spec.date_col.is_some() {
        fields.push(Field::new(DATE, DataType::Date32, true));
    }
    if spec.type_col.is_some() {
        fields.push(Field::new(
            TYPE,
            DataType::Dictionary(Box::new(DataType::Int8), Box::new(DataType::Utf8)),
            true,
        ));
    }

    let metadata = HashMap::from([(
        KIND_METADATA_KEY.to_string(),
        spec.kind.as_str().to_string(),
    )]);
    Ok(Arc::new(Schema::new(fields).with_metadata(metadata)))
}

/// Flatten a normalized table into a single record batch.
pub fn to_record_batch(table: &NormalizedTable) -> Result<RecordBatch> {
    batch_for(table.kind.spec(), table)
}

fn batch_for(spec: &KindSpec, table: &NormalizedTable) -> Result<RecordBatch> {
    let schema = schema_for(spec, &table.headers)?;
    let recs = &table.records;
    let mut cols: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());

    for i in 0..table.headers.len() {
        let arr: StringArray = recs
            .iter()
            .map(|r| r.raw.get(i).and_then(|v| v.as_deref()))
            .collect();
        cols.push(Arc::new(arr));
    }

    let ids: StringArray = recs.iter().map(|r| r.filer_id.as_deref()).collect();
    cols.push(Arc::new(ids));
    if spec.amount_col.is_some() {
        let amounts: Float64Array = recs.iter().map(|r| r.amount).collect();
        cols.push(Arc::new(amounts));
    }
    let addresses: StringArray = recs.iter().map(|r| Some(r.address.as_str())).collect();
    cols.push(Arc::new(addresses));
    if spec.geometry {
        let lat: Float64Array = recs.iter().map(|r| r.location.map(|c| c.lat)).collect();
        let long: Float64Array = recs.iter().map(|r| r.location.map(|c| c.long)).collect();
        cols.push(Arc::new(lat));
        cols.push(Arc::new(long));
    }
    if spec.date_col.is_some() {
        let dates: Date32Array = recs.iter().map(|r| r.date.map(date_to_days)).collect();
        cols.push(Arc::new(dates));
    }
    if spec.type_col.is_some() {
        let types: DictionaryArray<Int8Type> = recs
            .iter()
            .map(|r| r.filer_type.map(|t| t.as_str()))
            .collect();
        cols.push(Arc::new(types));
    }

    RecordBatch::try_new(schema, cols).context("building normalized record batch")
}

/// Read the dataset kind recorded in a cache schema.
pub fn schema_kind(schema: &Schema) -> Result<DatasetKind> {
    let raw = schema
        .metadata()
        .get(KIND_METADATA_KEY)
        .ok_or_else(|| anyhow!("schema has no {:?} metadata", KIND_METADATA_KEY))?;
    DatasetKind::from_str(raw).ok_or_else(|| anyhow!("unknown dataset kind {:?}", raw))
}

fn utf8_column(batch: &RecordBatch, name: &str) -> Result<Option<StringArray>> {
    let Some(col) = batch.column_by_name(name) else {
        return Ok(None);
    };
    // dictionary-encoded columns are flattened first
    let flat =
        cast(col.as_ref(), &DataType::Utf8).with_context(|| format!("casting {} to Utf8", name))?;
    flat.as_any()
        .downcast_ref::<StringArray>()
        .cloned()
        .map(Some)
        .ok_or_else(|| anyhow!("column {} was expected to be Utf8", name))
}

fn f64_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<Option<&'a Float64Array>> {
    batch
        .column_by_name(name)
        .map(|col| {
            col.as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| {
                    anyhow!(
                        "column {} was expected to be Float64, got {:?}",
                        name,
                        col.data_type()
                    )
                })
        })
        .transpose()
}

fn opt_str(arr: &StringArray, row: usize) -> Option<String> {
    (!arr.is_null(row)).then(|| arr.value(row).to_string())
}

fn opt_f64(arr: Option<&Float64Array>, row: usize) -> Option<f64> {
    arr.and_then(|a| (!a.is_null(row)).then(|| a.value(row)))
}

/// Rebuild a normalized table from cached batches sharing `schema`.
pub fn from_record_batches(schema: &Schema, batches: &[RecordBatch]) -> Result<NormalizedTable> {
    let kind = schema_kind(schema)?;
    let headers: Vec<String> = schema
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .filter(|n| !DERIVED.contains(&n.as_str()))
        .collect();

    let mut records = Vec::with_capacity(batches.iter().map(RecordBatch::num_rows).sum());
    for batch in batches {
        let raw_cols = headers
            .iter()
            .map(|h| utf8_column(batch, h)?.ok_or_else(|| anyhow!("raw column {:?} missing", h)))
            .collect::<Result<Vec<_>>>()?;
        let ids = utf8_column(batch, FILER_ID)?;
        let addresses =
            utf8_column(batch, ADDRESS)?.ok_or_else(|| anyhow!("address column missing"))?;
        let types = utf8_column(batch, TYPE)?;
        let amounts = f64_column(batch, AMOUNT)?;
        let lats = f64_column(batch, LAT)?;
        let longs = f64_column(batch, LONG)?;
        let dates = batch
            .column_by_name(DATE)
            .map(|col| {
                col.as_any()
                    .downcast_ref::<Date32Array>()
                    .ok_or_else(|| anyhow!("date column was expected to be Date32"))
            })
            .transpose()?;

        for row in 0..batch.num_rows() {
            let location = match (opt_f64(lats, row), opt_f64(longs, row)) {
                (Some(lat), Some(long)) => Some(Coordinate { lat, long }),
                _ => None,
            };
            let filer_type = match types.as_ref().and_then(|t| opt_str(t, row)) {
                Some(label) => Some(
                    FilerType::from_label(&label)
                        .ok_or_else(|| anyhow!("unknown filer type label {:?}", label))?,
                ),
                None => None,
            };
            records.push(NormalizedRecord {
                raw: raw_cols.iter().map(|c| opt_str(c, row)).collect(),
                filer_id: ids.as_ref().and_then(|c| opt_str(c, row)),
                amount: opt_f64(amounts, row),
                address: addresses.value(row).to_string(),
                location,
                date: dates
                    .and_then(|d| (!d.is_null(row)).then(|| d.value(row)))
                    .and_then(days_to_date),
                filer_type,
            });
        }
    }

    Ok(NormalizedTable {
        kind,
        headers,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filer_table() -> NormalizedTable {
        NormalizedTable {
            kind: DatasetKind::Filer,
            headers: vec!["Filer Identification Number".into(), "Filer Name".into()],
            records: vec![
                NormalizedRecord {
                    raw: vec![Some("1".into()), Some("A".into())],
                    filer_id: Some("1".into()),
                    amount: None,
                    address: "1 A St  York PA 17401".into(),
                    location: Some(Coordinate {
                        lat: 39.96,
                        long: -76.72,
                    }),
                    date: None,
                    filer_type: Some(FilerType::Committee),
                },
                NormalizedRecord {
                    raw: vec![Some("2".into()), None],
                    filer_id: Some("2".into()),
                    amount: None,
                    address: "    ".into(),
                    location: None,
                    date: None,
                    filer_type: Some(FilerType::Unknown),
                },
            ],
        }
    }

    #[test]
    fn filer_schema_has_type_but_no_amount_or_date() -> Result<()> {
        let schema = cache_schema(DatasetKind::Filer, &["x".to_string()])?;
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["x", FILER_ID, ADDRESS, LAT, LONG, TYPE]);
        assert_eq!(schema_kind(&schema)?, DatasetKind::Filer);
        Ok(())
    }

    #[test]
    fn derived_name_collision_is_rejected() {
        assert!(cache_schema(DatasetKind::Debt, &["amount".to_string()]).is_err());
    }

    #[test]
    fn batch_restores_table() -> Result<()> {
        let table = filer_table();
        let batch = to_record_batch(&table)?;
        assert_eq!(batch.num_rows(), 2);
        let back = from_record_batches(&batch.schema(), &[batch])?;
        assert_eq!(back, table);
        Ok(())
    }

    #[test]
    fn dates_are_days_since_epoch() {
        let d = NaiveDate::from_ymd_opt(1970, 1, 2).expect("valid date");
        assert_eq!(date_to_days(d), 1);
        assert_eq!(days_to_date(17229), NaiveDate::from_ymd_opt(2017, 3, 4));
    }

    #[test]
    fn every_kind_carries_coordinates() -> Result<()> {
        for kind in DatasetKind::ALL {
            let schema = cache_schema(kind, &[])?;
            assert!(schema.field_with_name(LAT).is_ok(), "{kind}");
            assert!(schema.field_with_name(LONG).is_ok(), "{kind}");
        }
        Ok(())
    }

    #[test]
    fn mapping_without_geometry_drops_coordinates() -> Result<()> {
        let spec = KindSpec {
            geometry: false,
            ..*DatasetKind::Filer.spec()
        };
        let schema = schema_for(&spec, &["x".to_string()])?;
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["x", FILER_ID, ADDRESS, TYPE]);

        let mut table = filer_table();
        for r in &mut table.records {
            r.location = None;
        }
        let batch = batch_for(&spec, &table)?;
        assert!(batch.column_by_name(LAT).is_none());
        let back = from_record_batches(&batch.schema(), &[batch])?;
        assert_eq!(back, table);
        Ok(())
    }
}
