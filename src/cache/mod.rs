// src/cache/mod.rs
pub mod arrow;

use ::arrow::record_batch::RecordBatch;
use anyhow::{bail, Context, Result};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    fs::{self, File},
    future::Future,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use crate::process::{DatasetKind, NormalizedTable};

/// Normalized datasets persisted as one Parquet file per kind.
#[derive(Debug, Clone)]
pub struct ParquetCache {
    dir: PathBuf,
}

impl ParquetCache {
    /// Open a cache rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating cache directory {:?}", &dir))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, kind: DatasetKind) -> PathBuf {
        self.dir.join(format!("{}.parquet", kind.spec().cache_key))
    }

    /// Cached table for `kind`, or `None` if nothing has been stored yet.
    pub fn load(&self, kind: DatasetKind) -> Result<Option<NormalizedTable>> {
        let path = self.path(kind);
        if !path.exists() {
            return Ok(None);
        }
        info!(kind = %kind, path = %path.display(), "loading cached dataset");
        let table = read_parquet(&path)?;
        if table.kind != kind {
            bail!(
                "cache file {} holds {} data, expected {}",
                path.display(),
                table.kind,
                kind
            );
        }
        Ok(Some(table))
    }

    /// Write `table` atomically: temp file first, then rename over the final path.
    /// The temp file is removed again if any step fails.
    pub fn store(&self, table: &NormalizedTable) -> Result<PathBuf> {
        let path = self.path(table.kind);
        let temp_path = path.with_extension("tmp");
        let batch = arrow::to_record_batch(table)?;

        if let Err(e) = write_then_rename(&batch, &temp_path, &path) {
            if temp_path.exists() {
                if let Err(rm) = fs::remove_file(&temp_path) {
                    warn!(path = %temp_path.display(), "failed to remove temp file: {}", rm);
                }
            }
            return Err(e);
        }
        info!(kind = %table.kind, rows = table.len(), path = %path.display(), "wrote cache");
        Ok(path)
    }
}

fn write_then_rename(batch: &RecordBatch, temp_path: &Path, path: &Path) -> Result<()> {
    let file =
        File::create(temp_path).with_context(|| format!("creating cache file {:?}", temp_path))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_dictionary_enabled(true)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("creating Arrow writer for cache")?;
    writer.write(batch).context("writing cache batch")?;
    writer.close().context("closing cache writer")?;

    fs::rename(temp_path, path)
        .with_context(|| format!("renaming {:?} -> {:?}", temp_path, path))
}

/// Read any cache file back into a normalized table; the kind comes from its metadata.
pub fn read_parquet(path: &Path) -> Result<NormalizedTable> {
    let file = File::open(path).with_context(|| format!("failed to open `{}`", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("reading parquet footer of `{}`", path.display()))?;
    let schema = builder.schema().clone();
    let reader = builder.with_batch_size(64 * 1024).build()?;

    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch.with_context(|| format!("decoding `{}`", path.display()))?);
    }
    debug!(path = %path.display(), batches = batches.len(), "read cache file");
    arrow::from_record_batches(&schema, &batches)
}

/// Return the cached table for `kind`, or run `compute` and persist its result.
pub async fn load_or_compute<F, Fut>(
    cache: &ParquetCache,
    kind: DatasetKind,
    compute: F,
) -> Result<NormalizedTable>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<NormalizedTable>>,
{
    if let Some(table) = cache.load(kind)? {
        return Ok(table);
    }
    let table = compute().await?;
    if table.kind != kind {
        bail!("computed {} data for the {} cache entry", table.kind, kind);
    }
    cache.store(&table)?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{normalize, read_csv};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,pacampfin::cache=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    const RECEIPTS: &str = "Filer Identification Number,Receipt Address 1,Receipt Address 2,\
        Receipt City,Receipt State,Receipt Zip Code,Receipt Date,Receipt Amount,\
        Receipt Location 1,Receipt Location 2\n\
        10,1 Front St,,Lancaster,PA,17602,20170101,$250.75,\"LANCASTER\n(40.03, -76.30)\",\n\
        11,,,,,,bogus,250,,\n";

    fn receipts() -> Result<NormalizedTable> {
        let raw = read_csv(RECEIPTS.as_bytes(), &DatasetKind::Receipt.spec().column_hints())?;
        Ok(normalize(DatasetKind::Receipt, &raw)?)
    }

    #[test]
    fn store_then_load_is_field_for_field_equal() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let cache = ParquetCache::new(dir.path())?;
        assert!(cache.load(DatasetKind::Receipt)?.is_none());

        let table = receipts()?;
        let path = cache.store(&table)?;
        assert_eq!(path, dir.path().join("receipt.parquet"));
        assert!(!path.with_extension("tmp").exists());

        let loaded = cache.load(DatasetKind::Receipt)?.expect("cache hit");
        assert_eq!(loaded, table);
        Ok(())
    }

    #[test]
    fn mismatched_kind_is_rejected() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let cache = ParquetCache::new(dir.path())?;
        cache.store(&receipts()?)?;
        fs::rename(
            cache.path(DatasetKind::Receipt),
            cache.path(DatasetKind::Debt),
        )?;
        assert!(cache.load(DatasetKind::Debt).is_err());
        Ok(())
    }

    #[tokio::test]
    async fn compute_runs_once() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let cache = ParquetCache::new(dir.path())?;
        let calls = AtomicUsize::new(0);

        let first = load_or_compute(&cache, DatasetKind::Receipt, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            receipts()
        })
        .await?;
        let second = load_or_compute(&cache, DatasetKind::Receipt, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            receipts()
        })
        .await?;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        Ok(())
    }

    #[tokio::test]
    async fn compute_errors_are_not_cached() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let cache = ParquetCache::new(dir.path())?;
        let res = load_or_compute(&cache, DatasetKind::Debt, || async {
            Err::<NormalizedTable, _>(anyhow::anyhow!("download failed"))
        })
        .await;
        assert!(res.is_err());
        assert!(!cache.path(DatasetKind::Debt).exists());
        Ok(())
    }

    #[test]
    fn failed_store_leaves_no_temp_file() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let cache = ParquetCache::new(dir.path())?;
        // a directory squatting on the final path makes the rename fail
        let target = cache.path(DatasetKind::Receipt);
        fs::create_dir(&target)?;
        fs::write(target.join("occupied"), b"x")?;

        assert!(cache.store(&receipts()?).is_err());
        assert!(!target.with_extension("tmp").exists());
        assert!(target.is_dir());
        Ok(())
    }
}
