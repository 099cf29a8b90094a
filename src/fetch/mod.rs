// src/fetch/mod.rs
pub mod urls;

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use tokio::{fs, io::AsyncWriteExt, task, time::Instant};
use tracing::{info, warn};
use url::Url;

use crate::process::{self, ColumnHint, DatasetKind, RawTable};

/// Stream `url` to `dest_dir/file_name`, writing through a temp file.
/// Returns the full path of the saved file.
pub async fn download_csv(
    client: &Client,
    url: &Url,
    dest_dir: impl AsRef<Path>,
    file_name: &str,
) -> Result<PathBuf> {
    let dest_dir = dest_dir.as_ref();
    fs::create_dir_all(dest_dir)
        .await
        .with_context(|| format!("creating download directory {:?}", dest_dir))?;
    let dest_path = dest_dir.join(file_name);
    let temp_path = dest_path.with_extension("part");

    let start = Instant::now();
    let resp = client
        .get(url.as_str())
        .send()
        .await
        .with_context(|| format!("GET {}", url))?
        .error_for_status()?;

    let bytes = match stream_then_rename(resp, url, &temp_path, &dest_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            if fs::try_exists(&temp_path).await.unwrap_or(false) {
                if let Err(rm) = fs::remove_file(&temp_path).await {
                    warn!(path = %temp_path.display(), "failed to remove partial download: {}", rm);
                }
            }
            return Err(e);
        }
    };
    info!(file = file_name, bytes, elapsed = ?start.elapsed(), "downloaded");
    Ok(dest_path)
}

async fn stream_then_rename(
    mut resp: Response,
    url: &Url,
    temp_path: &Path,
    dest_path: &Path,
) -> Result<usize> {
    let mut file = fs::File::create(temp_path)
        .await
        .with_context(|| format!("creating {:?}", temp_path))?;
    let mut bytes = 0usize;
    while let Some(chunk) = resp
        .chunk()
        .await
        .with_context(|| format!("reading body from {}", url))?
    {
        bytes += chunk.len();
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);

    fs::rename(temp_path, dest_path)
        .await
        .with_context(|| format!("renaming {:?} -> {:?}", temp_path, dest_path))?;
    Ok(bytes)
}

/// Download a CSV and parse it into a `RawTable` on the blocking pool.
pub async fn fetch_csv(
    client: &Client,
    url: &Url,
    dest_dir: impl AsRef<Path>,
    file_name: &str,
    hints: HashMap<String, ColumnHint>,
) -> Result<(PathBuf, RawTable)> {
    let path = download_csv(client, url, dest_dir, file_name).await?;
    let table = task::spawn_blocking({
        let path = path.clone();
        move || process::load_csv(&path, &hints)
    })
    .await??;
    Ok((path, table))
}

/// Fetch the raw table for one dataset kind from the portal rooted at `base`.
pub async fn fetch_dataset(
    client: &Client,
    base: &Url,
    kind: DatasetKind,
    dest_dir: impl AsRef<Path>,
) -> Result<(PathBuf, RawTable)> {
    let spec = kind.spec();
    let url = urls::dataset_url(base, kind)?;
    info!(kind = %kind, url = %url, "downloading {}", spec.file_name);
    fetch_csv(client, &url, dest_dir, spec.file_name, spec.column_hints())
        .await
        .with_context(|| format!("fetching {} dataset", kind))
}
