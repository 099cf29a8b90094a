use anyhow::{bail, Result};
use pacampfin::{
    cache::{self, ParquetCache},
    config::Config,
    fetch,
    process::{self, DatasetKind, NormalizedTable},
};
use reqwest::Client;
use std::{path::PathBuf, sync::Arc};
use tokio::{sync::Semaphore, task, time::Instant};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pacampfin=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configure ────────────────────────────────────────────────
    let cfg = Config::load()?;
    let base = fetch::urls::parse_base(&cfg.base_url)?;
    let cache = ParquetCache::new(&cfg.cache_dir)?;
    info!(
        cache = %cache.dir().display(),
        downloads = %cfg.download_dir.display(),
        kinds = cfg.kinds.len(),
        "configured"
    );

    // ─── 3) one task per dataset kind ────────────────────────────────
    let client = Client::new();
    let dl_sem = Arc::new(Semaphore::new(cfg.max_concurrent_downloads));
    let mut handles = Vec::with_capacity(cfg.kinds.len());

    for &kind in &cfg.kinds {
        let client = client.clone();
        let base = base.clone();
        let cache = cache.clone();
        let sem = dl_sem.clone();
        let download_dir = cfg.download_dir.clone();
        let keep = cfg.keep_downloads;

        handles.push((
            kind,
            tokio::spawn(async move {
                let start = Instant::now();
                let table = cache::load_or_compute(&cache, kind, || {
                    build_dataset(client, base, kind, download_dir, sem, keep)
                })
                .await?;
                let summary = table.summary();
                info!(
                    kind = %kind,
                    rows = summary.rows,
                    total_amount = summary.total_amount,
                    elapsed = ?start.elapsed(),
                    "dataset ready"
                );
                Ok::<_, anyhow::Error>(())
            }),
        ));
    }

    // ─── 4) await all kinds ──────────────────────────────────────────
    let mut failed = Vec::new();
    for (kind, h) in handles {
        match h.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(kind = %kind, "failed: {:#}", e);
                failed.push(kind);
            }
            Err(e) => {
                error!(kind = %kind, "task panicked: {}", e);
                failed.push(kind);
            }
        }
    }

    if !failed.is_empty() {
        bail!("{} of {} datasets failed", failed.len(), cfg.kinds.len());
    }
    info!("all done");
    Ok(())
}

/// Cache-miss path: download under the shared permit, normalize off the runtime,
/// then drop the raw CSV unless asked to keep it.
async fn build_dataset(
    client: Client,
    base: Url,
    kind: DatasetKind,
    download_dir: PathBuf,
    sem: Arc<Semaphore>,
    keep_download: bool,
) -> Result<NormalizedTable> {
    let (csv_path, raw) = {
        let _permit = sem.acquire().await?;
        fetch::fetch_dataset(&client, &base, kind, &download_dir).await?
    };
    info!(kind = %kind, rows = raw.len(), "processing data frame");

    let table = task::spawn_blocking(move || process::normalize(kind, &raw)).await??;

    if !keep_download {
        if let Err(e) = tokio::fs::remove_file(&csv_path).await {
            warn!(path = %csv_path.display(), "failed to delete download: {}", e);
        }
    }
    Ok(table)
}
