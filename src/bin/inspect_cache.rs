use anyhow::{Context, Result};
use glob::glob;
use pacampfin::{cache, config::Config, process::Summary};
use serde::Serialize;
use std::{env, path::PathBuf};

#[derive(Serialize)]
struct Entry {
    file: String,
    #[serde(flatten)]
    summary: Summary,
}

fn main() -> Result<()> {
    // Optional CLI argument: cache directory; otherwise the configured one.
    let args: Vec<String> = env::args().collect();
    let dir = match args.get(1) {
        Some(d) => PathBuf::from(d),
        None => Config::load()?.cache_dir,
    };

    let pattern = format!("{}/*.parquet", dir.display());
    let mut entries = Vec::new();
    for path in glob(&pattern).context("building glob pattern")? {
        let path = path?;
        let table = cache::read_parquet(&path)
            .with_context(|| format!("loading {}", path.display()))?;
        entries.push(Entry {
            file: path.display().to_string(),
            summary: table.summary(),
        });
    }

    if entries.is_empty() {
        eprintln!("no cached datasets under {}", dir.display());
    }
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}
