use anyhow::{Context, Result};
use serde::Deserialize;
use std::{env, fs, path::PathBuf};

use crate::fetch::urls::DEFAULT_BASE_URL;
use crate::process::DatasetKind;

/// Env var naming an optional YAML config file.
pub const CONFIG_ENV: &str = "PACAMPFIN_CONFIG";

/// Runtime settings for the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Portal view API root.
    pub base_url: String,
    /// Where raw CSV downloads land.
    pub download_dir: PathBuf,
    /// Where normalized parquet files live.
    pub cache_dir: PathBuf,
    pub kinds: Vec<DatasetKind>,
    pub max_concurrent_downloads: usize,
    /// Keep raw CSVs after they have been normalized and cached.
    pub keep_downloads: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            download_dir: PathBuf::from("data/raw"),
            cache_dir: PathBuf::from("data"),
            kinds: DatasetKind::ALL.to_vec(),
            max_concurrent_downloads: 3,
            keep_downloads: false,
        }
    }
}

impl Config {
    pub fn from_yaml(s: &str) -> Result<Self> {
        serde_yaml::from_str(s).context("parsing YAML config")
    }

    /// Defaults, overlaid by the YAML file named in `PACAMPFIN_CONFIG`, overlaid by
    /// `PACAMPFIN_BASE_URL`, `PACAMPFIN_CACHE_DIR` and `PACAMPFIN_DOWNLOAD_DIR`.
    pub fn load() -> Result<Self> {
        let mut cfg = match env::var(CONFIG_ENV) {
            Ok(path) => {
                let text = fs::read_to_string(&path)
                    .with_context(|| format!("reading config file {}", path))?;
                Self::from_yaml(&text).with_context(|| format!("in {}", path))?
            }
            Err(_) => Self::default(),
        };
        cfg.apply_overrides(|key| env::var(key).ok());
        Ok(cfg)
    }

    fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if let Some(v) = lookup("PACAMPFIN_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = lookup("PACAMPFIN_CACHE_DIR") {
            self.cache_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("PACAMPFIN_DOWNLOAD_DIR") {
            self.download_dir = PathBuf::from(v);
        }
        self.max_concurrent_downloads = self.max_concurrent_downloads.max(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_yaml_is_default() -> Result<()> {
        assert_eq!(Config::from_yaml("{}")?, Config::default());
        Ok(())
    }

    #[test]
    fn partial_yaml() -> Result<()> {
        let cfg = Config::from_yaml(
            "cache_dir: /tmp/pa\nkinds: [filer, contribution]\nkeep_downloads: true\n",
        )?;
        assert_eq!(cfg.cache_dir, PathBuf::from("/tmp/pa"));
        assert_eq!(cfg.kinds, vec![DatasetKind::Filer, DatasetKind::Contribution]);
        assert!(cfg.keep_downloads);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        Ok(())
    }

    #[test]
    fn unknown_keys_and_kinds_are_rejected() {
        assert!(Config::from_yaml("cache: x\n").is_err());
        assert!(Config::from_yaml("kinds: [lobbying]\n").is_err());
    }

    #[test]
    fn env_overrides_win() {
        let vars = HashMap::from([
            ("PACAMPFIN_CACHE_DIR", "/var/cache/pa"),
            ("PACAMPFIN_BASE_URL", "http://localhost/api/views/"),
        ]);
        let mut cfg = Config {
            max_concurrent_downloads: 0,
            ..Config::default()
        };
        cfg.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.cache_dir, PathBuf::from("/var/cache/pa"));
        assert_eq!(cfg.base_url, "http://localhost/api/views/");
        assert_eq!(cfg.download_dir, PathBuf::from("data/raw"));
        assert_eq!(cfg.max_concurrent_downloads, 1);
    }
}
