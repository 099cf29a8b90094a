// src/fetch/urls.rs
use anyhow::{Context, Result};
use url::Url;

use crate::process::DatasetKind;

/// Root of the Pennsylvania open-data portal's view API.
pub const DEFAULT_BASE_URL: &str = "https://data.pa.gov/api/views/";

/// Parse a portal root, tolerating a missing trailing slash.
pub fn parse_base(base: &str) -> Result<Url> {
    let with_slash = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    };
    Url::parse(&with_slash).with_context(|| format!("parsing base URL {}", base))
}

/// CSV export URL for one dataset kind.
pub fn dataset_url(base: &Url, kind: DatasetKind) -> Result<Url> {
    let spec = kind.spec();
    let mut url = base
        .join(&format!("{}/rows.csv", spec.resource_id))
        .with_context(|| format!("joining {} onto {}", spec.resource_id, base))?;
    url.query_pairs_mut().append_pair("accessType", "DOWNLOAD");
    Ok(url)
}
