//! Catalog loading
//!
//! The catalog is a JSON array of tune records read once at startup from a
//! file or an http(s) URL. Failures are logged and degrade to an empty
//! catalog; there is no retry.

use super::Catalog;
use crate::error::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tt_common::Tune;

/// Where the catalog JSON comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    File(PathBuf),
    Url(String),
}

impl CatalogSource {
    /// `http://` and `https://` locations are URLs, anything else a path
    pub fn parse(location: &str) -> Self {
        let location = location.trim();
        if location.starts_with("http://") || location.starts_with("https://") {
            CatalogSource::Url(location.to_string())
        } else {
            CatalogSource::File(PathBuf::from(location))
        }
    }
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogSource::File(path) => write!(f, "{}", path.display()),
            CatalogSource::Url(url) => f.write_str(url),
        }
    }
}

/// Parse catalog JSON
pub fn parse_catalog(bytes: &[u8]) -> Result<Vec<Tune>> {
    serde_json::from_slice(bytes).map_err(|e| Error::CatalogLoad(format!("invalid catalog JSON: {}", e)))
}

/// Fetch and parse the catalog, propagating failures
pub async fn fetch_tunes(source: &CatalogSource) -> Result<Vec<Tune>> {
    let bytes = match source {
        CatalogSource::File(path) => tokio::fs::read(path).await?,
        CatalogSource::Url(url) => {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()?;
            let response = client.get(url).send().await?.error_for_status()?;
            response.bytes().await?.to_vec()
        }
    };
    parse_catalog(&bytes)
}

/// Load the catalog, degrading to an empty one on any failure
pub async fn load_catalog(source: Option<&CatalogSource>) -> Catalog {
    let source = match source {
        Some(s) => s,
        None => {
            error!("No catalog source configured; running with an empty catalog");
            return Catalog::empty();
        }
    };

    match fetch_tunes(source).await {
        Ok(tunes) => {
            let catalog = Catalog::load(tunes);
            info!("Loaded {} tunes from {}", catalog.len(), source);
            catalog
        }
        Err(e) => {
            error!("Failed to load tunes from {}: {}", source, e);
            Catalog::empty()
        }
    }
}
