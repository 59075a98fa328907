// Named crawl targets, loadable from a JSON sources file

use crate::error::{Result, SitemapError};
use serde::{Deserialize, Serialize};
use sitemaper_scanner::FilterConfig;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// One site to crawl, with its filters and output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datasource {
    pub name: String,
    pub base_url: String,
    /// Where the crawl starts; the base URL when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(flatten)]
    pub filters: FilterConfig,
}

impl Datasource {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            name: source_name(&base_url),
            base_url,
            seed_url: None,
            output: None,
            filters: FilterConfig::default(),
        }
    }

    pub fn seed(&self) -> &str {
        self.seed_url.as_deref().unwrap_or(&self.base_url)
    }

    /// Configured output file, or one named after the site.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_output_name(&self.base_url)))
    }
}

/// Host of `base_url` without a leading `www.`, dots replaced by `_`.
fn source_name(base_url: &str) -> String {
    Url::parse(base_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .map(|host| host.trim_start_matches("www.").replace('.', "_"))
        .unwrap_or_else(|| "site".to_string())
}

/// File name used when no output path is given, e.g.
/// `https://www.admin.ch` becomes `sitemap__admin_ch.xml`.
pub fn default_output_name(base_url: &str) -> String {
    format!("sitemap__{}.xml", source_name(base_url))
}

/// Read a JSON array of datasources.
pub fn load_sources(path: &Path) -> Result<Vec<Datasource>> {
    let content = fs::read_to_string(path)?;
    let sources: Vec<Datasource> = serde_json::from_str(&content)?;

    if sources.is_empty() {
        return Err(SitemapError::NoSources(path.display().to_string()));
    }

    Ok(sources)
}

/// All sources, or only the one called `name`.
pub fn select_sources(sources: Vec<Datasource>, name: Option<&str>) -> Result<Vec<Datasource>> {
    match name {
        None => Ok(sources),
        Some(name) => {
            let selected: Vec<Datasource> = sources.into_iter().filter(|s| s.name == name).collect();
            if selected.is_empty() {
                Err(SitemapError::UnknownSource(name.to_string()))
            } else {
                Ok(selected)
            }
        }
    }
}
