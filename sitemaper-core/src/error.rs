use sitemaper_scanner::ScanError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SitemapError {
    #[error("Crawl failed: {0}")]
    ScanError(#[from] ScanError),

    #[error("Cannot write sitemap to {path}: {source}")]
    OutputError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid sources file: {0}")]
    SourcesError(#[from] serde_json::Error),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("No sources defined in {0}")]
    NoSources(String),
}

pub type Result<T> = std::result::Result<T, SitemapError>;
