pub mod config;
pub mod crawler;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod result;
pub mod scope;

pub use config::{CrawlLimits, FetchConfig};
pub use crawler::{CrawlContext, Crawler, ProgressCallback};
pub use error::ScanError;
pub use fetcher::{FetchOutcome, Fetcher};
pub use filter::FilterConfig;
pub use result::{Link, PageRecord};
pub use scope::SiteScope;
