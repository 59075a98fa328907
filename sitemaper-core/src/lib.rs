pub mod crawl;
pub mod error;
pub mod sitemap;
pub mod source;

pub use crawl::{CrawlOptions, CrawlSummary, execute_crawl};
pub use error::SitemapError;
pub use sitemap::{
    SitemapWriter, filter_records, finish_sitemap, lastmod_today, open_sitemap, write_sitemap,
};
pub use source::{Datasource, default_output_name, load_sources, select_sources};
