use crate::error::Result;
use crate::sitemap::{filter_records, finish_sitemap, lastmod_today, open_sitemap};
use crate::source::Datasource;
use indicatif::{ProgressBar, ProgressStyle};
use sitemaper_scanner::{CrawlLimits, Crawler, FetchConfig, PageRecord, SiteScope};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tracing::{info, warn};

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub source: Datasource,
    pub fetch: FetchConfig,
    pub limits: CrawlLimits,
    pub include_titles: bool,
    pub show_progress_bars: bool,
    /// Raised from outside (e.g. on Ctrl-C) to stop early and keep what
    /// has been recorded
    pub stop_flag: Option<Arc<AtomicBool>>,
}

impl CrawlOptions {
    pub fn new(source: Datasource) -> Self {
        Self {
            source,
            fetch: FetchConfig::default(),
            limits: CrawlLimits::default(),
            include_titles: true,
            show_progress_bars: false,
            stop_flag: None,
        }
    }
}

/// What one crawl produced
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub name: String,
    pub base_url: String,
    pub output: PathBuf,
    pub lastmod: String,
    /// Every page recorded during traversal
    pub records: Vec<PageRecord>,
    /// Entries that survived the output filter and were written
    pub written: usize,
}

impl CrawlSummary {
    pub fn visited(&self) -> usize {
        self.records.len()
    }

    pub fn filtered_out(&self) -> usize {
        self.records.len() - self.written
    }
}

/// Crawl one datasource and write its sitemap.
pub async fn execute_crawl(options: CrawlOptions) -> Result<CrawlSummary> {
    let CrawlOptions {
        source,
        fetch,
        limits,
        include_titles,
        show_progress_bars,
        stop_flag,
    } = options;

    let lastmod = lastmod_today();
    let output = source.output_path();
    info!("make sitemap for {} into {}", source.base_url, output.display());

    // Catch a bad base URL or an unwritable output before crawling
    SiteScope::parse(&source.base_url)?;
    let writer = open_sitemap(&output, &lastmod, include_titles)?;

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting crawl...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let mut crawler = Crawler::new()
        .with_fetch_config(fetch)
        .with_limits(limits)
        .with_filters(source.filters.clone());

    if let Some(ref pb) = progress_bar {
        let pb_clone = pb.clone();
        crawler = crawler.with_progress_callback(Arc::new(move |count: usize, url: String| {
            pb_clone.println(&url);
            pb_clone.set_message(format!("Crawling... {} pages recorded", count));
        }));
    }
    if let Some(flag) = stop_flag {
        crawler = crawler.with_stop_flag(flag);
    }

    let crawl_result = crawler.build_sitemap(source.seed(), &source.base_url).await;
    if let Some(ref pb) = progress_bar {
        pb.finish_and_clear();
    }
    let records = match crawl_result {
        Ok(records) => records,
        Err(e) => {
            drop(writer);
            if let Err(remove_err) = fs::remove_file(&output) {
                warn!("could not remove {}: {}", output.display(), remove_err);
            }
            return Err(e.into());
        }
    };

    let retained = filter_records(&records, &source.filters);
    let written = finish_sitemap(writer, &output, retained)?;

    info!(
        "sitemap for {} with {} of {} pages written to {}",
        source.base_url,
        written,
        records.len(),
        output.display()
    );

    Ok(CrawlSummary {
        name: source.name,
        base_url: source.base_url,
        output,
        lastmod,
        records,
        written,
    })
}
