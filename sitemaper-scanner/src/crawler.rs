use crate::config::{CrawlLimits, FetchConfig};
use crate::error::{Result, ScanError};
use crate::fetcher::Fetcher;
use crate::filter::FilterConfig;
use crate::result::{Link, PageRecord};
use crate::scope::SiteScope;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use url::Url;

/// Title given to the seed page, which no other page links to yet.
pub const DEFAULT_SEED_TITLE: &str = "Home";

/// Called with (running count, url) each time a page is recorded.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// Accumulated records and the path keys already claimed.
///
/// A key is claimed before its page is fetched and never released, so every
/// path is fetched at most once. The record itself is appended once the
/// fetch shows the page is worth listing, before any of its links are
/// explored.
#[derive(Debug, Default)]
pub struct CrawlContext {
    records: Vec<PageRecord>,
    visited: HashSet<String>,
}

impl CrawlContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visited(&self, path_key: &str) -> bool {
        self.visited.contains(path_key)
    }

    /// Claim `path_key`. Returns false if it was already claimed.
    pub fn claim(&mut self, path_key: String) -> bool {
        self.visited.insert(path_key)
    }

    pub fn record(&mut self, record: PageRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn records(&self) -> &[PageRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<PageRecord> {
        self.records
    }
}

/// Client and traversal state for one crawl; dropped when the crawl ends.
struct CrawlSession {
    fetcher: Fetcher,
    context: CrawlContext,
}

/// Depth-first traversal engine.
///
/// Links are explored in the order they appear on each page, using an
/// explicit stack so deep sites cannot exhaust the call stack.
pub struct Crawler {
    fetch_config: FetchConfig,
    limits: CrawlLimits,
    filters: FilterConfig,
    seed_title: String,
    progress_callback: Option<ProgressCallback>,
    stop_flag: Option<Arc<AtomicBool>>,
}

impl Crawler {
    pub fn new() -> Self {
        Self {
            fetch_config: FetchConfig::default(),
            limits: CrawlLimits::default(),
            filters: FilterConfig::default(),
            seed_title: DEFAULT_SEED_TITLE.to_string(),
            progress_callback: None,
            stop_flag: None,
        }
    }

    pub fn with_fetch_config(mut self, config: FetchConfig) -> Self {
        self.fetch_config = config;
        self
    }

    pub fn with_limits(mut self, limits: CrawlLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.limits.max_depth = depth;
        self
    }

    pub fn with_max_pages(mut self, pages: usize) -> Self {
        self.limits.max_pages = pages;
        self
    }

    /// Only the exclude patterns take effect during traversal; they are
    /// matched against path keys.
    pub fn with_filters(mut self, filters: FilterConfig) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_seed_title(mut self, title: impl Into<String>) -> Self {
        self.seed_title = title.into();
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Once the flag is raised the crawl stops and returns what it has.
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_flag = Some(flag);
        self
    }

    pub fn limits(&self) -> CrawlLimits {
        self.limits
    }

    /// Crawl from `seed_url`, confined to `base_url`, and return every
    /// recorded page in discovery order.
    ///
    /// Only top-level problems (an unusable base or seed URL, a client that
    /// cannot be built) are errors; failures on individual pages are logged
    /// and skipped.
    pub async fn build_sitemap(&self, seed_url: &str, base_url: &str) -> Result<Vec<PageRecord>> {
        info!("Starting crawl of {} (base {})", seed_url, base_url);

        let scope = SiteScope::parse(base_url)?;
        let raw_seed = seed_url.trim();
        let parsed_seed = Url::parse(raw_seed)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", raw_seed, e)))?;
        // The scope prefix is normalized by `Url`; a seed spelled differently,
        // such as with an uppercase host, is compared in normalized form
        let seed_url = if scope.contains(raw_seed) {
            raw_seed.to_string()
        } else {
            parsed_seed.to_string()
        };
        if !scope.contains(&seed_url) {
            return Err(ScanError::InvalidUrl(format!(
                "seed {} is outside of {}",
                seed_url,
                scope.prefix()
            )));
        }

        let mut session = CrawlSession {
            fetcher: self.fetcher_for(scope)?,
            context: CrawlContext::new(),
        };

        self.traverse(&mut session, Link::new(seed_url, self.seed_title.as_str()))
            .await;

        info!("Crawl complete. Recorded {} pages", session.context.len());
        Ok(session.context.into_records())
    }

    async fn traverse(&self, session: &mut CrawlSession, seed: Link) {
        let mut stack: Vec<(Link, usize)> = vec![(seed, 0)];

        while let Some((link, depth)) = stack.pop() {
            if self.is_stopped() {
                warn!(
                    "Crawl interrupted with {} pages recorded",
                    session.context.len()
                );
                break;
            }

            let Some(path_key) = session.fetcher.scope().path_key(&link.url) else {
                debug!("Dropping off-site link {}", link.url);
                continue;
            };
            if session.context.is_visited(&path_key) {
                continue;
            }
            if self.filters.is_excluded(&path_key) {
                debug!("Excluded {}", link.url);
                continue;
            }
            if session.context.len() >= self.limits.max_pages {
                warn!(
                    "Page limit of {} reached, stopping crawl",
                    self.limits.max_pages
                );
                break;
            }

            let url = link.url.clone();
            session.context.claim(path_key);

            let outcome = session.fetcher.fetch_page(&url).await;
            if outcome.is_skipped() {
                debug!("Skipped {}", url);
                continue;
            }

            session.context.record(PageRecord::from(link));
            debug!("[depth {}] Recorded {}", depth, url);
            if let Some(ref callback) = self.progress_callback {
                callback(session.context.len(), url.clone());
            }

            // Children past the depth limit are never pushed
            if depth < self.limits.max_depth {
                let links = outcome.into_links(&url);
                stack.extend(links.into_iter().rev().map(|child| (child, depth + 1)));
            }
        }
    }

    fn fetcher_for(&self, scope: SiteScope) -> Result<Fetcher> {
        let fetcher = Fetcher::new(scope, self.fetch_config.clone())?;
        Ok(match self.stop_flag {
            Some(ref flag) => fetcher.with_stop_flag(flag.clone()),
            None => fetcher,
        })
    }

    fn is_stopped(&self) -> bool {
        self.stop_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

impl Default for Crawler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn fast_config() -> FetchConfig {
        FetchConfig::default()
            .with_timeout(Duration::from_millis(500))
            .with_attempts(2)
            .with_retry_delay(Duration::from_millis(10))
    }

    fn crawler() -> Crawler {
        Crawler::new().with_fetch_config(fast_config())
    }

    async fn mount_page(server: &MockServer, page: &str, title: &str, links: &[&str]) {
        let mut body = format!("<html><head><title>{}</title></head><body>", title);
        for link in links {
            body.push_str(&format!(r#"<a href="{}">{}</a>"#, link, link));
        }
        body.push_str("</body></html>");

        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string(body),
            )
            .mount(server)
            .await;
    }

    fn paths(server: &MockServer, records: &[PageRecord]) -> Vec<String> {
        let scope = SiteScope::parse(&server.uri()).unwrap();
        records
            .iter()
            .map(|r| scope.path_key(&r.url).unwrap())
            .collect()
    }

    #[test]
    fn test_context_claims_key_once() {
        let mut context = CrawlContext::new();
        assert!(context.claim("/".into()));
        assert!(!context.claim("/".into()));
        assert!(context.is_visited("/"));
        assert!(context.is_empty());

        context.record(PageRecord::new("u".into(), "t".into()));
        assert_eq!(context.len(), 1);
        assert_eq!(context.visited_count(), 1);
        assert_eq!(context.records()[0].url, "u");
    }

    #[tokio::test]
    async fn test_three_page_site() {
        let mock_server = MockServer::start().await;
        mount_page(&mock_server, "/", "Root", &["/a", "/b"]).await;
        mount_page(&mock_server, "/a", "A", &["/"]).await;
        mount_page(&mock_server, "/b", "B", &[]).await;

        let base = mock_server.uri();
        let records = crawler().build_sitemap(&base, &base).await.unwrap();

        assert_eq!(paths(&mock_server, &records), vec!["/", "/a", "/b"]);
    }

    #[tokio::test]
    async fn test_records_carry_title_of_linking_page() {
        let mock_server = MockServer::start().await;
        mount_page(&mock_server, "/", "Root", &["/a"]).await;
        mount_page(&mock_server, "/a", "A", &[]).await;

        let base = mock_server.uri();
        let records = crawler()
            .with_seed_title("Start")
            .build_sitemap(&base, &base)
            .await
            .unwrap();

        assert_eq!(records[0], PageRecord::new(base.clone(), "Start".into()));
        assert_eq!(
            records[1],
            PageRecord::new(format!("{}/a", base), "Root".into())
        );
    }

    #[tokio::test]
    async fn test_cycle_terminates_and_fetches_each_page_once() {
        let mock_server = MockServer::start().await;
        for (page, next) in [("/", "/x"), ("/x", "/y"), ("/y", "/")] {
            let body = format!(
                r#"<title>{p}</title><a href="{n}">n</a><a href="{p}">self</a>"#,
                p = page,
                n = next
            );
            Mock::given(method("GET"))
                .and(path(page))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("content-type", "text/html")
                        .set_body_string(body),
                )
                .expect(1)
                .mount(&mock_server)
                .await;
        }

        let base = mock_server.uri();
        let records = crawler().build_sitemap(&base, &base).await.unwrap();
        assert_eq!(paths(&mock_server, &records), vec!["/", "/x", "/y"]);
    }

    #[tokio::test]
    async fn test_depth_first_document_order() {
        let mock_server = MockServer::start().await;
        mount_page(&mock_server, "/", "Root", &["/a", "/b"]).await;
        mount_page(&mock_server, "/a", "A", &["/a1", "/b"]).await;
        mount_page(&mock_server, "/a1", "A1", &[]).await;
        mount_page(&mock_server, "/b", "B", &["/b1"]).await;
        mount_page(&mock_server, "/b1", "B1", &[]).await;

        let base = mock_server.uri();
        let records = crawler().build_sitemap(&base, &base).await.unwrap();
        assert_eq!(
            paths(&mock_server, &records),
            vec!["/", "/a", "/a1", "/b", "/b1"]
        );
    }

    #[tokio::test]
    async fn test_excluded_path_is_neither_recorded_nor_followed() {
        let mock_server = MockServer::start().await;
        mount_page(&mock_server, "/", "Root", &["/fr/", "/de/"]).await;
        mount_page(&mock_server, "/de/", "DE", &[]).await;
        Mock::given(method("GET"))
            .and(path("/fr/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let base = mock_server.uri();
        let records = crawler()
            .with_filters(FilterConfig::new(vec!["/fr/".into()], vec![]))
            .build_sitemap(&base, &base)
            .await
            .unwrap();

        assert_eq!(paths(&mock_server, &records), vec!["/", "/de/"]);
    }

    #[tokio::test]
    async fn test_off_site_links_are_dropped() {
        let mock_server = MockServer::start().await;
        mount_page(
            &mock_server,
            "/",
            "Root",
            &["https://elsewhere.example/", "/local"],
        )
        .await;
        mount_page(&mock_server, "/local", "Local", &[]).await;

        let base = mock_server.uri();
        let records = crawler().build_sitemap(&base, &base).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.url.starts_with(&base)));
    }

    #[tokio::test]
    async fn test_failed_pages_are_skipped() {
        let mock_server = MockServer::start().await;
        mount_page(&mock_server, "/", "Root", &["/gone", "/logo.png", "/ok", "/gone"]).await;
        mount_page(&mock_server, "/ok", "OK", &[]).await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/logo.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![0u8; 4]),
            )
            .mount(&mock_server)
            .await;

        let base = mock_server.uri();
        let records = crawler().build_sitemap(&base, &base).await.unwrap();
        assert_eq!(paths(&mock_server, &records), vec!["/", "/ok"]);
    }

    #[tokio::test]
    async fn test_pdf_is_terminal() {
        let mock_server = MockServer::start().await;
        mount_page(&mock_server, "/", "Root", &["/doc.pdf"]).await;
        Mock::given(method("GET"))
            .and(path("/doc.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(b"%PDF".to_vec()),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let base = mock_server.uri();
        let records = crawler().build_sitemap(&base, &base).await.unwrap();
        assert_eq!(paths(&mock_server, &records), vec!["/", "/doc.pdf"]);
        assert_eq!(records[1].title, "Root");
    }

    #[tokio::test]
    async fn test_max_depth_bounds_traversal() {
        let mock_server = MockServer::start().await;
        mount_page(&mock_server, "/", "Root", &["/1"]).await;
        mount_page(&mock_server, "/1", "1", &["/2"]).await;
        Mock::given(method("GET"))
            .and(path("/2"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let base = mock_server.uri();
        let records = crawler()
            .with_max_depth(1)
            .build_sitemap(&base, &base)
            .await
            .unwrap();
        assert_eq!(paths(&mock_server, &records), vec!["/", "/1"]);
    }

    #[tokio::test]
    async fn test_zero_depth_records_only_seed() {
        let mock_server = MockServer::start().await;
        mount_page(&mock_server, "/", "Root", &["/a"]).await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let base = mock_server.uri();
        let records = crawler()
            .with_max_depth(0)
            .build_sitemap(&base, &base)
            .await
            .unwrap();
        assert_eq!(paths(&mock_server, &records), vec!["/"]);
    }

    #[tokio::test]
    async fn test_max_pages_bounds_traversal() {
        let mock_server = MockServer::start().await;
        mount_page(&mock_server, "/", "Root", &["/a", "/b", "/c"]).await;
        for page in ["/a", "/b", "/c"] {
            mount_page(&mock_server, page, page, &[]).await;
        }

        let base = mock_server.uri();
        let records = crawler()
            .with_max_pages(2)
            .build_sitemap(&base, &base)
            .await
            .unwrap();
        assert_eq!(paths(&mock_server, &records), vec!["/", "/a"]);
    }

    #[tokio::test]
    async fn test_stop_flag_keeps_recorded_pages() {
        let mock_server = MockServer::start().await;
        mount_page(&mock_server, "/", "Root", &["/a", "/b"]).await;
        mount_page(&mock_server, "/a", "A", &[]).await;
        mount_page(&mock_server, "/b", "B", &[]).await;

        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = stop.clone();
        let base = mock_server.uri();
        let records = crawler()
            .with_stop_flag(stop.clone())
            .with_progress_callback(Arc::new(move |count, _url| {
                if count == 2 {
                    stop_clone.store(true, Ordering::Relaxed);
                }
            }))
            .build_sitemap(&base, &base)
            .await
            .unwrap();

        assert_eq!(paths(&mock_server, &records), vec!["/", "/a"]);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let mock_server = MockServer::start().await;
        mount_page(&mock_server, "/", "Root", &["/a", "/b", "/a"]).await;
        mount_page(&mock_server, "/a", "A", &["/b", "/"]).await;
        mount_page(&mock_server, "/b", "B", &["/a"]).await;

        let base = mock_server.uri();
        let first = crawler().build_sitemap(&base, &base).await.unwrap();
        let second = crawler().build_sitemap(&base, &base).await.unwrap();
        assert_eq!(first, second);

        let keys = paths(&mock_server, &first);
        let unique: HashSet<&String> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
    }

    #[tokio::test]
    async fn test_page_out_of_retries_leaves_siblings_recorded() {
        let mock_server = MockServer::start().await;
        mount_page(&mock_server, "/", "Root", &["/a", "/slow", "/b"]).await;
        mount_page(&mock_server, "/a", "A", &[]).await;
        mount_page(&mock_server, "/b", "B", &[]).await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .expect(2)
            .mount(&mock_server)
            .await;

        let base = mock_server.uri();
        let records = crawler().build_sitemap(&base, &base).await.unwrap();
        assert_eq!(paths(&mock_server, &records), vec!["/", "/a", "/b"]);
    }

    #[tokio::test]
    async fn test_stop_flag_interrupts_pending_fetch() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&mock_server)
            .await;

        let config = FetchConfig::default()
            .with_timeout(Duration::from_millis(400))
            .with_attempts(5)
            .with_retry_delay(Duration::from_millis(400));
        let stop = Arc::new(AtomicBool::new(false));
        let raise = stop.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            raise.store(true, Ordering::Relaxed);
        });

        let base = mock_server.uri();
        let started = std::time::Instant::now();
        let records = Crawler::new()
            .with_fetch_config(config)
            .with_stop_flag(stop)
            .build_sitemap(&base, &base)
            .await
            .unwrap();

        assert!(records.is_empty());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_base_with_uppercase_host_crawls_itself() {
        let mock_server = MockServer::start().await;
        mount_page(&mock_server, "/", "Root", &["/a"]).await;
        mount_page(&mock_server, "/a", "A", &[]).await;

        let base = format!("http://LOCALHOST:{}", mock_server.address().port());
        let records = crawler().build_sitemap(&base, &base).await.unwrap();

        let urls: Vec<&str> = records.iter().map(|r| r.url.as_str()).collect();
        let normalized = format!("http://localhost:{}", mock_server.address().port());
        assert_eq!(
            urls,
            vec![format!("{}/", normalized), format!("{}/a", normalized)]
        );
    }

    #[tokio::test]
    async fn test_invalid_base_is_an_error() {
        let result = crawler()
            .build_sitemap("https://example.com", "not a url")
            .await;
        assert!(matches!(result, Err(ScanError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_seed_outside_base_is_an_error() {
        let result = crawler()
            .build_sitemap("https://other.com/", "https://example.com")
            .await;
        assert!(matches!(result, Err(ScanError::InvalidUrl(_))));
    }
}
