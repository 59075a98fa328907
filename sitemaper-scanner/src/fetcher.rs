use crate::config::FetchConfig;
use crate::error::{Result, ScanError};
use crate::result::{Link, NO_TITLE, PDF_TITLE};
use crate::scope::SiteScope;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// How often a pending request or retry pause checks the stop flag.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How a response body is treated, decided from its `Content-Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Pdf,
    Unsupported,
}

impl ContentKind {
    pub fn from_content_type(content_type: &str) -> Self {
        let content_type = content_type.to_ascii_lowercase();
        if content_type.contains("text/html") {
            ContentKind::Html
        } else if content_type.contains("application/pdf") {
            ContentKind::Pdf
        } else {
            ContentKind::Unsupported
        }
    }
}

/// What a single page turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// An HTML page: its title and every link found on it
    Page { title: String, links: Vec<Link> },
    /// A PDF document; recorded but never parsed
    Document,
    /// Off-site, non-200, unsupported content or failed for good
    Skipped,
}

impl FetchOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, FetchOutcome::Skipped)
    }

    /// Flatten into the `(link, title)` pairs the traversal descends into.
    /// A PDF becomes a single pair pointing back at itself.
    pub fn into_links(self, url: &str) -> Vec<Link> {
        match self {
            FetchOutcome::Page { links, .. } => links,
            FetchOutcome::Document => vec![Link::new(url, PDF_TITLE)],
            FetchOutcome::Skipped => Vec::new(),
        }
    }
}

/// Issues GET requests for pages of one site and turns them into links.
///
/// A fetch never fails from the caller's point of view: every definitive
/// failure is logged and yields [`FetchOutcome::Skipped`], so one bad page
/// cannot abort a crawl.
pub struct Fetcher {
    client: Client,
    scope: SiteScope,
    config: FetchConfig,
    stop_flag: Option<Arc<AtomicBool>>,
}

impl Fetcher {
    pub fn new(scope: SiteScope, config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            client,
            scope,
            config,
            stop_flag: None,
        })
    }

    /// Abandon a pending request or retry pause as soon as `flag` is raised.
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_flag = Some(flag);
        self
    }

    pub fn scope(&self) -> &SiteScope {
        &self.scope
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch `url` and return the links found on it, each paired with the
    /// page's own title.
    pub async fn fetch(&self, url: &str) -> Vec<Link> {
        self.fetch_page(url).await.into_links(url)
    }

    /// Fetch `url`, retrying transport failures with a fixed delay.
    pub async fn fetch_page(&self, url: &str) -> FetchOutcome {
        if !self.scope.contains(url) {
            debug!("Not fetching off-site URL {}", url);
            return FetchOutcome::Skipped;
        }

        let attempts = self.config.attempts.max(1);
        for attempt in 1..=attempts {
            let result = tokio::select! {
                result = self.fetch_once(url) => result,
                _ = self.stop_requested() => {
                    debug!("Stop requested, abandoning {}", url);
                    return FetchOutcome::Skipped;
                }
            };

            match result {
                Ok(outcome) => return outcome,
                Err(e) if e.is_transient() => {
                    if attempt < attempts {
                        warn!(
                            "Request error for {} (attempt {}/{}): {}. Retrying in {:?}",
                            url, attempt, attempts, e, self.config.retry_delay
                        );
                        tokio::select! {
                            _ = tokio::time::sleep(self.config.retry_delay) => {}
                            _ = self.stop_requested() => return FetchOutcome::Skipped,
                        }
                    } else {
                        warn!("Giving up on {} after {} attempts: {}", url, attempts, e);
                    }
                }
                Err(e) => {
                    warn!("Unexpected error while processing {}: {}", url, e);
                    return FetchOutcome::Skipped;
                }
            }
        }

        FetchOutcome::Skipped
    }

    /// Resolves once the stop flag is raised; never without one.
    async fn stop_requested(&self) {
        match self.stop_flag {
            Some(ref flag) => {
                while !flag.load(Ordering::Relaxed) {
                    tokio::time::sleep(STOP_POLL_INTERVAL).await;
                }
            }
            None => std::future::pending::<()>().await,
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<FetchOutcome> {
        debug!("Fetching {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!("Skipping {} (HTTP {})", url, status.as_u16());
            return Ok(FetchOutcome::Skipped);
        }

        let content_type = match response.headers().get(CONTENT_TYPE) {
            Some(value) => value
                .to_str()
                .map_err(|e| ScanError::ParseError(format!("unreadable content-type: {}", e)))?
                .to_string(),
            None => {
                debug!("Skipping {} (no content-type)", url);
                return Ok(FetchOutcome::Skipped);
            }
        };

        match ContentKind::from_content_type(&content_type) {
            ContentKind::Html => {
                let body = response.text().await?;
                let document = Html::parse_document(&body);
                let title = extract_title(&document)?;
                let links = extract_document_links(&document, &title, &self.scope)?;
                Ok(FetchOutcome::Page { title, links })
            }
            ContentKind::Pdf => Ok(FetchOutcome::Document),
            ContentKind::Unsupported => {
                debug!("Skipping {} (content-type {})", url, content_type);
                Ok(FetchOutcome::Skipped)
            }
        }
    }
}

/// Title of an HTML document, or `"No Title"` when it has none.
pub fn extract_title(document: &Html) -> Result<String> {
    let selector = Selector::parse("title").map_err(|e| ScanError::ParseError(e.to_string()))?;

    let title = document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| NO_TITLE.to_string());

    Ok(title)
}

/// Every `<a href>` of `html` resolved against the base URL, in document
/// order, each paired with the document's title.
pub fn extract_links(html: &str, scope: &SiteScope) -> Result<Vec<Link>> {
    let document = Html::parse_document(html);
    let title = extract_title(&document)?;
    extract_document_links(&document, &title, scope)
}

fn extract_document_links(document: &Html, title: &str, scope: &SiteScope) -> Result<Vec<Link>> {
    let link_selector =
        Selector::parse("a[href]").map_err(|e| ScanError::ParseError(e.to_string()))?;

    let mut links = Vec::new();
    for element in document.select(&link_selector) {
        if let Some(href) = element.value().attr("href")
            && let Some(absolute_url) = scope.resolve(href)
        {
            debug!("Found link: {}", absolute_url);
            links.push(Link::new(absolute_url, title));
        }
    }

    Ok(links)
}
