// Confinement of a crawl to one base URL and the path keys derived from it

use crate::error::{Result, ScanError};
use url::Url;

/// The base URL a crawl is confined to.
///
/// The base is normalized once through the `url` crate and stored without a
/// trailing slash, so `https://example.com` and `https://example.com/` scope
/// the same site.
#[derive(Debug, Clone)]
pub struct SiteScope {
    prefix: String,
    base: Url,
}

impl SiteScope {
    pub fn parse(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url.trim())
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(ScanError::InvalidUrl(format!(
                "{}: only http and https sites can be crawled",
                base_url
            )));
        }

        let prefix = base.as_str().trim_end_matches('/').to_string();
        Ok(Self { prefix, base })
    }

    /// The normalized base prefix, without trailing slash.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// The part of `url` after the base prefix, if `url` lies on the site.
    ///
    /// The prefix must end on a path boundary: `https://example.com.evil.net`
    /// does not start `https://example.com` as far as scope is concerned.
    fn remainder<'a>(&self, url: &'a str) -> Option<&'a str> {
        let rest = url.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() || rest.starts_with(['/', '?', '#']) {
            Some(rest)
        } else {
            None
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.remainder(url).is_some()
    }

    /// Visited-set key for `url`: the URL minus the base prefix, always
    /// starting with exactly one `/`.
    pub fn path_key(&self, url: &str) -> Option<String> {
        self.remainder(url)
            .map(|rest| format!("/{}", rest.trim_start_matches('/')))
    }

    /// Resolve an href found on any page of the site against the base URL.
    ///
    /// Fragments are dropped; hrefs that cannot name a page are skipped.
    pub fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
            || href.starts_with("data:")
        {
            return None;
        }

        let mut resolved = self.base.join(href).ok()?;
        resolved.set_fragment(None);
        Some(resolved.to_string())
    }
}
