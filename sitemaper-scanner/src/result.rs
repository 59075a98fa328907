use serde::{Deserialize, Serialize};

/// Title used when a page has no usable `<title>`.
pub const NO_TITLE: &str = "No Title";

/// Title attached to PDF documents, which are recorded but never parsed.
pub const PDF_TITLE: &str = "PDF-Datei";

/// A link found on a page, annotated with the title of the page it was
/// found on (not the title of the page it points to).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    pub title: String,
}

impl Link {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }
}

/// One retained entry of the sitemap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
}

impl PageRecord {
    pub fn new(url: String, title: String) -> Self {
        Self { url, title }
    }
}

impl From<Link> for PageRecord {
    fn from(link: Link) -> Self {
        Self::new(link.url, link.title)
    }
}
