// Substring filters shared by the traversal engine and the output pass

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub must_include: Vec<String>,
}

impl FilterConfig {
    pub fn new(exclude: Vec<String>, must_include: Vec<String>) -> Self {
        Self {
            exclude,
            must_include,
        }
    }

    /// True if any exclude pattern occurs in `candidate`.
    pub fn is_excluded(&self, candidate: &str) -> bool {
        self.exclude
            .iter()
            .any(|pattern| candidate.contains(pattern.as_str()))
    }

    /// True if every must-include pattern occurs in `candidate`.
    pub fn includes_all(&self, candidate: &str) -> bool {
        self.must_include
            .iter()
            .all(|pattern| candidate.contains(pattern.as_str()))
    }

    /// Full check used when assembling the sitemap.
    pub fn accepts(&self, candidate: &str) -> bool {
        !self.is_excluded(candidate) && self.includes_all(candidate)
    }
}
