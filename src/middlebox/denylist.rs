//! Keyword denylist
//!
//! File format: keywords separated by commas, surrounding whitespace ignored.

use std::path::Path;
use tracing::{info, warn};

/// Ordered keywords, matched case-insensitively as substrings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Denylist {
    keywords: Vec<String>,
    lowered: Vec<String>,
}

impl Denylist {
    /// Blank entries are dropped; order is kept.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|kw| kw.as_ref().trim().to_string())
            .filter(|kw| !kw.is_empty())
            .collect();
        let lowered = keywords.iter().map(|kw| kw.to_lowercase()).collect();

        Self { keywords, lowered }
    }

    pub fn parse(content: &str) -> Self {
        Self::new(content.trim().split(','))
    }

    /// Reads the denylist file.
    ///
    /// A missing or unreadable file yields an empty denylist, so nothing is
    /// blocked.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let denylist = Self::parse(&content);
                info!(
                    "Loaded {} keywords from {}: {:?}",
                    denylist.len(),
                    path.display(),
                    denylist.keywords
                );
                denylist
            }
            Err(e) => {
                warn!(
                    "Could not read denylist {}: {}. No packets will be blocked",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// First keyword, in list order, contained in `payload`.
    ///
    /// Invalid UTF-8 sequences are dropped before matching, so the bytes
    /// around them are joined.
    pub fn first_match(&self, payload: &[u8]) -> Option<&str> {
        if self.is_empty() {
            return None;
        }

        let text = payload
            .utf8_chunks()
            .map(|chunk| chunk.valid())
            .collect::<String>()
            .to_lowercase();
        self.lowered
            .iter()
            .position(|kw| text.contains(kw.as_str()))
            .map(|i| self.keywords[i].as_str())
    }
}
