//! URL resolution and the rules deciding which links a crawl follows.

use crate::error::{Result, ScanError};
use std::fmt;
use url::Url;

/// Keywords that mark account/auth pages. Matched case-insensitively.
pub const DEFAULT_EXCLUDED_KEYWORDS: [&str; 5] =
    ["login", "signup", "register", "account", "password"];

pub fn default_excluded_keywords() -> Vec<String> {
    DEFAULT_EXCLUDED_KEYWORDS
        .iter()
        .map(|k| k.to_string())
        .collect()
}

/// A validated starting point for one crawl run.
///
/// `as_str` is the URL exactly as supplied (it becomes the `Base URL` of every
/// edge); `url` is the parsed form used for scoping and identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedUrl {
    raw: String,
    url: Url,
}

impl SeedUrl {
    pub fn parse(input: &str) -> Result<Self> {
        let raw = input.trim();
        let mut url =
            Url::parse(raw).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", raw, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ScanError::InvalidUrl(format!(
                "{}: unsupported scheme '{}'",
                raw,
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(ScanError::InvalidUrl(format!("{}: missing host", raw)));
        }
        // Links are compared fragment-free, so the prefix must be too.
        url.set_fragment(None);

        Ok(Self {
            raw: raw.to_string(),
            url,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Host every discovered URL must share with the seed.
    pub fn root_domain(&self) -> &str {
        root_domain(&self.url)
    }

    /// Normalized seed string; depth-1 URLs must extend it.
    pub fn prefix(&self) -> &str {
        self.url.as_str()
    }
}

impl fmt::Display for SeedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

pub fn root_domain(url: &Url) -> &str {
    url.host_str().unwrap_or_default()
}

/// Resolve `href` against `base` the way a browser would, dropping the
/// fragment so in-page anchors collapse onto their page.
pub fn resolve(base: &Url, href: &str) -> Option<Url> {
    let mut resolved = base.join(href).ok()?;
    resolved.set_fragment(None);
    Some(resolved)
}

/// Same host, literal string prefix, and not the prefix itself.
///
/// The prefix test is a plain string comparison, so `/foo` also admits
/// `/foobar`.
pub fn is_in_scope(url: &Url, root_domain: &str, prefix: &str) -> bool {
    let same_host = url
        .host_str()
        .is_some_and(|host| host.eq_ignore_ascii_case(root_domain));

    same_host && url.as_str().starts_with(prefix) && url.as_str() != prefix
}

pub fn is_excluded(url: &str, keywords: &[String]) -> bool {
    let lowered = url.to_lowercase();
    keywords
        .iter()
        .any(|keyword| lowered.contains(&keyword.to_lowercase()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkVerdict {
    Admitted,
    OutOfScope,
    Excluded,
}

/// Scope and exclusion rules for a single seed's run.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    root_domain: String,
    keywords: Vec<String>,
}

impl LinkFilter {
    pub fn new(root_domain: &str, keywords: &[String]) -> Self {
        Self {
            root_domain: root_domain.to_string(),
            keywords: keywords.to_vec(),
        }
    }

    pub fn for_seed(seed: &SeedUrl, keywords: &[String]) -> Self {
        Self::new(seed.root_domain(), keywords)
    }

    pub fn root_domain(&self) -> &str {
        &self.root_domain
    }

    pub fn classify(&self, url: &Url, prefix: &str) -> LinkVerdict {
        if !is_in_scope(url, &self.root_domain, prefix) {
            LinkVerdict::OutOfScope
        } else if is_excluded(url.as_str(), &self.keywords) {
            LinkVerdict::Excluded
        } else {
            LinkVerdict::Admitted
        }
    }
}
