//! Crawl boundaries: which discovered URLs are worth visiting, and the
//! canonical form used to deduplicate them.

use url::Url;

use crate::error::CrawlError;

/// Path suffixes that point at files rather than pages.
pub const BLOCKED_EXTENSIONS: &[&str] = &[
    ".pdf", ".zip", ".jpg", ".png", ".gif", ".xml", ".rss", ".gz",
];

/// The (host, path prefix) pair a crawl is confined to.
///
/// Derived once from the start URL and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub hostname: String,
    /// Explicit port of the start URL, `None` for the scheme default.
    pub port: Option<u16>,
    /// Always ends in `/`.
    pub path_prefix: String,
}

impl Scope {
    /// Derive the scope from the crawl's start URL.
    ///
    /// The prefix is the start path's directory when the last segment looks
    /// like a file (`/docs/index.html` gives `/docs/`), otherwise the path
    /// itself with a trailing slash (`/docs/intro` gives `/docs/intro/`).
    pub fn from_start_url(start_url: &str) -> Result<Self, CrawlError> {
        let url = Url::parse(start_url).map_err(|e| CrawlError::InvalidUrl {
            url: start_url.to_string(),
            message: e.to_string(),
        })?;
        let hostname = url
            .host_str()
            .ok_or_else(|| CrawlError::InvalidUrl {
                url: start_url.to_string(),
                message: "URL has no host".to_string(),
            })?
            .to_string();

        Ok(Self {
            hostname,
            port: url.port(),
            path_prefix: path_prefix(url.path()),
        })
    }

    /// Decide whether a discovered absolute URL belongs to this crawl.
    ///
    /// Malformed input is simply out of scope.
    pub fn contains(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        self.contains_url(&parsed)
    }

    pub fn contains_url(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        // Exact match: subdomains are a different site.
        if url.host_str() != Some(self.hostname.as_str()) || url.port() != self.port {
            return false;
        }
        let path = url.path();
        if !path.starts_with(&self.path_prefix) {
            return false;
        }
        let lower = path.to_ascii_lowercase();
        !BLOCKED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
    }
}

/// Free-function form of [`Scope::contains`].
pub fn is_in_scope(url: &str, scope: &Scope) -> bool {
    scope.contains(url)
}

/// Strip query string and fragment. The result is both the navigation
/// target and the deduplication key.
///
/// Only query and fragment are touched: `/docs` and `/docs/` stay distinct.
pub fn canonicalize(url: &str) -> Result<String, CrawlError> {
    let parsed = Url::parse(url).map_err(|e| CrawlError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    Ok(canonicalize_url(parsed).into())
}

pub fn canonicalize_url(mut url: Url) -> Url {
    url.set_query(None);
    url.set_fragment(None);
    url
}

/// Resolve a raw `href` against the page it was found on.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok()
}

fn path_prefix(path: &str) -> String {
    let (dir, last) = match path.rfind('/') {
        Some(i) => (&path[..=i], &path[i + 1..]),
        None => ("/", path),
    };

    if has_file_extension(last) {
        dir.to_string()
    } else if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

fn has_file_extension(segment: &str) -> bool {
    match segment.rfind('.') {
        Some(i) => i > 0 && i + 1 < segment.len(),
        None => false,
    }
}
