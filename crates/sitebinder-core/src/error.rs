use std::path::PathBuf;

use thiserror::Error;

/// Crawl-wide error types for sitebinder.
#[derive(Error, Debug)]
pub enum CrawlError {
    /// A URL could not be parsed or resolved.
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// Navigating to a page failed.
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    /// A bounded browser operation did not finish in time.
    #[error("{operation} timed out after {secs} seconds")]
    Timeout { operation: &'static str, secs: u64 },

    /// Reading state from the rendered page failed.
    #[error("Render error: {0}")]
    Render(String),

    /// Collecting link targets from a page failed.
    #[error("Link extraction failed: {0}")]
    LinkExtraction(String),

    /// Exporting the page as a document or text failed.
    #[error("Export error: {0}")]
    Export(String),

    /// Plain filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// One artifact could not be appended to the composite document.
    #[error("Could not append {}: {message}", path.display())]
    MergeAppend { path: PathBuf, message: String },

    /// One artifact could not be read for the composite text.
    #[error("Could not read {}: {message}", path.display())]
    MergeRead { path: PathBuf, message: String },

    /// The composite output could not be written.
    #[error("Could not write composite output {}: {message}", path.display())]
    MergeFinalize { path: PathBuf, message: String },

    /// Browser process or session failure.
    #[error("Browser error: {0}")]
    Browser(String),

    /// Invalid crawl configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The user asked to stop before the operation completed.
    #[error("Interrupted before {0} completed")]
    Interrupted(&'static str),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CrawlError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CrawlError::Timeout { .. })
    }

    /// Returns true if this error only abandons the page (or artifact) it
    /// occurred on, and the crawl or merge may carry on.
    pub fn is_page_local(&self) -> bool {
        match self {
            CrawlError::InvalidUrl { .. }
            | CrawlError::Navigation { .. }
            | CrawlError::Timeout { .. }
            | CrawlError::Render(_)
            | CrawlError::LinkExtraction(_)
            | CrawlError::Export(_)
            | CrawlError::Io(_)
            | CrawlError::MergeAppend { .. }
            | CrawlError::MergeRead { .. } => true,
            CrawlError::MergeFinalize { .. }
            | CrawlError::Browser(_)
            | CrawlError::Config(_)
            | CrawlError::Interrupted(_)
            | CrawlError::Serialization(_) => false,
        }
    }
}
