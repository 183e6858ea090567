use std::future::Future;
use std::path::Path;
use std::time::Duration;

use crate::error::CrawlError;
use crate::models::{PdfOptions, Role, SessionProfile, WaitPolicy};

/// A single browser page reused for the whole crawl.
///
/// All methods act on the page most recently passed to [`navigate`](Self::navigate).
pub trait PageRenderer: Send + Sync {
    /// Element located by [`find_clickable`](Self::find_clickable).
    type Handle: Send;

    /// Apply the browser identity. Called once, before the first navigation.
    fn configure(
        &self,
        profile: &SessionProfile,
    ) -> impl Future<Output = Result<(), CrawlError>> + Send;

    /// Navigate to `url`, failing with [`CrawlError::Timeout`] past `timeout`.
    fn navigate(
        &self,
        url: &str,
        wait: WaitPolicy,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), CrawlError>> + Send;

    /// Find the first element with `role` whose visible name contains one of
    /// `names` (case-insensitive). `Ok(None)` means there is no such element.
    fn find_clickable(
        &self,
        role: Role,
        names: &[String],
    ) -> impl Future<Output = Result<Option<Self::Handle>, CrawlError>> + Send;

    fn click(
        &self,
        handle: Self::Handle,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), CrawlError>> + Send;

    fn title(&self) -> impl Future<Output = Result<String, CrawlError>> + Send;

    /// URL of the document currently loaded, after any redirects.
    fn current_url(&self) -> impl Future<Output = Result<String, CrawlError>> + Send;

    /// Raw `href` values of elements matching `selector`, possibly relative.
    fn extract_links(
        &self,
        selector: &str,
    ) -> impl Future<Output = Result<Vec<String>, CrawlError>> + Send;

    /// Print the page to PDF bytes.
    fn export_document(
        &self,
        options: &PdfOptions,
    ) -> impl Future<Output = Result<Vec<u8>, CrawlError>> + Send;

    fn extract_visible_text(&self) -> impl Future<Output = Result<String, CrawlError>> + Send;
}

/// Builds one composite document out of many.
pub trait DocumentMerger {
    /// Add every page of the document at `path`.
    fn append(&mut self, path: &Path) -> Result<(), CrawlError>;

    /// Write the composite to `output`.
    fn finalize(self, output: &Path) -> Result<(), CrawlError>
    where
        Self: Sized;
}
