//! Test utilities: mock implementations of the collaborator traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::CrawlError;
use crate::models::{PdfOptions, Role, SessionProfile, WaitPolicy};
use crate::reporter::{CrawlEvent, CrawlReporter};
use crate::traits::{DocumentMerger, PageRenderer};

// ---------------------------------------------------------------------------
// MockRenderer
// ---------------------------------------------------------------------------

/// One page of the in-memory site served by [`MockRenderer`].
#[derive(Debug, Clone, Default)]
pub struct MockPage {
    pub title: String,
    pub links: Vec<String>,
    pub text: String,
    pub consent_button: bool,
    pub consent_click_hangs: bool,
    /// Lookups that miss before the consent button shows up.
    pub consent_delay_lookups: usize,
    pub links_fail: bool,
}

impl MockPage {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            text: format!("Text of {title}"),
            ..Self::default()
        }
    }

    pub fn with_links(mut self, links: &[&str]) -> Self {
        self.links = links.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_consent_button(mut self) -> Self {
        self.consent_button = true;
        self
    }

    /// Consent button that only appears after `lookups` missed lookups.
    pub fn with_late_consent_button(mut self, lookups: usize) -> Self {
        self.consent_button = true;
        self.consent_delay_lookups = lookups;
        self
    }

    /// Consent button exists but clicking it never completes.
    pub fn with_hanging_consent(mut self) -> Self {
        self.consent_button = true;
        self.consent_click_hangs = true;
        self
    }

    pub fn with_broken_links(mut self) -> Self {
        self.links_fail = true;
        self
    }
}

/// Mock renderer serving a fixed site map and recording every call.
#[derive(Clone, Default)]
pub struct MockRenderer {
    pages: Arc<Mutex<HashMap<String, MockPage>>>,
    timeouts: Arc<Mutex<HashSet<String>>>,
    redirects: Arc<Mutex<HashMap<String, String>>>,
    lost_sessions: Arc<Mutex<HashSet<String>>>,
    configure_error: Arc<Mutex<Option<String>>>,
    current: Arc<Mutex<Option<String>>>,
    consent_lookups: Arc<Mutex<usize>>,
    navigations: Arc<Mutex<Vec<String>>>,
    link_extractions: Arc<Mutex<Vec<String>>>,
    clicks: Arc<Mutex<Vec<String>>>,
    profiles: Arc<Mutex<Vec<SessionProfile>>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, page: MockPage) -> Self {
        self.pages.lock().unwrap().insert(url.to_string(), page);
        self
    }

    /// Navigating to `url` times out.
    pub fn with_timeout(self, url: &str) -> Self {
        self.timeouts.lock().unwrap().insert(url.to_string());
        self
    }

    /// Navigating to `from` ends up on `to`.
    pub fn with_redirect(self, from: &str, to: &str) -> Self {
        self.redirects
            .lock()
            .unwrap()
            .insert(from.to_string(), to.to_string());
        self
    }

    /// Navigating to `url` kills the browser session.
    pub fn with_lost_session(self, url: &str) -> Self {
        self.lost_sessions.lock().unwrap().insert(url.to_string());
        self
    }

    /// Applying the session profile fails.
    pub fn with_configure_error(self, message: &str) -> Self {
        *self.configure_error.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn link_extractions(&self) -> Vec<String> {
        self.link_extractions.lock().unwrap().clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.clicks.lock().unwrap().clone()
    }

    pub fn profiles(&self) -> Vec<SessionProfile> {
        self.profiles.lock().unwrap().clone()
    }

    fn current_page(&self) -> Result<(String, MockPage), CrawlError> {
        let current = self.current.lock().unwrap().clone();
        let url = current.ok_or_else(|| CrawlError::Render("no page loaded".into()))?;
        let page = self
            .pages
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .ok_or_else(|| CrawlError::Render(format!("page {url} vanished")))?;
        Ok((url, page))
    }
}

impl PageRenderer for MockRenderer {
    type Handle = String;

    async fn configure(&self, profile: &SessionProfile) -> Result<(), CrawlError> {
        self.profiles.lock().unwrap().push(profile.clone());
        if let Some(message) = self.configure_error.lock().unwrap().clone() {
            return Err(CrawlError::Browser(message));
        }
        Ok(())
    }

    async fn navigate(
        &self,
        url: &str,
        _wait: WaitPolicy,
        timeout: Duration,
    ) -> Result<(), CrawlError> {
        self.navigations.lock().unwrap().push(url.to_string());
        *self.current.lock().unwrap() = None;
        *self.consent_lookups.lock().unwrap() = 0;

        if self.lost_sessions.lock().unwrap().contains(url) {
            return Err(CrawlError::Browser("connection to the browser was closed".into()));
        }
        if self.timeouts.lock().unwrap().contains(url) {
            return Err(CrawlError::Timeout {
                operation: "navigation",
                secs: timeout.as_secs(),
            });
        }
        let landed = self
            .redirects
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string());
        if !self.pages.lock().unwrap().contains_key(&landed) {
            return Err(CrawlError::Navigation {
                url: url.to_string(),
                message: "net::ERR_HTTP_RESPONSE_CODE_FAILURE".into(),
            });
        }

        *self.current.lock().unwrap() = Some(landed);
        Ok(())
    }

    async fn find_clickable(
        &self,
        _role: Role,
        _names: &[String],
    ) -> Result<Option<String>, CrawlError> {
        let (url, page) = self.current_page()?;
        let mut lookups = self.consent_lookups.lock().unwrap();
        *lookups += 1;
        let visible = page.consent_button && *lookups > page.consent_delay_lookups;
        Ok(visible.then_some(url))
    }

    async fn click(&self, handle: String, timeout: Duration) -> Result<(), CrawlError> {
        let (_, page) = self.current_page()?;
        if page.consent_click_hangs {
            return Err(CrawlError::Timeout {
                operation: "consent click",
                secs: timeout.as_secs(),
            });
        }
        self.clicks.lock().unwrap().push(handle);
        Ok(())
    }

    async fn title(&self) -> Result<String, CrawlError> {
        Ok(self.current_page()?.1.title)
    }

    async fn current_url(&self) -> Result<String, CrawlError> {
        Ok(self.current_page()?.0)
    }

    async fn extract_links(&self, _selector: &str) -> Result<Vec<String>, CrawlError> {
        let (url, page) = self.current_page()?;
        self.link_extractions.lock().unwrap().push(url);
        if page.links_fail {
            return Err(CrawlError::LinkExtraction("execution context destroyed".into()));
        }
        Ok(page.links)
    }

    async fn export_document(&self, _options: &PdfOptions) -> Result<Vec<u8>, CrawlError> {
        let (url, _) = self.current_page()?;
        Ok(format!("%PDF-mock {url}").into_bytes())
    }

    async fn extract_visible_text(&self) -> Result<String, CrawlError> {
        Ok(self.current_page()?.1.text)
    }
}

// ---------------------------------------------------------------------------
// MockMerger
// ---------------------------------------------------------------------------

/// Mock merger that records appends and rejects paths marked corrupt.
#[derive(Clone, Default)]
pub struct MockMerger {
    corrupt: Arc<Mutex<HashSet<PathBuf>>>,
    appended: Arc<Mutex<Vec<PathBuf>>>,
    finalized: Arc<Mutex<Option<PathBuf>>>,
    finalize_error: Option<String>,
    cancel_on_finalize: Option<CancellationToken>,
}

impl MockMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_corrupt(self, path: &Path) -> Self {
        self.corrupt.lock().unwrap().insert(path.to_path_buf());
        self
    }

    pub fn with_finalize_error(mut self, message: &str) -> Self {
        self.finalize_error = Some(message.to_string());
        self
    }

    /// Fire `cancel` once the composite has been written.
    pub fn with_cancel_on_finalize(mut self, cancel: CancellationToken) -> Self {
        self.cancel_on_finalize = Some(cancel);
        self
    }

    pub fn appended(&self) -> Vec<PathBuf> {
        self.appended.lock().unwrap().clone()
    }

    pub fn finalized_to(&self) -> Option<PathBuf> {
        self.finalized.lock().unwrap().clone()
    }
}

impl DocumentMerger for MockMerger {
    fn append(&mut self, path: &Path) -> Result<(), CrawlError> {
        if self.corrupt.lock().unwrap().contains(path) {
            return Err(CrawlError::MergeAppend {
                path: path.to_path_buf(),
                message: "invalid file header".into(),
            });
        }
        self.appended.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    fn finalize(self, output: &Path) -> Result<(), CrawlError> {
        if let Some(message) = &self.finalize_error {
            return Err(CrawlError::Io(std::io::Error::other(message.clone())));
        }
        std::fs::write(output, b"%PDF-merged")?;
        *self.finalized.lock().unwrap() = Some(output.to_path_buf());
        if let Some(cancel) = &self.cancel_on_finalize {
            cancel.cancel();
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Reporter that keeps the events tests care about.
#[derive(Default)]
pub struct RecordingReporter {
    failed_pages: Mutex<Vec<String>>,
    link_failures: Mutex<Vec<String>>,
    consent_accepted: Mutex<Vec<String>>,
    skipped_items: Mutex<Vec<PathBuf>>,
    throttles: Mutex<usize>,
    interrupted: Mutex<bool>,
}

impl RecordingReporter {
    pub fn failed_pages(&self) -> Vec<String> {
        self.failed_pages.lock().unwrap().clone()
    }

    pub fn link_failures(&self) -> Vec<String> {
        self.link_failures.lock().unwrap().clone()
    }

    pub fn consent_accepted(&self) -> Vec<String> {
        self.consent_accepted.lock().unwrap().clone()
    }

    pub fn skipped_items(&self) -> Vec<PathBuf> {
        self.skipped_items.lock().unwrap().clone()
    }

    pub fn throttles(&self) -> usize {
        *self.throttles.lock().unwrap()
    }

    pub fn was_interrupted(&self) -> bool {
        *self.interrupted.lock().unwrap()
    }
}

impl CrawlReporter for RecordingReporter {
    fn report(&self, event: CrawlEvent<'_>) {
        match event {
            CrawlEvent::PageFailed { url, .. } => {
                self.failed_pages.lock().unwrap().push(url.to_string());
            }
            CrawlEvent::LinkExtractionFailed { url, .. } => {
                self.link_failures.lock().unwrap().push(url.to_string());
            }
            CrawlEvent::ConsentAccepted { url } => {
                self.consent_accepted.lock().unwrap().push(url.to_string());
            }
            CrawlEvent::MergeItemSkipped { path, .. } => {
                self.skipped_items.lock().unwrap().push(path.to_path_buf());
            }
            CrawlEvent::Throttling { .. } => {
                *self.throttles.lock().unwrap() += 1;
            }
            CrawlEvent::Interrupted { .. } => {
                *self.interrupted.lock().unwrap() = true;
            }
            _ => {}
        }
    }
}
