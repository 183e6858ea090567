use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::CrawlError;
use crate::models::{ExportFormat, PdfOptions, SessionProfile, WaitPolicy};

/// Immutable input for one crawl.
///
/// Built with [`CrawlConfig::new`] and the `with_*` methods; defaults match
/// the interactive tool this crawler grew out of (depth 1, 2 s delay, merge
/// on, originals deleted after merge).
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub start_url: String,
    pub max_depth: u32,
    /// Politeness delay applied after every processed page.
    pub delay: Duration,
    pub format: ExportFormat,
    pub merge: bool,
    pub delete_originals_after_merge: bool,
    pub output_dir: PathBuf,
    pub merged_path: PathBuf,

    pub navigation_timeout: Duration,
    pub wait_policy: WaitPolicy,
    /// Bound on the best-effort consent click. Expiry means "no banner".
    pub consent_timeout: Duration,
    /// Pause after a consent click so the banner can go away.
    pub consent_settle: Duration,
    /// Visible names of consent buttons, matched case-insensitively.
    pub consent_names: Vec<String>,
    pub pdf: PdfOptions,
    pub session: SessionProfile,
}

impl CrawlConfig {
    pub fn new(start_url: impl Into<String>, format: ExportFormat) -> Self {
        Self {
            start_url: start_url.into(),
            max_depth: 1,
            delay: Duration::from_secs(2),
            format,
            merge: true,
            delete_originals_after_merge: true,
            output_dir: format.default_output_dir(),
            merged_path: format.default_merged_path(),
            navigation_timeout: Duration::from_secs(60),
            wait_policy: WaitPolicy::NetworkIdle,
            consent_timeout: Duration::from_secs(3),
            consent_settle: Duration::from_secs(1),
            consent_names: vec!["Accept All Cookies".to_string(), "Accept".to_string()],
            pdf: PdfOptions::default(),
            session: SessionProfile::default(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_merge(mut self, merge: bool) -> Self {
        self.merge = merge;
        self
    }

    pub fn with_delete_originals(mut self, delete: bool) -> Self {
        self.delete_originals_after_merge = delete;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_merged_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.merged_path = path.into();
        self
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn with_wait_policy(mut self, wait_policy: WaitPolicy) -> Self {
        self.wait_policy = wait_policy;
        self
    }

    pub fn with_consent_timeout(mut self, timeout: Duration) -> Self {
        self.consent_timeout = timeout;
        self
    }

    pub fn with_consent_settle(mut self, pause: Duration) -> Self {
        self.consent_settle = pause;
        self
    }

    pub fn with_session(mut self, session: SessionProfile) -> Self {
        self.session = session;
        self
    }

    /// Check the configuration before any browser work starts.
    pub fn validate(&self) -> Result<(), CrawlError> {
        let url = Url::parse(&self.start_url).map_err(|e| {
            CrawlError::Config(format!("Invalid start URL '{}': {e}", self.start_url))
        })?;

        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(CrawlError::Config(format!(
                    "Start URL scheme '{scheme}' is not supported (only http/https)"
                )));
            }
        }

        if url.host_str().is_none() {
            return Err(CrawlError::Config(format!(
                "Start URL '{}' has no host",
                self.start_url
            )));
        }

        if self.consent_timeout >= self.navigation_timeout {
            return Err(CrawlError::Config(format!(
                "Consent timeout ({}s) must be shorter than the navigation timeout ({}s)",
                self.consent_timeout.as_secs(),
                self.navigation_timeout.as_secs()
            )));
        }

        Ok(())
    }
}
