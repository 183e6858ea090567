use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::CrawlError;

/// One pending unit of crawl work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub url: String,
    pub depth: u32,
}

impl CrawlTask {
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }

    /// Task for a link discovered on this task's page.
    pub fn child(&self, url: impl Into<String>) -> Self {
        Self::new(url, self.depth + 1)
    }
}

/// What each page is exported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Paginated PDF document.
    Document,
    /// Visible text with a Markdown heading.
    Text,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Document => "pdf",
            ExportFormat::Text => "md",
        }
    }

    pub fn default_output_dir(self) -> PathBuf {
        match self {
            ExportFormat::Document => PathBuf::from("output_pdfs"),
            ExportFormat::Text => PathBuf::from("output_texts"),
        }
    }

    pub fn default_merged_path(self) -> PathBuf {
        PathBuf::from(format!("merged_output.{}", self.extension()))
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Document => f.write_str("PDF"),
            ExportFormat::Text => f.write_str("Text"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = CrawlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" | "document" => Ok(ExportFormat::Document),
            "text" | "md" | "markdown" => Ok(ExportFormat::Text),
            other => Err(CrawlError::Config(format!(
                "Unknown export format '{other}' (expected 'pdf' or 'text')"
            ))),
        }
    }
}

/// When a navigation counts as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitPolicy {
    /// The `load` event fired.
    Load,
    /// The document is complete and the network has been quiet for a moment.
    #[default]
    NetworkIdle,
}

/// Accessibility role of an element the renderer is asked to locate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Button,
}

impl Role {
    /// CSS selector matching elements that carry this role.
    pub fn selector(self) -> &'static str {
        match self {
            Role::Button => "button, [role=\"button\"], input[type=\"button\"], input[type=\"submit\"]",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PageSize {
    #[default]
    A4,
    Letter,
}

impl PageSize {
    /// Paper (width, height) in inches.
    pub fn inches(self) -> (f64, f64) {
        match self {
            PageSize::A4 => (8.27, 11.69),
            PageSize::Letter => (8.5, 11.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfOptions {
    pub page_size: PageSize,
    pub print_background: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            print_background: true,
        }
    }
}

/// Browser identity applied once to the rendering session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionProfile {
    pub user_agent: String,
    pub headers: BTreeMap<String, String>,
    /// Script evaluated in every new document before page scripts run.
    pub init_script: String,
}

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36";

pub const HIDE_WEBDRIVER_SCRIPT: &str =
    "Object.defineProperty(navigator, 'webdriver', {get: () => undefined})";

impl Default for SessionProfile {
    fn default() -> Self {
        let headers = [
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
            ),
            ("Accept-Language", "en-US,en;q=0.9"),
            ("Accept-Encoding", "gzip, deflate, br"),
            (
                "Sec-Ch-Ua",
                "\"Chromium\";v=\"118\", \"Google Chrome\";v=\"118\", \"Not=A?Brand\";v=\"99\"",
            ),
            ("Sec-Ch-Ua-Mobile", "?0"),
            ("Sec-Ch-Ua-Platform", "\"Windows\""),
            ("Sec-Fetch-Dest", "document"),
            ("Sec-Fetch-Mode", "navigate"),
            ("Sec-Fetch-Site", "none"),
            ("Sec-Fetch-User", "?1"),
            ("Upgrade-Insecure-Requests", "1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers,
            init_script: HIDE_WEBDRIVER_SCRIPT.to_string(),
        }
    }
}

/// One page's exported output file.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PageArtifact {
    pub source_url: String,
    pub title: String,
    pub path: PathBuf,
    pub format: ExportFormat,
    pub depth: u32,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a whole crawl.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CrawlReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Canonical URLs in the order they were marked visited.
    pub visited: Vec<String>,
    pub artifacts: Vec<PageArtifact>,
    pub rendered: usize,
    pub failed: usize,
    pub skipped: usize,
    pub interrupted: bool,
}

impl CrawlReport {
    pub fn artifact_paths(&self) -> Vec<PathBuf> {
        self.artifacts.iter().map(|a| a.path.clone()).collect()
    }
}

/// Outcome of the merge phase.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MergeReport {
    pub output: PathBuf,
    /// Artifacts that made it into the composite output.
    pub merged: usize,
    /// Artifacts that were skipped because they could not be appended or read.
    pub skipped: Vec<PathBuf>,
    pub originals_deleted: usize,
}
