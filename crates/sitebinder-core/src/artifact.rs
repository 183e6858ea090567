use std::path::{Path, PathBuf};

use crate::error::CrawlError;
use crate::models::ExportFormat;

/// Longest file stem produced by [`sanitize_filename`], in characters.
pub const MAX_FILENAME_CHARS: usize = 100;

/// Stem used for pages without a usable title.
pub const UNTITLED: &str = "no_title";

/// Rendered page content, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportedPage {
    Document(Vec<u8>),
    Text(String),
}

impl ExportedPage {
    pub fn format(&self) -> ExportFormat {
        match self {
            ExportedPage::Document(_) => ExportFormat::Document,
            ExportedPage::Text(_) => ExportFormat::Text,
        }
    }
}

/// Turn a page title into a file stem that is valid on common filesystems.
///
/// Drops reserved and control characters, collapses whitespace and
/// underscore runs into one `_`, caps the length and falls back to
/// [`UNTITLED`]. Applying it twice gives the same result as applying it once.
pub fn sanitize_filename(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut in_separator = false;

    for ch in title.chars() {
        if ch.is_whitespace() || ch == '_' {
            if !in_separator {
                out.push('_');
                in_separator = true;
            }
        } else if matches!(ch, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|')
            || ch.is_control()
        {
            continue;
        } else {
            out.push(ch);
            in_separator = false;
        }
    }

    let capped: String = out.chars().take(MAX_FILENAME_CHARS).collect();
    if capped.is_empty() {
        UNTITLED.to_string()
    } else {
        capped
    }
}

/// Writes one artifact per rendered page into the output directory.
///
/// File names are not deduplicated: a later page whose title sanitizes to
/// the same stem replaces the earlier file.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create the output directory if it does not exist yet.
    pub fn ensure_output_dir(&self) -> Result<(), CrawlError> {
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// Path the artifact for `title` would be written to.
    pub fn artifact_path(&self, title: &str, format: ExportFormat) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", sanitize_filename(title), format.extension()))
    }

    /// Write `page` and return the artifact path.
    ///
    /// Text artifacts start with the page title as a Markdown heading.
    pub fn write(&self, title: &str, page: &ExportedPage) -> Result<PathBuf, CrawlError> {
        let path = self.artifact_path(title, page.format());
        match page {
            ExportedPage::Document(bytes) => std::fs::write(&path, bytes)?,
            ExportedPage::Text(text) => std::fs::write(&path, format!("# {title}\n\n{text}"))?,
        }
        tracing::debug!(path = %path.display(), "Artifact written");
        Ok(path)
    }
}
