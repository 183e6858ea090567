//! Combines per-page artifacts into one composite output.
//!
//! Artifacts are merged in lexicographic path order, not crawl order.
//! A single unreadable or corrupt artifact is reported and skipped; only
//! failing to write the composite itself stops the merge.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::config::CrawlConfig;
use crate::error::CrawlError;
use crate::models::{ExportFormat, MergeReport};
use crate::reporter::{CrawlEvent, CrawlReporter};
use crate::traits::DocumentMerger;

/// Written after every text artifact in the composite.
pub const TEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Where and how to merge.
#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan {
    pub format: ExportFormat,
    pub output: PathBuf,
    /// Remove every original artifact once the composite is written.
    pub delete_originals: bool,
}

impl MergePlan {
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self {
            format: config.format,
            output: config.merged_path.clone(),
            delete_originals: config.delete_originals_after_merge,
        }
    }
}

pub struct MergeAssembler<M> {
    plan: MergePlan,
    merger: M,
    cancel: CancellationToken,
}

impl<M: DocumentMerger> MergeAssembler<M> {
    /// `merger` is only used for [`ExportFormat::Document`] plans.
    pub fn new(plan: MergePlan, merger: M) -> Self {
        Self {
            plan,
            merger,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop between artifacts once `cancel` fires.
    ///
    /// Cancelling before the composite is written leaves no output; after it
    /// is written, the originals are kept.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Merge `artifacts` into the plan's output.
    ///
    /// Returns `Ok(None)` when there is nothing to merge.
    pub fn run<R: CrawlReporter>(
        self,
        artifacts: &[PathBuf],
        reporter: &R,
    ) -> Result<Option<MergeReport>, CrawlError> {
        if artifacts.is_empty() {
            return Ok(None);
        }

        let mut sorted = artifacts.to_vec();
        sorted.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
        // Same-title pages share a file; merge it once.
        sorted.dedup();

        let output = self.plan.output.clone();
        reporter.report(CrawlEvent::MergeStarted {
            artifacts: sorted.len(),
            output: &output,
        });

        let cancel = self.cancel;
        let (merged, skipped) = match self.plan.format {
            ExportFormat::Document => {
                merge_documents(self.merger, &sorted, &output, &cancel, reporter)?
            }
            ExportFormat::Text => merge_texts(&sorted, &output, &cancel, reporter)?,
        };

        reporter.report(CrawlEvent::MergeCompleted {
            output: &output,
            merged,
            skipped: skipped.len(),
        });

        let originals_deleted = if !self.plan.delete_originals {
            0
        } else if cancel.is_cancelled() {
            reporter.report(CrawlEvent::Interrupted { in_flight: None });
            0
        } else {
            delete_originals(&sorted, reporter)
        };

        Ok(Some(MergeReport {
            output,
            merged,
            skipped,
            originals_deleted,
        }))
    }
}

fn merge_documents<M: DocumentMerger, R: CrawlReporter>(
    mut merger: M,
    paths: &[PathBuf],
    output: &Path,
    cancel: &CancellationToken,
    reporter: &R,
) -> Result<(usize, Vec<PathBuf>), CrawlError> {
    let mut merged = 0;
    let mut skipped = Vec::new();

    for path in paths {
        if cancel.is_cancelled() {
            return Err(CrawlError::Interrupted("merge"));
        }
        match merger.append(path) {
            Ok(()) => merged += 1,
            Err(e) => {
                reporter.report(CrawlEvent::MergeItemSkipped {
                    path,
                    error: &e.to_string(),
                });
                skipped.push(path.clone());
            }
        }
    }

    if merged == 0 {
        return Err(CrawlError::MergeFinalize {
            path: output.to_path_buf(),
            message: "no artifact could be appended".to_string(),
        });
    }

    prepare_output(output)?;
    merger.finalize(output).map_err(|e| match e {
        CrawlError::MergeFinalize { .. } => e,
        other => CrawlError::MergeFinalize {
            path: output.to_path_buf(),
            message: other.to_string(),
        },
    })?;

    Ok((merged, skipped))
}

fn merge_texts<R: CrawlReporter>(
    paths: &[PathBuf],
    output: &Path,
    cancel: &CancellationToken,
    reporter: &R,
) -> Result<(usize, Vec<PathBuf>), CrawlError> {
    let mut composite = String::new();
    let mut merged = 0;
    let mut skipped = Vec::new();

    for path in paths {
        if cancel.is_cancelled() {
            return Err(CrawlError::Interrupted("merge"));
        }
        match std::fs::read_to_string(path) {
            Ok(content) => {
                composite.push_str(&content);
                composite.push_str(TEXT_SEPARATOR);
                merged += 1;
            }
            Err(e) => {
                let err = CrawlError::MergeRead {
                    path: path.clone(),
                    message: e.to_string(),
                };
                reporter.report(CrawlEvent::MergeItemSkipped {
                    path,
                    error: &err.to_string(),
                });
                skipped.push(path.clone());
            }
        }
    }

    if merged == 0 {
        return Err(CrawlError::MergeFinalize {
            path: output.to_path_buf(),
            message: "no artifact could be read".to_string(),
        });
    }

    prepare_output(output)?;
    std::fs::write(output, composite).map_err(|e| CrawlError::MergeFinalize {
        path: output.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok((merged, skipped))
}

fn prepare_output(output: &Path) -> Result<(), CrawlError> {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| CrawlError::MergeFinalize {
                path: output.to_path_buf(),
                message: e.to_string(),
            })
        }
        _ => Ok(()),
    }
}

fn delete_originals<R: CrawlReporter>(paths: &[PathBuf], reporter: &R) -> usize {
    let mut deleted = 0;
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => deleted += 1,
            Err(e) => reporter.report(CrawlEvent::OriginalDeleteFailed {
                path,
                error: &e.to_string(),
            }),
        }
    }
    deleted
}
