use std::path::Path;
use std::time::Duration;

use crate::models::PageArtifact;
use crate::scope::Scope;

/// Why a dequeued task was not rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyVisited,
    TooDeep,
    InvalidUrl,
}

/// Events emitted by the crawl controller and the merge assembler.
#[derive(Debug, Clone)]
pub enum CrawlEvent<'a> {
    Started {
        start_url: &'a str,
        scope: &'a Scope,
        max_depth: u32,
    },
    PageStarted {
        url: &'a str,
        depth: u32,
        visited: usize,
        queued: usize,
    },
    PageSkipped {
        url: &'a str,
        depth: u32,
        reason: SkipReason,
    },
    ConsentAccepted {
        url: &'a str,
    },
    LinkExtractionFailed {
        url: &'a str,
        error: &'a str,
    },
    LinksEnqueued {
        url: &'a str,
        found: usize,
        enqueued: usize,
    },
    ArtifactWritten {
        artifact: &'a PageArtifact,
    },
    PageFailed {
        url: &'a str,
        error: &'a str,
    },
    Throttling {
        delay: Duration,
    },
    Interrupted {
        in_flight: Option<&'a str>,
    },
    Finished {
        rendered: usize,
        failed: usize,
        skipped: usize,
    },
    MergeStarted {
        artifacts: usize,
        output: &'a Path,
    },
    MergeItemSkipped {
        path: &'a Path,
        error: &'a str,
    },
    MergeCompleted {
        output: &'a Path,
        merged: usize,
        skipped: usize,
    },
    OriginalDeleteFailed {
        path: &'a Path,
        error: &'a str,
    },
}

/// Receives crawl and merge events (decoupled logging).
pub trait CrawlReporter: Send + Sync {
    fn report(&self, event: CrawlEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCrawlReporter;

impl CrawlReporter for TracingCrawlReporter {
    fn report(&self, event: CrawlEvent<'_>) {
        match event {
            CrawlEvent::Started {
                start_url,
                scope,
                max_depth,
            } => {
                tracing::info!(
                    %start_url,
                    host = %scope.hostname,
                    prefix = %scope.path_prefix,
                    %max_depth,
                    "Crawl started"
                );
            }
            CrawlEvent::PageStarted {
                url,
                depth,
                visited,
                queued,
            } => {
                tracing::info!(%url, %depth, %visited, %queued, "Rendering page");
            }
            CrawlEvent::PageSkipped { url, depth, reason } => {
                tracing::debug!(%url, %depth, ?reason, "Page skipped");
            }
            CrawlEvent::ConsentAccepted { url } => {
                tracing::info!(%url, "Accepted consent banner");
            }
            CrawlEvent::LinkExtractionFailed { url, error } => {
                tracing::warn!(%url, %error, "Link extraction failed, exporting page anyway");
            }
            CrawlEvent::LinksEnqueued {
                url,
                found,
                enqueued,
            } => {
                tracing::debug!(%url, %found, %enqueued, "Links enqueued");
            }
            CrawlEvent::ArtifactWritten { artifact } => {
                tracing::info!(
                    url = %artifact.source_url,
                    path = %artifact.path.display(),
                    "Artifact written"
                );
            }
            CrawlEvent::PageFailed { url, error } => {
                tracing::warn!(%url, %error, "Page failed");
            }
            CrawlEvent::Throttling { delay } => {
                tracing::debug!(delay_ms = %delay.as_millis(), "Throttling");
            }
            CrawlEvent::Interrupted { in_flight } => {
                tracing::warn!(?in_flight, "Crawl interrupted");
            }
            CrawlEvent::Finished {
                rendered,
                failed,
                skipped,
            } => {
                tracing::info!(%rendered, %failed, %skipped, "Crawl finished");
            }
            CrawlEvent::MergeStarted { artifacts, output } => {
                tracing::info!(%artifacts, output = %output.display(), "Merging artifacts");
            }
            CrawlEvent::MergeItemSkipped { path, error } => {
                tracing::warn!(path = %path.display(), %error, "Skipping artifact");
            }
            CrawlEvent::MergeCompleted {
                output,
                merged,
                skipped,
            } => {
                tracing::info!(output = %output.display(), %merged, %skipped, "Merge complete");
            }
            CrawlEvent::OriginalDeleteFailed { path, error } => {
                tracing::warn!(path = %path.display(), %error, "Could not delete artifact");
            }
        }
    }
}
