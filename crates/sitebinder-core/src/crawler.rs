use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::artifact::{ArtifactWriter, ExportedPage};
use crate::config::CrawlConfig;
use crate::error::CrawlError;
use crate::frontier::Frontier;
use crate::models::{CrawlReport, CrawlTask, ExportFormat, PageArtifact, Role};
use crate::reporter::{CrawlEvent, CrawlReporter, SkipReason};
use crate::scope::{Scope, canonicalize, canonicalize_url, resolve_link};
use crate::traits::PageRenderer;

/// Selector for elements whose `href` is followed.
pub const LINK_SELECTOR: &str = "a[href]";

/// How often a missing consent button is looked for again.
const CONSENT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Drives a single-session, breadth-first crawl.
///
/// Pages are processed strictly one at a time on the renderer's single
/// page: navigate, accept a consent banner if one shows up, read the
/// title, enqueue in-scope links (while below the depth limit), export the
/// page and write its artifact, then wait the politeness delay. A failure
/// abandons only the page it happened on.
pub struct Crawler<R: PageRenderer> {
    renderer: R,
    config: CrawlConfig,
    scope: Scope,
    writer: ArtifactWriter,
}

impl<R: PageRenderer> Crawler<R> {
    pub fn new(renderer: R, config: CrawlConfig) -> Result<Self, CrawlError> {
        config.validate()?;
        let scope = Scope::from_start_url(&config.start_url)?;
        let writer = ArtifactWriter::new(&config.output_dir);

        Ok(Self {
            renderer,
            config,
            scope,
            writer,
        })
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Give the renderer back, e.g. to shut the browser down.
    pub fn into_renderer(self) -> R {
        self.renderer
    }

    /// Crawl until the frontier drains or `cancel` fires.
    ///
    /// Setup failures (output directory, session configuration) and losing
    /// the browser session are returned as errors; page-local failures are
    /// counted in the report.
    pub async fn run<CR: CrawlReporter>(
        &self,
        cancel: CancellationToken,
        reporter: &CR,
    ) -> Result<CrawlReport, CrawlError> {
        let started_at = Utc::now();
        self.writer.ensure_output_dir()?;
        self.renderer.configure(&self.config.session).await?;

        reporter.report(CrawlEvent::Started {
            start_url: &self.config.start_url,
            scope: &self.scope,
            max_depth: self.config.max_depth,
        });

        let mut frontier = Frontier::new();
        frontier.push(CrawlTask::new(canonicalize(&self.config.start_url)?, 0));

        let mut visited = Vec::new();
        let mut artifacts = Vec::new();
        let (mut failed, mut skipped) = (0, 0);
        let mut interrupted = false;

        while let Some(task) = frontier.pop() {
            if cancel.is_cancelled() {
                reporter.report(CrawlEvent::Interrupted { in_flight: None });
                interrupted = true;
                break;
            }

            // Depth is enforced here, not at enqueue time.
            if task.depth > self.config.max_depth {
                skipped += 1;
                reporter.report(CrawlEvent::PageSkipped {
                    url: &task.url,
                    depth: task.depth,
                    reason: SkipReason::TooDeep,
                });
                continue;
            }
            let url = match canonicalize(&task.url) {
                Ok(url) => url,
                Err(_) => {
                    skipped += 1;
                    reporter.report(CrawlEvent::PageSkipped {
                        url: &task.url,
                        depth: task.depth,
                        reason: SkipReason::InvalidUrl,
                    });
                    continue;
                }
            };
            if !frontier.mark_visited(&url) {
                skipped += 1;
                reporter.report(CrawlEvent::PageSkipped {
                    url: &url,
                    depth: task.depth,
                    reason: SkipReason::AlreadyVisited,
                });
                continue;
            }
            visited.push(url.clone());
            let task = CrawlTask::new(url, task.depth);

            reporter.report(CrawlEvent::PageStarted {
                url: &task.url,
                depth: task.depth,
                visited: frontier.visited_count(),
                queued: frontier.len(),
            });

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = self.process(&task, &mut frontier, reporter) => Some(result),
            };

            match outcome {
                None => {
                    // Nothing was written for the in-flight page.
                    reporter.report(CrawlEvent::Interrupted {
                        in_flight: Some(&task.url),
                    });
                    interrupted = true;
                    break;
                }
                Some(Ok(artifact)) => {
                    reporter.report(CrawlEvent::ArtifactWritten {
                        artifact: &artifact,
                    });
                    artifacts.push(artifact);
                }
                Some(Err(e)) if !e.is_page_local() => return Err(e),
                Some(Err(e)) => {
                    failed += 1;
                    reporter.report(CrawlEvent::PageFailed {
                        url: &task.url,
                        error: &e.to_string(),
                    });
                }
            }

            // Politeness delay after every processed page, failed or not.
            if !self.config.delay.is_zero() {
                reporter.report(CrawlEvent::Throttling {
                    delay: self.config.delay,
                });
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        reporter.report(CrawlEvent::Interrupted { in_flight: None });
                        interrupted = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.config.delay) => {}
                }
            }
        }

        reporter.report(CrawlEvent::Finished {
            rendered: artifacts.len(),
            failed,
            skipped,
        });

        Ok(CrawlReport {
            started_at,
            finished_at: Utc::now(),
            visited,
            rendered: artifacts.len(),
            artifacts,
            failed,
            skipped,
            interrupted,
        })
    }

    async fn process<CR: CrawlReporter>(
        &self,
        task: &CrawlTask,
        frontier: &mut Frontier,
        reporter: &CR,
    ) -> Result<PageArtifact, CrawlError> {
        self.renderer
            .navigate(
                &task.url,
                self.config.wait_policy,
                self.config.navigation_timeout,
            )
            .await?;

        if self.accept_consent().await {
            reporter.report(CrawlEvent::ConsentAccepted { url: &task.url });
        }

        // Relative links resolve against the document actually loaded, which
        // differs from the task URL after a redirect.
        let page_url = match self.renderer.current_url().await {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(url = %task.url, error = %e, "Could not read page URL");
                task.url.clone()
            }
        };

        let title = self.renderer.title().await?;

        if task.depth < self.config.max_depth {
            match self.renderer.extract_links(LINK_SELECTOR).await {
                Ok(links) => {
                    let enqueued = self.enqueue_links(task, &page_url, &links, frontier);
                    reporter.report(CrawlEvent::LinksEnqueued {
                        url: &task.url,
                        found: links.len(),
                        enqueued,
                    });
                }
                Err(e) => {
                    reporter.report(CrawlEvent::LinkExtractionFailed {
                        url: &task.url,
                        error: &e.to_string(),
                    });
                }
            }
        }

        let page = match self.config.format {
            ExportFormat::Document => {
                ExportedPage::Document(self.renderer.export_document(&self.config.pdf).await?)
            }
            ExportFormat::Text => ExportedPage::Text(self.renderer.extract_visible_text().await?),
        };
        let path = self.writer.write(&title, &page)?;

        Ok(PageArtifact {
            source_url: task.url.clone(),
            title,
            path,
            format: self.config.format,
            depth: task.depth,
            created_at: Utc::now(),
        })
    }

    /// Click a consent-style button if the page shows one.
    ///
    /// Returns whether a click happened. Banners may show up late, so the
    /// lookup is repeated until the consent timeout runs out. Not finding a
    /// button, or the click timing out, means there is no banner to dismiss.
    async fn accept_consent(&self) -> bool {
        let timeout = self.config.consent_timeout;
        let lookup = tokio::time::timeout(timeout, async {
            loop {
                match self
                    .renderer
                    .find_clickable(Role::Button, &self.config.consent_names)
                    .await
                {
                    Ok(Some(handle)) => return Ok(handle),
                    Ok(None) => tokio::time::sleep(CONSENT_POLL_INTERVAL).await,
                    Err(e) => return Err(e),
                }
            }
        })
        .await;

        let handle = match lookup {
            Ok(Ok(handle)) => handle,
            Err(_) => return false,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Consent lookup failed");
                return false;
            }
        };

        match self.renderer.click(handle, timeout).await {
            Ok(()) => {
                if !self.config.consent_settle.is_zero() {
                    tokio::time::sleep(self.config.consent_settle).await;
                }
                true
            }
            Err(e) if e.is_timeout() => false,
            Err(e) => {
                tracing::debug!(error = %e, "Consent click failed");
                false
            }
        }
    }

    /// Resolve `links` against `page_url`, scope-check, canonicalize and
    /// enqueue them as children of `parent`. Returns how many new tasks were
    /// queued.
    fn enqueue_links(
        &self,
        parent: &CrawlTask,
        page_url: &str,
        links: &[String],
        frontier: &mut Frontier,
    ) -> usize {
        let Ok(base) = Url::parse(page_url).or_else(|_| Url::parse(&parent.url)) else {
            return 0;
        };

        let mut enqueued = 0;
        for href in links {
            let Some(resolved) = resolve_link(&base, href) else {
                continue;
            };
            if !self.scope.contains_url(&resolved) {
                continue;
            }
            let canonical = String::from(canonicalize_url(resolved));
            if frontier.push(parent.child(canonical)) {
                enqueued += 1;
            }
        }
        enqueued
    }
}
