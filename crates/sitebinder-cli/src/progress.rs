use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use sitebinder_core::reporter::{CrawlEvent, CrawlReporter, TracingCrawlReporter};

/// Terminal progress on top of the tracing reporter.
///
/// The bar length is the number of pages known so far (visited plus
/// queued), so it grows as the crawl discovers links. Log lines are printed
/// with the bar suspended to keep the terminal readable.
pub struct ProgressReporter {
    bar: Option<ProgressBar>,
    inner: TracingCrawlReporter,
}

impl ProgressReporter {
    pub fn new(enabled: bool) -> Self {
        let bar = enabled.then(|| {
            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner} [{bar:40}] {pos}/{len} ({elapsed}) {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                    .progress_chars("█▉▊▋▌▍▎▏ "),
            );
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        Self {
            bar,
            inner: TracingCrawlReporter,
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

impl CrawlReporter for ProgressReporter {
    fn report(&self, event: CrawlEvent<'_>) {
        let Some(bar) = &self.bar else {
            self.inner.report(event);
            return;
        };

        match &event {
            CrawlEvent::PageStarted {
                url,
                visited,
                queued,
                ..
            } => {
                bar.set_length((visited + queued) as u64);
                bar.set_position(*visited as u64);
                bar.set_message(url.to_string());
            }
            CrawlEvent::Throttling { .. } => bar.set_message("waiting"),
            CrawlEvent::MergeStarted { artifacts, .. } => {
                bar.set_message(format!("merging {artifacts} artifacts"));
            }
            CrawlEvent::Finished { .. } | CrawlEvent::Interrupted { .. } => {
                bar.finish_and_clear();
            }
            _ => {}
        }

        bar.suspend(|| self.inner.report(event));
    }
}
