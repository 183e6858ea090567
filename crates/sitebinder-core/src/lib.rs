pub mod artifact;
pub mod config;
pub mod crawler;
pub mod error;
pub mod frontier;
pub mod merge;
pub mod models;
pub mod reporter;
pub mod scope;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use artifact::{ArtifactWriter, ExportedPage, sanitize_filename};
pub use config::CrawlConfig;
pub use crawler::Crawler;
pub use error::CrawlError;
pub use merge::{MergeAssembler, MergePlan};
pub use models::{CrawlReport, CrawlTask, ExportFormat, MergeReport, PageArtifact};
pub use reporter::{CrawlEvent, CrawlReporter, TracingCrawlReporter};
pub use scope::{Scope, is_in_scope};
pub use traits::{DocumentMerger, PageRenderer};
