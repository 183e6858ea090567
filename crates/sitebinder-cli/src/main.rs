mod progress;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use sitebinder_client::{BrowserRenderer, LopdfMerger};
use sitebinder_core::models::{CrawlReport, ExportFormat, MergeReport};
use sitebinder_core::{CrawlConfig, CrawlError, Crawler, MergeAssembler, MergePlan};

use crate::progress::ProgressReporter;

#[derive(Parser)]
#[command(
    name = "sitebinder",
    version,
    about = "Crawl a documentation site and bind its pages into one file"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl a site section and export every page
    Crawl {
        /// Start URL; only links under its host and path prefix are followed
        #[arg(short, long, env = "SITEBINDER_URL")]
        url: String,

        /// Maximum link depth from the start URL
        #[arg(short, long, env = "SITEBINDER_DEPTH", default_value_t = 1)]
        depth: u32,

        /// Seconds to wait after each page
        #[arg(long, env = "SITEBINDER_DELAY", default_value_t = 2.0)]
        delay: f64,

        /// Export format: pdf or text
        #[arg(short, long, env = "SITEBINDER_FORMAT", default_value = "pdf")]
        format: ExportFormat,

        /// Do not merge the artifacts after the crawl
        #[arg(long, env = "SITEBINDER_NO_MERGE", default_value_t = false)]
        no_merge: bool,

        /// Keep per-page artifacts after merging
        #[arg(long, env = "SITEBINDER_KEEP_ORIGINALS", default_value_t = false)]
        keep_originals: bool,

        /// Directory for per-page artifacts (defaults to output_pdfs / output_texts)
        #[arg(short, long, env = "SITEBINDER_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,

        /// Composite output file (defaults to merged_output.pdf / .md)
        #[arg(short, long, env = "SITEBINDER_MERGED_PATH")]
        merged_path: Option<PathBuf>,

        /// Navigation timeout in seconds
        #[arg(long, env = "SITEBINDER_NAV_TIMEOUT", default_value_t = 60)]
        nav_timeout: u64,

        /// Consent banner timeout in seconds
        #[arg(long, env = "SITEBINDER_CONSENT_TIMEOUT", default_value_t = 3)]
        consent_timeout: u64,

        /// Print the crawl report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Disable the progress bar
        #[arg(long, env = "SITEBINDER_NO_PROGRESS", default_value_t = false)]
        no_progress: bool,
    },

    /// Merge the artifacts already present in a directory
    Merge {
        /// Directory holding the per-page artifacts
        #[arg(short, long)]
        dir: PathBuf,

        /// Artifact format: pdf or text
        #[arg(short, long, default_value = "pdf")]
        format: ExportFormat,

        /// Composite output file
        #[arg(short, long)]
        output: PathBuf,

        /// Delete the artifacts once the composite is written
        #[arg(long, default_value_t = false)]
        delete_originals: bool,

        /// Print the merge report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("sitebinder=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cancel = spawn_interrupt_handler();

    match cli.command {
        Commands::Crawl {
            url,
            depth,
            delay,
            format,
            no_merge,
            keep_originals,
            output_dir,
            merged_path,
            nav_timeout,
            consent_timeout,
            json,
            no_progress,
        } => {
            let delay = Duration::try_from_secs_f64(delay)
                .with_context(|| format!("Invalid delay: {delay}"))?;

            let mut config = CrawlConfig::new(url, format)
                .with_max_depth(depth)
                .with_delay(delay)
                .with_merge(!no_merge)
                .with_delete_originals(!keep_originals)
                .with_navigation_timeout(Duration::from_secs(nav_timeout))
                .with_consent_timeout(Duration::from_secs(consent_timeout));
            if let Some(dir) = output_dir {
                config = config.with_output_dir(dir);
            }
            if let Some(path) = merged_path {
                config = config.with_merged_path(path);
            }

            cmd_crawl(config, json, !no_progress, cancel).await?;
        }
        Commands::Merge {
            dir,
            format,
            output,
            delete_originals,
            json,
        } => {
            cmd_merge(&dir, format, output, delete_originals, json, cancel)?;
        }
    }

    Ok(())
}

/// Cancel the returned token on the first Ctrl-C. A second Ctrl-C exits
/// right away.
fn spawn_interrupt_handler() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("Ctrl-C received, stopping after the current step (again to quit now)");
        token.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Aborted by user.");
            std::process::exit(0);
        }
    });
    cancel
}

async fn cmd_crawl(
    config: CrawlConfig,
    json: bool,
    show_progress: bool,
    cancel: CancellationToken,
) -> Result<()> {
    // Fail on bad input before paying for a browser launch.
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!("Launching headless browser");
    let renderer = BrowserRenderer::launch()
        .await
        .context("Failed to start the browser")?;

    let plan = MergePlan::from_config(&config);
    let merge_enabled = config.merge;
    let crawler = Crawler::new(renderer, config).map_err(|e| anyhow::anyhow!(e))?;

    let reporter = ProgressReporter::new(show_progress);
    let result = crawler.run(cancel.clone(), &reporter).await;
    reporter.finish();

    if let Err(e) = crawler.into_renderer().close().await {
        tracing::warn!(error = %e, "Browser did not shut down cleanly");
    }
    let report = result.map_err(|e| anyhow::anyhow!(e))?;

    // Ctrl-C may also land while the browser is closing.
    if report.interrupted || cancel.is_cancelled() {
        eprintln!("Crawl aborted by user; skipping merge.");
        print_crawl(&report, None, json)?;
        return Ok(());
    }

    if !merge_enabled || report.artifacts.is_empty() {
        return print_crawl(&report, None, json);
    }

    let merge = MergeAssembler::new(plan, LopdfMerger::new())
        .with_cancellation(cancel.clone())
        .run(&report.artifact_paths(), &reporter);
    match merge {
        Ok(merge_report) => {
            if cancel.is_cancelled() {
                eprintln!("Aborted by user; original artifacts were kept.");
            }
            print_crawl(&report, merge_report.as_ref(), json)
        }
        Err(CrawlError::Interrupted(_)) => {
            eprintln!("Merge aborted by user; page artifacts were kept.");
            print_crawl(&report, None, json)
        }
        Err(e) => {
            // The crawl summary is still worth printing; artifacts stay on disk.
            print_crawl(&report, None, json)?;
            Err(anyhow::anyhow!(e).context("Merge failed, page artifacts were kept"))
        }
    }
}

fn cmd_merge(
    dir: &Path,
    format: ExportFormat,
    output: PathBuf,
    delete_originals: bool,
    json: bool,
    cancel: CancellationToken,
) -> Result<()> {
    let artifacts = collect_artifacts(dir, format)?;
    if artifacts.is_empty() {
        println!(
            "No .{} files found in {}",
            format.extension(),
            dir.display()
        );
        return Ok(());
    }

    let plan = MergePlan {
        format,
        output,
        delete_originals,
    };
    let reporter = ProgressReporter::new(false);
    let report = match MergeAssembler::new(plan, LopdfMerger::new())
        .with_cancellation(cancel.clone())
        .run(&artifacts, &reporter)
    {
        Ok(report) => report,
        Err(CrawlError::Interrupted(_)) => {
            eprintln!("Merge aborted by user; nothing was written.");
            return Ok(());
        }
        Err(e) => return Err(anyhow::anyhow!(e)),
    };
    if cancel.is_cancelled() {
        eprintln!("Aborted by user; original artifacts were kept.");
    }

    match report {
        Some(report) if json => println!("{}", serde_json::to_string_pretty(&report)?),
        Some(report) => print_merge(&report),
        None => println!("Nothing to merge"),
    }
    Ok(())
}

/// Every file in `dir` with the format's extension.
fn collect_artifacts(dir: &Path, format: ExportFormat) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

    let mut artifacts = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == format.extension()) {
            artifacts.push(path);
        }
    }
    Ok(artifacts)
}

fn print_crawl(report: &CrawlReport, merge: Option<&MergeReport>, json: bool) -> Result<()> {
    if json {
        let value = serde_json::json!({ "crawl": report, "merge": merge });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let elapsed = report.finished_at - report.started_at;
    println!(
        "Crawled {} pages in {}s: {} exported, {} failed, {} skipped",
        report.visited.len(),
        elapsed.num_seconds(),
        report.rendered,
        report.failed,
        report.skipped
    );
    if report.artifacts.is_empty() {
        println!("No pages were exported; nothing to merge.");
    }
    if let Some(merge) = merge {
        print_merge(merge);
    }
    Ok(())
}

fn print_merge(report: &MergeReport) {
    println!(
        "Merged {} artifacts into {}",
        report.merged,
        report.output.display()
    );
    for path in &report.skipped {
        println!("  skipped: {}", path.display());
    }
    if report.originals_deleted > 0 {
        println!("Deleted {} original artifacts", report.originals_deleted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crawl_defaults_follow_the_interactive_tool() {
        let cli = Cli::try_parse_from(["sitebinder", "crawl", "--url", "https://example.com/docs/"])
            .unwrap();
        let Commands::Crawl {
            depth,
            delay,
            format,
            no_merge,
            keep_originals,
            ..
        } = cli.command
        else {
            panic!("expected crawl command");
        };
        assert_eq!(depth, 1);
        assert_eq!(delay, 2.0);
        assert_eq!(format, ExportFormat::Document);
        assert!(!no_merge);
        assert!(!keep_originals);
    }

    #[test]
    fn format_accepts_text_aliases() {
        for alias in ["text", "md"] {
            let cli = Cli::try_parse_from([
                "sitebinder",
                "crawl",
                "--url",
                "https://example.com/",
                "--format",
                alias,
            ])
            .unwrap();
            let Commands::Crawl { format, .. } = cli.command else {
                panic!("expected crawl command");
            };
            assert_eq!(format, ExportFormat::Text);
        }
    }

    #[test]
    fn unknown_format_is_rejected() {
        let result = Cli::try_parse_from([
            "sitebinder",
            "crawl",
            "--url",
            "https://example.com/",
            "--format",
            "docx",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn collect_artifacts_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "# A").unwrap();
        std::fs::write(dir.path().join("b.pdf"), "%PDF").unwrap();
        std::fs::write(dir.path().join("c.md"), "# C").unwrap();
        std::fs::create_dir(dir.path().join("nested.md")).unwrap();

        let mut found = collect_artifacts(dir.path(), ExportFormat::Text).unwrap();
        found.sort();
        assert_eq!(
            found,
            vec![dir.path().join("a.md"), dir.path().join("c.md")]
        );
    }

    #[test]
    fn merge_command_concatenates_text_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.md"), "# B").unwrap();
        std::fs::write(dir.path().join("a.md"), "# A").unwrap();
        let output = dir.path().join("out").join("merged.md");

        cmd_merge(
            dir.path(),
            ExportFormat::Text,
            output.clone(),
            false,
            false,
            CancellationToken::new(),
        )
        .unwrap();

        let merged = std::fs::read_to_string(&output).unwrap();
        assert!(merged.find("# A").unwrap() < merged.find("# B").unwrap());
        assert!(dir.path().join("a.md").exists());
    }

    #[test]
    fn interrupted_merge_command_keeps_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "# A").unwrap();
        std::fs::write(dir.path().join("b.md"), "# B").unwrap();
        let output = dir.path().join("merged.md");
        let cancel = CancellationToken::new();
        cancel.cancel();

        cmd_merge(
            dir.path(),
            ExportFormat::Text,
            output.clone(),
            true,
            false,
            cancel,
        )
        .unwrap();

        assert!(!output.exists());
        assert!(dir.path().join("a.md").exists());
        assert!(dir.path().join("b.md").exists());
    }
}
