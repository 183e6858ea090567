/// Smoke-test for `BrowserRenderer`.
///
/// Launches a headless Chromium, renders <https://example.com> to PDF and
/// text, and checks both look like the page.
///
/// Run with:
///   cargo run -p sitebinder-client --example render_smoke
use std::time::Duration;

use sitebinder_client::BrowserRenderer;
use sitebinder_core::models::{PdfOptions, SessionProfile, WaitPolicy};
use sitebinder_core::traits::PageRenderer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("Launching headless browser…");
    let renderer = BrowserRenderer::launch().await?;
    renderer.configure(&SessionProfile::default()).await?;

    let url = "https://example.com";
    println!("Rendering {url} …");
    renderer
        .navigate(url, WaitPolicy::NetworkIdle, Duration::from_secs(30))
        .await?;

    let title = renderer.title().await?;
    assert_eq!(title, "Example Domain", "unexpected title");

    let links = renderer.extract_links("a[href]").await?;
    println!("Found {} links", links.len());

    let pdf = renderer.export_document(&PdfOptions::default()).await?;
    assert!(pdf.starts_with(b"%PDF"), "output is not a PDF");

    let text = renderer.extract_visible_text().await?;
    assert!(text.contains("Example Domain"), "visible text missing heading");

    println!("OK: {} byte PDF, {} chars of text", pdf.len(), text.len());
    renderer.close().await?;
    Ok(())
}
