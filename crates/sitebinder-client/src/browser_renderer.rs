use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::network::{
    Headers, SetExtraHttpHeadersParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, NavigateParams, PrintToPdfParams,
};
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures::StreamExt;
use sitebinder_core::error::CrawlError;
use sitebinder_core::models::{PdfOptions, Role, SessionProfile, WaitPolicy};
use sitebinder_core::traits::PageRenderer;
use tokio::task::JoinHandle;

/// Launch options for [`BrowserRenderer`].
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    /// Explicit Chrome/Chromium binary. Probed from `CHROME_BIN` and the
    /// usual install locations when unset.
    pub chrome_executable: Option<PathBuf>,
    /// Quiet period after `document.readyState` reaches `complete` before a
    /// [`WaitPolicy::NetworkIdle`] navigation counts as finished.
    pub idle_grace: Duration,
}

/// Chromium flags for an unattended crawl session.
const LAUNCH_ARGS: &[&str] = &[
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-popup-blocking",
    "--disable-translate",
    "--disable-blink-features=AutomationControlled",
    "--no-first-run",
];

/// Install locations tried when neither an explicit binary nor
/// `CHROME_BIN` is given. The snap entry is the real binary; the
/// `/snap/bin/chromium` wrapper drops the flags above.
const CHROME_CANDIDATES: &[&str] = &[
    "/snap/chromium/current/usr/lib/chromium-browser/chrome",
    "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
];

impl BrowserOptions {
    /// Binary to launch: the explicit one, then `CHROME_BIN`, then the first
    /// candidate that exists. `None` leaves the lookup to `chromiumoxide`.
    fn resolve_executable(&self) -> Option<PathBuf> {
        self.chrome_executable
            .clone()
            .or_else(|| {
                std::env::var_os("CHROME_BIN")
                    .map(PathBuf::from)
                    .filter(|path| path.exists())
            })
            .or_else(|| {
                CHROME_CANDIDATES
                    .iter()
                    .map(PathBuf::from)
                    .find(|path| path.exists())
            })
    }
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_executable: None,
            idle_grace: Duration::from_millis(500),
        }
    }
}

/// Headless-Chromium page renderer over the Chrome DevTools Protocol.
///
/// One browser process with one tab, reused for every page of the crawl.
/// Call [`close`](Self::close) when done so the process exits cleanly.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use sitebinder_client::BrowserRenderer;
/// use sitebinder_core::models::WaitPolicy;
/// use sitebinder_core::traits::PageRenderer;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let renderer = BrowserRenderer::launch().await?;
/// renderer
///     .navigate("https://example.com", WaitPolicy::Load, Duration::from_secs(30))
///     .await?;
/// println!("{}", renderer.title().await?);
/// renderer.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct BrowserRenderer {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    idle_grace: Duration,
}

impl BrowserRenderer {
    /// Launches a headless Chromium with default options.
    ///
    /// Requires a Chromium / Chrome binary reachable via `$PATH` (or the
    /// default locations checked by `chromiumoxide`).
    pub async fn launch() -> Result<Self, CrawlError> {
        Self::launch_with(BrowserOptions::default()).await
    }

    pub async fn launch_with(options: BrowserOptions) -> Result<Self, CrawlError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .disable_default_args()
            .args(LAUNCH_ARGS.iter().copied());
        if options.headless {
            builder = builder.arg("--headless=new");
        }
        if let Some(bin) = options.resolve_executable() {
            tracing::info!(binary = %bin.display(), "Using browser binary");
            builder = builder.chrome_executable(bin);
        }

        let config = builder
            .build()
            .map_err(|e| CrawlError::Browser(format!("Invalid browser config: {e}")))?;
        let (browser, mut events) = Browser::launch(config)
            .await
            .map_err(|e| CrawlError::Browser(format!("Failed to launch browser: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Err(e) = event {
                    tracing::warn!(error = %e, "CDP connection closed");
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| CrawlError::Browser(format!("Failed to open page: {e}")))?;

        Ok(Self {
            browser,
            page,
            handler,
            idle_grace: options.idle_grace,
        })
    }

    /// Close the browser and wait for the CDP handler to stop.
    pub async fn close(mut self) -> Result<(), CrawlError> {
        self.browser
            .close()
            .await
            .map_err(|e| CrawlError::Browser(format!("Failed to close browser: {e}")))?;
        let _ = self.browser.wait().await;
        let _ = self.handler.await;
        Ok(())
    }

    async fn wait_until(&self, wait: WaitPolicy) -> Result<(), CrawlError> {
        if wait == WaitPolicy::Load {
            return Ok(());
        }
        loop {
            let state: String = self
                .page
                .evaluate("document.readyState")
                .await
                .map_err(|e| CrawlError::Render(format!("Failed to read readyState: {e}")))?
                .into_value()
                .map_err(|e| CrawlError::Render(format!("Unexpected readyState: {e}")))?;
            if state == "complete" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(self.idle_grace).await;
        Ok(())
    }

    /// Accessible name of an element: its text, `aria-label` or `value`.
    async fn accessible_name(element: &Element) -> String {
        if let Ok(Some(text)) = element.inner_text().await {
            if !text.trim().is_empty() {
                return text;
            }
        }
        for attribute in ["aria-label", "value"] {
            if let Ok(Some(value)) = element.attribute(attribute).await {
                return value;
            }
        }
        String::new()
    }
}

impl PageRenderer for BrowserRenderer {
    type Handle = Element;

    async fn configure(&self, profile: &SessionProfile) -> Result<(), CrawlError> {
        self.page
            .set_user_agent(SetUserAgentOverrideParams::new(profile.user_agent.clone()))
            .await
            .map_err(|e| CrawlError::Browser(format!("Failed to set user agent: {e}")))?;

        let headers = serde_json::to_value(&profile.headers)?;
        self.page
            .execute(SetExtraHttpHeadersParams::new(Headers::new(headers)))
            .await
            .map_err(|e| CrawlError::Browser(format!("Failed to set extra headers: {e}")))?;

        self.page
            .evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(
                profile.init_script.clone(),
            ))
            .await
            .map_err(|e| CrawlError::Browser(format!("Failed to install init script: {e}")))?;

        Ok(())
    }

    async fn navigate(
        &self,
        url: &str,
        wait: WaitPolicy,
        timeout: Duration,
    ) -> Result<(), CrawlError> {
        let result = tokio::time::timeout(timeout, async {
            self.page
                .goto(NavigateParams::new(url))
                .await
                .map_err(|e| CrawlError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            self.wait_until(wait).await
        })
        .await;

        match result {
            Ok(inner) => inner,
            Err(_) => Err(CrawlError::Timeout {
                operation: "navigation",
                secs: timeout.as_secs(),
            }),
        }
    }

    async fn find_clickable(
        &self,
        role: Role,
        names: &[String],
    ) -> Result<Option<Element>, CrawlError> {
        // No match is reported as an error by CDP; it just means "not here".
        let Ok(elements) = self.page.find_elements(role.selector()).await else {
            return Ok(None);
        };
        let wanted: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();

        for element in elements {
            let name = Self::accessible_name(&element).await.to_lowercase();
            if wanted.iter().any(|w| name.contains(w.as_str())) {
                return Ok(Some(element));
            }
        }
        Ok(None)
    }

    async fn click(&self, handle: Element, timeout: Duration) -> Result<(), CrawlError> {
        match tokio::time::timeout(timeout, handle.click()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(CrawlError::Render(format!("Click failed: {e}"))),
            Err(_) => Err(CrawlError::Timeout {
                operation: "consent click",
                secs: timeout.as_secs(),
            }),
        }
    }

    async fn title(&self) -> Result<String, CrawlError> {
        let title = self
            .page
            .get_title()
            .await
            .map_err(|e| CrawlError::Render(format!("Failed to read title: {e}")))?;
        Ok(title.unwrap_or_default())
    }

    async fn current_url(&self) -> Result<String, CrawlError> {
        self.page
            .url()
            .await
            .map_err(|e| CrawlError::Render(format!("Failed to read page URL: {e}")))?
            .ok_or_else(|| CrawlError::Render("page has no URL".to_string()))
    }

    /// `el.href` is already resolved by the browser against the document's
    /// real base (redirects, `<base href>`); the raw attribute is the fallback
    /// for elements without an `href` property.
    async fn extract_links(&self, selector: &str) -> Result<Vec<String>, CrawlError> {
        let script = format!(
            "Array.from(document.querySelectorAll({})).map(el => el.href || el.getAttribute('href')).filter(href => href)",
            serde_json::to_string(selector)?
        );
        self.page
            .evaluate(script)
            .await
            .map_err(|e| CrawlError::LinkExtraction(e.to_string()))?
            .into_value()
            .map_err(|e| CrawlError::LinkExtraction(e.to_string()))
    }

    async fn export_document(&self, options: &PdfOptions) -> Result<Vec<u8>, CrawlError> {
        let (width, height) = options.page_size.inches();
        let params = PrintToPdfParams {
            print_background: Some(options.print_background),
            paper_width: Some(width),
            paper_height: Some(height),
            ..PrintToPdfParams::default()
        };
        self.page
            .pdf(params)
            .await
            .map_err(|e| CrawlError::Export(format!("Failed to print PDF: {e}")))
    }

    async fn extract_visible_text(&self) -> Result<String, CrawlError> {
        self.page
            .evaluate("document.body ? document.body.innerText : ''")
            .await
            .map_err(|e| CrawlError::Export(format!("Failed to read page text: {e}")))?
            .into_value()
            .map_err(|e| CrawlError::Export(e.to_string()))
    }
}
