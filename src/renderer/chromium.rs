//! Chromium-backed rendering via chromiumoxide.

use super::{Browser, PageHandle, Session};
use crate::error::PageError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Locate a Chromium binary.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. MATCHUP_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("MATCHUP_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.matchup/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = [
            home.join(".matchup/chromium/chrome-linux64/chrome"),
            home.join(".matchup/chromium/chrome"),
        ];
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Chromium engine. One headless instance serves all jobs; each job gets its
/// own [`ChromiumSession`].
pub struct ChromiumBrowser {
    browser: Arc<CdpBrowser>,
    session_count: Arc<AtomicUsize>,
}

impl ChromiumBrowser {
    /// Launch a headless Chromium instance with the given viewport.
    pub async fn launch(viewport: (u32, u32)) -> Result<Self> {
        let chrome_path = find_chromium().context(
            "Chromium not found. Install it or set MATCHUP_CHROMIUM_PATH",
        )?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(viewport.0, viewport.1)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = CdpBrowser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Drive the CDP event loop for the lifetime of the browser.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            session_count: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn acquire_session(&self) -> Result<Box<dyn Session>> {
        self.session_count.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(ChromiumSession {
            browser: Arc::clone(&self.browser),
            session_count: Arc::clone(&self.session_count),
        }))
    }

    fn active_sessions(&self) -> usize {
        self.session_count.load(Ordering::Relaxed)
    }

    async fn shutdown(&self) -> Result<()> {
        // Browser process exits when the CdpBrowser is dropped.
        Ok(())
    }
}

/// One job's rendering session. Pages are opened as fresh tabs against the
/// shared browser instance.
pub struct ChromiumSession {
    browser: Arc<CdpBrowser>,
    session_count: Arc<AtomicUsize>,
}

#[async_trait]
impl Session for ChromiumSession {
    async fn open(&self, url: &str, timeout_ms: u64) -> Result<Box<dyn PageHandle>, PageError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| PageError::Navigation {
                url: url.to_string(),
                reason: format!("failed to open tab: {e}"),
            })?;

        let nav = tokio::time::timeout(Duration::from_millis(timeout_ms), async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        })
        .await;

        match nav {
            Ok(Ok(())) => Ok(Box::new(ChromiumPage { page })),
            Ok(Err(e)) => {
                let _ = page.close().await;
                Err(PageError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                let _ = page.close().await;
                Err(PageError::NavigationTimeout {
                    url: url.to_string(),
                    timeout_ms,
                })
            }
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.session_count.fetch_sub(1, Ordering::Relaxed);
        Ok(())
    }
}

/// A single rendered tab.
pub struct ChromiumPage {
    page: Page,
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, PageError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| PageError::Detection(format!("script evaluation failed: {e}")))?;

        result
            .into_value()
            .map_err(|e| PageError::Detection(format!("non-JSON probe result: {e:?}")))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, PageError> {
        self.page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await
            .map_err(|e| PageError::Screenshot(e.to_string()))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let _ = self.page.close().await;
        Ok(())
    }
}
