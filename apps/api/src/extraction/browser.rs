//! Headless Chromium fetch for JavaScript-rendered pages.
//!
//! Each fetch launches its own browser and tears it down on every exit path.
//! The whole fetch, launch included, runs under one timeout; if the caller
//! drops the future instead, `BrowserSession`'s drop stops the CDP handler and
//! the browser process is killed with it.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BROWSER_TIMEOUT: Duration = Duration::from_secs(30);

/// Sub-resources not needed for text extraction.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
const BLOCKED_RESOURCES: &[&str] = &[
    // images
    "*.png", "*.jpg", "*.jpeg", "*.gif", "*.svg", "*.webp", "*.ico",
    // stylesheets and fonts
    "*.css", "*.woff", "*.woff2", "*.ttf", "*.otf", "*.eot",
];

pub struct BrowserFetcher {
    chrome_path: Option<PathBuf>,
    timeout: Duration,
    /// Host whose postings get the structured job-board extractor.
    job_board_domain: String,
}

impl BrowserFetcher {
    pub fn new(chrome_path: Option<PathBuf>, timeout: Duration) -> Self {
        Self {
            chrome_path,
            timeout,
            job_board_domain: "104.com.tw".to_string(),
        }
    }
}

#[cfg(not(feature = "browser"))]
mod disabled {
    use async_trait::async_trait;
    use url::Url;

    use super::BrowserFetcher;
    use crate::extraction::{ExtractedContent, FetchError, PageFetcher};

    #[async_trait]
    impl PageFetcher for BrowserFetcher {
        async fn fetch(&self, url: &Url) -> Result<ExtractedContent, FetchError> {
            tracing::warn!(
                "Dynamic fetch of {} skipped (timeout {:?}, chrome {:?}, job board {})",
                url,
                self.timeout,
                self.chrome_path,
                self.job_board_domain
            );
            Err(FetchError::Browser(
                "built without the `browser` feature".to_string(),
            ))
        }
    }
}

#[cfg(feature = "browser")]
mod live {
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use async_trait::async_trait;
    use chromiumoxide::cdp::browser_protocol::network::{
        EnableParams, SetBlockedUrLsParams, SetUserAgentOverrideParams,
    };
    use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
    use chromiumoxide::error::CdpError;
    use chromiumoxide::handler::viewport::Viewport;
    use chromiumoxide::{Browser, BrowserConfig, Page};
    use futures::StreamExt;
    use tokio::task::JoinHandle;
    use tracing::{debug, info, warn};
    use url::Url;

    use super::{BrowserFetcher, BLOCKED_RESOURCES};
    use crate::extraction::job_page::{self, FieldProbe, JOB_FIELD_PROBES};
    use crate::extraction::url_guard::host_matches;
    use crate::extraction::{ExtractedContent, FetchError, PageFetcher};
    use crate::search::client::DESKTOP_USER_AGENT;

    const CHROME_PATHS: &[&str] = &[
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    ];

    /// Resolves once the DOM is parsed; does not wait for network idle.
    const DOM_READY_SCRIPT: &str = r#"
        new Promise((resolve) => {
            if (document.readyState === 'interactive' || document.readyState === 'complete') {
                resolve(document.readyState);
            } else {
                document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
            }
        })
    "#;

    const BODY_TEXT_SCRIPT: &str = "document.body ? document.body.innerText : ''";

    /// Extra settle time for client-side rendering after DOMContentLoaded.
    const RENDER_SETTLE: Duration = Duration::from_secs(2);
    const SELECTOR_TIMEOUT: Duration = Duration::from_secs(2);

    impl From<CdpError> for FetchError {
        fn from(e: CdpError) -> Self {
            FetchError::Browser(e.to_string())
        }
    }

    /// A launched browser plus its CDP event loop.
    struct BrowserSession {
        browser: Browser,
        handler: JoinHandle<()>,
    }

    impl BrowserSession {
        async fn launch(chrome_path: Option<&Path>) -> Result<Self, FetchError> {
            let mut builder = BrowserConfig::builder()
                .window_size(1920, 1080)
                .viewport(Viewport {
                    width: 1920,
                    height: 1080,
                    ..Default::default()
                })
                .arg("--no-sandbox")
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage")
                .arg("--no-first-run")
                .arg("--no-default-browser-check");

            if let Some(path) = find_chrome(chrome_path) {
                builder = builder.chrome_executable(path);
            }

            let config = builder.build().map_err(FetchError::Browser)?;
            let (browser, mut handler) = Browser::launch(config).await?;

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            Ok(Self { browser, handler })
        }

        async fn close(mut self) {
            if let Err(e) = self.browser.close().await {
                debug!("Browser close failed: {}", e);
            }
            let _ = self.browser.wait().await;
        }
    }

    impl Drop for BrowserSession {
        fn drop(&mut self) {
            self.handler.abort();
        }
    }

    fn find_chrome(configured: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = configured {
            return Some(path.to_path_buf());
        }
        CHROME_PATHS
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
            .map(Path::to_path_buf)
    }

    #[async_trait]
    impl PageFetcher for BrowserFetcher {
        async fn fetch(&self, url: &Url) -> Result<ExtractedContent, FetchError> {
            match tokio::time::timeout(self.timeout, self.render(url)).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Browser fetch of {} timed out after {:?}", url, self.timeout);
                    Err(FetchError::Timeout(self.timeout.as_secs()))
                }
            }
        }
    }

    impl BrowserFetcher {
        async fn render(&self, url: &Url) -> Result<ExtractedContent, FetchError> {
            info!("Launching headless browser for {}", url);
            let session = BrowserSession::launch(self.chrome_path.as_deref()).await?;

            let result = match session.browser.new_page("about:blank").await {
                Ok(page) => {
                    let result = self.extract_from_page(&page, url).await;
                    let _ = page.close().await;
                    result
                }
                Err(e) => Err(e.into()),
            };

            session.close().await;
            result
        }

        async fn extract_from_page(
            &self,
            page: &Page,
            url: &Url,
        ) -> Result<ExtractedContent, FetchError> {
            page.execute(SetUserAgentOverrideParams::new(DESKTOP_USER_AGENT.to_string()))
                .await?;
            page.execute(EnableParams::default()).await?;
            page.execute(SetBlockedUrLsParams::new(
                BLOCKED_RESOURCES
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>(),
            ))
            .await?;

            let navigate = NavigateParams::builder()
                .url(url.as_str())
                .build()
                .map_err(FetchError::Browser)?;
            page.execute(navigate).await?;

            let state: String = page
                .evaluate(DOM_READY_SCRIPT.to_string())
                .await?
                .into_value()
                .unwrap_or_else(|_| "unknown".to_string());
            debug!("Page ready state: {}", state);
            tokio::time::sleep(RENDER_SETTLE).await;

            let body: String = page
                .evaluate(BODY_TEXT_SCRIPT.to_string())
                .await?
                .into_value()
                .unwrap_or_default();

            if !host_matches(url, &self.job_board_domain) {
                return job_page::generic_page(&body).ok_or(FetchError::Empty);
            }

            if let Some(content) = job_page::structured_sections(&body) {
                info!("Job page sliced into sections");
                return Ok(content);
            }

            let fields = probe_fields(page).await;
            if let Some(content) = job_page::summarize_fields(&fields) {
                info!("Job page matched {} headline fields", fields.len());
                return Ok(content);
            }

            warn!("Job page layout not recognised; using page text");
            job_page::fallback_dump(&body).ok_or(FetchError::Empty)
        }
    }

    /// First non-empty match for each probe's selector list.
    async fn probe_fields(page: &Page) -> Vec<(&'static FieldProbe, String)> {
        let mut found = Vec::new();
        for probe in JOB_FIELD_PROBES {
            for selector in probe.selectors {
                let lookup = page.find_element(*selector);
                let element = match tokio::time::timeout(SELECTOR_TIMEOUT, lookup).await {
                    Ok(Ok(element)) => element,
                    _ => continue,
                };
                if let Ok(Some(text)) = element.inner_text().await {
                    if !text.trim().is_empty() {
                        found.push((probe, text));
                        break;
                    }
                }
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_resources_cover_images_and_fonts() {
        for pattern in ["*.webp", "*.ico", "*.ttf", "*.otf", "*.woff2", "*.css"] {
            assert!(BLOCKED_RESOURCES.contains(&pattern), "{pattern} not blocked");
        }
        assert!(BLOCKED_RESOURCES.iter().all(|p| p.starts_with("*.")));
        assert!(!BLOCKED_RESOURCES.contains(&"*.font"));
    }
}
