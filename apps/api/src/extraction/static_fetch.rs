//! Plain HTTP fetch for server-rendered pages.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, redirect, Client};
use tracing::{debug, warn};
use url::Url;

use crate::extraction::html::summarize_html;
use crate::extraction::url_guard::check_url;
use crate::extraction::{ExtractedContent, FetchError, PageFetcher};
use crate::search::client::DESKTOP_USER_AGENT;

pub const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 5;

pub struct StaticFetcher {
    client: Client,
    max_body_bytes: usize,
}

impl StaticFetcher {
    pub fn new() -> Result<Self, FetchError> {
        // every redirect hop goes through the same host screening as the
        // original URL
        let policy = redirect::Policy::custom(|attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.error("too many redirects")
            } else if let Err(rejection) = check_url(attempt.url()) {
                attempt.error(rejection)
            } else {
                attempt.follow()
            }
        });

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static("zh-TW,zh;q=0.9,en;q=0.8"),
        );

        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(DESKTOP_USER_AGENT)
            .default_headers(headers)
            .redirect(policy)
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self {
            client,
            max_body_bytes: MAX_BODY_BYTES,
        })
    }

    /// Reads the body in chunks, aborting as soon as it passes the cap.
    async fn read_capped(&self, mut response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
        let limit = self.max_body_bytes;
        if let Some(declared) = response.content_length() {
            if declared as usize > limit {
                warn!("Declared body of {} bytes exceeds cap", declared);
                return Err(FetchError::TooLarge { limit });
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > limit {
                warn!("Body passed {} bytes mid-stream; aborting", limit);
                return Err(FetchError::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &Url) -> Result<ExtractedContent, FetchError> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = self.read_capped(response).await?;
        debug!("Fetched {} bytes from {}", body.len(), url);

        let html = String::from_utf8_lossy(&body);
        summarize_html(&html)
            .map(ExtractedContent::Summary)
            .ok_or(FetchError::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, response::Redirect, routing::get, Router};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn url(base: &str, path: &str) -> Url {
        Url::parse(&format!("{base}{path}")).unwrap()
    }

    #[tokio::test]
    async fn test_fetches_and_summarizes_html() {
        let base = serve(Router::new().route(
            "/job",
            get(|| async {
                axum::response::Html(
                    "<html><head><title>徵才</title></head><body><main>歡迎加入</main></body></html>",
                )
            }),
        ))
        .await;

        let fetcher = StaticFetcher::new().unwrap();
        let content = fetcher.fetch(&url(&base, "/job")).await.unwrap();
        assert_eq!(
            content,
            ExtractedContent::Summary("頁面標題：徵才\n內容：歡迎加入".to_string())
        );
    }

    #[tokio::test]
    async fn test_declared_oversized_body_is_rejected() {
        let base = serve(Router::new().route(
            "/big",
            get(|| async { "x".repeat(MAX_BODY_BYTES + 1) }),
        ))
        .await;

        let fetcher = StaticFetcher::new().unwrap();
        let err = fetcher.fetch(&url(&base, "/big")).await.unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn test_streamed_oversized_body_aborts() {
        let base = serve(Router::new().route(
            "/stream",
            get(|| async {
                let chunks = (0..7).map(|_| Ok::<_, std::io::Error>(vec![b'x'; 1024 * 1024]));
                Body::from_stream(futures::stream::iter(chunks))
            }),
        ))
        .await;

        let fetcher = StaticFetcher::new().unwrap();
        let err = fetcher.fetch(&url(&base, "/stream")).await.unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let base = serve(Router::new()).await;
        let fetcher = StaticFetcher::new().unwrap();
        let err = fetcher.fetch(&url(&base, "/missing")).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(404)));
    }

    #[tokio::test]
    async fn test_redirect_to_internal_host_is_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let target = format!("http://localhost:{port}/secret");
        let router = Router::new()
            .route(
                "/hop",
                get(move || {
                    let target = target.clone();
                    async move { Redirect::temporary(&target) }
                }),
            )
            .route("/secret", get(|| async { "internal" }));
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let fetcher = StaticFetcher::new().unwrap();
        let hop = Url::parse(&format!("http://127.0.0.1:{port}/hop")).unwrap();
        let err = fetcher.fetch(&hop).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
