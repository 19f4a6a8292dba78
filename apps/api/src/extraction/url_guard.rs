//! URL discovery and request-forgery screening.
//!
//! The host check is a string-prefix test, not CIDR arithmetic: it blocks the
//! obvious internal targets and errs on the side of rejecting.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use url::Url;

static RE_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://[^\s]+").unwrap());

const BLOCKED_HOSTS: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0", "::1", "[::1]"];
const PRIVATE_PREFIXES: &[&str] = &["10.", "172.", "192.168.", "169.254."];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlRejection {
    #[error("malformed URL: {0}")]
    Malformed(String),

    #[error("scheme '{0}' is not allowed")]
    Scheme(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("host '{0}' is a loopback address")]
    Loopback(String),

    #[error("host '{0}' is in a private range")]
    PrivateRange(String),
}

/// First `http(s)://` substring of a free-text query, if any.
pub fn extract_first_url(text: &str) -> Option<&str> {
    RE_URL.find(text).map(|m| m.as_str())
}

/// Parses `raw` and rejects anything but public http(s) hosts.
pub fn validate_url(raw: &str) -> Result<Url, UrlRejection> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlRejection::Malformed(e.to_string()))?;
    check_url(&url)?;
    Ok(url)
}

/// Host and scheme screening for an already-parsed URL (redirect targets).
pub fn check_url(url: &Url) -> Result<(), UrlRejection> {
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UrlRejection::Scheme(other.to_string())),
    }

    let host = url
        .host_str()
        .map(|h| h.trim_end_matches('.').to_ascii_lowercase())
        .filter(|h| !h.is_empty())
        .ok_or(UrlRejection::MissingHost)?;

    if BLOCKED_HOSTS.contains(&host.as_str()) {
        return Err(UrlRejection::Loopback(host));
    }
    if PRIVATE_PREFIXES.iter().any(|p| host.starts_with(p)) {
        return Err(UrlRejection::PrivateRange(host));
    }
    Ok(())
}

/// True when `url`'s host is `domain` or one of its subdomains.
pub fn host_matches(url: &Url, domain: &str) -> bool {
    let domain = domain.trim().trim_start_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return false;
    }
    url.host_str().is_some_and(|host| {
        let host = host.to_ascii_lowercase();
        host == domain || host.ends_with(&format!(".{domain}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_localhost() {
        assert!(matches!(
            validate_url("http://localhost/x"),
            Err(UrlRejection::Loopback(_))
        ));
    }

    #[test]
    fn test_rejects_loopback_ip() {
        assert!(matches!(
            validate_url("https://127.0.0.1/x"),
            Err(UrlRejection::Loopback(_))
        ));
    }

    #[test]
    fn test_rejects_private_range() {
        assert!(matches!(
            validate_url("http://192.168.1.5/x"),
            Err(UrlRejection::PrivateRange(_))
        ));
        assert!(validate_url("http://10.0.0.8/admin").is_err());
        assert!(validate_url("http://172.16.0.1/").is_err());
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        assert_eq!(
            validate_url("ftp://host/x"),
            Err(UrlRejection::Scheme("ftp".to_string()))
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            validate_url("not a url"),
            Err(UrlRejection::Malformed(_))
        ));
    }

    #[test]
    fn test_accepts_job_board_posting() {
        let url = validate_url("https://www.104.com.tw/job/abc123").unwrap();
        assert_eq!(url.host_str(), Some("www.104.com.tw"));
    }

    #[test]
    fn test_extract_first_url() {
        let text = "幫我看看 https://www.104.com.tw/job/abc123 和 http://example.com";
        assert_eq!(
            extract_first_url(text),
            Some("https://www.104.com.tw/job/abc123")
        );
        assert_eq!(extract_first_url("沒有網址"), None);
    }

    #[test]
    fn test_host_matches_suffix_only() {
        let job = Url::parse("https://www.104.com.tw/job/1").unwrap();
        assert!(host_matches(&job, "104.com.tw"));

        let lookalike = Url::parse("https://evil.com/?next=104.com.tw").unwrap();
        assert!(!host_matches(&lookalike, "104.com.tw"));

        let prefix = Url::parse("https://not104.com.tw/").unwrap();
        assert!(!host_matches(&prefix, "104.com.tw"));
    }
}
