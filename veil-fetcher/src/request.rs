//! Request model and the baseline browser header set.

use std::time::Duration;
use veil_common::WaitUntil;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Baseline realistic browser headers underlying every request.
///
/// Immutable; per-request overrides are merged over it functionally, so a
/// reused fetcher cannot bleed headers from one request into the next.
pub const BASELINE_HEADERS: &[(&str, &str)] = &[
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:135.0) Gecko/20100101 Firefox/135.0",
    ),
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
    ),
    ("Accept-Language", "en-US,en;q=0.5"),
    ("Accept-Encoding", "gzip, deflate, br"),
    ("Connection", "keep-alive"),
    ("Upgrade-Insecure-Requests", "1"),
];

/// HTTP method supported by the fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// One document retrieval. Constructed by the caller, consumed by a single
/// `fetch` call.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub method: Method,
    /// Opaque request body; required for POST.
    pub body: Option<Vec<u8>>,
    /// Ordered header overrides. Keys are case-insensitive and later
    /// entries override earlier ones.
    pub headers: Vec<(String, String)>,
    pub wait: WaitUntil,
    pub timeout: Duration,
}

impl FetchRequest {
    /// GET request with default wait policy and timeout.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            body: None,
            headers: Vec::new(),
            wait: WaitUntil::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// POST request carrying `body`.
    pub fn post(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            method: Method::Post,
            body: Some(body.into()),
            headers: Vec::new(),
            wait: WaitUntil::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_wait(mut self, wait: WaitUntil) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Effective header set for this request: baseline merged with overrides.
    pub fn merged_headers(&self) -> Vec<(String, String)> {
        merge_headers(&self.headers)
    }
}

/// Merge `overrides` over [`BASELINE_HEADERS`].
///
/// Matching is case-insensitive; later entries win. Baseline ordering is
/// preserved for names that are only overridden, and new names append in
/// the order they first appear.
pub fn merge_headers(overrides: &[(String, String)]) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = BASELINE_HEADERS
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    for (name, value) in overrides {
        match merged
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(slot) => *slot = (name.clone(), value.clone()),
            None => merged.push((name.clone(), value.clone())),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_survives_empty_overrides() {
        let merged = merge_headers(&[]);
        assert_eq!(merged.len(), BASELINE_HEADERS.len());
        assert_eq!(merged[0].0, "User-Agent");
    }

    #[test]
    fn override_matches_case_insensitively() {
        let merged = merge_headers(&[("accept".to_string(), "application/xml".to_string())]);
        let accepts: Vec<_> = merged
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("accept"))
            .collect();
        assert_eq!(accepts.len(), 1);
        assert_eq!(accepts[0].1, "application/xml");
    }

    #[test]
    fn later_override_wins() {
        let merged = merge_headers(&[
            ("X-Probe".to_string(), "one".to_string()),
            ("x-probe".to_string(), "two".to_string()),
        ]);
        let probes: Vec<_> = merged
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("x-probe"))
            .collect();
        assert_eq!(probes.len(), 1);
        assert_eq!(probes[0].1, "two");
    }

    #[test]
    fn merge_does_not_mutate_the_baseline() {
        let _ = merge_headers(&[("User-Agent".to_string(), "curl/8.0".to_string())]);
        let fresh = merge_headers(&[]);
        assert!(fresh[0].1.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn request_builders_set_method_and_body() {
        let get = FetchRequest::get("https://example.com/doc.xml");
        assert_eq!(get.method, Method::Get);
        assert!(get.body.is_none());
        assert_eq!(get.timeout, DEFAULT_TIMEOUT);

        let post = FetchRequest::post("https://example.com/search", br#"{"q":1}"#.to_vec());
        assert_eq!(post.method, Method::Post);
        assert!(post.body.is_some());
    }
}
