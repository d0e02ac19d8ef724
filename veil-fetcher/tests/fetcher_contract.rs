//! Contract tests for the fetcher against a deterministic mock backend.

mod common;

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use veil_common::WaitUntil;
use veil_fetcher::{
    Backend, ContentKind, FetchErrorKind, FetchRequest, Fetcher, FetcherConfig, RawResponse,
    Session, SessionConfig,
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Behavior {
    Respond,
    NeverRespond,
    FailNavigation,
    FailOpen,
}

/// Backend that serves one canned response and counts live sessions.
#[derive(Clone)]
struct MockBackend {
    canned: RawResponse,
    behavior: Behavior,
    live_sessions: Arc<AtomicUsize>,
    opened_sessions: Arc<AtomicUsize>,
    seen_headers: Arc<StdMutex<Vec<(String, String)>>>,
    seen_method: Arc<StdMutex<Option<String>>>,
}

impl MockBackend {
    fn respond_with(canned: RawResponse) -> Self {
        Self {
            canned,
            behavior: Behavior::Respond,
            live_sessions: Arc::new(AtomicUsize::new(0)),
            opened_sessions: Arc::new(AtomicUsize::new(0)),
            seen_headers: Arc::new(StdMutex::new(Vec::new())),
            seen_method: Arc::new(StdMutex::new(None)),
        }
    }

    fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    fn live(&self) -> usize {
        self.live_sessions.load(Ordering::SeqCst)
    }

    fn opened(&self) -> usize {
        self.opened_sessions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn open_session(&self, config: &SessionConfig) -> anyhow::Result<Box<dyn Session>> {
        if self.behavior == Behavior::FailOpen {
            anyhow::bail!("webdriver endpoint refused the connection");
        }
        self.live_sessions.fetch_add(1, Ordering::SeqCst);
        self.opened_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            canned: self.canned.clone(),
            behavior: self.behavior,
            live_sessions: self.live_sessions.clone(),
            seen_headers: self.seen_headers.clone(),
            seen_method: self.seen_method.clone(),
            user_agent: config.user_agent.clone(),
        }))
    }
}

struct MockSession {
    canned: RawResponse,
    behavior: Behavior,
    live_sessions: Arc<AtomicUsize>,
    seen_headers: Arc<StdMutex<Vec<(String, String)>>>,
    seen_method: Arc<StdMutex<Option<String>>>,
    #[allow(dead_code)]
    user_agent: Option<String>,
}

impl MockSession {
    async fn respond(&self, method: &str) -> anyhow::Result<RawResponse> {
        *self.seen_method.lock().unwrap() = Some(method.to_string());
        match self.behavior {
            Behavior::NeverRespond => {
                std::future::pending::<()>().await;
                anyhow::bail!("unreachable");
            }
            Behavior::FailNavigation => anyhow::bail!("tab crashed"),
            _ => Ok(self.canned.clone()),
        }
    }
}

#[async_trait]
impl Session for MockSession {
    async fn set_headers(&mut self, headers: &[(String, String)]) -> anyhow::Result<()> {
        *self.seen_headers.lock().unwrap() = headers.to_vec();
        Ok(())
    }

    async fn navigate(
        &mut self,
        _url: &str,
        _wait: WaitUntil,
        _timeout: Duration,
    ) -> anyhow::Result<RawResponse> {
        self.respond("GET").await
    }

    async fn request(
        &mut self,
        method: &str,
        _url: &str,
        _body: Option<&[u8]>,
        _headers: &[(String, String)],
    ) -> anyhow::Result<RawResponse> {
        self.respond(method).await
    }

    async fn close(self: Box<Self>) -> anyhow::Result<()> {
        self.live_sessions.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

fn fetcher_over(backend: &MockBackend) -> Fetcher {
    Fetcher::new(Box::new(backend.clone()), FetcherConfig::default())
}

fn json_response() -> RawResponse {
    RawResponse {
        status: 200,
        headers: vec![(
            "content-type".to_string(),
            "application/json; charset=utf-8".to_string(),
        )],
        body: r#"{"hits":{"total":2,"hits":[{"_id":"a"},{"_id":"b"}]}}"#.to_string(),
    }
}

#[tokio::test]
async fn declared_json_comes_back_decoded_without_a_note() {
    common::init_test_tracing();
    let backend = MockBackend::respond_with(json_response());
    let fetcher = fetcher_over(&backend);

    let result = fetcher
        .fetch(&FetchRequest::get("https://filings.example.com/search-index"))
        .await
        .unwrap();

    assert_eq!(result.status, 200);
    assert_eq!(result.kind, ContentKind::Json);
    assert_eq!(
        result.payload.as_json().unwrap()["hits"]["total"],
        json!(2)
    );
    assert!(result.extraction_note.is_none());
    assert_eq!(
        result.headers.get("content-type").map(String::as_str),
        Some("application/json; charset=utf-8")
    );

    fetcher.close().await.unwrap();
}

#[tokio::test]
async fn html_wrapped_xml_is_unwrapped_to_the_exact_span() {
    common::init_test_tracing();
    let xml = "<ownershipDocument><issuer><issuerCik>0001774807</issuerCik></issuer></ownershipDocument>";
    let backend = MockBackend::respond_with(RawResponse {
        status: 200,
        headers: vec![("content-type".to_string(), "text/html".to_string())],
        body: format!("<html><head><title>filing</title></head><body><pre>{xml}</pre></body></html>"),
    });
    let fetcher = fetcher_over(&backend);

    let result = fetcher
        .fetch(&FetchRequest::get(
            "https://filings.example.com/archives/ownership.xml",
        ))
        .await
        .unwrap();

    assert_eq!(result.kind, ContentKind::Xml);
    assert_eq!(result.payload.as_text(), Some(xml));
    let note = result.extraction_note.expect("unwrap should leave a note");
    assert!(!note.is_empty());

    fetcher.close().await.unwrap();
}

#[tokio::test]
async fn denial_page_yields_blocked_never_a_success() {
    common::init_test_tracing();
    let backend = MockBackend::respond_with(RawResponse {
        status: 200,
        headers: vec![("content-type".to_string(), "text/html".to_string())],
        body: "<html><body><h1>Access Denied</h1><p>Reference #18.b</p></body></html>".to_string(),
    });
    let fetcher = fetcher_over(&backend);

    let err = fetcher
        .fetch(&FetchRequest::get("https://filings.example.com/"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, FetchErrorKind::Blocked);

    fetcher.close().await.unwrap();
}

#[tokio::test]
async fn identical_requests_give_identical_results() {
    common::init_test_tracing();
    let backend = MockBackend::respond_with(json_response());
    let fetcher = fetcher_over(&backend);
    let request = FetchRequest::get("https://filings.example.com/search-index");

    let first = fetcher.fetch(&request).await.unwrap();
    let second = fetcher.fetch(&request).await.unwrap();

    assert_eq!(first, second);
    // The session is reused, not reopened, between calls.
    assert_eq!(backend.opened(), 1);

    fetcher.close().await.unwrap();
}

#[tokio::test]
async fn unresponsive_backend_times_out_instead_of_hanging() {
    common::init_test_tracing();
    let backend =
        MockBackend::respond_with(json_response()).with_behavior(Behavior::NeverRespond);
    let fetcher = fetcher_over(&backend);

    let request = FetchRequest::get("https://filings.example.com/slow")
        .with_timeout(Duration::from_millis(50));
    let err = fetcher.fetch(&request).await.unwrap_err();

    assert_eq!(err.kind, FetchErrorKind::Timeout);
    // The timed-out session was discarded, not leaked.
    assert_eq!(backend.live(), 0);
}

#[tokio::test]
async fn post_goes_through_the_request_path_with_its_body() {
    common::init_test_tracing();
    let backend = MockBackend::respond_with(json_response());
    let fetcher = fetcher_over(&backend);

    let request = FetchRequest::post(
        "https://filings.example.com/search-index",
        br#"{"forms":["4"],"dateRange":"30d"}"#.to_vec(),
    )
    .with_header("Content-Type", "application/json");
    let result = fetcher.fetch(&request).await.unwrap();

    assert_eq!(result.kind, ContentKind::Json);
    assert_eq!(
        backend.seen_method.lock().unwrap().as_deref(),
        Some("POST")
    );

    fetcher.close().await.unwrap();
}

#[tokio::test]
async fn header_overrides_merge_case_insensitively_over_the_baseline() {
    common::init_test_tracing();
    let backend = MockBackend::respond_with(json_response());
    let fetcher = fetcher_over(&backend);

    let request = FetchRequest::get("https://filings.example.com/search-index")
        .with_header("accept", "application/json, */*");
    fetcher.fetch(&request).await.unwrap();

    let seen = backend.seen_headers.lock().unwrap().clone();
    let accepts: Vec<_> = seen
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case("accept"))
        .collect();
    assert_eq!(accepts.len(), 1);
    assert_eq!(accepts[0].1, "application/json, */*");
    assert!(seen
        .iter()
        .any(|(name, value)| name == "User-Agent" && value.starts_with("Mozilla/5.0")));

    fetcher.close().await.unwrap();
}

#[tokio::test]
async fn close_is_idempotent_and_open_is_explicit() {
    common::init_test_tracing();
    let backend = MockBackend::respond_with(json_response());
    let fetcher = fetcher_over(&backend);

    // Safe to close before any session exists.
    fetcher.close().await.unwrap();
    assert_eq!(backend.live(), 0);

    fetcher.open().await.unwrap();
    assert_eq!(backend.live(), 1);

    fetcher.close().await.unwrap();
    fetcher.close().await.unwrap();
    assert_eq!(backend.live(), 0);
}

#[tokio::test]
async fn backend_failures_surface_as_transport_and_leak_nothing() {
    common::init_test_tracing();
    let crashing =
        MockBackend::respond_with(json_response()).with_behavior(Behavior::FailNavigation);
    let fetcher = fetcher_over(&crashing);

    let err = fetcher
        .fetch(&FetchRequest::get("https://filings.example.com/"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FetchErrorKind::TransportFailure);
    assert!(err.message.contains("tab crashed"));
    assert_eq!(crashing.live(), 0);

    let refusing = MockBackend::respond_with(json_response()).with_behavior(Behavior::FailOpen);
    let fetcher = fetcher_over(&refusing);
    let err = fetcher
        .fetch(&FetchRequest::get("https://filings.example.com/"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FetchErrorKind::TransportFailure);
    assert!(err.message.contains("failed to start"));
    assert_eq!(refusing.live(), 0);
}

#[tokio::test]
async fn invalid_requests_never_reach_the_backend() {
    common::init_test_tracing();
    let backend = MockBackend::respond_with(json_response());
    let fetcher = fetcher_over(&backend);

    let err = fetcher
        .fetch(&FetchRequest::get("not a url"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FetchErrorKind::TransportFailure);
    assert_eq!(backend.opened(), 0);
}
