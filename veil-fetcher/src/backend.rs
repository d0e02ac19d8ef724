//! Capability interface over a browser-automation backend.
//!
//! The fetcher never talks to a browser directly; it drives these traits.
//! The production implementation lives in [`crate::webdriver`], and tests
//! substitute deterministic mocks at the same seam.

use async_trait::async_trait;
use std::time::Duration;
use veil_common::{StealthLevel, WaitUntil};

/// Raw response surfaced by a backend before classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Options a backend applies when opening a session.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub headless: bool,
    pub stealth: StealthLevel,
    /// User agent the session should present, when the caller overrode it.
    pub user_agent: Option<String>,
}

/// A live browser session. One request in flight at a time; the fetcher
/// serializes its calls.
#[async_trait]
pub trait Session: Send {
    /// Apply header overrides for subsequent requests. Backends honor what
    /// their transport can express.
    async fn set_headers(&mut self, headers: &[(String, String)]) -> anyhow::Result<()>;

    /// Navigate to `url`, waiting for the readiness signal or `timeout`.
    async fn navigate(
        &mut self,
        url: &str,
        wait: WaitUntil,
        timeout: Duration,
    ) -> anyhow::Result<RawResponse>;

    /// Issue a non-navigation request (e.g. POST with a body).
    async fn request(
        &mut self,
        method: &str,
        url: &str,
        body: Option<&[u8]>,
        headers: &[(String, String)],
    ) -> anyhow::Result<RawResponse>;

    /// Release the session and its OS resources.
    async fn close(self: Box<Self>) -> anyhow::Result<()>;
}

/// Factory for sessions; implementations own the backend specifics.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn open_session(&self, config: &SessionConfig) -> anyhow::Result<Box<dyn Session>>;
}
