//! The fetcher: session lifecycle plus one classified retrieval per call.

use crate::backend::{Backend, Session, SessionConfig};
use crate::classify::{ExtractionRules, classify};
use crate::outcome::{FetchError, FetchResult};
use crate::request::{FetchRequest, Method};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio::time::timeout;
use url::Url;
use uuid::Uuid;
use veil_common::StealthLevel;

/// Tuning for a fetcher instance.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub headless: bool,
    pub stealth: StealthLevel,
    pub rules: ExtractionRules,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            headless: true,
            stealth: StealthLevel::default(),
            rules: ExtractionRules::default(),
        }
    }
}

/// Owns a browser session lifecycle and turns raw responses into classified
/// outcomes.
///
/// The session is created lazily on the first call, reused across calls,
/// and torn down by [`Fetcher::close`] or whenever a call leaves it in an
/// unknown state (timeout, backend failure). Calls are serialized through
/// an internal mutex; the underlying browser cannot interleave navigations,
/// so a shared fetcher stays safe without caller-side locking.
pub struct Fetcher {
    backend: Box<dyn Backend>,
    config: FetcherConfig,
    session: Mutex<Option<Box<dyn Session>>>,
}

impl Fetcher {
    pub fn new(backend: Box<dyn Backend>, config: FetcherConfig) -> Self {
        Self {
            backend,
            config,
            session: Mutex::new(None),
        }
    }

    /// Eagerly acquire the browser session.
    ///
    /// Optional; `fetch` opens one on demand. Fails with a transport error
    /// when the backend cannot start.
    pub async fn open(&self) -> Result<(), FetchError> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            *guard = Some(self.open_session(None).await?);
        }
        Ok(())
    }

    /// Release the session. Idempotent; safe to call when `open` never
    /// succeeded or the session is already gone.
    pub async fn close(&self) -> Result<(), FetchError> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.take() {
            session
                .close()
                .await
                .map_err(|e| FetchError::transport(format!("session close failed: {e:#}")))?;
        }
        Ok(())
    }

    /// Fetch one document.
    ///
    /// Exactly one of a result or an error comes back; there are no partial
    /// bodies and no internal retries. Retry and pacing policy belong to
    /// the caller.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, FetchError> {
        validate(request)?;

        let req_id = Uuid::new_v4();
        let merged = request.merged_headers();
        let user_agent = merged
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
            .map(|(_, value)| value.clone());

        tracing::debug!(
            target: "fetch.request",
            %req_id,
            url = %request.url,
            method = request.method.as_str(),
            wait = ?request.wait,
            timeout_ms = request.timeout.as_millis() as u64,
            "fetch.start"
        );

        // One request in flight per session.
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            *guard = Some(self.open_session(user_agent).await?);
            tracing::debug!(target: "fetch.session", %req_id, "browser session opened");
        }
        let Some(session) = guard.as_mut() else {
            return Err(FetchError::transport("browser session unavailable"));
        };

        if let Err(err) = session.set_headers(&merged).await {
            if let Some(stale) = guard.take() {
                let _ = stale.close().await;
            }
            return Err(FetchError::transport(format!("applying headers: {err:#}")));
        }

        let attempt = match request.method {
            Method::Get => {
                timeout(
                    request.timeout,
                    session.navigate(&request.url, request.wait, request.timeout),
                )
                .await
            }
            Method::Post => {
                timeout(
                    request.timeout,
                    session.request(
                        request.method.as_str(),
                        &request.url,
                        request.body.as_deref(),
                        &merged,
                    ),
                )
                .await
            }
        };

        let raw = match attempt {
            Err(_elapsed) => {
                // A session that outlived its navigation is in an unknown
                // state; drop it so the next call starts clean.
                if let Some(stale) = guard.take() {
                    let _ = stale.close().await;
                }
                tracing::warn!(
                    target: "fetch.request",
                    %req_id,
                    timeout_ms = request.timeout.as_millis() as u64,
                    "fetch.timeout"
                );
                return Err(FetchError::timeout(format!(
                    "no response within {}ms",
                    request.timeout.as_millis()
                )));
            }
            Ok(Err(err)) => {
                if let Some(stale) = guard.take() {
                    let _ = stale.close().await;
                }
                tracing::warn!(target: "fetch.request", %req_id, error = %err, "fetch.backend_error");
                return Err(FetchError::transport(format!("{err:#}")));
            }
            Ok(Ok(raw)) => raw,
        };
        drop(guard);

        tracing::debug!(
            target: "fetch.response",
            %req_id,
            status = raw.status,
            body_len = raw.body.len(),
            "fetch.response"
        );

        if !(100..=599).contains(&raw.status) {
            return Err(FetchError::transport(format!(
                "backend reported implausible status {}",
                raw.status
            )));
        }

        let content_type = raw
            .headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.as_str());

        let classified = classify(&request.url, content_type, &raw.body, &self.config.rules)?;

        if let Some(note) = &classified.note {
            tracing::debug!(target: "fetch.extract", %req_id, %note, "payload unwrapped");
        }

        Ok(FetchResult {
            status: raw.status,
            headers: raw.headers.into_iter().collect::<HashMap<_, _>>(),
            payload: classified.payload,
            kind: classified.kind,
            extraction_note: classified.note,
        })
    }

    async fn open_session(
        &self,
        user_agent: Option<String>,
    ) -> Result<Box<dyn Session>, FetchError> {
        let config = SessionConfig {
            headless: self.config.headless,
            stealth: self.config.stealth,
            user_agent,
        };
        self.backend
            .open_session(&config)
            .await
            .map_err(|e| FetchError::transport(format!("backend failed to start: {e:#}")))
    }
}

fn validate(request: &FetchRequest) -> Result<(), FetchError> {
    if request.url.trim().is_empty() {
        return Err(FetchError::transport("request url is empty"));
    }
    let parsed = Url::parse(&request.url)
        .map_err(|e| FetchError::transport(format!("invalid url {:?}: {e}", request.url)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::transport(format!(
            "unsupported scheme {:?}",
            parsed.scheme()
        )));
    }
    if request.method == Method::Post && request.body.is_none() {
        return Err(FetchError::transport("post request requires a body"));
    }
    if request.timeout.is_zero() {
        return Err(FetchError::transport("timeout must be positive"));
    }
    Ok(())
}
