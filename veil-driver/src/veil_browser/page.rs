use crate::veil_browser::{behavioral::Pacer, stealth::StealthScripts};
use anyhow::{anyhow, Result};
use fantoccini::Client;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::debug;
use veil_common::{StealthLevel, WaitUntil};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// High-level page wrapper: navigation with readiness waits, raw content
/// retrieval, and in-page request execution.
pub struct VeilPage {
    pub(crate) client: Client,
    pub(crate) stealth: StealthLevel,
    pub(crate) pacer: Pacer,
}

impl VeilPage {
    /// Construct a page wrapper around an existing WebDriver client.
    pub fn new(client: Client, stealth: StealthLevel, pacer: Pacer) -> Self {
        Self {
            client,
            stealth,
            pacer,
        }
    }

    /// Navigate to `url`, apply evasion scripts, and wait until the
    /// requested readiness signal or `timeout`.
    pub async fn goto(&mut self, url: &str, wait: WaitUntil, timeout: Duration) -> Result<()> {
        self.pacer.random_delay(300, 1200).await;
        self.client.goto(url).await.map_err(anyhow::Error::from)?;

        self.apply_stealth().await?;
        self.wait_until_ready(wait, timeout).await?;

        Ok(())
    }

    /// Apply evasion scripts appropriate for the session's stealth level.
    async fn apply_stealth(&mut self) -> Result<()> {
        self.client
            .execute(StealthScripts::core_evasions(), vec![])
            .await?;

        match self.stealth {
            StealthLevel::Lightweight => {
                // No additional scripts for the lightest level
            }

            StealthLevel::Balanced => {
                self.client
                    .execute(StealthScripts::canvas_evasions(), vec![])
                    .await?;
            }

            StealthLevel::Maximum => {
                self.client
                    .execute(StealthScripts::canvas_evasions(), vec![])
                    .await?;
                self.client
                    .execute(StealthScripts::webgl_evasions(), vec![])
                    .await?;
            }
        }
        Ok(())
    }

    /// Poll `document.readyState` until the requested signal is reached.
    ///
    /// WebDriver has no notion of a quiet network, so `NetworkIdle` is
    /// approximated as `complete` plus a short jittered settle pause.
    async fn wait_until_ready(&mut self, wait: WaitUntil, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let state = self
                .client
                .execute("return document.readyState;", vec![])
                .await?;
            let state = state.as_str().unwrap_or_default();
            let ready = match wait {
                WaitUntil::DomContentLoaded => state == "interactive" || state == "complete",
                WaitUntil::NetworkIdle => state == "complete",
            };
            if ready {
                break;
            }
            if Instant::now() >= deadline {
                return Err(anyhow!(
                    "page did not become ready within {}ms",
                    timeout.as_millis()
                ));
            }
            sleep(READY_POLL_INTERVAL).await;
        }

        if matches!(wait, WaitUntil::NetworkIdle) {
            self.pacer.settle().await;
        }
        Ok(())
    }

    /// Return the full page source.
    pub async fn content(&self) -> Result<String> {
        self.client.source().await.map_err(anyhow::Error::from)
    }

    /// MIME type the document was parsed as.
    pub async fn content_type(&self) -> Result<String> {
        let v = self
            .client
            .execute("return document.contentType;", vec![])
            .await?;
        Ok(v.as_str().unwrap_or_default().to_string())
    }

    /// HTTP status of the navigation response, when the engine exposes it.
    ///
    /// Chromium surfaces the status on `PerformanceNavigationTiming`; other
    /// engines report nothing and we return `None`.
    pub async fn navigation_status(&self) -> Result<Option<u16>> {
        let v = self
            .client
            .execute(
                r#"
                const entries = performance.getEntriesByType('navigation');
                return entries.length ? (entries[0].responseStatus || 0) : 0;
                "#,
                vec![],
            )
            .await?;
        Ok(v.as_u64()
            .and_then(|s| u16::try_from(s).ok())
            .filter(|s| (100..=599).contains(s)))
    }

    /// Issue a request from inside the page via `fetch`, returning the
    /// response status, headers, and body text as a JSON object.
    ///
    /// Running the request in the page's own network context keeps cookies,
    /// TLS identity, and header order indistinguishable from ordinary
    /// browsing, which is the point of driving a browser at all.
    pub async fn fetch_from_page(
        &mut self,
        method: &str,
        url: &str,
        body: Option<&str>,
        headers: &[(String, String)],
    ) -> Result<Value> {
        let header_map: serde_json::Map<String, Value> = headers
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        let script = r#"
            const method = arguments[0];
            const url = arguments[1];
            const body = arguments[2];
            const headers = arguments[3];
            const done = arguments[4];
            fetch(url, {
                method: method,
                headers: headers,
                body: body === null ? undefined : body,
                credentials: 'include',
            }).then(async (res) => {
                const collected = {};
                res.headers.forEach((value, key) => { collected[key] = value; });
                const text = await res.text();
                done({ ok: true, status: res.status, headers: collected, body: text });
            }).catch((err) => done({ ok: false, error: String(err) }));
        "#;

        let args = vec![
            json!(method),
            json!(url),
            body.map(|b| json!(b)).unwrap_or(Value::Null),
            Value::Object(header_map),
        ];

        debug!(target: "browser.fetch", %method, %url, "issuing in-page request");
        let v = self.client.execute_async(script, args).await?;

        if v.get("ok").and_then(Value::as_bool) != Some(true) {
            let message = v
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("in-page fetch failed");
            return Err(anyhow!("{message}"));
        }
        Ok(v)
    }

    /// Return the current page URL.
    pub async fn url(&self) -> Result<String> {
        self.client
            .current_url()
            .await
            .map(|url| url.to_string())
            .map_err(anyhow::Error::from)
    }
}
