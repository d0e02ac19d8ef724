//! WebDriver-backed sessions built on the `veil-driver` stealth browser.

use crate::backend::{Backend, RawResponse, Session, SessionConfig};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use url::Url;
use veil_common::WaitUntil;
use veil_driver::veil_browser::driver::{DriverConfig, VeilDriver};

/// Opens stealth-configured WebDriver sessions against a fixed endpoint.
pub struct WebDriverBackend {
    endpoint: String,
}

impl WebDriverBackend {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Backend for WebDriverBackend {
    async fn open_session(&self, config: &SessionConfig) -> Result<Box<dyn Session>> {
        let driver = VeilDriver::new(&DriverConfig {
            webdriver_url: self.endpoint.clone(),
            headless: config.headless,
            stealth: config.stealth,
            user_agent: config.user_agent.clone(),
        })
        .await?;
        Ok(Box::new(WebDriverSession {
            driver,
            headers: Vec::new(),
        }))
    }
}

/// One live browser tab.
///
/// The WebDriver protocol exposes neither navigation response status nor
/// response headers, so navigation recovers the status from
/// `PerformanceNavigationTiming` (falling back to 200) and reports the
/// document's parsed MIME type as `content-type`. Non-navigation verbs run
/// as in-page `fetch` calls, which do yield real status and headers.
struct WebDriverSession {
    driver: VeilDriver,
    headers: Vec<(String, String)>,
}

#[async_trait]
impl Session for WebDriverSession {
    async fn set_headers(&mut self, headers: &[(String, String)]) -> Result<()> {
        // The user agent was already fixed at launch; the rest applies to
        // in-page requests only, which is all WebDriver lets us express.
        self.headers = headers.to_vec();
        Ok(())
    }

    async fn navigate(
        &mut self,
        url: &str,
        wait: WaitUntil,
        timeout: Duration,
    ) -> Result<RawResponse> {
        let page = self.driver.goto(url, wait, timeout).await?;
        let body = page.content().await?;
        let status = page.navigation_status().await?.unwrap_or(200);

        let mut headers = Vec::new();
        if let Ok(content_type) = page.content_type().await {
            if !content_type.is_empty() {
                headers.push(("content-type".to_string(), content_type));
            }
        }

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    async fn request(
        &mut self,
        method: &str,
        url: &str,
        body: Option<&[u8]>,
        headers: &[(String, String)],
    ) -> Result<RawResponse> {
        let target = Url::parse(url).context("request url")?;
        let origin = target.origin().ascii_serialization();

        // Hop to the target origin first so the in-page fetch is
        // same-origin and its response stays readable.
        let mut page = self.driver.page();
        let current = page.url().await.unwrap_or_default();
        if !current.starts_with(&origin) {
            page.goto(
                &format!("{origin}/"),
                WaitUntil::DomContentLoaded,
                Duration::from_secs(30),
            )
            .await?;
        }

        let body_text = body.map(|b| String::from_utf8_lossy(b).into_owned());
        let effective = if headers.is_empty() {
            self.headers.clone()
        } else {
            headers.to_vec()
        };

        let reply = page
            .fetch_from_page(method, url, body_text.as_deref(), &effective)
            .await?;
        Ok(raw_response_from_reply(&reply))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.driver.close().await
    }
}

fn raw_response_from_reply(reply: &Value) -> RawResponse {
    let status = reply
        .get("status")
        .and_then(Value::as_u64)
        .and_then(|s| u16::try_from(s).ok())
        .unwrap_or_default();
    let headers = reply
        .get("headers")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string()))
                .collect()
        })
        .unwrap_or_default();
    let body = reply
        .get("body")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    RawResponse {
        status,
        headers,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reply_fields_map_onto_raw_response() {
        let reply = json!({
            "ok": true,
            "status": 200,
            "headers": {"content-type": "application/json"},
            "body": "{\"hits\":[]}",
        });
        let raw = raw_response_from_reply(&reply);
        assert_eq!(raw.status, 200);
        assert_eq!(
            raw.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
        assert_eq!(raw.body, "{\"hits\":[]}");
    }

    #[test]
    fn missing_fields_degrade_to_defaults() {
        let raw = raw_response_from_reply(&json!({"ok": true}));
        assert_eq!(raw.status, 0);
        assert!(raw.headers.is_empty());
        assert!(raw.body.is_empty());
    }
}
