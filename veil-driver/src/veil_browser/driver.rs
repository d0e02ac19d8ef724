use crate::veil_browser::{
    behavioral::Pacer,
    fingerprint::{BrowserProfile, ProfilePool},
    page::VeilPage,
    stealth::build_stealth_arguments,
};
use anyhow::Result;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use veil_common::{StealthLevel, WaitUntil};
use webdriver::capabilities::Capabilities;

/// Options for launching a stealth-configured browser session.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// WebDriver endpoint to connect to (Chromedriver by default).
    pub webdriver_url: String,
    pub headless: bool,
    pub stealth: StealthLevel,
    /// Replaces the pooled profile's user agent when set.
    pub user_agent: Option<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            stealth: StealthLevel::default(),
            user_agent: None,
        }
    }
}

/// Thin wrapper around a `fantoccini` WebDriver client with stealth and
/// pacing helpers.
pub struct VeilDriver {
    pub client: Client,
    pacer: Pacer,
    profile: BrowserProfile,
    stealth: StealthLevel,
}

impl VeilDriver {
    /// Create a new driver connected to a running WebDriver service.
    pub async fn new(config: &DriverConfig) -> Result<Self> {
        let mut pool = ProfilePool::builtin();
        let mut profile = pool.session_profile().clone();
        if let Some(ua) = &config.user_agent {
            profile.user_agent = ua.clone();
        }

        let mut args = build_stealth_arguments(config.stealth, &profile);
        if config.headless {
            args.push("--headless".to_string());
            args.push("--disable-gpu".to_string());
        }

        let mut chrome_opts = HashMap::new();
        chrome_opts.insert("args".to_string(), json!(args));

        let mut caps = Capabilities::new();
        caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&config.webdriver_url)
            .await?;

        tracing::debug!(
            target: "browser.session",
            endpoint = %config.webdriver_url,
            headless = config.headless,
            user_agent = %profile.user_agent,
            "webdriver session established"
        );

        Ok(Self {
            client,
            pacer: Pacer::new(),
            profile,
            stealth: config.stealth,
        })
    }

    /// Identity presented by this session.
    pub fn profile(&self) -> &BrowserProfile {
        &self.profile
    }

    /// Navigate to `url` and return a [`VeilPage`] with evasion scripts
    /// applied and the requested readiness signal reached.
    pub async fn goto(&mut self, url: &str, wait: WaitUntil, timeout: Duration) -> Result<VeilPage> {
        let mut page = VeilPage::new(self.client.clone(), self.stealth, self.pacer.clone());
        // Navigate via VeilPage so evasions and readiness waits are applied consistently
        page.goto(url, wait, timeout).await?;
        Ok(page)
    }

    /// Page wrapper over the current browser tab without navigating.
    pub fn page(&self) -> VeilPage {
        VeilPage::new(self.client.clone(), self.stealth, self.pacer.clone())
    }

    /// Close the underlying browser session.
    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}
