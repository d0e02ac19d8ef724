use rand::prelude::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Snapshot of user agent, viewport, and locale characteristics presented by
/// a session.
pub struct BrowserProfile {
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub platform: String,
    pub languages: Vec<String>,
    pub timezone: String,
}

#[derive(Debug, Clone)]
/// Pool of plausible desktop identities; one is pinned per session so a
/// target never sees the fingerprint change mid-visit.
pub struct ProfilePool {
    profiles: Vec<BrowserProfile>,
    pinned: Option<BrowserProfile>,
}

impl ProfilePool {
    /// Built-in desktop profiles.
    pub fn builtin() -> Self {
        Self {
            profiles: vec![
                BrowserProfile {
                    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
                    viewport: (1920, 1080),
                    platform: "Win32".to_string(),
                    languages: vec!["en-US".to_string(), "en".to_string()],
                    timezone: "America/New_York".to_string(),
                },
                BrowserProfile {
                    user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
                    viewport: (1440, 900),
                    platform: "MacIntel".to_string(),
                    languages: vec!["en-US".to_string(), "en".to_string()],
                    timezone: "America/Los_Angeles".to_string(),
                },
                BrowserProfile {
                    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:135.0) Gecko/20100101 Firefox/135.0".to_string(),
                    viewport: (1920, 1080),
                    platform: "Win32".to_string(),
                    languages: vec!["en-US".to_string(), "en".to_string()],
                    timezone: "America/Chicago".to_string(),
                },
            ],
            pinned: None,
        }
    }

    /// Get (or lazily pin) the profile for this session.
    pub fn session_profile(&mut self) -> &BrowserProfile {
        if self.pinned.is_none() {
            let mut rng = rand::thread_rng();
            let p = self.profiles.choose(&mut rng).unwrap().clone();
            self.pinned = Some(p);
        }
        self.pinned.as_ref().unwrap()
    }
}
