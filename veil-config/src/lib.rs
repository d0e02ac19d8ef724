//! Loader for workspace configuration with YAML + environment overlays.
//!
//! Sources merge in order: the YAML file (or inline snippet), then
//! `VEIL_`-prefixed environment variables. `${VAR}` placeholders inside
//! values are expanded recursively before the merged tree is deserialized
//! into [`VeilConfig`].
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use veil_common::{StealthLevel, WaitUntil};

const MAX_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Deserialize)]
pub struct VeilConfig {
    pub version: Option<String>,
    #[serde(default)]
    pub fetcher: FetcherSettings,
}

impl Default for VeilConfig {
    fn default() -> Self {
        Self {
            version: None,
            fetcher: FetcherSettings::default(),
        }
    }
}

/// Settings for the fetcher and its browser session.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherSettings {
    pub headless: bool,
    pub stealth: StealthLevel,
    /// WebDriver endpoint the driver connects to.
    pub webdriver_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Readiness signal navigations wait for.
    pub wait: WaitUntil,
    /// Header overrides applied to every request.
    pub headers: HashMap<String, String>,
    /// Lower-case phrases that mark a denial page.
    pub block_phrases: Vec<String>,
    /// Root element names an embedded XML document may use.
    pub root_tags: Vec<String>,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            headless: true,
            stealth: StealthLevel::default(),
            webdriver_url: "http://localhost:9515".to_string(),
            timeout_secs: 30,
            wait: WaitUntil::default(),
            headers: HashMap::new(),
            block_phrases: vec!["access denied".to_string(), "blocked".to_string()],
            root_tags: vec!["ownershipDocument".to_string()],
        }
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAX_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct VeilConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for VeilConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl VeilConfigLoader {
    /// Start with sensible defaults: YAML file + `VEIL_` env overrides.
    ///
    /// ```
    /// use veil_config::VeilConfigLoader;
    ///
    /// let config = VeilConfigLoader::new()
    ///     .with_yaml_str("version: '1'")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert!(config.fetcher.headless);
    /// ```
    pub fn new() -> Self {
        let builder =
            Config::builder().add_source(Environment::with_prefix("VEIL").separator("__"));
        Self { builder }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by
    /// suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self.builder.add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use veil_config::VeilConfigLoader;
    ///
    /// let config = VeilConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// fetcher:
    ///   timeout_secs: 10
    ///   root_tags: ["ownershipDocument", "edgarSubmission"]
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.fetcher.timeout_secs, 10);
    /// assert_eq!(config.fetcher.root_tags.len(), 2);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    pub fn load(self) -> Result<VeilConfig, ConfigError> {
        let cfg = self.builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: VeilConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("HOST", Some("filings")), ("TLD", Some("example.com"))], || {
            let mut v = json!([
                "https://$HOST.$TLD/",
                { "referer": "${HOST}.${TLD}" },
                42,
                true,
                null
            ]);
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!([
                    "https://filings.example.com/",
                    { "referer": "filings.example.com" },
                    42,
                    true,
                    null
                ])
            );
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("BAZ", Some("qux")),
                ("BAR", Some("mid-${BAZ}")),
                ("FOO", Some("start-${BAR}-end")),
            ],
            || {
                let mut v = json!("X=${FOO}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("X=start-mid-qux-end"));
            },
        );
    }

    #[test]
    fn stops_on_cycles_and_terminates() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${DOES_NOT_EXIST}"));
    }

    #[test]
    fn defaults_are_complete_without_any_sources() {
        let settings = FetcherSettings::default();
        assert!(settings.headless);
        assert_eq!(settings.timeout_secs, 30);
        assert_eq!(settings.root_tags, vec!["ownershipDocument".to_string()]);
        assert_eq!(
            settings.block_phrases,
            vec!["access denied".to_string(), "blocked".to_string()]
        );
    }
}
