use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use veil_common::WaitUntil;
use veil_common::observability::{LogConfig, init_logging};
use veil_config::{VeilConfig, VeilConfigLoader};
use veil_fetcher::{
    ExtractionRules, FetchReport, FetchRequest, Fetcher, FetcherConfig, Method, WebDriverBackend,
};

/// Fetch one document through a stealth browser session and print a JSON
/// report (`data`, `status`, `headers`, and `error` on failure) to stdout.
#[derive(Parser, Debug)]
#[command(name = "veil", version, about)]
struct Cli {
    /// Target URL.
    url: String,

    /// HTTP method.
    #[arg(long, value_enum, default_value_t = MethodArg::Get)]
    method: MethodArg,

    /// Request body; required for POST.
    #[arg(long)]
    body: Option<String>,

    /// Header override as a `Name: value` pair; repeatable.
    #[arg(long = "header", short = 'H')]
    headers: Vec<String>,

    /// Readiness signal to wait for.
    #[arg(long, value_enum)]
    wait: Option<WaitArg>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Configuration file (optional; defaults apply when absent).
    #[arg(long, default_value = "veil.yaml")]
    config: PathBuf,

    /// Pretty-print the JSON report.
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MethodArg {
    Get,
    Post,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WaitArg {
    Domcontentloaded,
    Networkidle,
}

impl From<WaitArg> for WaitUntil {
    fn from(arg: WaitArg) -> Self {
        match arg {
            WaitArg::Domcontentloaded => WaitUntil::DomContentLoaded,
            WaitArg::Networkidle => WaitUntil::NetworkIdle,
        }
    }
}

fn split_header(raw: &str) -> Result<(&str, &str)> {
    let Some((name, value)) = raw.split_once(':') else {
        bail!("header override {raw:?} is not a `Name: value` pair");
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("header override {raw:?} has an empty name");
    }
    Ok((name, value.trim()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg: VeilConfig = if cli.config.exists() {
        VeilConfigLoader::new()
            .with_file(&cli.config)
            .load()
            .with_context(|| format!("loading {}", cli.config.display()))?
    } else {
        VeilConfig::default()
    };

    init_logging(LogConfig::default())?;

    let settings = cfg.fetcher;
    let fetcher = Fetcher::new(
        Box::new(WebDriverBackend::new(settings.webdriver_url.clone())),
        FetcherConfig {
            headless: settings.headless,
            stealth: settings.stealth,
            rules: ExtractionRules {
                root_tags: settings.root_tags.clone(),
                block_phrases: settings.block_phrases.clone(),
            },
        },
    );

    let mut request = FetchRequest::get(&cli.url)
        .with_wait(cli.wait.map(WaitUntil::from).unwrap_or(settings.wait))
        .with_timeout(Duration::from_secs(
            cli.timeout_secs.unwrap_or(settings.timeout_secs),
        ));
    if matches!(cli.method, MethodArg::Post) {
        request.method = Method::Post;
        request.body = cli.body.as_ref().map(|b| b.clone().into_bytes());
    }
    for (name, value) in &settings.headers {
        request = request.with_header(name, value);
    }
    for raw in &cli.headers {
        let (name, value) = split_header(raw)?;
        request = request.with_header(name, value);
    }

    let outcome = fetcher.fetch(&request).await;
    if let Err(err) = &outcome {
        tracing::warn!(url = %cli.url, %err, "fetch failed");
    }

    let report = FetchReport::from_outcome(&outcome);
    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{rendered}");

    if let Err(err) = fetcher.close().await {
        tracing::warn!(%err, "session close failed");
    }
    Ok(())
}
