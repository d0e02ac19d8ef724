//! Resilient document retrieval through a stealth browser session.
//!
//! A [`Fetcher`] owns one browser session, issues one navigation or request
//! per call, classifies what came back (XML, HTML, JSON, or unknown), strips
//! HTML shells that anti-bot or CDN layers wrap around raw documents, and
//! returns exactly one of a structured [`FetchResult`] or a structured
//! [`FetchError`] per call.
//!
//! - [`request`]: the request model and baseline browser header set
//! - [`outcome`]: results, the error taxonomy, and the JSON report form
//! - [`classify`]: content-kind detection, unwrapping, block-page heuristic
//! - [`backend`]: capability traits over a browser-automation backend
//! - [`webdriver`]: the WebDriver-backed session built on `veil-driver`
//!
//! Retry, backoff, and pacing between calls are caller concerns; the fetcher
//! makes a single attempt and reports what happened.

pub mod backend;
pub mod classify;
pub mod fetcher;
pub mod outcome;
pub mod request;
pub mod webdriver;

pub use backend::{Backend, RawResponse, Session, SessionConfig};
pub use classify::ExtractionRules;
pub use fetcher::{Fetcher, FetcherConfig};
pub use outcome::{ContentKind, FetchError, FetchErrorKind, FetchReport, FetchResult, Payload};
pub use request::{BASELINE_HEADERS, DEFAULT_TIMEOUT, FetchRequest, Method, merge_headers};
pub use webdriver::WebDriverBackend;
