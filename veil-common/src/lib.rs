//! Common types and utilities shared across Veil crates.
//!
//! This crate defines the enums that describe browser behavior and the
//! centralised observability helpers used by binaries and tests. It is
//! intentionally lightweight so that every crate can depend on it without
//! pulling in heavy transitive costs.
//!
//! - [`StealthLevel`]: how aggressively the browser hides automation signals
//! - [`WaitUntil`]: navigation readiness policy
//! - [`observability`]: centralised tracing/logging initialisation
use serde::{Deserialize, Serialize};

pub mod observability;

/// Browser automation stealth level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StealthLevel {
    Lightweight,
    Balanced,
    Maximum,
}

impl Default for StealthLevel {
    fn default() -> Self {
        Self::Balanced
    }
}

/// Readiness signal a navigation waits for before the page is considered
/// loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitUntil {
    /// The DOM has been parsed; subresources may still be loading.
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    /// The document is complete and the network has gone quiet.
    #[serde(rename = "networkidle")]
    NetworkIdle,
}

impl Default for WaitUntil {
    fn default() -> Self {
        Self::DomContentLoaded
    }
}
