//! # aegis-guard
//!
//! Request abuse detection and admission control for the Aegis security core.
//!
//! ## Components
//!
//! - [`AbuseDetector`] - Pure scoring of a key's recent history against six
//!   sliding-window checks
//! - [`RequestTracker`] - Per-key request history, suspicion scores and
//!   timeouts, with encrypted best-effort persistence
//! - [`RateLimiter`] - The admission façade request handlers call
//!
//! ## Escalation
//!
//! Every detected abuse applies a two-minute timeout and bumps the key's
//! suspicion score. Scores map to a [`KeyStatus`]: `GOOD` (≤ 2), `WARNED`
//! (3–5), `HIGH_RISK` (> 5), with `SUSPENDED` overriding while a timeout is
//! live.
//!
//! # Example
//!
//! ```rust
//! use aegis_guard::{GuardConfig, RateLimiter, RequestInfo, Verdict};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let limiter = RateLimiter::in_memory(GuardConfig::default());
//!
//! let request = RequestInfo::new("/api/chat").with_content("hello");
//! match limiter.check("api-key-1", &request).await {
//!     Verdict::Allow => println!("allowed"),
//!     Verdict::Warn { violations } => println!("allowed, {} warnings", violations.len()),
//!     Verdict::Reject { reason, retry_after_secs, .. } => {
//!         println!("rejected ({reason}), retry after {retry_after_secs}s");
//!     }
//! }
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod detector;
pub mod error;
pub mod limiter;
pub mod state;
pub mod tracker;

pub use config::{DetectorConfig, GuardConfig, GuardConfigBuilder, StatusThresholds, TrackerConfig};
pub use detector::{AbuseAnalysis, AbuseDetector, Severity, Violation, ViolationType};
pub use error::{GuardError, GuardResult};
pub use limiter::{KeyReport, KeyStatus, RateLimiter, RejectReason, Verdict};
pub use state::AbuseState;
pub use tracker::{RequestInfo, RequestRecord, RequestTracker};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::GuardConfig;
    pub use crate::detector::{AbuseDetector, Severity, Violation};
    pub use crate::error::{GuardError, GuardResult};
    pub use crate::limiter::{KeyStatus, RateLimiter, Verdict};
    pub use crate::tracker::{RequestInfo, RequestTracker};
}

/// A short, stable label for a key that is safe to put in logs.
pub(crate) fn key_label(key: &str) -> String {
    let mut digest = aegis_cipher::service::hash(key);
    digest.truncate(12);
    digest
}
