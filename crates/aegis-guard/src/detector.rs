//! Abuse scoring over a key's recent request history.
//!
//! The detector is pure: it reads a history snapshot and the incoming
//! request's fingerprint and returns an [`AbuseAnalysis`]. All windows are
//! inclusive, a record counts when `timestamp >= now - window`.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DetectorConfig;
use crate::tracker::RequestRecord;

/// How serious a single violation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Borderline signal; never blocks on its own.
    Low,
    /// Allowed but flagged.
    Medium,
    /// Blocks immediately.
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        };
        f.write_str(s)
    }
}

/// The six independent abuse checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationType {
    /// Too many requests in a short window.
    RapidFire,
    /// A short burst of requests.
    Burst,
    /// The same payload over and over.
    DuplicateSpam,
    /// Most recent requests failed.
    HighErrorRate,
    /// High volume over a minute.
    SustainedRate,
    /// Requests arriving back-to-back.
    MinInterval,
}

impl ViolationType {
    /// The fixed severity of this check.
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::RapidFire | Self::DuplicateSpam => Severity::High,
            Self::Burst | Self::HighErrorRate | Self::SustainedRate => Severity::Medium,
            Self::MinInterval => Severity::Low,
        }
    }
}

/// One triggered check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Which check fired.
    #[serde(rename = "type")]
    pub kind: ViolationType,
    /// Its severity.
    pub severity: Severity,
    /// Human readable detail.
    pub message: String,
}

impl Violation {
    fn new(kind: ViolationType, message: String) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            message,
        }
    }
}

/// Result of scoring one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbuseAnalysis {
    /// Every check that fired.
    pub violations: Vec<Violation>,
    /// Whether the request should be rejected.
    pub is_abuse: bool,
    /// Highest severity present, `None` when clean.
    pub severity: Option<Severity>,
}

impl AbuseAnalysis {
    /// True when no check fired.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Whether a violation of `kind` is present.
    #[must_use]
    pub fn has(&self, kind: ViolationType) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }

    /// Comma separated violation types, for logs and timeout reasons.
    #[must_use]
    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| format!("{:?}", v.kind))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Start of a window ending at `now`, clamped to the earliest representable time.
pub(crate) fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(window)
        .ok()
        .and_then(|d| now.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Stateless abuse scorer.
#[derive(Debug, Clone, Default)]
pub struct AbuseDetector {
    config: DetectorConfig,
}

impl AbuseDetector {
    /// Create a detector with default thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from configuration.
    #[must_use]
    pub fn from_config(config: &DetectorConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// The active thresholds.
    #[must_use]
    pub const fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Score an incoming request against `history`.
    ///
    /// `history` holds the key's earlier requests in arrival order, not
    /// including the incoming one. `content_hash` is the incoming request's
    /// fingerprint, if it carried content.
    #[must_use]
    pub fn analyze(
        &self,
        history: &[RequestRecord],
        content_hash: Option<&str>,
        now: DateTime<Utc>,
    ) -> AbuseAnalysis {
        let c = &self.config;
        let count_in = |window: Duration| {
            let start = window_start(now, window);
            history.iter().filter(|r| r.timestamp >= start).count()
        };

        let mut violations = Vec::new();

        let rapid = count_in(c.rapid_fire_window);
        if rapid >= c.rapid_fire_threshold {
            violations.push(Violation::new(
                ViolationType::RapidFire,
                format!("{rapid} requests in {}s", c.rapid_fire_window.as_secs()),
            ));
        }

        let burst = count_in(c.burst_window);
        if burst > c.burst_threshold {
            violations.push(Violation::new(
                ViolationType::Burst,
                format!("burst of {burst} requests in {}s", c.burst_window.as_secs()),
            ));
        }

        if let Some(hash) = content_hash {
            let start = window_start(now, c.duplicate_window);
            let duplicates = history
                .iter()
                .filter(|r| r.timestamp >= start && r.content_hash.as_deref() == Some(hash))
                .count();
            if duplicates >= c.duplicate_threshold {
                violations.push(Violation::new(
                    ViolationType::DuplicateSpam,
                    format!("same content sent {duplicates} times"),
                ));
            }
        }

        let start = window_start(now, c.error_window);
        let (samples, errors) = history
            .iter()
            .filter(|r| r.timestamp >= start)
            .fold((0usize, 0usize), |(n, e), r| (n + 1, e + usize::from(r.has_error)));
        if samples >= c.error_min_samples && errors as f64 / samples as f64 >= c.error_ratio {
            violations.push(Violation::new(
                ViolationType::HighErrorRate,
                format!("{errors} of {samples} recent requests failed"),
            ));
        }

        let sustained = count_in(c.sustained_window);
        if sustained > c.sustained_threshold {
            violations.push(Violation::new(
                ViolationType::SustainedRate,
                format!("{sustained} requests in {}s", c.sustained_window.as_secs()),
            ));
        }

        if let Some(last) = history.last() {
            // concurrent callers can read the clock before a newer record lands
            let gap = now.signed_duration_since(last.timestamp).max(TimeDelta::zero());
            let min = TimeDelta::from_std(c.min_interval).unwrap_or(TimeDelta::MAX);
            if gap < min {
                violations.push(Violation::new(
                    ViolationType::MinInterval,
                    format!("{}ms since previous request", gap.num_milliseconds()),
                ));
            }
        }

        let severity = violations.iter().map(|v| v.severity).max();
        let is_abuse = severity == Some(Severity::High) || violations.len() >= c.abuse_violation_count;

        AbuseAnalysis {
            violations,
            is_abuse,
            severity,
        }
    }
}
