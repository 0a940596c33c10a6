//! The admission façade request handlers call.

use std::fmt;
use std::sync::Arc;

use aegis_cipher::CipherService;
use chrono::{DateTime, Utc};
use serde::ser::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::config::{GuardConfig, StatusThresholds};
use crate::detector::{AbuseDetector, Severity, Violation};
use crate::error::GuardResult;
use crate::key_label;
use crate::tracker::{RequestInfo, RequestTracker};

/// Why a request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    /// The key is serving a timeout.
    TimedOut,
    /// This request tripped the abuse detector.
    AbuseDetected,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TimedOut => "TIMED_OUT",
            Self::AbuseDetected => "ABUSE_DETECTED",
        })
    }
}

/// Admission decision for one request.
///
/// Serializes to the handler contract
/// `{allowed, warning?, reason?, retryAfter?, violations?}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Request is allowed.
    Allow,
    /// Request is allowed but looked suspicious.
    Warn {
        /// What was noticed.
        violations: Vec<Violation>,
    },
    /// Request is rejected.
    Reject {
        /// Why.
        reason: RejectReason,
        /// Seconds until the key may try again.
        retry_after_secs: u64,
        /// Violations behind an abuse rejection; empty for timeouts.
        violations: Vec<Violation>,
    },
}

impl Verdict {
    /// Check if the request may proceed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        !matches!(self, Self::Reject { .. })
    }

    /// Check if the request was allowed with a warning.
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(self, Self::Warn { .. })
    }

    /// The rejection reason, if rejected.
    #[must_use]
    pub const fn reason(&self) -> Option<RejectReason> {
        match self {
            Self::Reject { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Seconds to wait, if rejected.
    #[must_use]
    pub const fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::Reject {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Violations attached to the verdict.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Allow => &[],
            Self::Warn { violations } | Self::Reject { violations, .. } => violations,
        }
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct VerdictBody<'a> {
    allowed: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    warning: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<RejectReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
    #[serde(skip_serializing_if = "<[Violation]>::is_empty")]
    violations: &'a [Violation],
}

impl Serialize for Verdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        VerdictBody {
            allowed: self.is_allowed(),
            warning: self.is_warning(),
            reason: self.reason(),
            retry_after: self.retry_after_secs(),
            violations: self.violations(),
        }
        .serialize(serializer)
    }
}

/// Derived standing of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyStatus {
    /// Low suspicion.
    Good,
    /// Repeated timeouts.
    Warned,
    /// Many timeouts.
    HighRisk,
    /// Currently timed out.
    Suspended,
}

impl KeyStatus {
    /// Derive the status from a score and timeout flag.
    #[must_use]
    pub const fn derive(score: u32, timed_out: bool, thresholds: StatusThresholds) -> Self {
        if timed_out {
            Self::Suspended
        } else if score > thresholds.high_risk_above {
            Self::HighRisk
        } else if score > thresholds.warned_above {
            Self::Warned
        } else {
            Self::Good
        }
    }
}

impl fmt::Display for KeyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Good => "GOOD",
            Self::Warned => "WARNED",
            Self::HighRisk => "HIGH_RISK",
            Self::Suspended => "SUSPENDED",
        })
    }
}

/// Point-in-time view of a key for operators.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyReport {
    /// Derived status.
    pub status: KeyStatus,
    /// Suspicion score.
    pub suspicion_score: u32,
    /// Seconds left on the current timeout.
    pub timeout_remaining: u64,
    /// Requests in the tracked history window.
    pub recent_requests: usize,
}

/// Orchestrates the tracker and detector into admission decisions.
///
/// Never fails: every path yields a [`Verdict`]. Persistence problems are
/// logged and do not change the decision.
#[derive(Debug)]
pub struct RateLimiter {
    tracker: RequestTracker,
    detector: AbuseDetector,
    thresholds: StatusThresholds,
}

impl RateLimiter {
    /// Create a limiter around an existing tracker.
    #[must_use]
    pub fn new(config: &GuardConfig, tracker: RequestTracker) -> Self {
        Self {
            tracker,
            detector: AbuseDetector::from_config(&config.detector),
            thresholds: config.status,
        }
    }

    /// Create a limiter whose state lives only in memory.
    #[must_use]
    pub fn in_memory(config: GuardConfig) -> Self {
        let tracker = RequestTracker::in_memory(config.tracker.clone());
        Self::new(&config, tracker)
    }

    /// Validate `config` and create a limiter, restoring persisted abuse state.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Config`](crate::GuardError::Config) if the
    /// configuration is invalid.
    pub async fn open(config: GuardConfig, cipher: Arc<CipherService>) -> GuardResult<Self> {
        config.validate()?;
        let tracker = RequestTracker::open(config.tracker.clone(), cipher).await;
        Ok(Self::new(&config, tracker))
    }

    /// The underlying tracker.
    #[must_use]
    pub const fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    /// Decide whether a request from `key` may proceed.
    pub async fn check(&self, key: &str, request: &RequestInfo) -> Verdict {
        self.check_at(key, request, Utc::now()).await
    }

    /// [`check`](Self::check) with an explicit clock reading.
    ///
    /// 1. A live timeout rejects without touching history.
    /// 2. The request is scored against history, then recorded regardless
    ///    of outcome.
    /// 3. Abuse applies a timeout and rejects; a MEDIUM result warns.
    pub async fn check_at(&self, key: &str, request: &RequestInfo, now: DateTime<Utc>) -> Verdict {
        if self.tracker.is_timed_out_at(key, now).await {
            let retry_after_secs = self.tracker.timeout_remaining_at(key, now);
            debug!(key_id = %key_label(key), retry_after_secs, "rejected: timed out");
            return Verdict::Reject {
                reason: RejectReason::TimedOut,
                retry_after_secs,
                violations: Vec::new(),
            };
        }

        let analysis = self
            .tracker
            .analyze_and_record_at(key, request, &self.detector, now);

        if analysis.is_abuse {
            let reason = analysis.summary();
            let score = self.tracker.apply_timeout_at(key, &reason, now).await;
            let retry_after_secs = self.tracker.timeout_remaining_at(key, now);
            warn!(
                key_id = %key_label(key),
                endpoint = %request.endpoint,
                violations = %reason,
                score,
                "abuse detected"
            );
            return Verdict::Reject {
                reason: RejectReason::AbuseDetected,
                retry_after_secs,
                violations: analysis.violations,
            };
        }

        if analysis.severity == Some(Severity::Medium) {
            debug!(
                key_id = %key_label(key),
                violations = %analysis.summary(),
                "allowed with warning"
            );
            return Verdict::Warn {
                violations: analysis.violations,
            };
        }

        Verdict::Allow
    }

    /// Derived status of `key`.
    pub async fn status(&self, key: &str) -> KeyStatus {
        self.status_at(key, Utc::now()).await
    }

    /// [`status`](Self::status) with an explicit clock reading.
    pub async fn status_at(&self, key: &str, now: DateTime<Utc>) -> KeyStatus {
        let timed_out = self.tracker.is_timed_out_at(key, now).await;
        KeyStatus::derive(self.tracker.suspicion_score(key), timed_out, self.thresholds)
    }

    /// Operator view of `key`.
    pub async fn report(&self, key: &str) -> KeyReport {
        self.report_at(key, Utc::now()).await
    }

    /// [`report`](Self::report) with an explicit clock reading.
    pub async fn report_at(&self, key: &str, now: DateTime<Utc>) -> KeyReport {
        let status = self.status_at(key, now).await;
        KeyReport {
            status,
            suspicion_score: self.tracker.suspicion_score(key),
            timeout_remaining: self.tracker.timeout_remaining_at(key, now),
            recent_requests: self.tracker.history_at(key, now).len(),
        }
    }

    /// Admin reset of a key's timeout and score.
    pub async fn clear(&self, key: &str) -> bool {
        self.tracker.clear(key).await
    }

    /// Forget keys with no recent requests, timeout or score.
    pub fn cleanup_stale(&self) -> usize {
        self.tracker.cleanup_stale()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectorConfig;
    use crate::detector::ViolationType;
    use crate::error::GuardError;
    use chrono::TimeDelta;
    use test_case::test_case;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
    }

    fn at(ms: i64) -> DateTime<Utc> {
        t0() + TimeDelta::milliseconds(ms)
    }

    fn limiter() -> RateLimiter {
        RateLimiter::in_memory(GuardConfig::default())
    }

    fn request(n: i64) -> RequestInfo {
        RequestInfo::new("/api/chat").with_content(format!("message {n}"))
    }

    #[tokio::test]
    async fn quiet_key_is_allowed() {
        let limiter = limiter();
        let verdict = limiter.check_at("k", &request(0), at(0)).await;
        assert_eq!(verdict, Verdict::Allow);
        assert_eq!(limiter.tracker().history_at("k", at(0)).len(), 1);
    }

    #[tokio::test]
    async fn rapid_fire_is_rejected() {
        let limiter = limiter();
        // 20 requests spread over 9 seconds
        for i in 0..20 {
            limiter
                .tracker()
                .record_request_at("k", &request(i), at(i * 450));
        }

        let verdict = limiter.check_at("k", &request(99), at(9_000)).await;

        assert!(!verdict.is_allowed());
        assert_eq!(verdict.reason(), Some(RejectReason::AbuseDetected));
        assert_eq!(verdict.retry_after_secs(), Some(120));
        assert!(
            verdict
                .violations()
                .iter()
                .any(|v| v.kind == ViolationType::RapidFire)
        );
        assert_eq!(limiter.tracker().suspicion_score("k"), 1);
        // the rejected request was still recorded
        assert_eq!(limiter.tracker().history_at("k", at(9_000)).len(), 21);
    }

    #[tokio::test]
    async fn timed_out_key_is_rejected_without_recording() {
        let limiter = limiter();
        limiter.tracker().apply_timeout_at("k", "manual", at(0)).await;

        let verdict = limiter.check_at("k", &request(0), at(30_000)).await;

        assert_eq!(verdict.reason(), Some(RejectReason::TimedOut));
        assert_eq!(verdict.retry_after_secs(), Some(90));
        assert!(verdict.violations().is_empty());
        assert!(limiter.tracker().history_at("k", at(30_000)).is_empty());

        // after expiry the key is admitted again
        let verdict = limiter.check_at("k", &request(1), at(120_000)).await;
        assert!(verdict.is_allowed());
    }

    #[tokio::test]
    async fn medium_severity_warns() {
        let limiter = limiter();
        for i in 0..11 {
            limiter
                .tracker()
                .record_request_at("k", &request(i), at(i * 400));
        }

        let verdict = limiter.check_at("k", &request(99), at(4_400)).await;

        assert!(verdict.is_allowed());
        assert!(verdict.is_warning());
        assert!(
            verdict
                .violations()
                .iter()
                .all(|v| v.severity == Severity::Medium)
        );
        assert_eq!(limiter.tracker().suspicion_score("k"), 0);
    }

    #[tokio::test]
    async fn low_severity_alone_is_plain_allow() {
        let limiter = limiter();
        limiter.check_at("k", &request(0), at(0)).await;
        let verdict = limiter.check_at("k", &request(1), at(50)).await;
        assert_eq!(verdict, Verdict::Allow);
    }

    #[tokio::test]
    async fn repeated_abuse_escalates_status() {
        let limiter = limiter();
        let mut now = 0;
        for round in 1..=6u32 {
            limiter.tracker().apply_timeout_at("k", "round", at(now)).await;
            now += 121_000;
            let status = limiter.status_at("k", at(now)).await;
            let expected = match round {
                0..=2 => KeyStatus::Good,
                3..=5 => KeyStatus::Warned,
                _ => KeyStatus::HighRisk,
            };
            assert_eq!(status, expected, "round {round}");
        }

        limiter.tracker().apply_timeout_at("k", "again", at(now)).await;
        assert_eq!(limiter.status_at("k", at(now)).await, KeyStatus::Suspended);
    }

    #[test_case(0, false, KeyStatus::Good)]
    #[test_case(2, false, KeyStatus::Good)]
    #[test_case(3, false, KeyStatus::Warned)]
    #[test_case(5, false, KeyStatus::Warned)]
    #[test_case(6, false, KeyStatus::HighRisk)]
    #[test_case(0, true, KeyStatus::Suspended)]
    #[test_case(9, true, KeyStatus::Suspended)]
    fn status_derivation(score: u32, timed_out: bool, expected: KeyStatus) {
        assert_eq!(
            KeyStatus::derive(score, timed_out, StatusThresholds::default()),
            expected
        );
    }

    #[tokio::test]
    async fn report_reflects_state() {
        let limiter = limiter();
        limiter.check_at("k", &request(0), at(0)).await;
        limiter.tracker().apply_timeout_at("k", "x", at(1_000)).await;

        let report = limiter.report_at("k", at(11_000)).await;
        assert_eq!(report.status, KeyStatus::Suspended);
        assert_eq!(report.suspicion_score, 1);
        assert_eq!(report.timeout_remaining, 110);
        assert_eq!(report.recent_requests, 1);
    }

    #[tokio::test]
    async fn clear_restores_good_standing() {
        let limiter = limiter();
        limiter.tracker().apply_timeout_at("k", "x", at(0)).await;
        assert!(limiter.clear("k").await);
        assert_eq!(limiter.status_at("k", at(1)).await, KeyStatus::Good);
        assert!(limiter.check_at("k", &request(0), at(1)).await.is_allowed());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_are_all_counted() {
        let limiter = Arc::new(limiter());
        let mut handles = Vec::new();

        for i in 0..15 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.check("shared", &request(i)).await
            }));
        }
        for handle in handles {
            let verdict = handle.await.expect("task should complete");
            assert!(verdict.is_allowed());
        }

        assert_eq!(limiter.tracker().history("shared").len(), 15);
    }

    #[tokio::test]
    async fn open_rejects_invalid_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = GuardConfig::builder()
            .state_path(dir.path().join("abuse_state.enc"))
            .detector(DetectorConfig {
                abuse_violation_count: 0,
                ..DetectorConfig::default()
            })
            .build();

        let err = RateLimiter::open(config, Arc::new(CipherService::from_passphrase("k")))
            .await
            .expect_err("invalid config");
        assert!(matches!(err, GuardError::Config(_)));
        assert!(!dir.path().join("abuse_state.enc").exists());
    }

    #[test]
    fn cleanup_stale_forgets_quiet_keys() {
        let limiter = limiter();
        limiter
            .tracker()
            .record_request_at("k", &request(0), Utc::now() - TimeDelta::minutes(10));
        assert_eq!(limiter.cleanup_stale(), 1);
        assert_eq!(limiter.tracker().tracked_keys(), 0);
    }

    #[test]
    fn verdict_serializes_to_contract() {
        let allow = serde_json::to_value(Verdict::Allow).expect("serialize");
        assert_eq!(allow, serde_json::json!({ "allowed": true }));

        let reject = serde_json::to_value(Verdict::Reject {
            reason: RejectReason::TimedOut,
            retry_after_secs: 42,
            violations: Vec::new(),
        })
        .expect("serialize");
        assert_eq!(
            reject,
            serde_json::json!({ "allowed": false, "reason": "TIMED_OUT", "retryAfter": 42 })
        );

        let warn = serde_json::to_value(Verdict::Warn {
            violations: vec![Violation {
                kind: ViolationType::Burst,
                severity: Severity::Medium,
                message: "burst".into(),
            }],
        })
        .expect("serialize");
        assert_eq!(warn["allowed"], true);
        assert_eq!(warn["warning"], true);
        assert_eq!(warn["violations"][0]["type"], "BURST");
    }

    #[test]
    fn display_names_match_wire_names() {
        assert_eq!(RejectReason::AbuseDetected.to_string(), "ABUSE_DETECTED");
        assert_eq!(KeyStatus::HighRisk.to_string(), "HIGH_RISK");
    }
}
