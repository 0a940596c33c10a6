//! Guard configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GuardError, GuardResult};

/// Windows and thresholds of the six abuse checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Window for the rapid-fire check.
    pub rapid_fire_window: Duration,
    /// Requests in the window that trigger rapid-fire (inclusive).
    pub rapid_fire_threshold: usize,
    /// Window for the burst check.
    pub burst_window: Duration,
    /// Burst triggers when the window holds more than this many requests.
    pub burst_threshold: usize,
    /// Window for duplicate content detection.
    pub duplicate_window: Duration,
    /// Identical payloads in the window that trigger duplicate spam (inclusive).
    pub duplicate_threshold: usize,
    /// Window for the error-rate check.
    pub error_window: Duration,
    /// Minimum samples before the error rate is judged.
    pub error_min_samples: usize,
    /// Error ratio that triggers the check (inclusive).
    pub error_ratio: f64,
    /// Window for the sustained-rate check.
    pub sustained_window: Duration,
    /// Sustained rate triggers above this many requests in the window.
    pub sustained_threshold: usize,
    /// Gaps shorter than this since the previous request are flagged.
    pub min_interval: Duration,
    /// Violation count that marks a request abusive without any HIGH signal.
    pub abuse_violation_count: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            rapid_fire_window: Duration::from_secs(10),
            rapid_fire_threshold: 20,
            burst_window: Duration::from_secs(5),
            burst_threshold: 10,
            duplicate_window: Duration::from_secs(60),
            duplicate_threshold: 10,
            error_window: Duration::from_secs(60),
            error_min_samples: 10,
            error_ratio: 0.5,
            sustained_window: Duration::from_secs(60),
            sustained_threshold: 60,
            min_interval: Duration::from_millis(100),
            abuse_violation_count: 3,
        }
    }
}

impl DetectorConfig {
    fn validate(&self) -> GuardResult<()> {
        let counts = [
            ("rapid_fire_threshold", self.rapid_fire_threshold),
            ("duplicate_threshold", self.duplicate_threshold),
            ("error_min_samples", self.error_min_samples),
            ("abuse_violation_count", self.abuse_violation_count),
        ];
        if let Some((name, _)) = counts.iter().find(|(_, v)| *v == 0) {
            return Err(GuardError::Config(format!("{name} must be positive")));
        }

        let windows = [
            ("rapid_fire_window", self.rapid_fire_window),
            ("burst_window", self.burst_window),
            ("duplicate_window", self.duplicate_window),
            ("error_window", self.error_window),
            ("sustained_window", self.sustained_window),
        ];
        if let Some((name, _)) = windows.iter().find(|(_, w)| w.is_zero()) {
            return Err(GuardError::Config(format!("{name} must be non-zero")));
        }

        if !(self.error_ratio > 0.0 && self.error_ratio <= 1.0) {
            return Err(GuardError::Config(format!(
                "error_ratio must be in (0, 1], got {}",
                self.error_ratio
            )));
        }
        Ok(())
    }
}

/// Request tracker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// How long request history is kept per key.
    pub history_window: Duration,
    /// Length of a timeout applied after abuse.
    pub timeout_duration: Duration,
    /// Encrypted abuse-state file. `None` keeps everything in memory.
    pub state_path: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            history_window: Duration::from_secs(300), // 5 minutes
            timeout_duration: Duration::from_secs(120),
            state_path: None,
        }
    }
}

/// Suspicion score boundaries between key statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusThresholds {
    /// Scores above this are `WARNED`.
    pub warned_above: u32,
    /// Scores above this are `HIGH_RISK`.
    pub high_risk_above: u32,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            warned_above: 2,
            high_risk_above: 5,
        }
    }
}

/// Main guard configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Abuse check settings.
    pub detector: DetectorConfig,
    /// History and timeout settings.
    pub tracker: TrackerConfig,
    /// Status derivation settings.
    pub status: StatusThresholds,
}

impl GuardConfig {
    /// Create a new builder for guard configuration.
    #[must_use]
    pub fn builder() -> GuardConfigBuilder {
        GuardConfigBuilder::default()
    }

    /// Check the configuration for values that would disable or break checks.
    ///
    /// # Errors
    ///
    /// Returns `GuardError::Config` describing the first invalid value.
    pub fn validate(&self) -> GuardResult<()> {
        self.detector.validate()?;

        if self.tracker.history_window < self.detector.sustained_window {
            return Err(GuardError::Config(
                "history_window must cover the longest detector window".into(),
            ));
        }
        if self.status.high_risk_above < self.status.warned_above {
            return Err(GuardError::Config(
                "high_risk_above must not be below warned_above".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for `GuardConfig`.
#[derive(Debug, Clone, Default)]
pub struct GuardConfigBuilder {
    config: GuardConfig,
}

impl GuardConfigBuilder {
    /// Set detector configuration.
    #[must_use]
    pub fn detector(mut self, config: DetectorConfig) -> Self {
        self.config.detector = config;
        self
    }

    /// Set tracker configuration.
    #[must_use]
    pub fn tracker(mut self, config: TrackerConfig) -> Self {
        self.config.tracker = config;
        self
    }

    /// Set status thresholds.
    #[must_use]
    pub fn status(mut self, thresholds: StatusThresholds) -> Self {
        self.config.status = thresholds;
        self
    }

    /// Persist abuse state to this encrypted file.
    #[must_use]
    pub fn state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tracker.state_path = Some(path.into());
        self
    }

    /// Override the timeout applied after abuse.
    #[must_use]
    pub fn timeout_duration(mut self, duration: Duration) -> Self {
        self.config.tracker.timeout_duration = duration;
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> GuardConfig {
        self.config
    }
}
