//! Per-key request history, suspicion scores and timeouts.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use aegis_cipher::{CipherService, fingerprint};
use aegis_persist::EncryptedJsonFile;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::detector::{AbuseAnalysis, AbuseDetector, window_start};
use crate::error::GuardResult;
use crate::key_label;
use crate::state::AbuseState;

/// What a caller tells the guard about an inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    /// The endpoint being called.
    pub endpoint: String,
    /// The request payload, used only for duplicate detection.
    pub content: String,
    /// Whether the request ended in an error.
    pub has_error: bool,
}

impl RequestInfo {
    /// A request to `endpoint` with no content.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Set the payload.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Mark the request as failed.
    #[must_use]
    pub const fn with_error(mut self, has_error: bool) -> Self {
        self.has_error = has_error;
        self
    }

    /// Fingerprint of the payload, `None` when there is no payload.
    #[must_use]
    pub fn content_hash(&self) -> Option<String> {
        (!self.content.is_empty()).then(|| fingerprint(&self.content))
    }
}

/// One remembered request. Lives only in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    /// When the request arrived.
    pub timestamp: DateTime<Utc>,
    /// The endpoint called.
    pub endpoint: String,
    /// Whether it failed.
    pub has_error: bool,
    /// Payload fingerprint.
    pub content_hash: Option<String>,
}

impl RequestRecord {
    fn from_request(request: &RequestInfo, now: DateTime<Utc>) -> Self {
        Self {
            timestamp: now,
            endpoint: request.endpoint.clone(),
            has_error: request.has_error,
            content_hash: request.content_hash(),
        }
    }
}

/// Everything known about one key.
#[derive(Debug, Default)]
struct KeyState {
    history: VecDeque<RequestRecord>,
    timeout_expiry: Option<DateTime<Utc>>,
    suspicion_score: u32,
}

impl KeyState {
    /// Drop records older than `cutoff`.
    fn prune(&mut self, cutoff: DateTime<Utc>) {
        while self.history.front().is_some_and(|r| r.timestamp <= cutoff) {
            self.history.pop_front();
        }
    }

    /// Insert keeping history sorted by timestamp; callers racing on the
    /// clock can arrive slightly out of order.
    fn push(&mut self, record: RequestRecord, cutoff: DateTime<Utc>) {
        let idx = self
            .history
            .partition_point(|r| r.timestamp <= record.timestamp);
        self.history.insert(idx, record);
        self.prune(cutoff);
    }

    fn is_idle(&self) -> bool {
        self.history.is_empty() && self.timeout_expiry.is_none() && self.suspicion_score == 0
    }
}

/// Owns per-key request state.
///
/// History is volatile. Timeouts and suspicion scores are written to an
/// encrypted state file whenever they change; write failures are logged and
/// otherwise ignored.
pub struct RequestTracker {
    config: TrackerConfig,
    keys: RwLock<HashMap<String, KeyState>>,
    store: Option<EncryptedJsonFile>,
    /// Serializes snapshot writes so the newest state lands last.
    save_lock: Mutex<()>,
    /// Epoch milliseconds of the last idle-key sweep.
    last_sweep: AtomicI64,
}

impl RequestTracker {
    /// A tracker that never touches disk.
    #[must_use]
    pub fn in_memory(config: TrackerConfig) -> Self {
        Self::with_store(config, None)
    }

    fn with_store(config: TrackerConfig, store: Option<EncryptedJsonFile>) -> Self {
        Self {
            config,
            keys: RwLock::new(HashMap::new()),
            store,
            save_lock: Mutex::new(()),
            last_sweep: AtomicI64::new(i64::MIN),
        }
    }

    /// Open a tracker, restoring persisted state from `config.state_path`.
    ///
    /// A missing or unreadable state file yields an empty tracker.
    pub async fn open(config: TrackerConfig, cipher: Arc<CipherService>) -> Self {
        Self::open_at(config, cipher, Utc::now()).await
    }

    /// [`open`](Self::open) with an explicit clock reading.
    pub async fn open_at(config: TrackerConfig, cipher: Arc<CipherService>, now: DateTime<Utc>) -> Self {
        let store = config
            .state_path
            .clone()
            .map(|path| EncryptedJsonFile::new(path, cipher));
        let tracker = Self::with_store(config, store);

        if let Some(store) = &tracker.store {
            match store.load::<AbuseState>().await {
                Ok(Some(state)) => tracker.restore(&state, now),
                Ok(None) => debug!(path = %store.path().display(), "no abuse state on disk"),
                Err(e) => warn!(error = %e, "failed to load abuse state, starting empty"),
            }
        }

        tracker
    }

    fn restore(&self, state: &AbuseState, now: DateTime<Utc>) {
        let mut keys = self.keys.write();
        let mut timeouts = 0usize;

        for (key, expiry) in state.live_timeouts(now) {
            keys.entry(key.to_string()).or_default().timeout_expiry = Some(expiry);
            timeouts += 1;
        }
        for (key, score) in &state.suspicion_scores {
            keys.entry(key.clone()).or_default().suspicion_score = *score;
        }

        info!(
            timeouts,
            scores = state.suspicion_scores.len(),
            "restored abuse state"
        );
    }

    fn history_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        window_start(now, self.config.history_window)
    }

    /// Whether a write at `now` should also sweep idle keys.
    ///
    /// At most one sweep per history window.
    fn sweep_due(&self, now: DateTime<Utc>) -> bool {
        let now_ms = now.timestamp_millis();
        let window_ms = i64::try_from(self.config.history_window.as_millis()).unwrap_or(i64::MAX);
        let last = self.last_sweep.load(Ordering::Relaxed);
        now_ms.saturating_sub(last) >= window_ms
            && self
                .last_sweep
                .compare_exchange(last, now_ms, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
    }

    /// Prune every history and drop keys with nothing left to remember.
    fn sweep(keys: &mut HashMap<String, KeyState>, cutoff: DateTime<Utc>) -> usize {
        let before = keys.len();
        keys.retain(|_, state| {
            state.prune(cutoff);
            !state.is_idle()
        });
        before.saturating_sub(keys.len())
    }

    // ==================== History ====================

    /// Record a request for `key`.
    pub fn record_request(&self, key: &str, request: &RequestInfo) {
        self.record_request_at(key, request, Utc::now());
    }

    /// [`record_request`](Self::record_request) with an explicit clock reading.
    pub fn record_request_at(&self, key: &str, request: &RequestInfo, now: DateTime<Utc>) {
        let cutoff = self.history_cutoff(now);
        let sweep = self.sweep_due(now);
        let mut keys = self.keys.write();
        keys.entry(key.to_string())
            .or_default()
            .push(RequestRecord::from_request(request, now), cutoff);
        if sweep {
            let removed = Self::sweep(&mut keys, cutoff);
            debug!(removed, remaining = keys.len(), "swept idle keys");
        }
    }

    /// Score `request` against the key's history, then record it.
    ///
    /// Both happen under one lock, so concurrent requests for the same key
    /// each see every request recorded before them.
    pub fn analyze_and_record_at(
        &self,
        key: &str,
        request: &RequestInfo,
        detector: &AbuseDetector,
        now: DateTime<Utc>,
    ) -> AbuseAnalysis {
        let cutoff = self.history_cutoff(now);
        let record = RequestRecord::from_request(request, now);
        let sweep = self.sweep_due(now);

        let mut keys = self.keys.write();
        let state = keys.entry(key.to_string()).or_default();
        state.prune(cutoff);
        let analysis = detector.analyze(
            state.history.make_contiguous(),
            record.content_hash.as_deref(),
            now,
        );
        state.push(record, cutoff);

        if sweep {
            let removed = Self::sweep(&mut keys, cutoff);
            debug!(removed, remaining = keys.len(), "swept idle keys");
        }
        analysis
    }

    /// Drop keys with no recent requests, no timeout and no suspicion score.
    ///
    /// Writes already sweep once per history window; this forces one now.
    /// Returns the number of keys removed.
    pub fn cleanup_stale(&self) -> usize {
        self.cleanup_stale_at(Utc::now())
    }

    /// [`cleanup_stale`](Self::cleanup_stale) with an explicit clock reading.
    pub fn cleanup_stale_at(&self, now: DateTime<Utc>) -> usize {
        let cutoff = self.history_cutoff(now);
        self.last_sweep.store(now.timestamp_millis(), Ordering::Relaxed);
        let removed = Self::sweep(&mut self.keys.write(), cutoff);
        if removed > 0 {
            debug!(removed, "cleaned up stale keys");
        }
        removed
    }

    /// Recent requests for `key`, oldest first.
    #[must_use]
    pub fn history(&self, key: &str) -> Vec<RequestRecord> {
        self.history_at(key, Utc::now())
    }

    /// [`history`](Self::history) with an explicit clock reading.
    #[must_use]
    pub fn history_at(&self, key: &str, now: DateTime<Utc>) -> Vec<RequestRecord> {
        let cutoff = self.history_cutoff(now);
        self.keys.read().get(key).map_or_else(Vec::new, |state| {
            state
                .history
                .iter()
                .filter(|r| r.timestamp > cutoff)
                .cloned()
                .collect()
        })
    }

    // ==================== Timeouts ====================

    /// Whether `key` is currently timed out.
    ///
    /// An expired timeout is cleared here and the cleared state persisted.
    pub async fn is_timed_out(&self, key: &str) -> bool {
        self.is_timed_out_at(key, Utc::now()).await
    }

    /// [`is_timed_out`](Self::is_timed_out) with an explicit clock reading.
    pub async fn is_timed_out_at(&self, key: &str, now: DateTime<Utc>) -> bool {
        {
            let mut keys = self.keys.write();
            let Some(state) = keys.get_mut(key) else {
                return false;
            };
            match state.timeout_expiry {
                None => return false,
                Some(expiry) if now < expiry => return true,
                Some(_) => state.timeout_expiry = None,
            }
        }

        info!(key_id = %key_label(key), "timeout expired");
        self.persist().await;
        false
    }

    /// Whole seconds until the timeout on `key` lifts, 0 if none.
    #[must_use]
    pub fn timeout_remaining(&self, key: &str) -> u64 {
        self.timeout_remaining_at(key, Utc::now())
    }

    /// [`timeout_remaining`](Self::timeout_remaining) with an explicit clock reading.
    ///
    /// Rounds up, so a live timeout never reports 0.
    #[must_use]
    pub fn timeout_remaining_at(&self, key: &str, now: DateTime<Utc>) -> u64 {
        self.timeout_expiry(key).map_or(0, |expiry| {
            let ms = expiry.signed_duration_since(now).num_milliseconds();
            if ms <= 0 { 0 } else { (ms as u64).div_ceil(1000) }
        })
    }

    /// When the timeout on `key` lifts, if one is set.
    #[must_use]
    pub fn timeout_expiry(&self, key: &str) -> Option<DateTime<Utc>> {
        self.keys.read().get(key).and_then(|s| s.timeout_expiry)
    }

    /// Time out `key`, bump its suspicion score and persist.
    ///
    /// Returns the new score.
    pub async fn apply_timeout(&self, key: &str, reason: &str) -> u32 {
        self.apply_timeout_at(key, reason, Utc::now()).await
    }

    /// [`apply_timeout`](Self::apply_timeout) with an explicit clock reading.
    pub async fn apply_timeout_at(&self, key: &str, reason: &str, now: DateTime<Utc>) -> u32 {
        let duration = TimeDelta::from_std(self.config.timeout_duration).unwrap_or(TimeDelta::MAX);
        let expiry = now.checked_add_signed(duration).unwrap_or(DateTime::<Utc>::MAX_UTC);

        let score = {
            let mut keys = self.keys.write();
            let state = keys.entry(key.to_string()).or_default();
            state.timeout_expiry = Some(expiry);
            state.suspicion_score = state.suspicion_score.saturating_add(1);
            state.suspicion_score
        };

        warn!(
            key_id = %key_label(key),
            reason,
            score,
            expires_at = %expiry,
            "applied timeout"
        );
        self.persist().await;
        score
    }

    // ==================== Scores ====================

    /// Current suspicion score for `key`.
    #[must_use]
    pub fn suspicion_score(&self, key: &str) -> u32 {
        self.keys.read().get(key).map_or(0, |s| s.suspicion_score)
    }

    /// Admin reset: clear the timeout and suspicion score of `key`.
    ///
    /// Returns false if there was nothing to clear.
    pub async fn clear(&self, key: &str) -> bool {
        let cleared = {
            let mut keys = self.keys.write();
            match keys.get_mut(key) {
                Some(state) if state.timeout_expiry.is_some() || state.suspicion_score > 0 => {
                    state.timeout_expiry = None;
                    state.suspicion_score = 0;
                    if state.is_idle() {
                        keys.remove(key);
                    }
                    true
                }
                _ => false,
            }
        };

        if cleared {
            info!(key_id = %key_label(key), "abuse state cleared");
            self.persist().await;
        }
        cleared
    }

    /// Number of keys with any state.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.keys.read().len()
    }

    // ==================== Persistence ====================

    fn snapshot(&self, now: DateTime<Utc>) -> AbuseState {
        let keys = self.keys.read();
        let mut state = AbuseState::empty(now);
        for (key, s) in keys.iter() {
            if let Some(expiry) = s.timeout_expiry {
                state.timeouts.insert(key.clone(), expiry.timestamp_millis());
            }
            if s.suspicion_score > 0 {
                state.suspicion_scores.insert(key.clone(), s.suspicion_score);
            }
        }
        state
    }

    /// Write timeouts and scores to the state file now.
    ///
    /// A no-op for in-memory trackers.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be encrypted or written.
    pub async fn flush(&self) -> GuardResult<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let _guard = self.save_lock.lock().await;
        let state = self.snapshot(Utc::now());
        store.save(&state).await?;
        Ok(())
    }

    async fn persist(&self) {
        if let Err(e) = self.flush().await {
            warn!(error = %e, "failed to persist abuse state");
        }
    }
}

impl std::fmt::Debug for RequestTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestTracker")
            .field("tracked_keys", &self.tracked_keys())
            .field("state_path", &self.config.state_path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
    }

    fn at_secs(secs: i64) -> DateTime<Utc> {
        t0() + TimeDelta::seconds(secs)
    }

    fn cipher() -> Arc<CipherService> {
        Arc::new(CipherService::from_passphrase("tracker tests"))
    }

    fn persistent_config(dir: &tempfile::TempDir) -> TrackerConfig {
        TrackerConfig {
            state_path: Some(dir.path().join("abuse_state.enc")),
            ..TrackerConfig::default()
        }
    }

    fn chat() -> RequestInfo {
        RequestInfo::new("/api/chat").with_content("hello")
    }

    #[test]
    fn request_info_fingerprints_content() {
        assert!(RequestInfo::new("/x").content_hash().is_none());
        let hash = chat().content_hash().expect("has content");
        assert_eq!(hash, fingerprint("hello"));
    }

    #[test]
    fn record_and_read_history() {
        let tracker = RequestTracker::in_memory(TrackerConfig::default());
        tracker.record_request_at("k", &chat(), at_secs(0));
        tracker.record_request_at("k", &chat().with_error(true), at_secs(1));

        let history = tracker.history_at("k", at_secs(2));
        assert_eq!(history.len(), 2);
        assert!(!history[0].has_error);
        assert!(history[1].has_error);
        assert_eq!(history[0].endpoint, "/api/chat");
        assert!(tracker.history_at("other", at_secs(2)).is_empty());
    }

    #[test]
    fn old_records_are_pruned_on_write() {
        let tracker = RequestTracker::in_memory(TrackerConfig::default());
        tracker.record_request_at("k", &chat(), at_secs(0));
        tracker.record_request_at("k", &chat(), at_secs(301));

        let history = tracker.history_at("k", at_secs(301));
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].timestamp, at_secs(301));
    }

    #[test]
    fn history_read_hides_stale_records() {
        let tracker = RequestTracker::in_memory(TrackerConfig::default());
        tracker.record_request_at("k", &chat(), at_secs(0));
        assert!(tracker.history_at("k", at_secs(300)).is_empty());
    }

    #[test]
    fn out_of_order_records_are_kept_sorted() {
        let tracker = RequestTracker::in_memory(TrackerConfig::default());
        tracker.record_request_at("k", &chat(), at_secs(5));
        tracker.record_request_at("k", &chat(), at_secs(0));
        tracker.record_request_at("k", &chat(), at_secs(302));

        // the 0s record is older than the 302s cutoff even though it arrived second
        let stored: Vec<_> = tracker.keys.read()["k"]
            .history
            .iter()
            .map(|r| r.timestamp)
            .collect();
        assert_eq!(stored, [at_secs(5), at_secs(302)]);
    }

    #[tokio::test]
    async fn idle_keys_are_swept_on_write() {
        let tracker = RequestTracker::in_memory(TrackerConfig::default());
        for i in 0..1_000 {
            tracker.record_request_at(&format!("key-{i}"), &chat(), at_secs(0));
        }
        tracker.apply_timeout_at("offender", "x", at_secs(0)).await;
        assert_eq!(tracker.tracked_keys(), 1_001);

        let detector = AbuseDetector::new();
        tracker.analyze_and_record_at("fresh", &chat(), &detector, at_secs(86_400));

        // only the scored key and the new one remain
        assert_eq!(tracker.tracked_keys(), 2);
        assert_eq!(tracker.suspicion_score("offender"), 1);
        assert_eq!(tracker.history_at("fresh", at_secs(86_400)).len(), 1);
    }

    #[test]
    fn cleanup_stale_drops_only_expired_history() {
        let tracker = RequestTracker::in_memory(TrackerConfig::default());
        tracker.record_request_at("k", &chat(), at_secs(0));

        assert_eq!(tracker.cleanup_stale_at(at_secs(100)), 0);
        assert_eq!(tracker.tracked_keys(), 1);
        assert_eq!(tracker.cleanup_stale_at(at_secs(301)), 1);
        assert_eq!(tracker.tracked_keys(), 0);
    }

    #[test]
    fn analyze_sees_history_before_recording() {
        let tracker = RequestTracker::in_memory(TrackerConfig::default());
        let detector = AbuseDetector::new();
        tracker.record_request_at("k", &chat(), at_secs(0));

        let analysis = tracker.analyze_and_record_at("k", &chat(), &detector, at_secs(0));
        // one prior record at the same instant trips only the interval check
        assert_eq!(analysis.violations.len(), 1);
        assert_eq!(tracker.history_at("k", at_secs(0)).len(), 2);
    }

    #[tokio::test]
    async fn timeout_lifecycle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tracker = RequestTracker::open_at(persistent_config(&dir), cipher(), at_secs(0)).await;

        let score = tracker.apply_timeout_at("k", "test", at_secs(0)).await;
        assert_eq!(score, 1);
        assert!(tracker.is_timed_out_at("k", at_secs(0)).await);

        let mut last = u64::MAX;
        for secs in [0, 1, 30, 60, 119] {
            let remaining = tracker.timeout_remaining_at("k", at_secs(secs));
            assert!(remaining < last || last == u64::MAX);
            assert!(remaining > 0);
            last = remaining;
        }
        assert_eq!(tracker.timeout_remaining_at("k", at_secs(0)), 120);
        assert_eq!(tracker.timeout_remaining_at("k", at_secs(119)), 1);

        // flips exactly at expiry and stays flipped
        assert!(tracker.is_timed_out_at("k", at_secs(119)).await);
        assert!(!tracker.is_timed_out_at("k", at_secs(120)).await);
        assert!(tracker.timeout_expiry("k").is_none());
        assert!(!tracker.is_timed_out_at("k", at_secs(121)).await);
        assert_eq!(tracker.timeout_remaining_at("k", at_secs(121)), 0);

        // the cleared timeout reached disk, the score survived
        let reopened = RequestTracker::open_at(persistent_config(&dir), cipher(), at_secs(0)).await;
        assert!(reopened.timeout_expiry("k").is_none());
        assert_eq!(reopened.suspicion_score("k"), 1);
    }

    #[tokio::test]
    async fn scores_accumulate() {
        let tracker = RequestTracker::in_memory(TrackerConfig::default());
        for expected in 1..=4 {
            let score = tracker.apply_timeout_at("k", "again", at_secs(0)).await;
            assert_eq!(score, expected);
        }
        assert_eq!(tracker.suspicion_score("k"), 4);
        assert_eq!(tracker.suspicion_score("unknown"), 0);
    }

    #[tokio::test]
    async fn restart_restores_only_live_timeouts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tracker = RequestTracker::open_at(persistent_config(&dir), cipher(), at_secs(0)).await;
        tracker.apply_timeout_at("early", "x", at_secs(0)).await;
        tracker.apply_timeout_at("late", "x", at_secs(100)).await;
        tracker.record_request_at("late", &chat(), at_secs(100));

        let reopened =
            RequestTracker::open_at(persistent_config(&dir), cipher(), at_secs(150)).await;

        assert!(reopened.timeout_expiry("early").is_none());
        assert_eq!(reopened.suspicion_score("early"), 1);
        assert_eq!(reopened.timeout_expiry("late"), Some(at_secs(220)));
        assert!(reopened.history_at("late", at_secs(150)).is_empty());
    }

    #[tokio::test]
    async fn corrupt_state_file_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = persistent_config(&dir);
        let path = config.state_path.clone().expect("path");
        tokio::fs::write(&path, "garbage").await.expect("write");

        let tracker = RequestTracker::open_at(config, cipher(), at_secs(0)).await;
        assert_eq!(tracker.tracked_keys(), 0);
    }

    #[tokio::test]
    async fn persistence_failure_does_not_block() {
        let dir = tempfile::tempdir().expect("tempdir");
        // a directory where the state file should be makes every save fail
        let blocked = dir.path().join("abuse_state.enc");
        std::fs::create_dir(&blocked).expect("mkdir");
        let config = TrackerConfig {
            state_path: Some(blocked),
            ..TrackerConfig::default()
        };

        let tracker = RequestTracker::open_at(config, cipher(), at_secs(0)).await;
        let score = tracker.apply_timeout_at("k", "x", at_secs(0)).await;
        assert_eq!(score, 1);
        assert!(tracker.is_timed_out_at("k", at_secs(1)).await);
        assert!(tracker.flush().await.is_err());
    }

    #[tokio::test]
    async fn clear_resets_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tracker = RequestTracker::open_at(persistent_config(&dir), cipher(), at_secs(0)).await;
        tracker.apply_timeout_at("k", "x", at_secs(0)).await;

        assert!(tracker.clear("k").await);
        assert!(!tracker.clear("k").await);
        assert_eq!(tracker.suspicion_score("k"), 0);
        assert!(tracker.timeout_expiry("k").is_none());
        assert_eq!(tracker.tracked_keys(), 0);

        let reopened = RequestTracker::open_at(persistent_config(&dir), cipher(), at_secs(0)).await;
        assert_eq!(reopened.suspicion_score("k"), 0);
    }

    #[tokio::test]
    async fn custom_timeout_duration() {
        let tracker = RequestTracker::in_memory(TrackerConfig {
            timeout_duration: Duration::from_secs(10),
            ..TrackerConfig::default()
        });
        tracker.apply_timeout_at("k", "x", at_secs(0)).await;
        assert_eq!(tracker.timeout_expiry("k"), Some(at_secs(10)));
    }

    #[test]
    fn debug_does_not_list_keys() {
        let tracker = RequestTracker::in_memory(TrackerConfig::default());
        tracker.record_request_at("sk-secret", &chat(), at_secs(0));
        let debug = format!("{tracker:?}");
        assert!(debug.contains("tracked_keys: 1"));
        assert!(!debug.contains("sk-secret"));
    }
}
