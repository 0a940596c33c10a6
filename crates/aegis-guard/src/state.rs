//! The persisted abuse-state document.
//!
//! Only timeouts and suspicion scores are durable. Request history is
//! high-volume and low-value and never leaves memory.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decrypted content of the abuse-state file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbuseState {
    /// Timeout expiry per key, epoch milliseconds.
    #[serde(default)]
    pub timeouts: BTreeMap<String, i64>,
    /// Suspicion score per key.
    #[serde(default)]
    pub suspicion_scores: BTreeMap<String, u32>,
    /// When this document was written.
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

impl AbuseState {
    /// An empty document stamped with `now`.
    #[must_use]
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            timeouts: BTreeMap::new(),
            suspicion_scores: BTreeMap::new(),
            last_updated: now,
        }
    }

    /// Timeouts still live at `now`, as timestamps.
    ///
    /// Expired or unrepresentable entries are dropped.
    pub fn live_timeouts(&self, now: DateTime<Utc>) -> impl Iterator<Item = (&str, DateTime<Utc>)> {
        self.timeouts.iter().filter_map(move |(key, ms)| {
            DateTime::<Utc>::from_timestamp_millis(*ms)
                .filter(|expiry| *expiry > now)
                .map(|expiry| (key.as_str(), expiry))
        })
    }
}
