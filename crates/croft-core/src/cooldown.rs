//! Retry cooldown tracking for gated expansion operations.
//!
//! Unlock and upgrade calls fail persistently for reasons outside the
//! engine's control (currency thresholds, server-side prerequisites).
//! Retrying them every cycle hammers the server for nothing, so each
//! failure opens a per-plot suppression window. Maintenance and harvest
//! actions are never gated -- they are idempotent and cheap to retry.

use std::collections::HashMap;

use croft_types::PlotId;

/// Default suppression window after a failed gated operation.
pub const DEFAULT_RETRY_SECS: i64 = 600;

/// The operations whose failures are placed on cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatedOp {
    /// Unlocking a new plot.
    Unlock,
    /// Upgrading a plot's tier.
    Upgrade,
}

/// Per-plot, per-operation last-failure map.
///
/// Timestamps are estimated server epoch seconds; the caller supplies
/// "now" so the tracker stays a pure data structure.
#[derive(Debug, Clone)]
pub struct CooldownTracker {
    retry_secs: i64,
    last_failure: HashMap<(GatedOp, PlotId), i64>,
}

impl CooldownTracker {
    /// Create a tracker with the default 10-minute retry window.
    pub fn new() -> Self {
        Self::with_retry_secs(DEFAULT_RETRY_SECS)
    }

    /// Create a tracker with a custom retry window.
    pub fn with_retry_secs(retry_secs: i64) -> Self {
        Self {
            retry_secs,
            last_failure: HashMap::new(),
        }
    }

    /// Whether the operation may be attempted on this plot: no failure
    /// recorded, or at least the retry window has elapsed since the last
    /// one.
    pub fn is_eligible(&self, op: GatedOp, id: PlotId, now_secs: i64) -> bool {
        self.last_failure
            .get(&(op, id))
            .is_none_or(|&failed_at| now_secs.saturating_sub(failed_at) >= self.retry_secs)
    }

    /// Record a failed attempt, opening (or refreshing) the window.
    pub fn record_failure(&mut self, op: GatedOp, id: PlotId, now_secs: i64) {
        self.last_failure.insert((op, id), now_secs);
    }

    /// Clear the entry for one plot, making it eligible immediately.
    pub fn clear(&mut self, op: GatedOp, id: PlotId) {
        self.last_failure.remove(&(op, id));
    }

    /// Clear every entry. Called at session start and by the explicit
    /// "expand now" entry point so eligible actions are retried right
    /// after a (re)connect.
    pub fn clear_all(&mut self) {
        self.last_failure.clear();
    }
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new()
    }
}
