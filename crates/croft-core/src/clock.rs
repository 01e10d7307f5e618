//! Server-time estimator.
//!
//! The server timestamps everything in its own wall clock, which drifts
//! from ours and must not be queried per-computation. [`ServerClock`]
//! records the pair (server time, local instant) once per sync and
//! projects "now" from local elapsed time thereafter.
//!
//! The projection is monotonic only with respect to the local monotonic
//! clock; it is deliberately not protected against local wall-clock
//! adjustment, because only the pre-sync fallback touches the wall clock.

use std::time::Instant;

use chrono::Utc;
use croft_types::normalize_epoch_secs;

/// Estimates the current server time from a single synchronization point.
///
/// Before the first [`sync`](Self::sync), estimates fall back to the local
/// wall clock.
#[derive(Debug, Clone, Copy)]
pub struct ServerClock {
    /// Server time at the last sync, normalized to epoch seconds.
    server_secs_at_sync: Option<i64>,
    /// Local monotonic instant captured at the last sync.
    local_at_sync: Instant,
}

impl ServerClock {
    /// Create an unsynced clock.
    pub fn new() -> Self {
        Self {
            server_secs_at_sync: None,
            local_at_sync: Instant::now(),
        }
    }

    /// Record a server-reported time.
    ///
    /// `server_time` may be in milliseconds or seconds; it is normalized
    /// the same way phase timestamps are. Zero or negative reports are
    /// ignored (the server occasionally sends placeholder zeros during
    /// login).
    pub fn sync(&mut self, server_time: i64) {
        if let Some(secs) = normalize_epoch_secs(server_time) {
            self.server_secs_at_sync = Some(secs);
            self.local_at_sync = Instant::now();
        }
    }

    /// Whether the clock has been synced at least once this session.
    pub const fn is_synced(&self) -> bool {
        self.server_secs_at_sync.is_some()
    }

    /// Projected current server time in epoch seconds, rounded down.
    ///
    /// Falls back to local wall-clock seconds if never synced.
    pub fn now_secs(&self) -> i64 {
        match self.server_secs_at_sync {
            Some(base) => {
                let elapsed = self.local_at_sync.elapsed().as_secs();
                let elapsed = i64::try_from(elapsed).unwrap_or(i64::MAX);
                base.saturating_add(elapsed)
            }
            None => Utc::now().timestamp(),
        }
    }
}

impl Default for ServerClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unsynced_clock_tracks_local_wall_clock() {
        let clock = ServerClock::new();
        assert!(!clock.is_synced());
        let local = Utc::now().timestamp();
        let estimated = clock.now_secs();
        // Within a generous two seconds of the local wall clock.
        assert!((estimated - local).abs() <= 2);
    }

    #[test]
    fn synced_clock_projects_from_server_base() {
        let mut clock = ServerClock::new();
        clock.sync(1_700_000_000_000); // milliseconds
        assert!(clock.is_synced());
        let estimated = clock.now_secs();
        // Test executes in well under a second of elapsed local time.
        assert!((1_700_000_000..1_700_000_002).contains(&estimated));
    }

    #[test]
    fn sync_accepts_seconds_too() {
        let mut clock = ServerClock::new();
        clock.sync(1_700_000_000);
        assert!((1_700_000_000..1_700_000_002).contains(&clock.now_secs()));
    }

    #[test]
    fn zero_or_negative_sync_is_ignored() {
        let mut clock = ServerClock::new();
        clock.sync(0);
        assert!(!clock.is_synced());
        clock.sync(-42);
        assert!(!clock.is_synced());
    }

    #[test]
    fn later_sync_replaces_earlier_base() {
        let mut clock = ServerClock::new();
        clock.sync(1_700_000_000);
        clock.sync(1_800_000_000);
        assert!(clock.now_secs() >= 1_800_000_000);
    }
}
