//! Core entity structs: plots, occupants, phases, snapshots, shop and
//! session state.
//!
//! Everything here is reconstructed fresh each cycle from a remote
//! snapshot; nothing carries engine state across cycles.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::enums::{PhaseKind, PlotTier};
use crate::ids::{OwnerId, PlotId, SeedId};

/// Timestamps whose magnitude exceeds this value are in milliseconds and
/// get divided by 1000 on access. The server is inconsistent about units.
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Normalize a raw server timestamp to epoch seconds.
///
/// Returns `None` for zero or negative values ("not scheduled").
/// Values above `10^12` are interpreted as milliseconds.
pub const fn normalize_epoch_secs(raw: i64) -> Option<i64> {
    if raw <= 0 {
        return None;
    }
    if raw > MILLIS_THRESHOLD {
        raw.checked_div(1000)
    } else {
        Some(raw)
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// A scheduled growth phase with its sub-timers.
///
/// All timestamp fields hold raw server values; use the `*_secs` accessors
/// to get normalized epoch seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    /// The kind of phase (seed, growing, mature, dead, ...).
    pub kind: PhaseKind,
    /// When this phase begins. Zero or negative means "not scheduled".
    #[serde(default)]
    pub scheduled_start: i64,
    /// When the soil dries out during this phase.
    #[serde(default)]
    pub dry_deadline: i64,
    /// When weeds appear during this phase.
    #[serde(default)]
    pub weed_deadline: i64,
    /// When pests appear during this phase.
    #[serde(default)]
    pub pest_deadline: i64,
}

impl Phase {
    /// Normalized start of this phase in epoch seconds, if scheduled.
    pub const fn start_secs(&self) -> Option<i64> {
        normalize_epoch_secs(self.scheduled_start)
    }

    /// Normalized dry deadline in epoch seconds, if scheduled.
    pub const fn dry_deadline_secs(&self) -> Option<i64> {
        normalize_epoch_secs(self.dry_deadline)
    }

    /// Normalized weed deadline in epoch seconds, if scheduled.
    pub const fn weed_deadline_secs(&self) -> Option<i64> {
        normalize_epoch_secs(self.weed_deadline)
    }

    /// Normalized pest deadline in epoch seconds, if scheduled.
    pub const fn pest_deadline_secs(&self) -> Option<i64> {
        normalize_epoch_secs(self.pest_deadline)
    }
}

// ---------------------------------------------------------------------------
// Occupant
// ---------------------------------------------------------------------------

/// Whatever is currently planted on a plot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    /// Display name of the crop (used for harvest logging).
    pub name: String,
    /// Scheduled phases, ascending by scheduled start.
    #[serde(default)]
    pub phases: Vec<Phase>,
    /// Number of dry events the server has queued for this occupant.
    /// A positive count signals "needs water" even without an elapsed
    /// dry timer.
    #[serde(default)]
    pub pending_dry_count: u32,
    /// Accounts that left weeds on this plot. Non-empty signals
    /// "needs weeding" regardless of timer state.
    #[serde(default)]
    pub weed_markers: BTreeSet<OwnerId>,
    /// Accounts that left pests on this plot. Non-empty signals
    /// "needs pest control" regardless of timer state.
    #[serde(default)]
    pub pest_markers: BTreeSet<OwnerId>,
    /// Estimated reward value on harvest (informational, for logging).
    #[serde(default)]
    pub reward_value: u64,
}

// ---------------------------------------------------------------------------
// Plot
// ---------------------------------------------------------------------------

/// A unit of land the engine can act on.
///
/// Identity is the [`PlotId`]; a plot is immutable once fetched within a
/// cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plot {
    /// Server-assigned plot identifier.
    pub id: PlotId,
    /// Whether this plot is available to the account.
    #[serde(default)]
    pub unlocked: bool,
    /// Whether the server currently offers to unlock this plot.
    #[serde(default)]
    pub unlock_eligible: bool,
    /// Whether the server currently offers to upgrade this plot's tier.
    #[serde(default)]
    pub upgrade_eligible: bool,
    /// Current tier of the plot.
    #[serde(default)]
    pub tier: PlotTier,
    /// What is planted here, if anything.
    #[serde(default)]
    pub occupant: Option<Occupant>,
}

impl Plot {
    /// A plot with no occupant, or an occupant with an empty phase list,
    /// is empty and a candidate for direct seeding.
    pub fn is_empty(&self) -> bool {
        self.occupant.as_ref().is_none_or(|occ| occ.phases.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Operation-count limits reported alongside a snapshot.
///
/// Purely informational side channel; the engine logs it but imposes its
/// own pacing independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpLimits {
    /// Remaining operations the server will accept today, if reported.
    #[serde(default)]
    pub remaining: Option<u32>,
    /// The daily operation ceiling, if reported.
    #[serde(default)]
    pub limit: Option<u32>,
}

/// A full point-in-time view of every plot, fetched once per cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotSnapshot {
    /// All plots, locked and unlocked.
    pub plots: Vec<Plot>,
    /// Server wall-clock at snapshot time, in milliseconds, when the
    /// transport reports it. Used to refresh the clock estimator.
    #[serde(default)]
    pub server_time_ms: Option<i64>,
    /// Operation-count limits side channel.
    #[serde(default)]
    pub op_limits: OpLimits,
}

impl PlotSnapshot {
    /// Number of unlocked plots in the snapshot.
    pub fn unlocked_count(&self) -> usize {
        self.plots.iter().filter(|p| p.unlocked).count()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Mutable per-session account state.
///
/// Owned by the session layer; the engine reads it each cycle and
/// decrements `currency` when a purchase succeeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Account identity string, for logging.
    pub identity: String,
    /// Current account level; gates the seed catalog.
    pub level: u32,
    /// Stored currency available for purchases.
    pub currency: u64,
}

// ---------------------------------------------------------------------------
// Shop
// ---------------------------------------------------------------------------

/// One entry in the seed shop catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopEntry {
    /// Catalog entry identifier.
    pub id: SeedId,
    /// Display name of the seed.
    pub name: String,
    /// Price per unit in currency.
    pub unit_price: u64,
    /// Minimum account level required to purchase.
    #[serde(default)]
    pub level_required: u32,
    /// Whether the entry is unlocked for this account.
    #[serde(default)]
    pub unlocked: bool,
    /// Lifetime purchase cap, if any.
    #[serde(default)]
    pub purchase_limit: Option<u32>,
    /// Units already purchased against the cap.
    #[serde(default)]
    pub purchased: u32,
}

impl ShopEntry {
    /// Whether this entry can be purchased at the given account level:
    /// unlocked, level-gated conditions satisfied, and purchase cap not
    /// exhausted.
    pub fn is_available(&self, level: u32) -> bool {
        self.unlocked
            && self.level_required <= level
            && self.purchase_limit.is_none_or(|cap| self.purchased < cap)
    }
}

/// Result of a successful purchase call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    /// The catalog entry purchased.
    pub entry_id: SeedId,
    /// Units acquired.
    pub count: u32,
    /// Total currency spent.
    pub total_price: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn normalize_divides_millis() {
        assert_eq!(normalize_epoch_secs(1_700_000_000_123), Some(1_700_000_000));
        assert_eq!(normalize_epoch_secs(1_700_000_000), Some(1_700_000_000));
    }

    #[test]
    fn normalize_rejects_unscheduled() {
        assert_eq!(normalize_epoch_secs(0), None);
        assert_eq!(normalize_epoch_secs(-5), None);
    }

    #[test]
    fn plot_emptiness() {
        let mut plot = Plot {
            id: PlotId(1),
            unlocked: true,
            ..Plot::default()
        };
        assert!(plot.is_empty());

        plot.occupant = Some(Occupant::default());
        assert!(plot.is_empty(), "occupant with no phases is still empty");

        plot.occupant = Some(Occupant {
            phases: vec![Phase::default()],
            ..Occupant::default()
        });
        assert!(!plot.is_empty());
    }

    #[test]
    fn shop_entry_availability() {
        let entry = ShopEntry {
            id: SeedId(1),
            name: "Carrot".to_owned(),
            unit_price: 100,
            level_required: 5,
            unlocked: true,
            purchase_limit: Some(10),
            purchased: 10,
        };
        assert!(!entry.is_available(20), "exhausted cap blocks purchase");

        let fresh = ShopEntry {
            purchased: 3,
            ..entry.clone()
        };
        assert!(fresh.is_available(20));
        assert!(!fresh.is_available(4), "level gate");
        assert!(
            !ShopEntry {
                unlocked: false,
                ..fresh
            }
            .is_available(20)
        );
    }

    #[test]
    fn snapshot_deserializes_with_sparse_fields() {
        let json = r#"{
            "plots": [
                {"id": 1, "unlocked": true,
                 "occupant": {"name": "Wheat", "phases": [
                     {"kind": "seed", "scheduled_start": 1700000000000}
                 ]}}
            ],
            "server_time_ms": 1700000500000
        }"#;
        let snap: PlotSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.plots.len(), 1);
        assert_eq!(snap.unlocked_count(), 1);
        let first = snap.plots.first().unwrap();
        let occ = first.occupant.as_ref().unwrap();
        let phase = occ.phases.first().unwrap();
        assert_eq!(phase.start_secs(), Some(1_700_000_000));
        assert_eq!(phase.dry_deadline_secs(), None);
    }
}
