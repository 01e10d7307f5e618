//! Enumeration types shared across the croft workspace.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Plot tier
// ---------------------------------------------------------------------------

/// Upgrade tier of a plot.
///
/// Plots start at [`PlotTier::Base`] and can be upgraded through the
/// colored tiers when the server marks them upgrade-eligible. A higher
/// tier shortens growth timers server-side; the engine only needs the
/// tier for logging and eligibility bookkeeping.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PlotTier {
    /// Ordinary land, the starting tier.
    #[default]
    Base,
    /// First upgrade tier.
    Red,
    /// Second upgrade tier.
    Black,
    /// Final upgrade tier.
    Gold,
}

// ---------------------------------------------------------------------------
// Phase kind
// ---------------------------------------------------------------------------

/// The kind of a scheduled growth phase.
///
/// The server schedules an ordered list of phases per occupant; the engine
/// resolves which one is active from the estimated server time. Kinds the
/// engine does not recognize deserialize as [`PhaseKind::Unknown`] and are
/// treated as growing, so a server-side addition never breaks a snapshot.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    /// Freshly planted, not yet sprouted.
    #[default]
    Seed,
    /// Early visible growth.
    Sprout,
    /// Main growth period.
    Growing,
    /// Ready to harvest.
    Mature,
    /// Withered; the occupant must be removed before replanting.
    Dead,
    /// A phase kind this engine version does not know about.
    #[serde(other)]
    Unknown,
}

impl PhaseKind {
    /// Whether this kind represents a plot still in active growth
    /// (i.e. worth watering, weeding, and de-pesting).
    pub const fn is_growing(self) -> bool {
        matches!(self, Self::Seed | Self::Sprout | Self::Growing | Self::Unknown)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unknown_phase_kind_tolerated() {
        let kind: PhaseKind = serde_json::from_str("\"quantum_bloom\"").unwrap();
        assert_eq!(kind, PhaseKind::Unknown);
        assert!(kind.is_growing());
    }

    #[test]
    fn mature_and_dead_are_not_growing() {
        assert!(!PhaseKind::Mature.is_growing());
        assert!(!PhaseKind::Dead.is_growing());
        assert!(PhaseKind::Seed.is_growing());
    }
}
