//! Plot classification: bucket every plot in a snapshot into action
//! categories.
//!
//! Runs once per cycle over a fresh snapshot. The output is transient --
//! the orchestrator consumes it immediately and nothing is persisted
//! beyond the aggregate counts cached for summary logging.

use croft_types::{PhaseKind, Plot, PlotId, PlotSnapshot};

use crate::phase::current_phase;

/// A harvestable plot with the occupant metadata used for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestTarget {
    /// The plot ready to harvest.
    pub id: PlotId,
    /// Crop name, for the harvest log line.
    pub name: String,
    /// Estimated reward value, for the harvest log line.
    pub reward_value: u64,
}

/// Per-cycle classification of every plot in a snapshot.
///
/// The growing-need sets (`needs_water`, `needs_weed`, `needs_pest`) may
/// overlap each other, but every plot appears in exactly one of
/// {dead, harvestable, empty, growing} as its primary state. Locked
/// plots appear only in `unlock_candidates` or nowhere.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Locked plots the server offers to unlock.
    pub unlock_candidates: Vec<PlotId>,
    /// Unlocked plots the server offers to upgrade (occupied or not).
    pub upgrade_candidates: Vec<PlotId>,
    /// Unlocked plots with nothing planted.
    pub empty: Vec<PlotId>,
    /// Plots whose occupant has withered and must be removed.
    pub dead: Vec<PlotId>,
    /// Plots ready to harvest, with occupant metadata.
    pub harvestable: Vec<HarvestTarget>,
    /// Growing plots that need watering.
    pub needs_water: Vec<PlotId>,
    /// Growing plots that need weeding.
    pub needs_weed: Vec<PlotId>,
    /// Growing plots that need pest control.
    pub needs_pest: Vec<PlotId>,
    /// Total number of plots in active growth.
    pub growing: usize,
}

impl Classification {
    /// One-line human-readable summary for the cycle log.
    pub fn summary(&self) -> String {
        format!(
            "harvestable={} dead={} empty={} growing={} water={} weed={} pest={} unlock={} upgrade={}",
            self.harvestable.len(),
            self.dead.len(),
            self.empty.len(),
            self.growing,
            self.needs_water.len(),
            self.needs_weed.len(),
            self.needs_pest.len(),
            self.unlock_candidates.len(),
            self.upgrade_candidates.len(),
        )
    }
}

/// Classify every plot in the snapshot against the estimated server time.
///
/// Pure function: no clocks, no remote calls.
pub fn classify(snapshot: &PlotSnapshot, now_secs: i64) -> Classification {
    let mut result = Classification::default();
    for plot in &snapshot.plots {
        classify_plot(plot, now_secs, &mut result);
    }
    result
}

/// Classify a single plot into the accumulating result.
fn classify_plot(plot: &Plot, now_secs: i64, result: &mut Classification) {
    if !plot.unlocked {
        // Locked plots are skipped entirely unless the server offers to
        // unlock them.
        if plot.unlock_eligible {
            result.unlock_candidates.push(plot.id);
        }
        return;
    }

    // Upgrade eligibility is independent of occupancy.
    if plot.upgrade_eligible {
        result.upgrade_candidates.push(plot.id);
    }

    if plot.is_empty() {
        result.empty.push(plot.id);
        return;
    }

    // is_empty() guarantees an occupant with at least one phase here.
    let Some(occupant) = plot.occupant.as_ref() else {
        result.empty.push(plot.id);
        return;
    };
    let Some(phase) = current_phase(&occupant.phases, now_secs) else {
        result.empty.push(plot.id);
        return;
    };

    match phase.kind {
        // Dead plots are never inspected for water/weed/pest.
        PhaseKind::Dead => result.dead.push(plot.id),
        PhaseKind::Mature => result.harvestable.push(HarvestTarget {
            id: plot.id,
            name: occupant.name.clone(),
            reward_value: occupant.reward_value,
        }),
        kind if kind.is_growing() => {
            result.growing = result.growing.saturating_add(1);

            // Each need is an OR of two independent signals: the
            // occupant-level counter/markers and the elapsed phase timer.
            let dry_elapsed = phase
                .dry_deadline_secs()
                .is_some_and(|deadline| deadline <= now_secs);
            if occupant.pending_dry_count > 0 || dry_elapsed {
                result.needs_water.push(plot.id);
            }

            let weed_elapsed = phase
                .weed_deadline_secs()
                .is_some_and(|deadline| deadline <= now_secs);
            if !occupant.weed_markers.is_empty() || weed_elapsed {
                result.needs_weed.push(plot.id);
            }

            let pest_elapsed = phase
                .pest_deadline_secs()
                .is_some_and(|deadline| deadline <= now_secs);
            if !occupant.pest_markers.is_empty() || pest_elapsed {
                result.needs_pest.push(plot.id);
            }
        }
        // is_growing() covers every kind other than Mature and Dead.
        _ => {}
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use croft_types::{Occupant, OwnerId, Phase, PlotTier};

    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn growing_phase(start: i64) -> Phase {
        Phase {
            kind: PhaseKind::Growing,
            scheduled_start: start,
            ..Phase::default()
        }
    }

    fn planted(id: u32, phases: Vec<Phase>) -> Plot {
        Plot {
            id: PlotId(id),
            unlocked: true,
            occupant: Some(Occupant {
                name: "Turnip".to_owned(),
                phases,
                ..Occupant::default()
            }),
            ..Plot::default()
        }
    }

    fn snapshot(plots: Vec<Plot>) -> PlotSnapshot {
        PlotSnapshot {
            plots,
            ..PlotSnapshot::default()
        }
    }

    #[test]
    fn locked_ineligible_plot_is_invisible() {
        let snap = snapshot(vec![Plot {
            id: PlotId(1),
            unlocked: false,
            ..Plot::default()
        }]);
        let result = classify(&snap, NOW);
        assert_eq!(result, Classification::default());
    }

    #[test]
    fn locked_eligible_plot_is_an_unlock_candidate_only() {
        let snap = snapshot(vec![Plot {
            id: PlotId(1),
            unlocked: false,
            unlock_eligible: true,
            // A locked plot is never an upgrade candidate even if the
            // snapshot claims eligibility.
            upgrade_eligible: true,
            ..Plot::default()
        }]);
        let result = classify(&snap, NOW);
        assert_eq!(result.unlock_candidates, vec![PlotId(1)]);
        assert!(result.upgrade_candidates.is_empty());
        assert!(result.empty.is_empty());
    }

    #[test]
    fn upgrade_candidacy_is_independent_of_occupancy() {
        let mut occupied = planted(1, vec![growing_phase(NOW - 100)]);
        occupied.upgrade_eligible = true;
        let vacant = Plot {
            id: PlotId(2),
            unlocked: true,
            upgrade_eligible: true,
            tier: PlotTier::Red,
            ..Plot::default()
        };
        let result = classify(&snapshot(vec![occupied, vacant]), NOW);
        assert_eq!(result.upgrade_candidates, vec![PlotId(1), PlotId(2)]);
        assert_eq!(result.empty, vec![PlotId(2)]);
        assert_eq!(result.growing, 1);
    }

    #[test]
    fn dead_plot_skips_maintenance_checks() {
        let mut plot = planted(
            1,
            vec![Phase {
                kind: PhaseKind::Dead,
                scheduled_start: NOW - 10,
                // Elapsed dry timer must be ignored on a dead plot.
                dry_deadline: NOW - 5,
                ..Phase::default()
            }],
        );
        if let Some(occ) = plot.occupant.as_mut() {
            occ.pending_dry_count = 3;
        }
        let result = classify(&snapshot(vec![plot]), NOW);
        assert_eq!(result.dead, vec![PlotId(1)]);
        assert!(result.needs_water.is_empty());
    }

    #[test]
    fn mature_plot_carries_occupant_metadata() {
        let mut plot = planted(
            2,
            vec![Phase {
                kind: PhaseKind::Mature,
                scheduled_start: NOW - 10,
                ..Phase::default()
            }],
        );
        if let Some(occ) = plot.occupant.as_mut() {
            occ.name = "Carrot".to_owned();
            occ.reward_value = 250;
        }
        let result = classify(&snapshot(vec![plot]), NOW);
        assert_eq!(
            result.harvestable,
            vec![HarvestTarget {
                id: PlotId(2),
                name: "Carrot".to_owned(),
                reward_value: 250,
            }]
        );
    }

    #[test]
    fn water_need_is_or_of_counter_and_timer() {
        // Neither signal: not needing water.
        let calm = planted(
            1,
            vec![Phase {
                kind: PhaseKind::Growing,
                scheduled_start: NOW - 100,
                dry_deadline: NOW + 600,
                ..Phase::default()
            }],
        );
        let result = classify(&snapshot(vec![calm.clone()]), NOW);
        assert!(result.needs_water.is_empty());

        // Counter alone.
        let mut counter = calm.clone();
        if let Some(occ) = counter.occupant.as_mut() {
            occ.pending_dry_count = 1;
        }
        let result = classify(&snapshot(vec![counter]), NOW);
        assert_eq!(result.needs_water, vec![PlotId(1)]);

        // Timer alone.
        let mut timer = calm.clone();
        if let Some(occ) = timer.occupant.as_mut() {
            if let Some(phase) = occ.phases.first_mut() {
                phase.dry_deadline = NOW - 1;
            }
        }
        let result = classify(&snapshot(vec![timer]), NOW);
        assert_eq!(result.needs_water, vec![PlotId(1)]);

        // Both signals still yield exactly one membership.
        let mut both = calm;
        if let Some(occ) = both.occupant.as_mut() {
            occ.pending_dry_count = 2;
            if let Some(phase) = occ.phases.first_mut() {
                phase.dry_deadline = NOW - 1;
            }
        }
        let result = classify(&snapshot(vec![both]), NOW);
        assert_eq!(result.needs_water, vec![PlotId(1)]);
    }

    #[test]
    fn weed_and_pest_markers_signal_without_timers() {
        let mut plot = planted(3, vec![growing_phase(NOW - 100)]);
        if let Some(occ) = plot.occupant.as_mut() {
            occ.weed_markers = BTreeSet::from([OwnerId(900)]);
            occ.pest_markers = BTreeSet::from([OwnerId(901), OwnerId(902)]);
        }
        let result = classify(&snapshot(vec![plot]), NOW);
        assert_eq!(result.needs_weed, vec![PlotId(3)]);
        assert_eq!(result.needs_pest, vec![PlotId(3)]);
        assert_eq!(result.growing, 1);
    }

    #[test]
    fn unrecognized_phase_kind_counts_as_growing() {
        let mut plot = planted(
            1,
            vec![Phase {
                kind: PhaseKind::Unknown,
                scheduled_start: NOW - 100,
                dry_deadline: NOW - 10,
                ..Phase::default()
            }],
        );
        if let Some(occ) = plot.occupant.as_mut() {
            occ.pending_dry_count = 1;
        }
        let result = classify(&snapshot(vec![plot]), NOW);
        assert_eq!(result.growing, 1);
        assert_eq!(result.needs_water, vec![PlotId(1)]);
        assert!(result.dead.is_empty());
        assert!(result.harvestable.is_empty());
    }

    #[test]
    fn growing_counts_regardless_of_sub_needs() {
        let quiet = planted(1, vec![growing_phase(NOW - 100)]);
        let mut thirsty = planted(2, vec![growing_phase(NOW - 100)]);
        if let Some(occ) = thirsty.occupant.as_mut() {
            occ.pending_dry_count = 1;
        }
        let result = classify(&snapshot(vec![quiet, thirsty]), NOW);
        assert_eq!(result.growing, 2);
        assert_eq!(result.needs_water, vec![PlotId(2)]);
    }

    #[test]
    fn summary_renders_counts() {
        let snap = snapshot(vec![
            planted(1, vec![growing_phase(NOW - 100)]),
            Plot {
                id: PlotId(2),
                unlocked: true,
                ..Plot::default()
            },
        ]);
        let summary = classify(&snap, NOW).summary();
        assert!(summary.contains("growing=1"));
        assert!(summary.contains("empty=1"));
    }
}
