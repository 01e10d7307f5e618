//! Action orchestration: turn a classification into a bounded sequence of
//! remote calls.
//!
//! Executed once per cycle with deterministic stage ordering:
//!
//! 1. **Maintenance** -- watering, weeding, and pest removal as three
//!    concurrent batch calls; failures are logged and ignored.
//! 2. **Harvest** -- one batch call; successes clear the plot's upgrade
//!    cooldown.
//! 3. **Unlock** -- one plot at a time behind the feature flag and the
//!    cooldown gate, with pacing between items.
//! 4. **Upgrade** -- same contract, after unlock so expansion does not
//!    race with leveling.
//! 5. **Replant** -- clear dead residue, pick a seed, shrink to what the
//!    account can afford, purchase once, then plant and amend one plot
//!    at a time.
//!
//! Every stage handles its own failures; nothing escapes this module.
//! Only two failures gate later work: a failed purchase aborts planting,
//! and a failed amendment halts the remaining amendment loop (treated as
//! resource exhaustion).

use std::collections::BTreeSet;

use croft_types::{ItemId, PlotId};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::classify::Classification;
use crate::client::{ClientError, FarmClient, Recommender, SharedSession};
use crate::config::BotConfig;
use crate::cooldown::{CooldownTracker, GatedOp};
use crate::selector::select_seed;

/// Aggregate counters from one orchestration pass.
///
/// Used for the per-cycle log line, the periodic summary, and the
/// one-time first-cycle callback. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Total plots in the snapshot.
    pub plots_total: usize,
    /// Unlocked plots in the snapshot.
    pub plots_unlocked: usize,
    /// Plots in active growth.
    pub growing: usize,
    /// Plots watered this cycle.
    pub watered: usize,
    /// Plots weeded this cycle.
    pub weeded: usize,
    /// Plots de-pested this cycle.
    pub depested: usize,
    /// Plots harvested this cycle.
    pub harvested: usize,
    /// Summed reward estimate of everything harvested.
    pub harvest_value: u64,
    /// Plots unlocked this cycle.
    pub unlocked: usize,
    /// Plots upgraded this cycle.
    pub upgraded: usize,
    /// Plots planted this cycle.
    pub planted: usize,
    /// Plots amended (fertilized) this cycle.
    pub amended: usize,
    /// Plant candidates dropped because currency ran short.
    pub skipped_unaffordable: usize,
    /// Name of the seed planted this cycle, if any.
    pub seed_name: Option<String>,
}

impl CycleStats {
    /// One-line human-readable summary for the cycle log.
    pub fn summary(&self) -> String {
        format!(
            "plots={}/{} growing={} watered={} weeded={} depested={} harvested={} (+{}) unlocked={} upgraded={} planted={} amended={}",
            self.plots_unlocked,
            self.plots_total,
            self.growing,
            self.watered,
            self.weeded,
            self.depested,
            self.harvested,
            self.harvest_value,
            self.unlocked,
            self.upgraded,
            self.planted,
            self.amended,
        )
    }
}

/// Borrowed context for one orchestration pass.
///
/// Holds the remote client, the recommendation service, the shared
/// session state, and the configuration. The cooldown tracker is passed
/// into [`run`](Self::run) mutably because it outlives cycles.
pub struct Orchestrator<'a> {
    /// Remote farm actions.
    pub client: &'a dyn FarmClient,
    /// Planting-efficiency recommendation service.
    pub recommender: &'a dyn Recommender,
    /// Mutable account state (level, currency).
    pub session: &'a SharedSession,
    /// Engine configuration.
    pub config: &'a BotConfig,
}

impl Orchestrator<'_> {
    /// Execute the full action sequence for one classification.
    ///
    /// `now_secs` is the estimated server time the classification was
    /// computed against; `unlocked_plots` is the snapshot's unlocked
    /// count (feeds the recommendation service).
    pub async fn run(
        &self,
        classification: &Classification,
        cooldowns: &mut CooldownTracker,
        now_secs: i64,
        unlocked_plots: usize,
    ) -> CycleStats {
        let mut stats = CycleStats {
            plots_unlocked: unlocked_plots,
            growing: classification.growing,
            ..CycleStats::default()
        };

        // --- Stage 1: concurrent maintenance batches ---
        let (watered, weeded, depested) = tokio::join!(
            self.water_all(&classification.needs_water),
            self.weed_all(&classification.needs_weed),
            self.depest_all(&classification.needs_pest),
        );
        stats.watered = watered;
        stats.weeded = weeded;
        stats.depested = depested;

        // --- Stage 2: batched harvest ---
        self.harvest_all(classification, cooldowns, &mut stats).await;

        // --- Stage 3: unlock, one plot at a time ---
        if self.config.actions.auto_unlock {
            stats.unlocked = self
                .expand_loop(GatedOp::Unlock, &classification.unlock_candidates, cooldowns, now_secs)
                .await
                .succeeded
                .len();
        }

        // --- Stage 4: upgrade, one plot at a time, after unlock ---
        let upgrades = if self.config.actions.auto_upgrade {
            self.expand_loop(GatedOp::Upgrade, &classification.upgrade_candidates, cooldowns, now_secs)
                .await
        } else {
            ExpandOutcome::default()
        };
        stats.upgraded = upgrades.succeeded.len();

        // --- Stage 5: replant pipeline ---
        if self.config.actions.auto_replant {
            self.replant(classification, &upgrades, unlocked_plots, &mut stats)
                .await;
        }

        stats
    }

    // -----------------------------------------------------------------------
    // Stage 1: maintenance
    // -----------------------------------------------------------------------

    /// Log a batch action result, returning how many plots were acted on.
    fn settle_batch(
        label: &'static str,
        count: usize,
        result: Result<(), ClientError>,
    ) -> usize {
        match result {
            Ok(()) => {
                info!(action = label, count, "batch action complete");
                count
            }
            Err(err) => {
                // No retry this cycle; the next snapshot re-derives need.
                warn!(action = label, count, error = %err, "batch action failed");
                0
            }
        }
    }

    /// Water every plot in `ids`, if any.
    async fn water_all(&self, ids: &[PlotId]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        Self::settle_batch("water", ids.len(), self.client.water(ids).await)
    }

    /// Weed every plot in `ids`, if any.
    async fn weed_all(&self, ids: &[PlotId]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        Self::settle_batch("weed", ids.len(), self.client.weed(ids).await)
    }

    /// De-pest every plot in `ids`, if any.
    async fn depest_all(&self, ids: &[PlotId]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        Self::settle_batch("depest", ids.len(), self.client.depest(ids).await)
    }

    // -----------------------------------------------------------------------
    // Stage 2: harvest
    // -----------------------------------------------------------------------

    /// Harvest everything mature in one batch call.
    ///
    /// A successful harvest clears the plot's upgrade cooldown: a
    /// freshly-harvested plot is free land and a clean upgrade attempt
    /// should not wait out an old failure.
    async fn harvest_all(
        &self,
        classification: &Classification,
        cooldowns: &mut CooldownTracker,
        stats: &mut CycleStats,
    ) {
        if classification.harvestable.is_empty() {
            return;
        }
        let ids: Vec<PlotId> = classification.harvestable.iter().map(|t| t.id).collect();
        match self.client.harvest(&ids).await {
            Ok(()) => {
                for target in &classification.harvestable {
                    info!(
                        plot = %target.id,
                        crop = %target.name,
                        value = target.reward_value,
                        "harvested"
                    );
                    cooldowns.clear(GatedOp::Upgrade, target.id);
                    stats.harvest_value =
                        stats.harvest_value.saturating_add(target.reward_value);
                }
                stats.harvested = ids.len();
            }
            Err(err) => {
                warn!(count = ids.len(), error = %err, "harvest failed");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Stages 3-4: expansion (unlock / upgrade)
    // -----------------------------------------------------------------------

    /// Run a gated one-at-a-time expansion loop over the candidates.
    ///
    /// Candidates still inside their cooldown window are skipped and
    /// reported in `cooling`; each attempted item feeds the tracker
    /// individually.
    async fn expand_loop(
        &self,
        op: GatedOp,
        candidates: &[PlotId],
        cooldowns: &mut CooldownTracker,
        now_secs: i64,
    ) -> ExpandOutcome {
        let mut outcome = ExpandOutcome::default();
        let mut first = true;
        for &id in candidates {
            if !cooldowns.is_eligible(op, id, now_secs) {
                debug!(plot = %id, op = ?op, "still cooling down, skipped");
                outcome.cooling.insert(id);
                continue;
            }
            if !first {
                sleep(self.config.cycle.item_pacing()).await;
            }
            first = false;

            let result = match op {
                GatedOp::Unlock => self.client.unlock_one(id).await,
                GatedOp::Upgrade => self.client.upgrade_one(id).await,
            };
            match result {
                Ok(()) => {
                    info!(plot = %id, op = ?op, "expansion succeeded");
                    cooldowns.clear(op, id);
                    outcome.succeeded.insert(id);
                }
                Err(err) => {
                    warn!(plot = %id, op = ?op, error = %err, "expansion failed, on cooldown");
                    cooldowns.record_failure(op, id, now_secs);
                    outcome.failed.insert(id);
                }
            }
        }
        outcome
    }

    // -----------------------------------------------------------------------
    // Stage 5: replant pipeline
    // -----------------------------------------------------------------------

    /// Clear dead residue, then seed the freed and empty plots.
    ///
    /// Residue removal covers dead plots minus anything that failed an
    /// upgrade this cycle (that plot is about to change tier; do not
    /// touch it). Direct seeding covers empty plots minus anything that
    /// upgraded this cycle or was already cooling down at cycle start.
    /// Harvested plots re-enter through the next snapshot, where they
    /// show up empty.
    #[allow(clippy::too_many_lines)]
    async fn replant(
        &self,
        classification: &Classification,
        upgrades: &ExpandOutcome,
        unlocked_plots: usize,
        stats: &mut CycleStats,
    ) {
        let removal: BTreeSet<PlotId> = classification
            .dead
            .iter()
            .copied()
            .filter(|id| !upgrades.failed.contains(id))
            .collect();

        let seeding: BTreeSet<PlotId> = classification
            .empty
            .iter()
            .copied()
            .filter(|id| !upgrades.succeeded.contains(id) && !upgrades.cooling.contains(id))
            .collect();

        let targets: Vec<PlotId> = removal.union(&seeding).copied().collect();
        if targets.is_empty() {
            return;
        }

        // a. Clear residue. Best-effort: a failed removal is cosmetic and
        //    must not block seeding the plots that are already clear.
        if !removal.is_empty() {
            let ids: Vec<PlotId> = removal.iter().copied().collect();
            if let Err(err) = self.client.remove_occupant(&ids).await {
                warn!(count = ids.len(), error = %err, "residue removal failed, proceeding");
            }
        }

        // b. Pick a seed.
        let (level, currency) = {
            let session = self.session.lock().await;
            (session.level, session.currency)
        };
        let catalog = match self.client.fetch_catalog(self.config.seeds.shop_id).await {
            Ok(catalog) => catalog,
            Err(err) => {
                warn!(error = %err, "catalog fetch failed, skipping replant");
                return;
            }
        };
        let Some(seed) = select_seed(
            &catalog,
            level,
            unlocked_plots,
            &self.config.seeds,
            self.recommender,
        )
        .await
        else {
            info!(level, "no seed available at this level, skipping replant");
            return;
        };

        // c. Affordability: shrink the candidate count to what the stored
        //    currency covers; zero affordable aborts the pipeline.
        let mut targets = targets;
        let wanted = targets.len();
        let affordable = affordable_count(currency, seed.unit_price, wanted);
        if affordable == 0 {
            warn!(
                seed = %seed.name,
                unit_price = seed.unit_price,
                currency,
                "cannot afford a single seed, skipping replant"
            );
            return;
        }
        if affordable < wanted {
            stats.skipped_unaffordable = wanted.saturating_sub(affordable);
            warn!(
                seed = %seed.name,
                wanted,
                affordable,
                currency,
                "currency shortfall, planting fewer plots"
            );
            targets.truncate(affordable);
        }

        // d. One batched purchase; failure means nothing to plant.
        let count = u32::try_from(targets.len()).unwrap_or(u32::MAX);
        let receipt = match self
            .client
            .purchase(seed.id, count, seed.unit_price)
            .await
        {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!(seed = %seed.name, count, error = %err, "purchase failed, skipping replant");
                return;
            }
        };
        {
            let mut session = self.session.lock().await;
            session.currency = session.currency.saturating_sub(receipt.total_price);
        }
        info!(
            seed = %seed.name,
            count = receipt.count,
            spent = receipt.total_price,
            "seeds purchased"
        );
        stats.seed_name = Some(seed.name.clone());

        // e. Plant one at a time with pacing; per-item failures tolerated.
        let mut planted: Vec<PlotId> = Vec::new();
        let mut first = true;
        for &id in &targets {
            if !first {
                sleep(self.config.cycle.item_pacing()).await;
            }
            first = false;
            match self.client.plant_one(seed.id, id).await {
                Ok(()) => planted.push(id),
                Err(err) => warn!(plot = %id, error = %err, "planting failed"),
            }
        }
        stats.planted = planted.len();

        // f. Amend each planted plot; the first failure means the
        //    amendment stock ran out, so stop the loop.
        let amendment = ItemId(self.config.actions.amendment_item);
        for &id in &planted {
            sleep(self.config.cycle.item_pacing()).await;
            match self.client.amend_one(id, amendment).await {
                Ok(()) => stats.amended = stats.amended.saturating_add(1),
                Err(err) => {
                    warn!(plot = %id, error = %err, "amendment failed, stopping loop");
                    break;
                }
            }
        }
    }
}

/// Per-item results of one expansion loop.
#[derive(Debug, Clone, Default)]
struct ExpandOutcome {
    /// Plots the operation succeeded on.
    succeeded: BTreeSet<PlotId>,
    /// Plots the operation failed on this cycle.
    failed: BTreeSet<PlotId>,
    /// Plots skipped because they were still cooling down.
    cooling: BTreeSet<PlotId>,
}

/// How many units of `wanted` the stored currency covers.
fn affordable_count(currency: u64, unit_price: u64, wanted: usize) -> usize {
    if unit_price == 0 {
        return wanted;
    }
    let by_currency = currency.checked_div(unit_price).unwrap_or(0);
    let by_currency = usize::try_from(by_currency).unwrap_or(usize::MAX);
    wanted.min(by_currency)
}
