//! Best-seed selection for the replant pipeline.
//!
//! A deliberate cascade of increasing-cost fallbacks: pinned preference,
//! forced-cheapest flag, the external recommendation service, and finally
//! a static level heuristic. As long as any catalog entry survives the
//! availability filter, the selector returns one -- it never fails
//! outright.

use croft_types::{SeedId, ShopEntry};
use tracing::{debug, warn};

use crate::client::Recommender;
use crate::config::SeedConfig;

/// Choose which seed to plant this cycle.
///
/// `catalog` is the freshly-fetched shop catalog; `level` and
/// `plot_count` feed the recommendation service; `prefs` carries the
/// user's pinned/cheapest preferences. Returns `None` only when no
/// catalog entry is available at this level, in which case the caller
/// must skip planting for the cycle.
pub async fn select_seed(
    catalog: &[ShopEntry],
    level: u32,
    plot_count: usize,
    prefs: &SeedConfig,
    recommender: &dyn Recommender,
) -> Option<ShopEntry> {
    let available: Vec<&ShopEntry> = catalog
        .iter()
        .filter(|entry| entry.is_available(level))
        .collect();
    if available.is_empty() {
        return None;
    }

    // 1. User-pinned seed, when present in the filtered list.
    if let Some(pinned) = prefs.pinned {
        let pinned = SeedId(pinned);
        if let Some(entry) = available.iter().find(|entry| entry.id == pinned) {
            debug!(seed = %entry.id, name = %entry.name, "using pinned seed");
            return Some((*entry).clone());
        }
        warn!(
            seed = %pinned,
            "pinned seed not available at level {level}, falling through"
        );
    }

    // 2. Forced cheapest: lowest level requirement, ties by price.
    if prefs.force_cheapest {
        return cheapest(&available).cloned();
    }

    // 3. External ranking service, best-effort.
    match recommender.recommend(level, plot_count).await {
        Ok(ranked) => {
            for id in ranked {
                if let Some(entry) = available.iter().find(|entry| entry.id == id) {
                    debug!(seed = %entry.id, name = %entry.name, "using recommended seed");
                    return Some((*entry).clone());
                }
            }
            debug!("no recommended seed matched the catalog, using heuristic");
        }
        Err(err) => {
            warn!(error = %err, "recommendation service failed, using heuristic");
        }
    }

    // 4. Static heuristic: low levels plant cheap fast seeds; higher
    // levels plant the highest-requirement seed for better yield.
    if level < prefs.cheap_level_threshold {
        cheapest(&available).cloned()
    } else {
        available
            .iter()
            .max_by_key(|entry| (entry.level_required, entry.unit_price))
            .map(|entry| (*entry).clone())
    }
}

/// Lowest level requirement, tie-broken by lowest price.
fn cheapest<'a>(available: &[&'a ShopEntry]) -> Option<&'a ShopEntry> {
    available
        .iter()
        .min_by_key(|entry| (entry.level_required, entry.unit_price))
        .copied()
}
