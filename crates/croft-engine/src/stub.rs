//! In-memory stub farm backend.
//!
//! Implements [`FarmClient`] and [`Recommender`] over a mutable world
//! behind a mutex, so the full cycle loop can be exercised end-to-end
//! without a live server. Every call mutates the world the way the real
//! server would: harvesting frees the plot, planting schedules a growth
//! phase list, unlocking flips the flag.

use std::sync::Mutex;

use async_trait::async_trait;
use croft_core::{ClientError, FarmClient, Recommender};
use croft_types::{
    ItemId, Occupant, Phase, PhaseKind, Plot, PlotId, PlotSnapshot, PurchaseReceipt, SeedId,
    ShopEntry,
};

/// Growth schedule used for stub plantings: sprout after 10 minutes,
/// mature after 30.
const SPROUT_AFTER_SECS: i64 = 600;
const MATURE_AFTER_SECS: i64 = 1_800;

/// A deterministic in-memory farm.
pub struct StubFarm {
    world: Mutex<Vec<Plot>>,
    catalog: Vec<ShopEntry>,
}

impl StubFarm {
    /// Create the starting farm: one mature crop, one withered crop, one
    /// thirsty seedling, two empty plots, and one locked plot the server
    /// offers to unlock.
    pub fn starting_farm(now_secs: i64) -> Self {
        let growing = |start: i64, dry: i64| Phase {
            kind: PhaseKind::Growing,
            scheduled_start: start,
            dry_deadline: dry,
            ..Phase::default()
        };
        let plots = vec![
            Plot {
                id: PlotId(1),
                unlocked: true,
                occupant: Some(Occupant {
                    name: "Carrot".to_owned(),
                    reward_value: 250,
                    phases: vec![Phase {
                        kind: PhaseKind::Mature,
                        scheduled_start: now_secs.saturating_sub(60),
                        ..Phase::default()
                    }],
                    ..Occupant::default()
                }),
                ..Plot::default()
            },
            Plot {
                id: PlotId(2),
                unlocked: true,
                occupant: Some(Occupant {
                    name: "Wheat".to_owned(),
                    phases: vec![Phase {
                        kind: PhaseKind::Dead,
                        scheduled_start: now_secs.saturating_sub(120),
                        ..Phase::default()
                    }],
                    ..Occupant::default()
                }),
                ..Plot::default()
            },
            Plot {
                id: PlotId(3),
                unlocked: true,
                occupant: Some(Occupant {
                    name: "Turnip".to_owned(),
                    phases: vec![growing(
                        now_secs.saturating_sub(300),
                        now_secs.saturating_sub(30),
                    )],
                    ..Occupant::default()
                }),
                ..Plot::default()
            },
            Plot {
                id: PlotId(4),
                unlocked: true,
                ..Plot::default()
            },
            Plot {
                id: PlotId(5),
                unlocked: true,
                ..Plot::default()
            },
            Plot {
                id: PlotId(6),
                unlocked: false,
                unlock_eligible: true,
                ..Plot::default()
            },
        ];
        let catalog = vec![
            ShopEntry {
                id: SeedId(1),
                name: "Turnip".to_owned(),
                unit_price: 50,
                level_required: 1,
                unlocked: true,
                purchase_limit: None,
                purchased: 0,
            },
            ShopEntry {
                id: SeedId(2),
                name: "Pumpkin".to_owned(),
                unit_price: 400,
                level_required: 25,
                unlocked: true,
                purchase_limit: None,
                purchased: 0,
            },
        ];
        Self {
            world: Mutex::new(plots),
            catalog,
        }
    }

    /// Run `f` over the mutable plot list.
    fn with_world<T>(
        &self,
        f: impl FnOnce(&mut Vec<Plot>) -> Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        let mut world = self
            .world
            .lock()
            .map_err(|_poisoned| ClientError::Transport("stub world poisoned".to_owned()))?;
        f(&mut world)
    }

    /// Mutate one plot by id, rejecting unknown ids.
    fn with_plot(
        &self,
        id: PlotId,
        f: impl FnOnce(&mut Plot) -> Result<(), ClientError>,
    ) -> Result<(), ClientError> {
        self.with_world(|plots| {
            let plot = plots
                .iter_mut()
                .find(|plot| plot.id == id)
                .ok_or_else(|| ClientError::Rejected(format!("unknown plot {id}")))?;
            f(plot)
        })
    }

    fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[async_trait]
impl FarmClient for StubFarm {
    async fn fetch_all_plots(&self) -> Result<PlotSnapshot, ClientError> {
        self.with_world(|plots| {
            Ok(PlotSnapshot {
                plots: plots.clone(),
                server_time_ms: Some(Self::now_ms()),
                ..PlotSnapshot::default()
            })
        })
    }

    async fn harvest(&self, ids: &[PlotId]) -> Result<(), ClientError> {
        self.with_world(|plots| {
            for plot in plots.iter_mut() {
                if ids.contains(&plot.id) {
                    plot.occupant = None;
                }
            }
            Ok(())
        })
    }

    async fn water(&self, ids: &[PlotId]) -> Result<(), ClientError> {
        self.with_world(|plots| {
            for plot in plots.iter_mut() {
                if ids.contains(&plot.id) {
                    if let Some(occupant) = plot.occupant.as_mut() {
                        occupant.pending_dry_count = 0;
                        for phase in &mut occupant.phases {
                            phase.dry_deadline = 0;
                        }
                    }
                }
            }
            Ok(())
        })
    }

    async fn weed(&self, ids: &[PlotId]) -> Result<(), ClientError> {
        self.with_world(|plots| {
            for plot in plots.iter_mut() {
                if ids.contains(&plot.id) {
                    if let Some(occupant) = plot.occupant.as_mut() {
                        occupant.weed_markers.clear();
                        for phase in &mut occupant.phases {
                            phase.weed_deadline = 0;
                        }
                    }
                }
            }
            Ok(())
        })
    }

    async fn depest(&self, ids: &[PlotId]) -> Result<(), ClientError> {
        self.with_world(|plots| {
            for plot in plots.iter_mut() {
                if ids.contains(&plot.id) {
                    if let Some(occupant) = plot.occupant.as_mut() {
                        occupant.pest_markers.clear();
                        for phase in &mut occupant.phases {
                            phase.pest_deadline = 0;
                        }
                    }
                }
            }
            Ok(())
        })
    }

    async fn remove_occupant(&self, ids: &[PlotId]) -> Result<(), ClientError> {
        self.with_world(|plots| {
            for plot in plots.iter_mut() {
                if ids.contains(&plot.id) {
                    plot.occupant = None;
                }
            }
            Ok(())
        })
    }

    async fn unlock_one(&self, id: PlotId) -> Result<(), ClientError> {
        self.with_plot(id, |plot| {
            if plot.unlocked {
                return Err(ClientError::Rejected(format!("plot {id} already unlocked")));
            }
            plot.unlocked = true;
            plot.unlock_eligible = false;
            Ok(())
        })
    }

    async fn upgrade_one(&self, id: PlotId) -> Result<(), ClientError> {
        self.with_plot(id, |plot| {
            if !plot.upgrade_eligible {
                return Err(ClientError::Rejected(format!("plot {id} not upgradable")));
            }
            plot.upgrade_eligible = false;
            Ok(())
        })
    }

    async fn plant_one(&self, _seed: SeedId, id: PlotId) -> Result<(), ClientError> {
        let now_secs = Self::now_ms().checked_div(1000).unwrap_or(0);
        self.with_plot(id, |plot| {
            if !plot.is_empty() {
                return Err(ClientError::Rejected(format!("plot {id} is occupied")));
            }
            plot.occupant = Some(Occupant {
                name: "Turnip".to_owned(),
                phases: vec![
                    Phase {
                        kind: PhaseKind::Seed,
                        scheduled_start: now_secs,
                        ..Phase::default()
                    },
                    Phase {
                        kind: PhaseKind::Growing,
                        scheduled_start: now_secs.saturating_add(SPROUT_AFTER_SECS),
                        ..Phase::default()
                    },
                    Phase {
                        kind: PhaseKind::Mature,
                        scheduled_start: now_secs.saturating_add(MATURE_AFTER_SECS),
                        ..Phase::default()
                    },
                ],
                ..Occupant::default()
            });
            Ok(())
        })
    }

    async fn amend_one(&self, id: PlotId, _amendment: ItemId) -> Result<(), ClientError> {
        // The stub has unlimited amendment stock; just validate the plot.
        self.with_plot(id, |plot| {
            if plot.is_empty() {
                return Err(ClientError::Rejected(format!("plot {id} has no crop")));
            }
            Ok(())
        })
    }

    async fn fetch_catalog(&self, _shop_id: u32) -> Result<Vec<ShopEntry>, ClientError> {
        Ok(self.catalog.clone())
    }

    async fn purchase(
        &self,
        entry: SeedId,
        count: u32,
        unit_price: u64,
    ) -> Result<PurchaseReceipt, ClientError> {
        if !self.catalog.iter().any(|e| e.id == entry) {
            return Err(ClientError::Rejected(format!("unknown catalog entry {entry}")));
        }
        Ok(PurchaseReceipt {
            entry_id: entry,
            count,
            total_price: u64::from(count).saturating_mul(unit_price),
        })
    }
}

#[async_trait]
impl Recommender for StubFarm {
    async fn recommend(&self, level: u32, _plot_count: usize) -> Result<Vec<SeedId>, ClientError> {
        // Prefer the pumpkin once the account can plant it.
        if level >= 25 {
            Ok(vec![SeedId(2), SeedId(1)])
        } else {
            Ok(vec![SeedId(1)])
        }
    }
}
