//! Cycle scheduling: the self-rescheduling loop that drives the engine.
//!
//! One cycle = fetch a snapshot, classify every plot, run the action
//! orchestrator. The scheduler repeats that on a configured interval,
//! guards against overlapping runs with a try-lock, and reacts to
//! debounced push notifications with out-of-band cycles.
//!
//! # Concurrency model
//!
//! A single cycle runs at a time, enforced by the `in_flight` mutex --
//! the only mutual exclusion this engine needs. Cancellation is
//! cooperative via the `running` flag: stopping mid-cycle lets in-flight
//! remote calls complete naturally.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use croft_types::PlotsChanged;
use tokio::sync::{broadcast, oneshot, Mutex, Notify};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::client::{FarmClient, Recommender, SharedSession};
use crate::clock::ServerClock;
use crate::config::BotConfig;
use crate::cooldown::CooldownTracker;
use crate::orchestrator::{CycleStats, Orchestrator};

/// The unattended farm engine: owns the cooldown store, the clock
/// estimator, and the scheduling state, and drives classify-then-act
/// cycles against the remote client.
///
/// Cheap to clone; all state lives behind one [`Arc`].
#[derive(Clone)]
pub struct FarmBot {
    shared: Arc<BotShared>,
}

/// State shared between the cycle loop, the push listener, and the
/// summary logger.
struct BotShared {
    config: BotConfig,
    client: Arc<dyn FarmClient>,
    recommender: Arc<dyn Recommender>,
    session: SharedSession,
    /// Server-time estimator, refreshed from snapshot side channels.
    clock: StdMutex<ServerClock>,
    /// Unlock/upgrade retry suppression, surviving across cycles.
    cooldowns: Mutex<CooldownTracker>,
    /// Whether the scheduler should keep running.
    running: AtomicBool,
    /// Re-entrancy guard: held for the duration of one cycle.
    in_flight: Mutex<()>,
    /// Last accepted push, for debouncing. Uses the tokio clock so the
    /// debounce window follows virtual time in tests.
    last_push: StdMutex<Option<Instant>>,
    /// Most recent cycle stats, for the periodic summary log.
    last_stats: StdMutex<Option<CycleStats>>,
    /// One-shot notification fired after the first completed cycle.
    first_cycle_tx: StdMutex<Option<oneshot::Sender<CycleStats>>>,
    /// Wakes sleeping tasks on stop.
    stop_notify: Notify,
}

impl FarmBot {
    /// Create an engine instance for one session.
    pub fn new(
        config: BotConfig,
        client: Arc<dyn FarmClient>,
        recommender: Arc<dyn Recommender>,
        session: SharedSession,
    ) -> Self {
        let retry_secs = config.actions.retry_cooldown_secs;
        Self {
            shared: Arc::new(BotShared {
                config,
                client,
                recommender,
                session,
                clock: StdMutex::new(ServerClock::new()),
                cooldowns: Mutex::new(CooldownTracker::with_retry_secs(retry_secs)),
                running: AtomicBool::new(false),
                in_flight: Mutex::new(()),
                last_push: StdMutex::new(None),
                last_stats: StdMutex::new(None),
                first_cycle_tx: StdMutex::new(None),
                stop_notify: Notify::new(),
            }),
        }
    }

    /// Start the engine: the cycle loop, the push listener, and the
    /// periodic summary logger.
    ///
    /// `push_rx` delivers `plots_changed` notifications from the
    /// transport; `first_cycle` (if provided) fires once after the first
    /// completed cycle so session bootstrap can finalize login reporting.
    /// Starting an already-running engine is a logged no-op.
    pub fn start(
        &self,
        push_rx: broadcast::Receiver<PlotsChanged>,
        first_cycle: Option<oneshot::Sender<CycleStats>>,
    ) {
        if self.shared.running.swap(true, Ordering::AcqRel) {
            warn!("engine already running, ignoring start");
            return;
        }
        if let Ok(mut slot) = self.shared.first_cycle_tx.lock() {
            *slot = first_cycle;
        }
        info!(
            interval_secs = self.shared.config.cycle.interval_secs,
            startup_delay_ms = self.shared.config.cycle.startup_delay_ms,
            "engine starting"
        );

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move { shared.cycle_loop().await });

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move { shared.push_loop(push_rx).await });

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move { shared.summary_loop().await });
    }

    /// Stop the engine. In-flight remote calls complete naturally;
    /// pending timers are woken and the tasks exit.
    pub fn stop(&self) {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }
        info!("engine stopping");
        self.shared.stop_notify.notify_waiters();
    }

    /// Force an immediate expansion pass: clears every retry cooldown and
    /// runs an out-of-band cycle right away. Invoked after (re)login so
    /// eligible unlocks/upgrades are not stuck behind stale failures.
    pub async fn expand_now(&self) {
        info!("expand-now requested, clearing cooldowns");
        self.shared.cooldowns.lock().await.clear_all();
        self.shared.run_cycle().await;
    }

    /// Run a single cycle immediately (no-op if one is already in
    /// flight). Exposed for callers that manage their own scheduling.
    pub async fn run_cycle_once(&self) {
        self.shared.run_cycle().await;
    }
}

impl BotShared {
    /// The main self-rescheduling loop: startup delay, then one cycle per
    /// interval until `running` is cleared.
    async fn cycle_loop(self: Arc<Self>) {
        let startup = std::time::Duration::from_millis(self.config.cycle.startup_delay_ms);
        tokio::select! {
            () = sleep(startup) => {}
            () = self.stop_notify.notified() => {}
        }

        while self.running.load(Ordering::Acquire) {
            self.run_cycle().await;
            tokio::select! {
                () = sleep(self.config.cycle.interval()) => {}
                () = self.stop_notify.notified() => {}
            }
        }
        debug!("cycle loop exited");
    }

    /// Listen for push notifications and schedule debounced out-of-band
    /// cycles.
    async fn push_loop(self: Arc<Self>, mut push_rx: broadcast::Receiver<PlotsChanged>) {
        while self.running.load(Ordering::Acquire) {
            let event = tokio::select! {
                event = push_rx.recv() => event,
                () = self.stop_notify.notified() => break,
            };
            match event {
                Ok(event) => self.handle_push(&event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "push listener lagged, continuing");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        debug!("push listener exited");
    }

    /// Debounce and schedule one push-triggered cycle.
    ///
    /// Ignored while a cycle is in flight or within the debounce window
    /// of the last accepted push. The out-of-band cycle runs after a
    /// short settle delay so related server-side writes land first; the
    /// pending timer is cancelled by `stop()`.
    fn handle_push(self: &Arc<Self>, event: &PlotsChanged) {
        if !self.accept_push() {
            return;
        }
        debug!(changed = event.plot_ids.len(), "push accepted, scheduling cycle");
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let settle = std::time::Duration::from_millis(shared.config.cycle.push_settle_ms);
            tokio::select! {
                () = sleep(settle) => {}
                () = shared.stop_notify.notified() => return,
            }
            if !shared.running.load(Ordering::Acquire) {
                return;
            }
            shared.run_cycle().await;
        });
    }

    /// Whether a push should trigger a cycle, updating the debounce
    /// timestamp when accepted.
    fn accept_push(&self) -> bool {
        // A cycle in flight will observe the push's effects via its own
        // snapshot; queuing another would double-act.
        if self.in_flight.try_lock().is_err() {
            debug!("push ignored: cycle in flight");
            return false;
        }
        let Ok(mut last_push) = self.last_push.lock() else {
            return false;
        };
        let now = Instant::now();
        if let Some(last) = *last_push {
            if now.duration_since(last) < self.config.cycle.push_debounce() {
                debug!("push ignored: inside debounce window");
                return false;
            }
        }
        *last_push = Some(now);
        true
    }

    /// Log the cached stats at a low frequency for unattended operation.
    async fn summary_loop(self: Arc<Self>) {
        let interval = std::time::Duration::from_secs(self.config.cycle.summary_interval_secs);
        while self.running.load(Ordering::Acquire) {
            tokio::select! {
                () = sleep(interval) => {}
                () = self.stop_notify.notified() => break,
            }
            if !self.running.load(Ordering::Acquire) {
                break;
            }
            let cached = self.last_stats.lock().ok().and_then(|stats| stats.clone());
            match cached {
                Some(stats) => info!(summary = %stats.summary(), "periodic status"),
                None => info!("periodic status: no cycle completed yet"),
            }
        }
        debug!("summary loop exited");
    }

    /// One full classify-then-act cycle.
    ///
    /// Returns immediately if another cycle holds the in-flight guard --
    /// cycles are never queued. The guard is released on every path,
    /// including snapshot-fetch failure.
    async fn run_cycle(&self) {
        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!("cycle already in flight, skipping");
            return;
        };

        let snapshot = match self.client.fetch_all_plots().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                // Recoverable: the next scheduled cycle retries.
                warn!(error = %err, "snapshot fetch failed, aborting cycle");
                return;
            }
        };
        if let Some(remaining) = snapshot.op_limits.remaining {
            debug!(remaining, "server operation allowance");
        }

        let now_secs = {
            let Ok(mut clock) = self.clock.lock() else {
                return;
            };
            if let Some(server_ms) = snapshot.server_time_ms {
                clock.sync(server_ms);
            }
            clock.now_secs()
        };

        let classification = classify(&snapshot, now_secs);
        info!(classified = %classification.summary(), "snapshot classified");

        let mut cooldowns = self.cooldowns.lock().await;
        let orchestrator = Orchestrator {
            client: self.client.as_ref(),
            recommender: self.recommender.as_ref(),
            session: &self.session,
            config: &self.config,
        };
        let mut stats = orchestrator
            .run(&classification, &mut cooldowns, now_secs, snapshot.unlocked_count())
            .await;
        drop(cooldowns);
        stats.plots_total = snapshot.plots.len();
        info!(summary = %stats.summary(), "cycle complete");

        if let Ok(mut cached) = self.last_stats.lock() {
            *cached = Some(stats.clone());
        }
        let first_cycle = self
            .first_cycle_tx
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        if let Some(tx) = first_cycle {
            let _ = tx.send(stats);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use croft_types::{
        ItemId, PlotId, PlotSnapshot, PurchaseReceipt, SeedId, SessionState, ShopEntry,
    };

    use crate::client::ClientError;
    use crate::cooldown::GatedOp;

    use super::*;

    /// Counts snapshot fetches; every other call succeeds as a no-op.
    #[derive(Default)]
    struct CountingClient {
        fetches: AtomicUsize,
    }

    impl CountingClient {
        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FarmClient for CountingClient {
        async fn fetch_all_plots(&self) -> Result<PlotSnapshot, ClientError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(PlotSnapshot::default())
        }

        async fn harvest(&self, _ids: &[PlotId]) -> Result<(), ClientError> {
            Ok(())
        }

        async fn water(&self, _ids: &[PlotId]) -> Result<(), ClientError> {
            Ok(())
        }

        async fn weed(&self, _ids: &[PlotId]) -> Result<(), ClientError> {
            Ok(())
        }

        async fn depest(&self, _ids: &[PlotId]) -> Result<(), ClientError> {
            Ok(())
        }

        async fn remove_occupant(&self, _ids: &[PlotId]) -> Result<(), ClientError> {
            Ok(())
        }

        async fn unlock_one(&self, _id: PlotId) -> Result<(), ClientError> {
            Ok(())
        }

        async fn upgrade_one(&self, _id: PlotId) -> Result<(), ClientError> {
            Ok(())
        }

        async fn plant_one(&self, _seed: SeedId, _id: PlotId) -> Result<(), ClientError> {
            Ok(())
        }

        async fn amend_one(&self, _id: PlotId, _amendment: ItemId) -> Result<(), ClientError> {
            Ok(())
        }

        async fn fetch_catalog(&self, _shop_id: u32) -> Result<Vec<ShopEntry>, ClientError> {
            Ok(Vec::new())
        }

        async fn purchase(
            &self,
            entry: SeedId,
            count: u32,
            unit_price: u64,
        ) -> Result<PurchaseReceipt, ClientError> {
            Ok(PurchaseReceipt {
                entry_id: entry,
                count,
                total_price: u64::from(count).saturating_mul(unit_price),
            })
        }
    }

    struct NoRecommendations;

    #[async_trait]
    impl Recommender for NoRecommendations {
        async fn recommend(
            &self,
            _level: u32,
            _plot_count: usize,
        ) -> Result<Vec<SeedId>, ClientError> {
            Ok(Vec::new())
        }
    }

    fn make_bot(config: BotConfig) -> (FarmBot, Arc<CountingClient>) {
        let client = Arc::new(CountingClient::default());
        let session = Arc::new(Mutex::new(SessionState {
            identity: "tester".to_owned(),
            level: 10,
            currency: 1_000,
        }));
        let bot = FarmBot::new(
            config,
            Arc::clone(&client) as Arc<dyn FarmClient>,
            Arc::new(NoRecommendations),
            session,
        );
        (bot, client)
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_trigger_while_in_flight_is_a_noop() {
        let (bot, client) = make_bot(BotConfig::default());

        let guard = bot.shared.in_flight.lock().await;
        bot.run_cycle_once().await;
        assert_eq!(client.fetch_count(), 0, "guarded trigger must not fetch");
        drop(guard);

        bot.run_cycle_once().await;
        assert_eq!(client.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn first_cycle_notification_fires_exactly_once() {
        let (bot, _client) = make_bot(BotConfig::default());
        let (tx, rx) = oneshot::channel();
        if let Ok(mut slot) = bot.shared.first_cycle_tx.lock() {
            *slot = Some(tx);
        }

        bot.run_cycle_once().await;
        let stats = rx.await.unwrap();
        assert_eq!(stats.plots_total, 0);

        // The sender slot is consumed; further cycles must not panic.
        bot.run_cycle_once().await;
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_cycles_repeat_until_stopped() {
        let mut config = BotConfig::default();
        config.cycle.startup_delay_ms = 0;
        config.cycle.interval_secs = 5;
        config.cycle.summary_interval_secs = 3_600;
        let (bot, client) = make_bot(config);

        let (_push_tx, push_rx) = broadcast::channel(8);
        bot.start(push_rx, None);

        tokio::time::sleep(Duration::from_secs(12)).await;
        let after_three_intervals = client.fetch_count();
        assert!(
            after_three_intervals >= 2,
            "expected repeated cycles, got {after_three_intervals}"
        );

        bot.stop();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(client.fetch_count(), after_three_intervals, "no cycles after stop");
    }

    #[tokio::test(start_paused = true)]
    async fn pushes_are_debounced_into_one_cycle() {
        let mut config = BotConfig::default();
        // Keep the scheduled loop far away so only pushes trigger cycles.
        config.cycle.startup_delay_ms = 3_600_000;
        config.cycle.push_settle_ms = 1_000;
        config.cycle.push_debounce_secs = 30;
        config.cycle.summary_interval_secs = 3_600;
        let (bot, client) = make_bot(config);

        let (push_tx, push_rx) = broadcast::channel(8);
        bot.start(push_rx, None);
        tokio::time::sleep(Duration::from_millis(10)).await;

        push_tx.send(PlotsChanged::default()).unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(client.fetch_count(), 1, "first push triggers a cycle");

        // Second push inside the debounce window is ignored.
        push_tx.send(PlotsChanged::default()).unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(client.fetch_count(), 1, "debounced push must not trigger");

        // Past the window, a new push triggers again.
        tokio::time::sleep(Duration::from_secs(31)).await;
        push_tx.send(PlotsChanged::default()).unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(client.fetch_count(), 2);

        bot.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_a_pending_push_cycle() {
        let mut config = BotConfig::default();
        // Keep the scheduled loop far away so only pushes trigger cycles.
        config.cycle.startup_delay_ms = 3_600_000;
        config.cycle.push_settle_ms = 2_000;
        config.cycle.summary_interval_secs = 3_600;
        let (bot, client) = make_bot(config);

        let (push_tx, push_rx) = broadcast::channel(8);
        bot.start(push_rx, None);
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Stop while the accepted push is still inside its settle delay.
        push_tx.send(PlotsChanged::default()).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        bot.stop();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(client.fetch_count(), 0, "no cycle may run after stop");
    }

    #[tokio::test(start_paused = true)]
    async fn expand_now_clears_cooldowns_and_runs() {
        let (bot, client) = make_bot(BotConfig::default());
        bot.shared
            .cooldowns
            .lock()
            .await
            .record_failure(GatedOp::Unlock, PlotId(3), 1_700_000_000);

        bot.expand_now().await;

        assert_eq!(client.fetch_count(), 1);
        let cooldowns = bot.shared.cooldowns.lock().await;
        assert!(cooldowns.is_eligible(GatedOp::Unlock, PlotId(3), 1_700_000_000));
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_is_ignored() {
        let mut config = BotConfig::default();
        config.cycle.startup_delay_ms = 0;
        config.cycle.interval_secs = 3_600;
        config.cycle.summary_interval_secs = 3_600;
        let (bot, client) = make_bot(config);

        let (_tx1, rx1) = broadcast::channel(8);
        let (_tx2, rx2) = broadcast::channel(8);
        bot.start(rx1, None);
        bot.start(rx2, None);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(client.fetch_count(), 1, "second start must not add a loop");
        bot.stop();
    }
}
