//! Decision and orchestration engine for the croft farm automation bot.
//!
//! The engine repeatedly inspects a set of remotely-owned plots and
//! issues corrective or productive actions through an asynchronous
//! client it does not own. Each cycle it reconstructs the true state of
//! every plot from scheduled phase timestamps and an estimated server
//! clock, classifies the plots into action categories, and sequences
//! batched and paced remote calls over them.
//!
//! # Modules
//!
//! - [`clock`] -- Server-time estimator from a single sync point.
//! - [`phase`] -- Pure resolution of the currently active growth phase.
//! - [`classify`] -- Per-cycle bucketing of plots into action categories.
//! - [`cooldown`] -- Retry suppression for failed unlock/upgrade calls.
//! - [`selector`] -- Best-seed selection with a fallback cascade.
//! - [`orchestrator`] -- The five-stage remote action sequence.
//! - [`scheduler`] -- The self-rescheduling cycle loop with debounced
//!   push triggers.
//! - [`client`] -- Boundary traits for the remote farm services.
//! - [`config`] -- YAML configuration loading.

pub mod classify;
pub mod client;
pub mod clock;
pub mod config;
pub mod cooldown;
pub mod orchestrator;
pub mod phase;
pub mod scheduler;
pub mod selector;

pub use classify::{classify, Classification, HarvestTarget};
pub use client::{ClientError, FarmClient, Recommender, SharedSession};
pub use clock::ServerClock;
pub use config::{ActionConfig, BotConfig, ConfigError, CycleConfig, SeedConfig};
pub use cooldown::{CooldownTracker, GatedOp};
pub use orchestrator::{CycleStats, Orchestrator};
pub use phase::current_phase;
pub use scheduler::FarmBot;
pub use selector::select_seed;
