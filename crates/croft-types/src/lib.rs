//! Shared type definitions for the croft farm automation engine.
//!
//! This crate is the single source of truth for all types used across the
//! croft workspace: the data model the engine reconstructs from remote
//! snapshots each cycle, the shop and session types the replant pipeline
//! consumes, and the push-event payloads the scheduler reacts to.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe integer wrappers for all entity identifiers
//! - [`enums`] -- Enumeration types (plot tiers, phase kinds)
//! - [`structs`] -- Core entity structs (plots, occupants, phases, shop,
//!   session) and timestamp normalization
//! - [`events`] -- Push-event payloads from the transport layer

pub mod enums;
pub mod events;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{PhaseKind, PlotTier};
pub use events::PlotsChanged;
pub use ids::{ItemId, OwnerId, PlotId, SeedId};
pub use structs::{
    normalize_epoch_secs, Occupant, OpLimits, Phase, Plot, PlotSnapshot, PurchaseReceipt,
    SessionState, ShopEntry,
};
