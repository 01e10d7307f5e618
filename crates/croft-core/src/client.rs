//! Client boundary: the remote services the engine consumes.
//!
//! The wire transport, login handshake, and request/response correlation
//! live outside this crate. The engine only sees these object-safe async
//! traits, which makes every orchestration path testable against
//! recording mocks and lets the binary swap in an in-memory stub farm.

use std::sync::Arc;

use async_trait::async_trait;
use croft_types::{ItemId, PlotId, PlotSnapshot, PurchaseReceipt, SeedId, SessionState, ShopEntry};

/// Errors surfaced by the remote service boundary.
///
/// Nothing here is fatal to the engine; every failure is logged and the
/// cycle (or the affected step) moves on per the orchestration contract.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The transport could not deliver the request or lost the session.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a rejection.
    #[error("server rejected the request: {0}")]
    Rejected(String),

    /// The response arrived but could not be decoded.
    #[error("decode error: {source}")]
    Decode {
        /// The underlying serde error.
        #[from]
        source: serde_json::Error,
    },
}

/// Shared handle to the mutable session state (identity, level, currency).
///
/// Owned by the session layer; the engine reads it each cycle and
/// decrements the currency after a successful purchase.
pub type SharedSession = Arc<tokio::sync::Mutex<SessionState>>;

/// The remote farm actions the engine issues.
///
/// Batched calls take the whole id set for a category in one request;
/// the `*_one` calls exist because the server rejects batched variants
/// of those operations. All calls are awaited to completion -- any
/// timeout behavior belongs to the transport implementation.
#[async_trait]
pub trait FarmClient: Send + Sync {
    /// Fetch a full point-in-time snapshot of every plot.
    async fn fetch_all_plots(&self) -> Result<PlotSnapshot, ClientError>;

    /// Harvest every listed plot in one call.
    async fn harvest(&self, ids: &[PlotId]) -> Result<(), ClientError>;

    /// Water every listed plot in one call.
    async fn water(&self, ids: &[PlotId]) -> Result<(), ClientError>;

    /// Clear weeds from every listed plot in one call.
    async fn weed(&self, ids: &[PlotId]) -> Result<(), ClientError>;

    /// Remove pests from every listed plot in one call.
    async fn depest(&self, ids: &[PlotId]) -> Result<(), ClientError>;

    /// Remove the (dead or harvested) occupant from every listed plot.
    async fn remove_occupant(&self, ids: &[PlotId]) -> Result<(), ClientError>;

    /// Unlock a single plot. The server rejects batched unlocks.
    async fn unlock_one(&self, id: PlotId) -> Result<(), ClientError>;

    /// Upgrade a single plot's tier. The server rejects batched upgrades.
    async fn upgrade_one(&self, id: PlotId) -> Result<(), ClientError>;

    /// Plant one seed on one plot.
    async fn plant_one(&self, seed: SeedId, id: PlotId) -> Result<(), ClientError>;

    /// Apply a soil amendment to one freshly-planted plot.
    async fn amend_one(&self, id: PlotId, amendment: ItemId) -> Result<(), ClientError>;

    /// Fetch the seed catalog for a shop.
    async fn fetch_catalog(&self, shop_id: u32) -> Result<Vec<ShopEntry>, ClientError>;

    /// Purchase `count` units of a catalog entry at the quoted unit price.
    async fn purchase(
        &self,
        entry: SeedId,
        count: u32,
        unit_price: u64,
    ) -> Result<PurchaseReceipt, ClientError>;
}

/// External planting-efficiency recommendation service.
///
/// Best-effort: the selector tolerates any failure and falls back to its
/// static heuristic.
#[async_trait]
pub trait Recommender: Send + Sync {
    /// Return seed ids ordered by recommended preference for the given
    /// account level and unlocked plot count.
    async fn recommend(&self, level: u32, plot_count: usize) -> Result<Vec<SeedId>, ClientError>;
}
