//! Push-event payloads delivered asynchronously by the transport layer.

use serde::{Deserialize, Serialize};

use crate::ids::PlotId;

/// Notification that one or more plots changed server-side (a visitor
/// watered, stole, or left weeds; a timer elapsed; etc.).
///
/// The transport fans these out on a broadcast channel; the scheduler
/// debounces them into at most one out-of-band cycle per window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotsChanged {
    /// The plots the server says changed. May be empty when the server
    /// only signals "something changed".
    #[serde(default)]
    pub plot_ids: Vec<PlotId>,
}
