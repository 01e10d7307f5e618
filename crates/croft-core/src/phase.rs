//! Phase resolution: which scheduled phase is active right now.
//!
//! The server hands us an ordered list of future state transitions per
//! occupant rather than a current state. The resolver is a pure function
//! of the phase list and an estimated "now", so it can be tested in
//! isolation from the clock and the transport.

use croft_types::Phase;

/// Resolve the currently active phase from an ascending-by-start list.
///
/// Returns `None` for an empty list. Otherwise scans from the end and
/// returns the last phase whose normalized start is in `(0, now_secs]`.
/// If every start is in the future (or unset), returns the first phase:
/// a plot that has not reached its first visible transition is treated
/// as being in its earliest defined phase, not as absent.
pub fn current_phase(phases: &[Phase], now_secs: i64) -> Option<&Phase> {
    phases
        .iter()
        .rev()
        .find(|phase| phase.start_secs().is_some_and(|start| start <= now_secs))
        .or_else(|| phases.first())
}
