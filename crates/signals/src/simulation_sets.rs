//! Deterministic signal-control ordering via `SystemSet` phases.
//!
//! Every system the signal plugins add to `FixedUpdate` belongs to one of
//! these sets. The sets are chained, so each tick sees commands applied before
//! metrics, all local controllers updated before coordination, and repairs
//! last.
//!
//! ```text
//! Input  →  Metrics  →  Control  →  Coordinate  →  Report
//! ```
//!
//! * **Input** – Tick counters and the command executor.
//! * **Metrics** – Per-phase demand aggregation from lane samples.
//! * **Control** – Per-junction state machine update.
//! * **Coordinate** – Group leader/follower propagation, drift correction and
//!   group cycle timers. Followers react to the leader's result of this tick.
//! * **Report** – Slow-tick validation and repair.

use bevy::prelude::*;

/// Ordered phases for signal systems in the `FixedUpdate` schedule.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SignalSet {
    Input,
    Metrics,
    Control,
    Coordinate,
    Report,
}

/// Configure the `SignalSet` chain in `FixedUpdate`.
pub fn configure_signal_sets(app: &mut App) {
    app.configure_sets(
        FixedUpdate,
        (
            SignalSet::Input,
            SignalSet::Metrics,
            SignalSet::Control,
            SignalSet::Coordinate,
            SignalSet::Report,
        )
            .chain(),
    );
}
