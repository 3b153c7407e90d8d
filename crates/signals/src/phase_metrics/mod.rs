//! Per-phase demand metrics.
//!
//! Each tick every phase of a junction recounts the lanes it serves (lanes whose
//! group mask has the phase's bit set), derives its priority from the
//! petitioners observed, and folds the tick's occupancy and flow into
//! exponentially smoothed trend values. The resulting `weighted_waiting`
//! grows with `turns_since_last_run`, so a starved phase keeps gaining weight
//! until it is served.

mod calculations;
mod lanes;
mod systems;


pub use calculations::{
    aggregate_phase_metrics, derive_priority, raw_weighted_waiting, shift_car_flow, smooth,
};
pub use lanes::{LaneSample, LaneSamples};
pub use systems::update_phase_metrics;
