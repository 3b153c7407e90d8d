//! Signal phases and their per-phase buffers.
//!
//! A junction under phase-based control owns a [`SignalPhases`] component: an
//! ordered list of [`Phase`]s plus an index-parallel list of
//! [`EdgeGroupMask`]s carrying per-class open/close delays. Phases are numbered
//! from 1 in the junction state (0 means "no phase"); the vectors are indexed
//! from 0.

mod masks;
mod options;
mod types;


pub use masks::{ClassDelays, EdgeGroupMask, SignalPhases};
pub use options::PhaseOptions;
pub use types::{ChangeMetric, ClassCounts, Phase, VehicleClass};
