//! Open/close delays applied around a phase's green and red transitions.
//!
//! Two sources add up: the per-class delays stored on the active phase's edge
//! group mask, and manual per-edge overrides on the junction. The result only
//! shifts the *effective* timer used for follower synchronization and
//! countdown display; the controller's own timer is never touched.

mod resolver;
mod types;


pub use resolver::{
    current_open_delay, effective_timer, mask_delay, override_delay, resolve_delay,
};
pub use types::{DelayKind, EdgeSignalDelays, SignalDelay};
