/// Maximum phases per junction; matches the width of the lane group mask.
pub const MAX_PHASES: usize = 16;

/// Bounds given to a freshly created phase.
pub const DEFAULT_MIN_DURATION: u16 = 2;
pub const DEFAULT_MAX_DURATION: u16 = 20;

/// Bounds restored when validation finds `min_duration > max_duration`.
pub const REPAIR_MIN_DURATION: u16 = 2;
pub const REPAIR_MAX_DURATION: u16 = 300;

/// Upper bound for any open/close or member signal delay, in ticks.
pub const MAX_SIGNAL_DELAY: i32 = 300;

/// Group defaults, also used when validation finds a non-positive value.
pub const DEFAULT_GREEN_WAVE_SPEED: f32 = 50.0;
pub const DEFAULT_CYCLE_LENGTH: u16 = 16;
pub const DEFAULT_MAX_COORDINATION_DISTANCE: f32 = 500.0;

/// Timer ceiling applied when a follower is hard-synced to its leader.
pub const MAX_SYNC_TIMER: u16 = 255;

/// Dynamic-mode target duration is `TARGET_DURATION_SCALE * (flow + track * TRACK_FLOW_WEIGHT)`.
pub const TARGET_DURATION_SCALE: f32 = 10.0;
pub const TRACK_FLOW_WEIGHT: f32 = 0.5;

/// Number of observation windows kept in the car-flow ring.
pub const CAR_FLOW_WINDOWS: usize = 3;
