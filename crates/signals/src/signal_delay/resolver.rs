use crate::junction_control::JunctionSignalState;
use crate::phases::{SignalPhases, VehicleClass};

use super::{DelayKind, EdgeSignalDelays};

/// Delay stored on the phase's edge group mask. With a class, that class's
/// value; without, the largest over all classes.
pub fn mask_delay(
    phases: &SignalPhases,
    phase_index: usize,
    kind: DelayKind,
    class: Option<VehicleClass>,
) -> i32 {
    let Some(mask) = phases.mask(phase_index) else {
        return 0;
    };
    let delays = match kind {
        DelayKind::Open => &mask.open_delay,
        DelayKind::Close => &mask.close_delay,
    };
    match class {
        Some(class) => delays.get(class),
        None => delays.max(),
    }
}

/// Largest enabled manual override among the edges the phase serves.
pub fn override_delay(
    phases: &SignalPhases,
    overrides: &EdgeSignalDelays,
    phase_index: usize,
    kind: DelayKind,
) -> i32 {
    let Some(mask) = phases.mask(phase_index) else {
        return 0;
    };
    mask.edges
        .iter()
        .filter_map(|&edge| overrides.get(edge))
        .filter(|delay| delay.enabled)
        .map(|delay| delay.get(kind))
        .max()
        .unwrap_or(0)
}

/// Total delay for a phase: mask delay plus manual override.
pub fn resolve_delay(
    phases: &SignalPhases,
    overrides: Option<&EdgeSignalDelays>,
    phase_index: usize,
    kind: DelayKind,
    class: Option<VehicleClass>,
) -> i32 {
    let manual = overrides
        .map(|overrides| override_delay(phases, overrides, phase_index, kind))
        .unwrap_or(0);
    mask_delay(phases, phase_index, kind, class) + manual
}

/// Open delay of the phase currently running, 0 when none runs.
pub fn current_open_delay(
    phases: &SignalPhases,
    overrides: Option<&EdgeSignalDelays>,
    signal: &JunctionSignalState,
) -> i32 {
    signal
        .current_index()
        .filter(|&index| index < phases.len())
        .map(|index| resolve_delay(phases, overrides, index, DelayKind::Open, None))
        .unwrap_or(0)
}

/// Controller timer shifted back by `delay`, floored at zero.
pub fn effective_timer(timer: u16, delay: i32) -> u16 {
    (timer as i32 - delay.max(0)).max(0) as u16
}
