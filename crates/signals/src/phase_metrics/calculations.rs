use crate::config::CAR_FLOW_WINDOWS;
use crate::params::{PriorityFloors, SignalParams};
use crate::phases::{ClassCounts, Phase, PhaseOptions, SignalPhases};

use super::LaneSample;

/// Exponential smoothing: `s × previous + (1 − s) × sample`.
#[inline]
pub fn smooth(previous: f32, sample: f32, smoothing: f32) -> f32 {
    smoothing * previous + (1.0 - smoothing) * sample
}

/// Unsmoothed waiting weight of one phase for this tick.
///
/// `weighted_occupied × multiplier × (turns_since_last_run / phase_count) ^ exponent`.
pub fn raw_weighted_waiting(
    weighted_occupied: f32,
    multiplier: f32,
    turns_since_last_run: u32,
    phase_count: usize,
    exponent: f32,
) -> f32 {
    if phase_count == 0 {
        return 0.0;
    }
    let staleness = turns_since_last_run as f32 / phase_count as f32;
    let value = weighted_occupied * multiplier * staleness.powf(exponent);
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Shift the car-flow ring by one window and open an empty newest slot.
pub fn shift_car_flow(ring: &mut [f32; CAR_FLOW_WINDOWS]) {
    for i in (1..CAR_FLOW_WINDOWS).rev() {
        ring[i] = ring[i - 1];
    }
    ring[0] = 0.0;
}

/// Phase priority from the highest petitioner priority, raised to the class
/// floor for every prioritized class that is present.
pub fn derive_priority(
    petitioner_priority: i32,
    occupancy: &ClassCounts,
    options: PhaseOptions,
    floors: &PriorityFloors,
) -> i32 {
    let mut priority = petitioner_priority.max(0);
    if options.contains(PhaseOptions::PRIORITIZE_TRACK) && occupancy.track > 0 {
        priority = priority.max(floors.track);
    }
    if options.contains(PhaseOptions::PRIORITIZE_PUBLIC_CAR) && occupancy.public_car > 0 {
        priority = priority.max(floors.public_car);
    }
    if options.contains(PhaseOptions::PRIORITIZE_PEDESTRIAN) && occupancy.pedestrian > 0 {
        priority = priority.max(floors.pedestrian);
    }
    if options.contains(PhaseOptions::PRIORITIZE_BICYCLE) && occupancy.bicycle > 0 {
        priority = priority.max(floors.bicycle);
    }
    priority
}

/// Recount and re-smooth every phase of one junction from this tick's lanes.
pub fn aggregate_phase_metrics(phases: &mut SignalPhases, lanes: &[LaneSample], params: &SignalParams) {
    let phase_count = phases.len();
    let smoothing = params.smoothing();

    for (index, phase) in phases.phases.iter_mut().enumerate() {
        count_lanes(phase, index, lanes);

        let weighted_occupied = phase.occupancy.weighted(&params.weights);
        let raw = raw_weighted_waiting(
            weighted_occupied,
            params.lane_occupied_multiplier,
            phase.turns_since_last_run,
            phase_count,
            params.interval_exponent,
        );
        phase.weighted_waiting = smooth(phase.weighted_waiting, raw, smoothing);
        phase.current_wait = weighted_occupied;
        phase.flow_ratio = smooth(phase.flow_ratio, phase.current_flow, smoothing);
        phase.wait_ratio = smooth(phase.wait_ratio, weighted_occupied, smoothing);
        phase.priority = derive_priority(
            phase.priority,
            &phase.occupancy,
            phase.options,
            &params.priority_floors,
        );
    }
}

/// Reset counters, then accumulate occupancy, petitioner priority and flow
/// from the lanes this phase serves. Leaves the petitioner priority in
/// `phase.priority` and the tick's flow in `phase.current_flow`.
fn count_lanes(phase: &mut Phase, index: usize, lanes: &[LaneSample]) {
    phase.occupancy = ClassCounts::default();
    phase.priority = 0;
    shift_car_flow(&mut phase.car_flow);

    let mut tick_flow = 0.0;
    for lane in lanes.iter().filter(|lane| lane.serves(index)) {
        phase.occupancy.add(lane.class, lane.occupants);
        phase.priority = phase.priority.max(lane.priority);
        let flow = lane.flow();
        tick_flow += flow;
        if lane.is_car_like() {
            phase.car_flow[0] += flow;
        }
    }

    phase.current_flow = tick_flow;
    phase.average_car_flow = phase.car_flow.iter().sum::<f32>() / CAR_FLOW_WINDOWS as f32;
}
