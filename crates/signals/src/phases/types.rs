use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::config::{
    CAR_FLOW_WINDOWS, DEFAULT_MAX_DURATION, DEFAULT_MIN_DURATION, REPAIR_MAX_DURATION,
    REPAIR_MIN_DURATION,
};
use crate::params::ClassWeights;

use super::PhaseOptions;

/// Vehicle classes counted separately on each phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum VehicleClass {
    Car,
    PublicCar,
    Track,
    Pedestrian,
    Bicycle,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 5] = [
        VehicleClass::Car,
        VehicleClass::PublicCar,
        VehicleClass::Track,
        VehicleClass::Pedestrian,
        VehicleClass::Bicycle,
    ];
}

/// Occupancy counts by vehicle class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct ClassCounts {
    pub car: u16,
    pub public_car: u16,
    pub track: u16,
    pub pedestrian: u16,
    pub bicycle: u16,
}

impl ClassCounts {
    pub fn get(&self, class: VehicleClass) -> u16 {
        match class {
            VehicleClass::Car => self.car,
            VehicleClass::PublicCar => self.public_car,
            VehicleClass::Track => self.track,
            VehicleClass::Pedestrian => self.pedestrian,
            VehicleClass::Bicycle => self.bicycle,
        }
    }

    pub fn add(&mut self, class: VehicleClass, count: u16) {
        let slot = match class {
            VehicleClass::Car => &mut self.car,
            VehicleClass::PublicCar => &mut self.public_car,
            VehicleClass::Track => &mut self.track,
            VehicleClass::Pedestrian => &mut self.pedestrian,
            VehicleClass::Bicycle => &mut self.bicycle,
        };
        *slot = slot.saturating_add(count);
    }

    pub fn total(&self) -> u32 {
        VehicleClass::ALL
            .iter()
            .map(|&class| self.get(class) as u32)
            .sum()
    }

    /// `Σ count_class × weight_class`.
    pub fn weighted(&self, weights: &ClassWeights) -> f32 {
        VehicleClass::ALL
            .iter()
            .map(|&class| self.get(class) as f32 * weights.get(class))
            .sum()
    }
}

/// Metric that decides when a fixed-timed phase may end early and which
/// optional step runs next.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode,
)]
pub enum ChangeMetric {
    /// Flow minus wait; change once flow drops below wait.
    #[default]
    Default,
    FirstFlow,
    FirstWait,
    NoFlow,
    NoWait,
}

/// One signal phase of one junction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct Phase {
    /// Minimum duration in ticks. Never greater than `max_duration`.
    pub min_duration: u16,
    /// Maximum duration in ticks.
    pub max_duration: u16,
    pub options: PhaseOptions,
    pub change_metric: ChangeMetric,

    // Derived each tick by the phase metrics pass.
    pub priority: i32,
    pub weighted_waiting: f32,
    pub current_flow: f32,
    pub current_wait: f32,
    pub flow_ratio: f32,
    pub wait_ratio: f32,
    pub occupancy: ClassCounts,
    /// Flow samples of the last observation windows, newest first.
    pub car_flow: [f32; CAR_FLOW_WINDOWS],
    pub average_car_flow: f32,
    /// Dynamic-mode target duration, kept for display.
    pub target_duration: f32,

    // Staleness and starvation counters.
    pub turns_since_last_run: u32,
    pub low_flow_timer: u8,
    pub low_priority_timer: u8,
}

impl Default for Phase {
    fn default() -> Self {
        Self {
            min_duration: DEFAULT_MIN_DURATION,
            max_duration: DEFAULT_MAX_DURATION,
            options: PhaseOptions::default(),
            change_metric: ChangeMetric::Default,
            priority: 0,
            weighted_waiting: 0.0,
            current_flow: 0.0,
            current_wait: 0.0,
            flow_ratio: 0.0,
            wait_ratio: 0.0,
            occupancy: ClassCounts::default(),
            car_flow: [0.0; CAR_FLOW_WINDOWS],
            average_car_flow: 0.0,
            target_duration: 0.0,
            turns_since_last_run: 0,
            low_flow_timer: 0,
            low_priority_timer: 0,
        }
    }
}

impl Phase {
    pub fn with_durations(min_duration: u16, max_duration: u16) -> Self {
        let mut phase = Self::default();
        phase.set_durations(min_duration, max_duration);
        phase
    }

    /// Set both bounds at once; a reversed pair is swapped.
    pub fn set_durations(&mut self, min_duration: u16, max_duration: u16) {
        self.min_duration = min_duration.min(max_duration);
        self.max_duration = min_duration.max(max_duration);
    }

    /// Reset a reversed `min > max` pair to the repair bounds. Returns
    /// `true` if the bounds were reversed.
    pub fn repair_bounds(&mut self) -> bool {
        if self.min_duration <= self.max_duration {
            return false;
        }
        self.min_duration = REPAIR_MIN_DURATION;
        self.max_duration = REPAIR_MAX_DURATION;
        true
    }

    /// Set the minimum, raising the maximum if needed to keep `min ≤ max`.
    pub fn set_min_duration(&mut self, ticks: u16) {
        self.min_duration = ticks;
        if self.max_duration < ticks {
            self.max_duration = ticks;
        }
    }

    /// Set the maximum, lowering the minimum if needed to keep `min ≤ max`.
    pub fn set_max_duration(&mut self, ticks: u16) {
        self.max_duration = ticks;
        if self.min_duration > ticks {
            self.min_duration = ticks;
        }
    }

    pub fn with_options(mut self, bits: u8) -> Self {
        self.options.insert(bits);
        self
    }

    pub fn with_metric(mut self, metric: ChangeMetric) -> Self {
        self.change_metric = metric;
        self
    }

    /// Reset staleness when the phase starts running.
    pub fn mark_started(&mut self) {
        self.turns_since_last_run = 0;
        self.low_flow_timer = 0;
        self.low_priority_timer = 0;
    }

    pub fn reset_starvation(&mut self) {
        self.low_flow_timer = 0;
        self.low_priority_timer = 0;
    }
}
