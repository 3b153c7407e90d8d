use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::MAX_PHASES;
use crate::phases::VehicleClass;

/// One lane's observation for the current tick, supplied by the host simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaneSample {
    /// Bit `i` set means the lane is served by phase index `i`.
    pub group_mask: u16,
    pub class: VehicleClass,
    /// Vehicles (or pedestrians) currently waiting on or occupying the lane.
    pub occupants: u16,
    /// Highest priority among the lane's petitioners.
    pub priority: i32,
    /// Distance travelled through the lane during the sample window.
    pub flow_distance: f32,
    /// Length of the sample window.
    pub flow_duration: f32,
}

impl LaneSample {
    pub fn new(group_mask: u16, class: VehicleClass) -> Self {
        Self {
            group_mask,
            class,
            occupants: 0,
            priority: 0,
            flow_distance: 0.0,
            flow_duration: 0.0,
        }
    }

    pub fn with_occupants(mut self, occupants: u16, priority: i32) -> Self {
        self.occupants = occupants;
        self.priority = priority;
        self
    }

    pub fn with_flow(mut self, distance: f32, duration: f32) -> Self {
        self.flow_distance = distance;
        self.flow_duration = duration;
        self
    }

    #[inline]
    pub fn serves(&self, phase_index: usize) -> bool {
        phase_index < MAX_PHASES && self.group_mask & (1u16 << phase_index) != 0
    }

    /// Distance per unit time, or 0 for an empty window.
    pub fn flow(&self) -> f32 {
        if self.flow_duration > 0.0 && self.flow_distance.is_finite() {
            (self.flow_distance / self.flow_duration).max(0.0)
        } else {
            0.0
        }
    }

    pub fn is_car_like(&self) -> bool {
        matches!(self.class, VehicleClass::Car | VehicleClass::PublicCar)
    }
}

/// Lane observations of one junction, overwritten by the host each tick.
#[derive(Component, Debug, Clone, Default)]
pub struct LaneSamples {
    pub lanes: Vec<LaneSample>,
}
