//! Data-driven controller parameters.
//!
//! Collects the tunables of the phase-metric and state-machine math into a
//! single [`SignalParams`] resource so they can be adjusted at runtime. The
//! resource is registered via the `Saveable` trait so overrides persist across
//! save/load cycles.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::phases::VehicleClass;
use crate::Saveable;

/// Per-class weights applied to lane occupancy counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct ClassWeights {
    pub car: f32,
    pub public_car: f32,
    pub track: f32,
    pub pedestrian: f32,
    pub bicycle: f32,
}

impl Default for ClassWeights {
    fn default() -> Self {
        Self {
            car: 1.0,
            public_car: 2.0,
            track: 2.0,
            pedestrian: 1.0,
            bicycle: 1.0,
        }
    }
}

impl ClassWeights {
    pub fn get(&self, class: VehicleClass) -> f32 {
        match class {
            VehicleClass::Car => self.car,
            VehicleClass::PublicCar => self.public_car,
            VehicleClass::Track => self.track,
            VehicleClass::Pedestrian => self.pedestrian,
            VehicleClass::Bicycle => self.bicycle,
        }
    }
}

/// Priority floor raised on a phase when a prioritized class is present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct PriorityFloors {
    pub track: i32,
    pub public_car: i32,
    pub pedestrian: i32,
    pub bicycle: i32,
}

impl Default for PriorityFloors {
    fn default() -> Self {
        Self {
            track: 108,
            public_car: 106,
            pedestrian: 104,
            bicycle: 102,
        }
    }
}

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct SignalParams {
    /// Exponential smoothing factor in `[0, 1]`; weight kept from the previous value.
    pub smoothing: f32,
    pub weights: ClassWeights,
    pub lane_occupied_multiplier: f32,
    /// Exponent applied to `turns_since_last_run / phase_count`.
    pub interval_exponent: f32,
    pub target_duration_multiplier: f32,
    /// Extra ticks a phase holding the unique maximum priority may run past its target.
    pub low_flow_grace_ticks: u8,
    /// Extra ticks a phase below the maximum priority may run past its target.
    pub low_priority_grace_ticks: u8,
    /// Clearance length of the `Ending` state.
    pub ending_ticks: u8,
    /// Clearance length of the `Changing` state.
    pub changing_ticks: u8,
    pub priority_floors: PriorityFloors,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            smoothing: 0.5,
            weights: ClassWeights::default(),
            lane_occupied_multiplier: 1.0,
            interval_exponent: 2.0,
            target_duration_multiplier: 1.0,
            low_flow_grace_ticks: 3,
            low_priority_grace_ticks: 1,
            ending_ticks: 1,
            changing_ticks: 1,
            priority_floors: PriorityFloors::default(),
        }
    }
}

impl SignalParams {
    /// Smoothing factor clamped into `[0, 1]`; NaN falls back to the default.
    pub fn smoothing(&self) -> f32 {
        if self.smoothing.is_nan() {
            0.5
        } else {
            self.smoothing.clamp(0.0, 1.0)
        }
    }
}

impl Saveable for SignalParams {
    const SAVE_KEY: &'static str = "signal_params";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        if *self == Self::default() {
            return None;
        }
        Some(bitcode::encode(self))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        crate::decode_or_warn(Self::SAVE_KEY, bytes)
    }
}
