use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::config::{MAX_PHASES, MAX_SIGNAL_DELAY};
use crate::ids::EdgeId;

use super::{Phase, VehicleClass};

/// Open or close delay per vehicle class, in ticks (`0..=MAX_SIGNAL_DELAY`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct ClassDelays {
    pub car: i16,
    pub public_car: i16,
    pub track: i16,
    pub pedestrian: i16,
    pub bicycle: i16,
}

impl ClassDelays {
    pub fn get(&self, class: VehicleClass) -> i32 {
        match class {
            VehicleClass::Car => self.car as i32,
            VehicleClass::PublicCar => self.public_car as i32,
            VehicleClass::Track => self.track as i32,
            VehicleClass::Pedestrian => self.pedestrian as i32,
            VehicleClass::Bicycle => self.bicycle as i32,
        }
    }

    /// Store a delay, clamped to `[0, MAX_SIGNAL_DELAY]`.
    pub fn set(&mut self, class: VehicleClass, ticks: i32) {
        let value = ticks.clamp(0, MAX_SIGNAL_DELAY) as i16;
        match class {
            VehicleClass::Car => self.car = value,
            VehicleClass::PublicCar => self.public_car = value,
            VehicleClass::Track => self.track = value,
            VehicleClass::Pedestrian => self.pedestrian = value,
            VehicleClass::Bicycle => self.bicycle = value,
        }
    }

    /// Largest delay over all classes.
    pub fn max(&self) -> i32 {
        VehicleClass::ALL
            .iter()
            .map(|&class| self.get(class))
            .max()
            .unwrap_or(0)
    }

    /// Clamp every class into range. Returns `true` if anything changed.
    pub fn clamp_all(&mut self) -> bool {
        let before = *self;
        for class in VehicleClass::ALL {
            self.set(class, self.get(class));
        }
        before != *self
    }
}

/// Edges served by one phase plus that phase's per-class open/close delays.
/// Stored index-parallel to the phase list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct EdgeGroupMask {
    pub edges: Vec<EdgeId>,
    pub open_delay: ClassDelays,
    pub close_delay: ClassDelays,
}

/// Phase list of a junction under phase-based control.
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct SignalPhases {
    pub phases: Vec<Phase>,
    /// Kept the same length as `phases`.
    pub masks: Vec<EdgeGroupMask>,
}

impl SignalPhases {
    /// Build from a phase list, truncated to `MAX_PHASES`, with empty masks.
    pub fn new(mut phases: Vec<Phase>) -> Self {
        phases.truncate(MAX_PHASES);
        let masks = vec![EdgeGroupMask::default(); phases.len()];
        Self { phases, masks }
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Phase> {
        self.phases.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Phase> {
        self.phases.get_mut(index)
    }

    /// Append a phase. Returns its index, or `None` when the junction is full.
    pub fn push(&mut self, phase: Phase) -> Option<usize> {
        if self.phases.len() >= MAX_PHASES {
            return None;
        }
        self.phases.push(phase);
        self.masks.push(EdgeGroupMask::default());
        Some(self.phases.len() - 1)
    }

    /// Remove the phase at `index` together with its mask.
    pub fn remove(&mut self, index: usize) -> Option<Phase> {
        if index >= self.phases.len() {
            return None;
        }
        if index < self.masks.len() {
            self.masks.remove(index);
        }
        Some(self.phases.remove(index))
    }

    /// Swap two phases and their masks. Returns `false` if either index is out of range.
    pub fn swap(&mut self, a: usize, b: usize) -> bool {
        if a >= self.phases.len() || b >= self.phases.len() {
            return false;
        }
        self.sync_masks();
        self.phases.swap(a, b);
        self.masks.swap(a, b);
        true
    }

    /// Truncate or pad the mask buffer to match the phase list.
    /// Returns `true` if the buffers were out of sync.
    pub fn sync_masks(&mut self) -> bool {
        if self.masks.len() == self.phases.len() {
            return false;
        }
        self.masks
            .resize_with(self.phases.len(), EdgeGroupMask::default);
        true
    }

    pub fn mask(&self, index: usize) -> Option<&EdgeGroupMask> {
        self.masks.get(index)
    }

    pub fn mask_mut(&mut self, index: usize) -> Option<&mut EdgeGroupMask> {
        self.sync_masks();
        self.masks.get_mut(index)
    }

    /// Highest priority over all phases (0 for an empty list).
    pub fn max_priority(&self) -> i32 {
        self.phases.iter().map(|p| p.priority).max().unwrap_or(0)
    }

    /// Sum of maximum durations, used as the cycle length of a group leader.
    pub fn cycle_length(&self) -> u32 {
        self.phases.iter().map(|p| p.max_duration as u32).sum()
    }
}
