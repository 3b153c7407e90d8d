//! Stable identifiers for junctions, groups and road edges.
//!
//! ECS `Entity` ids are not stable across save/load, so every cross-record
//! reference (group membership, leader pointers, per-edge delays) goes through
//! these plain newtypes instead.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Stable identifier of a signalized junction. Attached to the junction entity.
#[derive(
    Component,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Encode,
    Decode,
)]
pub struct JunctionId(pub u32);

/// Identifier of a coordination group inside the `SignalGroupRegistry`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Encode, Decode,
)]
pub struct GroupId(pub u32);

/// Identifier of a road edge connected to a junction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Encode, Decode,
)]
pub struct EdgeId(pub u32);

impl std::fmt::Display for JunctionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "J{}", self.0)
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "G{}", self.0)
    }
}
