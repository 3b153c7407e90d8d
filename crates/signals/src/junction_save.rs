//! Save and restore of junction controllers.
//!
//! Junction configuration lives on entities rather than in a resource, so it
//! does not go through the `SaveableRegistry`. The host save system calls
//! [`save_junctions`] / [`load_junctions`] and stores the record list next to
//! the extension map. Records are ordered by `JunctionId` so that saving the
//! same network twice produces identical bytes.

use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::ids::JunctionId;
use crate::junction_control::{JunctionSignalState, TrafficSignalJunction};
use crate::phase_metrics::LaneSamples;
use crate::phases::SignalPhases;
use crate::records::{read_record, write_record, JunctionRecord};

/// Encode every junction controller as a versioned record.
pub fn save_junctions(world: &mut World) -> Vec<Vec<u8>> {
    let mut query = world.query::<(
        &JunctionId,
        &TrafficSignalJunction,
        &SignalPhases,
        &JunctionSignalState,
    )>();
    let mut records: Vec<JunctionRecord> = query
        .iter(world)
        .map(|(&id, control, phases, signal)| JunctionRecord::capture(id, control, phases, signal))
        .collect();
    records.sort_by_key(|record| record.junction);
    records.iter().map(|record| write_record(record)).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JunctionLoadReport {
    /// Existing junction entities whose controller was replaced.
    pub restored: u32,
    /// Junctions that had no entity yet and were spawned.
    pub spawned: u32,
    /// Records that failed to decode.
    pub skipped: u32,
}

/// Apply saved junction records to the world.
///
/// Junctions already present (matched by `JunctionId`) keep their position
/// and lane samples; missing ones are spawned at the origin with no lanes.
pub fn load_junctions(world: &mut World, records: &[Vec<u8>]) -> JunctionLoadReport {
    let mut report = JunctionLoadReport::default();

    let mut query = world.query::<(Entity, &JunctionId)>();
    let entities: BTreeMap<JunctionId, Entity> = query
        .iter(world)
        .map(|(entity, &id)| (id, entity))
        .collect();

    for bytes in records {
        let record = match read_record::<JunctionRecord>(bytes) {
            Ok(record) => record,
            Err(e) => {
                warn!("Junction save: skipping record of {} bytes: {}", bytes.len(), e);
                report.skipped += 1;
                continue;
            }
        };
        let (mode, phases, signal) = record.restore();

        match entities.get(&record.junction) {
            Some(&entity) => {
                let position = world
                    .get::<TrafficSignalJunction>(entity)
                    .map(|control| control.position)
                    .unwrap_or_default();
                world.entity_mut(entity).insert((
                    TrafficSignalJunction::new(mode, position),
                    phases,
                    signal,
                ));
                report.restored += 1;
            }
            None => {
                world.spawn((
                    record.junction,
                    TrafficSignalJunction::new(mode, Vec2::ZERO),
                    phases,
                    signal,
                    LaneSamples::default(),
                ));
                report.spawned += 1;
            }
        }
    }

    if report.skipped > 0 {
        warn!(
            "Junction save: {} of {} records could not be read",
            report.skipped,
            records.len()
        );
    }
    report
}
