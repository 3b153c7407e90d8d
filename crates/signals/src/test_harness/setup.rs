//! Builder methods for junction, lane and group setup in integration tests.

use bevy::prelude::*;

use crate::coordination::SignalGroupRegistry;
use crate::ids::{EdgeId, JunctionId};
use crate::junction_control::{JunctionSignalState, TrafficSignalJunction};
use crate::params::SignalParams;
use crate::phase_metrics::{LaneSample, LaneSamples};
use crate::phase_selector::SignalMode;
use crate::phases::{Phase, SignalPhases};
use crate::signal_delay::EdgeSignalDelays;

use super::TestNetwork;

impl TestNetwork {
    // -----------------------------------------------------------------------
    // Junctions and lanes
    // -----------------------------------------------------------------------

    /// Spawn a signalized junction with the given phases and no lanes.
    pub fn with_junction(
        mut self,
        id: u32,
        mode: SignalMode,
        position: Vec2,
        phases: Vec<Phase>,
    ) -> Self {
        self.spawn_junction(id, mode, position, phases);
        self
    }

    /// Spawn `count` identical junctions along the x axis, `spacing` apart,
    /// with ids starting at `first_id`.
    pub fn with_corridor(
        mut self,
        first_id: u32,
        count: u32,
        spacing: f32,
        mode: SignalMode,
        phases: Vec<Phase>,
    ) -> Self {
        for i in 0..count {
            let position = Vec2::new(i as f32 * spacing, 0.0);
            self.spawn_junction(first_id + i, mode, position, phases.clone());
        }
        self
    }

    /// Append a lane observation to a junction. The lane is reported every
    /// tick until replaced with `set_lanes`.
    pub fn with_lane(mut self, junction: u32, lane: LaneSample) -> Self {
        if let Some(entity) = self.entity(junction) {
            if let Some(mut lanes) = self.app.world_mut().get_mut::<LaneSamples>(entity) {
                lanes.lanes.push(lane);
            }
        }
        self
    }

    /// Attach a per-edge delay override to a junction.
    pub fn with_edge_delay(mut self, junction: u32, edge: u32, open_delay: i32) -> Self {
        if let Some(entity) = self.entity(junction) {
            let world = self.app.world_mut();
            let mut delays = world
                .get::<EdgeSignalDelays>(entity)
                .cloned()
                .unwrap_or_default();
            delays.set(EdgeId(edge), open_delay, 0, true);
            world.entity_mut(entity).insert(delays);
        }
        self
    }

    /// Spawn a junction and return its entity.
    pub fn spawn_junction(
        &mut self,
        id: u32,
        mode: SignalMode,
        position: Vec2,
        phases: Vec<Phase>,
    ) -> Entity {
        self.app
            .world_mut()
            .spawn((
                JunctionId(id),
                TrafficSignalJunction::new(mode, position),
                SignalPhases::new(phases),
                JunctionSignalState::default(),
                LaneSamples::default(),
            ))
            .id()
    }

    // -----------------------------------------------------------------------
    // Groups and parameters
    // -----------------------------------------------------------------------

    /// Create a coordination group; the first id leads.
    pub fn with_group(mut self, members: &[u32]) -> Self {
        let ids: Vec<JunctionId> = members.iter().map(|&id| JunctionId(id)).collect();
        self.app
            .world_mut()
            .resource_mut::<SignalGroupRegistry>()
            .create_group(&ids)
            .expect("test group members must be non-empty");
        self
    }

    /// Adjust signal parameters in place.
    pub fn with_params(mut self, edit: impl FnOnce(&mut SignalParams)) -> Self {
        edit(&mut self.app.world_mut().resource_mut::<SignalParams>());
        self
    }
}
