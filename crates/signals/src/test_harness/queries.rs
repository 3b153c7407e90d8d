//! Query and simulation-tick methods for `TestNetwork`.

use bevy::prelude::*;

use crate::commands::{CommandResult, CommandResultLog, CommandSource, SignalCommand, SignalCommandQueue};
use crate::coordination::SignalGroupRegistry;
use crate::ids::{GroupId, JunctionId};
use crate::junction_control::JunctionSignalState;
use crate::phase_metrics::{LaneSample, LaneSamples};
use crate::phases::SignalPhases;
use crate::signal_delay::EdgeSignalDelays;
use crate::status::SignalStatus;
use crate::validation::RepairReport;
use crate::{SlowTickTimer, TickCounter};

use super::TestNetwork;

impl TestNetwork {
    // -----------------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------------

    /// Run N fixed-update ticks by directly executing the `FixedUpdate`
    /// schedule, bypassing Bevy's time system.
    pub fn tick(&mut self, n: u32) {
        for _ in 0..n {
            self.app.world_mut().run_schedule(FixedUpdate);
        }
    }

    /// Run until the SlowTickTimer fires once more.
    pub fn tick_slow_cycle(&mut self) {
        self.tick(SlowTickTimer::INTERVAL);
    }

    // -----------------------------------------------------------------------
    // Queries (note: Bevy's World::query() requires &mut World)
    // -----------------------------------------------------------------------

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn resource<T: Resource>(&self) -> &T {
        self.app.world().resource::<T>()
    }

    pub fn ticks(&self) -> u64 {
        self.resource::<TickCounter>().0
    }

    /// Entity carrying the given junction id.
    pub fn entity(&mut self, junction: u32) -> Option<Entity> {
        let world = self.app.world_mut();
        let mut query = world.query::<(Entity, &JunctionId)>();
        query
            .iter(world)
            .find(|(_, id)| id.0 == junction)
            .map(|(entity, _)| entity)
    }

    /// Controller state of a junction. Panics if the junction does not exist.
    pub fn signal(&mut self, junction: u32) -> JunctionSignalState {
        let entity = self.expect_entity(junction);
        *self
            .app
            .world()
            .get::<JunctionSignalState>(entity)
            .expect("junction has a controller")
    }

    /// Mutate a junction's controller state directly.
    pub fn edit_signal(&mut self, junction: u32, edit: impl FnOnce(&mut JunctionSignalState)) {
        let entity = self.expect_entity(junction);
        if let Some(mut signal) = self.app.world_mut().get_mut::<JunctionSignalState>(entity) {
            edit(&mut signal);
        }
    }

    pub fn phases(&mut self, junction: u32) -> SignalPhases {
        let entity = self.expect_entity(junction);
        self.app
            .world()
            .get::<SignalPhases>(entity)
            .cloned()
            .expect("junction has phases")
    }

    /// Mutate a junction's phase list directly.
    pub fn edit_phases(&mut self, junction: u32, edit: impl FnOnce(&mut SignalPhases)) {
        let entity = self.expect_entity(junction);
        if let Some(mut phases) = self.app.world_mut().get_mut::<SignalPhases>(entity) {
            edit(&mut phases);
        }
    }

    pub fn status(&mut self, junction: u32) -> SignalStatus {
        let entity = self.expect_entity(junction);
        let world = self.app.world();
        let signal = world
            .get::<JunctionSignalState>(entity)
            .expect("junction has a controller");
        let phases = world.get::<SignalPhases>(entity).expect("junction has phases");
        let overrides = world.get::<EdgeSignalDelays>(entity);
        SignalStatus::capture(signal, phases, overrides)
    }

    /// Replace the lane observations of a junction.
    pub fn set_lanes(&mut self, junction: u32, lanes: Vec<LaneSample>) {
        let entity = self.expect_entity(junction);
        if let Some(mut samples) = self.app.world_mut().get_mut::<LaneSamples>(entity) {
            samples.lanes = lanes;
        }
    }

    pub fn registry(&self) -> &SignalGroupRegistry {
        self.resource::<SignalGroupRegistry>()
    }

    pub fn registry_mut(&mut self) -> Mut<'_, SignalGroupRegistry> {
        self.app.world_mut().resource_mut::<SignalGroupRegistry>()
    }

    pub fn group_of(&self, junction: u32) -> Option<GroupId> {
        self.registry().group_of(JunctionId(junction))
    }

    pub fn repair_report(&self) -> &RepairReport {
        self.resource::<RepairReport>()
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Queue a command for the next tick.
    pub fn queue(&mut self, command: SignalCommand) {
        let tick = self.ticks();
        self.app
            .world_mut()
            .resource_mut::<SignalCommandQueue>()
            .push(tick, CommandSource::Agent, command);
    }

    /// Queue a command, run one tick, and return its result.
    pub fn execute(&mut self, command: SignalCommand) -> CommandResult {
        self.queue(command);
        self.tick(1);
        self.last_result()
            .cloned()
            .expect("executed command was logged")
    }

    pub fn last_result(&self) -> Option<&CommandResult> {
        self.resource::<CommandResultLog>().last_result()
    }

    fn expect_entity(&mut self, junction: u32) -> Entity {
        self.entity(junction)
            .unwrap_or_else(|| panic!("no junction with id {junction}"))
    }
}
