use bevy::prelude::*;
use std::collections::BTreeMap;

pub mod commands;
pub mod config;
pub mod coordination;
pub mod ids;
pub mod junction_control;
pub mod junction_save;
pub mod params;
pub mod phase_metrics;
pub mod phase_selector;
pub mod phases;
pub mod records;
pub mod signal_delay;
pub mod simulation_sets;
pub mod status;
pub mod templates;
pub mod validation;

#[cfg(test)]
mod integration_tests;
#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

pub use simulation_sets::SignalSet;

use commands::SignalCommandsPlugin;
use coordination::{apply_group_coordination, SignalGroupRegistry};
use junction_control::update_junction_states;
use params::SignalParams;
use phase_metrics::update_phase_metrics;
use validation::{validate_signal_state, RepairReport};

// ---------------------------------------------------------------------------
// Resource persistence
// ---------------------------------------------------------------------------

/// A controller resource stored as one named blob in the host's save map.
pub trait Saveable: Resource + Default {
    /// Blob name in the save map. Released keys never change.
    const SAVE_KEY: &'static str;

    /// Encoded state, or `None` while there is nothing worth storing.
    fn save_to_bytes(&self) -> Option<Vec<u8>>;

    /// Rebuild the resource from a blob produced by `save_to_bytes`.
    fn load_from_bytes(bytes: &[u8]) -> Self;
}

/// Bitcode-decode a saved blob; an undecodable blob is reported and
/// replaced by `T::default()`.
pub fn decode_or_warn<T: bitcode::DecodeOwned + Default>(key: &str, bytes: &[u8]) -> T {
    bitcode::decode(bytes).unwrap_or_else(|error| {
        warn!(
            "Discarding saved {} ({} bytes), using defaults: {}",
            key,
            bytes.len(),
            error
        );
        T::default()
    })
}

struct PersistedResource {
    key: &'static str,
    save: fn(&World) -> Option<Vec<u8>>,
    load: fn(&mut World, &[u8]),
    reset: fn(&mut World),
}

fn save_resource<T: Saveable>(world: &World) -> Option<Vec<u8>> {
    world.get_resource::<T>()?.save_to_bytes()
}

fn load_resource<T: Saveable>(world: &mut World, bytes: &[u8]) {
    world.insert_resource(T::load_from_bytes(bytes));
}

fn reset_resource<T: Saveable>(world: &mut World) {
    world.insert_resource(T::default());
}

/// Resources registered for persistence by the signal plugins, in
/// registration order.
#[derive(Resource, Default)]
pub struct SaveableRegistry {
    resources: Vec<PersistedResource>,
}

impl SaveableRegistry {
    /// Register `T`. A second registration under the same key is ignored
    /// and returns `false`.
    pub fn register<T: Saveable>(&mut self) -> bool {
        if self.resources.iter().any(|r| r.key == T::SAVE_KEY) {
            warn!("Save key {} is already registered", T::SAVE_KEY);
            return false;
        }
        self.resources.push(PersistedResource {
            key: T::SAVE_KEY,
            save: save_resource::<T>,
            load: load_resource::<T>,
            reset: reset_resource::<T>,
        });
        true
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resources.iter().map(|r| r.key)
    }

    /// Blobs of every registered resource that has something to store.
    pub fn save_all(&self, world: &World) -> BTreeMap<String, Vec<u8>> {
        self.resources
            .iter()
            .filter_map(|r| Some((r.key.to_string(), (r.save)(world)?)))
            .collect()
    }

    /// Restore every registered resource present in `blobs`; the rest keep
    /// their current value. Unknown keys are ignored.
    pub fn load_all(&self, world: &mut World, blobs: &BTreeMap<String, Vec<u8>>) {
        for resource in &self.resources {
            if let Some(bytes) = blobs.get(resource.key) {
                (resource.load)(world, bytes);
            }
        }
    }

    /// Put every registered resource back to its default, e.g. before
    /// loading into a world that already ran.
    pub fn reset_all(&self, world: &mut World) {
        for resource in &self.resources {
            (resource.reset)(world);
        }
    }
}

// ---------------------------------------------------------------------------
// Core resources
// ---------------------------------------------------------------------------

/// Global tick counter incremented each FixedUpdate.
#[derive(Resource, Default)]
pub struct TickCounter(pub u64);

/// Throttle for passes that don't need to run every tick (validation).
#[derive(Resource, Default)]
pub struct SlowTickTimer {
    pub counter: u32,
}

impl SlowTickTimer {
    pub const INTERVAL: u32 = 100;

    pub fn tick(&mut self) {
        self.counter += 1;
    }

    pub fn should_run(&self) -> bool {
        self.counter.is_multiple_of(Self::INTERVAL)
    }
}

pub fn tick_slow_timer(mut timer: ResMut<SlowTickTimer>, mut tick: ResMut<TickCounter>) {
    timer.tick();
    tick.0 = tick.0.wrapping_add(1);
}

/// Phase-based traffic signal control: metrics, per-junction state machines,
/// group coordination, commands and periodic repair.
pub struct SignalsPlugin;

impl Plugin for SignalsPlugin {
    fn build(&self, app: &mut App) {
        simulation_sets::configure_signal_sets(app);

        app.init_resource::<TickCounter>()
            .init_resource::<SlowTickTimer>()
            .init_resource::<SignalParams>()
            .init_resource::<SignalGroupRegistry>()
            .init_resource::<RepairReport>()
            .init_resource::<SaveableRegistry>()
            .add_systems(
                FixedUpdate,
                tick_slow_timer
                    .before(commands::execute_signal_commands)
                    .in_set(SignalSet::Input),
            )
            .add_systems(
                FixedUpdate,
                update_phase_metrics.in_set(SignalSet::Metrics),
            )
            .add_systems(
                FixedUpdate,
                update_junction_states.in_set(SignalSet::Control),
            )
            .add_systems(
                FixedUpdate,
                apply_group_coordination.in_set(SignalSet::Coordinate),
            )
            .add_systems(
                FixedUpdate,
                validate_signal_state.in_set(SignalSet::Report),
            );

        app.add_plugins(SignalCommandsPlugin);

        let mut registry = app.world_mut().resource_mut::<SaveableRegistry>();
        registry.register::<SignalParams>();
        registry.register::<SignalGroupRegistry>();
    }
}
