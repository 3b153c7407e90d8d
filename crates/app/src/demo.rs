//! Demo corridor: a coordinated row of fixed-timed junctions followed by two
//! demand-responsive ones, fed with seeded synthetic lane samples.

use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use signals::coordination::SignalGroupRegistry;
use signals::ids::JunctionId;
use signals::junction_control::{JunctionSignalState, TrafficSignalJunction};
use signals::phase_metrics::{LaneSample, LaneSamples};
use signals::phases::{SignalPhases, VehicleClass};
use signals::signal_delay::EdgeSignalDelays;
use signals::status::SignalStatus;
use signals::templates::TimingTemplate;
use signals::{SignalSet, TickCounter};

/// Junctions 1..=CORRIDOR_LENGTH form the coordinated corridor.
pub const CORRIDOR_LENGTH: u32 = 4;
const STANDALONE: u32 = 2;
const SPACING: f32 = 120.0;
const GREEN_WAVE_SPEED: f32 = 12.0;

#[derive(Resource, Debug, Clone, Copy)]
pub struct DemoSettings {
    /// Stop after this many fixed ticks; 0 runs forever.
    pub ticks: u64,
    pub seed: u64,
    pub report_every: u64,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            ticks: 600,
            seed: 42,
            report_every: 50,
        }
    }
}

#[derive(Resource)]
struct DemandRng(ChaCha8Rng);

pub struct DemoPlugin {
    pub settings: DemoSettings,
}

impl Plugin for DemoPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.settings)
            .insert_resource(DemandRng(ChaCha8Rng::seed_from_u64(self.settings.seed)))
            .add_systems(Startup, spawn_corridor)
            .add_systems(FixedUpdate, feed_demand.in_set(SignalSet::Input))
            .add_systems(
                FixedUpdate,
                (report_status, stop_after_ticks)
                    .chain()
                    .after(SignalSet::Report),
            );
    }
}

/// Spawn the demo junctions and group the corridor under a green wave.
pub fn spawn_corridor(mut commands: Commands, mut registry: ResMut<SignalGroupRegistry>) {
    let total = CORRIDOR_LENGTH + STANDALONE;
    for id in 1..=total {
        let template = if id <= CORRIDOR_LENGTH {
            TimingTemplate::FixedCorridor
        } else {
            TimingTemplate::FourPhaseSplit
        };
        commands.spawn((
            JunctionId(id),
            TrafficSignalJunction::new(
                template.mode(),
                Vec2::new((id - 1) as f32 * SPACING, 0.0),
            ),
            SignalPhases::new(template.phases()),
            JunctionSignalState::default(),
            LaneSamples::default(),
        ));
    }

    let corridor: Vec<JunctionId> = (1..=CORRIDOR_LENGTH).map(JunctionId).collect();
    let group = match registry.create_group(&corridor) {
        Ok(group) => group,
        Err(e) => {
            warn!("Demo: could not create corridor group: {e}");
            return;
        }
    };
    if let Err(e) = registry.set_green_wave(group, true, GREEN_WAVE_SPEED, 0.0) {
        warn!("Demo: could not enable green wave: {e}");
    }
    info!(
        "Demo: {} junctions, corridor of {} in {}",
        total, CORRIDOR_LENGTH, group
    );
}

/// Replace every junction's lane samples with fresh random demand.
fn feed_demand(
    mut rng: ResMut<DemandRng>,
    mut junctions: Query<(&JunctionId, &SignalPhases, &mut LaneSamples)>,
) {
    let mut sorted: Vec<_> = junctions.iter_mut().collect();
    sorted.sort_by_key(|(id, _, _)| **id);

    for (_, phases, mut samples) in sorted {
        samples.lanes.clear();
        for index in 0..phases.len() {
            let class = VehicleClass::ALL[rng.0.gen_range(0..VehicleClass::ALL.len())];
            let occupants = rng.0.gen_range(0..8);
            let lane = LaneSample::new(1 << index, class)
                .with_occupants(occupants, rng.0.gen_range(0..3))
                .with_flow(rng.0.gen_range(0.0..15.0), 1.0);
            samples.lanes.push(lane);
        }
    }
}

fn report_status(
    tick: Res<TickCounter>,
    settings: Res<DemoSettings>,
    registry: Res<SignalGroupRegistry>,
    junctions: Query<(
        &JunctionId,
        &JunctionSignalState,
        &SignalPhases,
        Option<&EdgeSignalDelays>,
    )>,
) {
    if settings.report_every == 0 || !tick.0.is_multiple_of(settings.report_every) {
        return;
    }

    let mut rows: Vec<_> = junctions.iter().collect();
    rows.sort_by_key(|(id, ..)| **id);
    let total = rows.len();
    let mut serving = 0;
    for (id, signal, phases, delays) in rows {
        let status = SignalStatus::capture(signal, phases, delays);
        if status.is_serving() {
            serving += 1;
        }
        info!(
            "tick {} junction {}: {:?} phase {} next {} timer {} (effective {}) target {:.1}",
            tick.0,
            id.0,
            status.state,
            status.current_phase,
            status.next_phase,
            status.timer,
            status.effective_timer,
            status.target_duration,
        );
    }
    info!(
        "tick {}: {} of {} junctions serving a phase",
        tick.0, serving, total
    );
    for group in registry.groups() {
        info!(
            "tick {} group {}: {} members, leader {:?}, cycle {}/{}",
            tick.0,
            group.id,
            group.len(),
            group.leader(),
            group.cycle_timer,
            group.cycle_length,
        );
    }
}

fn stop_after_ticks(
    tick: Res<TickCounter>,
    settings: Res<DemoSettings>,
    mut exit: EventWriter<AppExit>,
) {
    if settings.ticks > 0 && tick.0 >= settings.ticks {
        info!("Demo finished after {} ticks", tick.0);
        exit.send(AppExit::Success);
    }
}
