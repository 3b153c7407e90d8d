//! Command executor system: drains the [`SignalCommandQueue`] each fixed
//! tick, applies every queued [`SignalCommand`] and records the outcome in
//! the [`CommandResultLog`].

use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::config::MAX_SIGNAL_DELAY;
use crate::coordination::{collect_layout, force_sync, target_phase, SignalGroupRegistry};
use crate::ids::{EdgeId, GroupId, JunctionId};
use crate::junction_control::{JunctionSignalState, TrafficSignalJunction};
use crate::phases::{Phase, SignalPhases, VehicleClass};
use crate::signal_delay::{resolve_delay, DelayKind, EdgeSignalDelays};
use crate::templates::TimingTemplate;

use super::result_log::CommandResultLog;
use super::{CommandError, CommandResult, PhaseUpdate, SignalCommand, SignalCommandQueue};

type JunctionItem<'a> = (
    Entity,
    &'a JunctionId,
    &'a mut TrafficSignalJunction,
    &'a mut SignalPhases,
    &'a mut JunctionSignalState,
    Option<&'a mut EdgeSignalDelays>,
);

/// Drains all pending commands and executes them in order.
pub fn execute_signal_commands(
    mut queue: ResMut<SignalCommandQueue>,
    mut log: ResMut<CommandResultLog>,
    mut registry: ResMut<SignalGroupRegistry>,
    mut junctions: Query<JunctionItem<'static>>,
    mut commands: Commands,
) {
    if queue.is_empty() {
        return;
    }
    let entities: BTreeMap<JunctionId, Entity> = junctions
        .iter()
        .map(|(entity, &id, ..)| (id, entity))
        .collect();
    let mut inserts = Vec::new();
    let mut ctx = CommandContext {
        registry: &mut *registry,
        junctions: &mut junctions,
        entities: &entities,
        inserts: &mut inserts,
        offsets_stale: false,
    };

    for queued in queue.drain() {
        let result = ctx.execute(&queued.command);
        if let CommandResult::Error(error) = &result {
            debug!("Signal command {:?} failed: {}", queued.command, error);
        } else if changes_offsets(&queued.command) {
            ctx.offsets_stale = true;
        }
        log.push(queued.command, result);
    }
    ctx.refresh_offsets();

    for (entity, delays) in inserts {
        commands.entity(entity).insert(delays);
    }
}

struct CommandContext<'a, 'w, 's> {
    registry: &'a mut SignalGroupRegistry,
    junctions: &'a mut Query<'w, 's, JunctionItem<'static>>,
    entities: &'a BTreeMap<JunctionId, Entity>,
    /// Delay components for junctions that had none yet.
    inserts: &'a mut Vec<(Entity, EdgeSignalDelays)>,
    /// Set when a command changed group membership, group parameters or a
    /// member's phase list since the last offset refresh.
    offsets_stale: bool,
}

impl CommandContext<'_, '_, '_> {
    fn execute(&mut self, command: &SignalCommand) -> CommandResult {
        match command {
            SignalCommand::AddPhase {
                junction,
                min_duration,
                max_duration,
            } => self.add_phase(*junction, *min_duration, *max_duration),
            SignalCommand::RemovePhase { junction, index } => self.remove_phase(*junction, *index),
            SignalCommand::SwapPhases { junction, a, b } => self.swap_phases(*junction, *a, *b),
            SignalCommand::UpdatePhase {
                junction,
                index,
                update,
            } => self.update_phase(*junction, *index, *update),
            SignalCommand::SetMode { junction, mode } => {
                self.with_junction(*junction, |_, control, _, signal, _| {
                    if control.mode != *mode {
                        control.mode = *mode;
                        signal.fault();
                    }
                    Ok(CommandResult::Success)
                })
            }
            SignalCommand::SetManualOverride { junction, phase } => {
                self.with_junction(*junction, |_, _, phases, signal, _| {
                    if *phase as usize > phases.len() {
                        return Err(CommandError::NotFound);
                    }
                    signal.manual_override_phase = *phase;
                    Ok(CommandResult::Success)
                })
            }
            SignalCommand::EndPhasePrematurely { junction } => {
                self.with_junction(*junction, |_, _, phases, signal, _| {
                    let index = signal.current_index().ok_or(CommandError::EmptyPhaseList)?;
                    let phase = phases.get_mut(index).ok_or(CommandError::NotFound)?;
                    phase
                        .options
                        .insert(crate::phases::PhaseOptions::END_PREMATURELY);
                    Ok(CommandResult::Success)
                })
            }
            SignalCommand::CreateGroup { members } => {
                if let Some(missing) = members.iter().find(|&j| !self.entities.contains_key(j)) {
                    return CommandResult::Error(CommandError::InvalidParameter(format!(
                        "junction {missing} is not signalized"
                    )));
                }
                match self.registry.create_group(members) {
                    Ok(_) => CommandResult::Success,
                    Err(error) => CommandResult::Error(error),
                }
            }
            SignalCommand::DeleteGroup { group } => self.registry.delete_group(*group).into(),
            SignalCommand::AddMember { group, junction } => {
                if !self.entities.contains_key(junction) {
                    return CommandResult::Error(CommandError::NotFound);
                }
                self.registry.add_member(*group, *junction).into()
            }
            SignalCommand::RemoveMember { junction } => {
                self.registry.remove_member(*junction).into()
            }
            SignalCommand::SetLeader { group, junction } => {
                self.registry.set_leader(*group, *junction).into()
            }
            SignalCommand::JoinGroups { target, absorbed } => {
                self.registry.join_groups(*target, *absorbed).into()
            }
            SignalCommand::SetCoordination { group, coordinated } => {
                self.registry.set_coordination(*group, *coordinated).into()
            }
            SignalCommand::SetGreenWave {
                group,
                enabled,
                speed,
                offset,
            } => self
                .registry
                .set_green_wave(*group, *enabled, *speed, *offset)
                .into(),
            SignalCommand::SetMaxCoordinationDistance { group, distance } => self
                .registry
                .set_max_coordination_distance(*group, *distance)
                .into(),
            SignalCommand::SetEnhancedOffsets {
                group,
                enabled,
                main_phase,
            } => self
                .registry
                .set_enhanced_offsets(*group, *enabled, *main_phase)
                .into(),
            SignalCommand::SetMemberSignalDelay { junction, ticks } => {
                match self.registry.set_member_signal_delay(*junction, *ticks) {
                    Ok(stored) if stored != *ticks => clamped_warning(*ticks, stored),
                    Ok(_) => CommandResult::Success,
                    Err(error) => CommandResult::Error(error),
                }
            }
            SignalCommand::SetEdgeDelay {
                junction,
                edge,
                open_delay,
                close_delay,
                enabled,
            } => self.set_edge_delay(*junction, *edge, *open_delay, *close_delay, *enabled),
            SignalCommand::SetPhaseDelay {
                junction,
                index,
                class,
                open_delay,
                close_delay,
            } => self.set_phase_delay(*junction, *index, *class, *open_delay, *close_delay),
            SignalCommand::ApplyTemplate { junction, template } => {
                self.apply_template(*junction, template)
            }
            SignalCommand::ForceSyncGroup { group } => self.force_sync_group(*group),
        }
    }

    /// Run `f` on one junction's components.
    fn with_junction(
        &mut self,
        junction: JunctionId,
        f: impl FnOnce(
            Entity,
            &mut TrafficSignalJunction,
            &mut SignalPhases,
            &mut JunctionSignalState,
            Option<&mut EdgeSignalDelays>,
        ) -> Result<CommandResult, CommandError>,
    ) -> CommandResult {
        let Some(&entity) = self.entities.get(&junction) else {
            return CommandResult::Error(CommandError::NotFound);
        };
        let Ok((entity, _, mut control, mut phases, mut signal, delays)) =
            self.junctions.get_mut(entity)
        else {
            return CommandResult::Error(CommandError::NotFound);
        };
        let delays = delays.map(|d| d.into_inner());
        match f(entity, &mut *control, &mut *phases, &mut *signal, delays) {
            Ok(result) => result,
            Err(error) => CommandResult::Error(error),
        }
    }

    fn add_phase(&mut self, junction: JunctionId, min: u16, max: u16) -> CommandResult {
        self.with_junction(junction, |_, _, phases, _, _| {
            phases
                .push(Phase::with_durations(min, max))
                .ok_or(CommandError::PhaseLimit)?;
            if min > max {
                return Ok(CommandResult::SuccessWithWarning(format!(
                    "durations swapped to {max}..{min}"
                )));
            }
            Ok(CommandResult::Success)
        })
    }

    fn remove_phase(&mut self, junction: JunctionId, index: usize) -> CommandResult {
        self.with_junction(junction, |_, _, phases, signal, _| {
            phases.remove(index).ok_or(CommandError::NotFound)?;
            restart_after_reorder(phases, signal);
            Ok(CommandResult::Success)
        })
    }

    fn swap_phases(&mut self, junction: JunctionId, a: usize, b: usize) -> CommandResult {
        self.with_junction(junction, |_, _, phases, signal, _| {
            if !phases.swap(a, b) {
                return Err(CommandError::NotFound);
            }
            if a != b {
                restart_after_reorder(phases, signal);
            }
            Ok(CommandResult::Success)
        })
    }

    fn update_phase(
        &mut self,
        junction: JunctionId,
        index: usize,
        update: PhaseUpdate,
    ) -> CommandResult {
        self.with_junction(junction, |_, _, phases, _, _| {
            let phase = phases.get_mut(index).ok_or(CommandError::NotFound)?;
            match update {
                PhaseUpdate::MinDuration(ticks) => {
                    let raised = ticks > phase.max_duration;
                    phase.set_min_duration(ticks);
                    if raised {
                        return Ok(CommandResult::SuccessWithWarning(format!(
                            "max duration raised to {ticks}"
                        )));
                    }
                }
                PhaseUpdate::MaxDuration(ticks) => {
                    let lowered = ticks < phase.min_duration;
                    phase.set_max_duration(ticks);
                    if lowered {
                        return Ok(CommandResult::SuccessWithWarning(format!(
                            "min duration lowered to {ticks}"
                        )));
                    }
                }
                PhaseUpdate::Options(bits) => {
                    if bits & !crate::phases::PhaseOptions::ALL != 0 {
                        return Err(CommandError::InvalidParameter(format!(
                            "unknown option bits {bits:#04x}"
                        )));
                    }
                    phase.options.0 = bits;
                }
                PhaseUpdate::Option { bit, enabled } => {
                    if bit.count_ones() != 1 || bit & !crate::phases::PhaseOptions::ALL != 0 {
                        return Err(CommandError::InvalidParameter(format!(
                            "not a single option bit: {bit:#04x}"
                        )));
                    }
                    phase.options.set(bit, enabled);
                }
                PhaseUpdate::ChangeMetric(metric) => phase.change_metric = metric,
            }
            Ok(CommandResult::Success)
        })
    }

    fn set_edge_delay(
        &mut self,
        junction: JunctionId,
        edge: EdgeId,
        open_delay: i32,
        close_delay: i32,
        enabled: bool,
    ) -> CommandResult {
        let Some(&entity) = self.entities.get(&junction) else {
            return CommandResult::Error(CommandError::NotFound);
        };
        let Ok((.., delays)) = self.junctions.get_mut(entity) else {
            return CommandResult::Error(CommandError::NotFound);
        };
        match delays {
            Some(mut delays) => delays.set(edge, open_delay, close_delay, enabled),
            None => {
                let index = match self.inserts.iter().position(|(e, _)| *e == entity) {
                    Some(index) => index,
                    None => {
                        self.inserts.push((entity, EdgeSignalDelays::default()));
                        self.inserts.len() - 1
                    }
                };
                self.inserts[index]
                    .1
                    .set(edge, open_delay, close_delay, enabled);
            }
        }
        if out_of_range(open_delay) || out_of_range(close_delay) {
            return CommandResult::SuccessWithWarning(format!(
                "delays clamped to 0..={MAX_SIGNAL_DELAY}"
            ));
        }
        CommandResult::Success
    }

    fn set_phase_delay(
        &mut self,
        junction: JunctionId,
        index: usize,
        class: VehicleClass,
        open_delay: i32,
        close_delay: i32,
    ) -> CommandResult {
        self.with_junction(junction, |_, _, phases, _, _| {
            let mask = phases.mask_mut(index).ok_or(CommandError::NotFound)?;
            mask.open_delay.set(class, open_delay);
            mask.close_delay.set(class, close_delay);
            if out_of_range(open_delay) || out_of_range(close_delay) {
                return Ok(CommandResult::SuccessWithWarning(format!(
                    "delays clamped to 0..={MAX_SIGNAL_DELAY}"
                )));
            }
            Ok(CommandResult::Success)
        })
    }

    fn apply_template(&mut self, junction: JunctionId, name: &str) -> CommandResult {
        let Some(template) = TimingTemplate::from_name(name) else {
            return CommandResult::Error(CommandError::InvalidParameter(format!(
                "unknown timing template '{name}'"
            )));
        };
        self.with_junction(junction, |_, control, phases, signal, _| {
            *phases = SignalPhases::new(template.phases());
            control.mode = template.mode();
            signal.manual_override_phase = 0;
            signal.fault();
            Ok(CommandResult::Success)
        })
    }

    /// Hard-copy the leader's controller state onto every follower.
    /// Recompute group distances, offsets and cycle lengths if an earlier
    /// command in this batch invalidated them.
    fn refresh_offsets(&mut self) {
        if !self.offsets_stale {
            return;
        }
        let layout = collect_layout(
            self.junctions
                .iter()
                .map(|(_, id, control, phases, ..)| (id, control, phases)),
        );
        self.registry.refresh(&layout);
        self.offsets_stale = false;
    }

    fn force_sync_group(&mut self, group: GroupId) -> CommandResult {
        self.refresh_offsets();
        let Some(group) = self.registry.group(group) else {
            return CommandResult::Error(CommandError::NotFound);
        };
        let leader = group
            .leader()
            .and_then(|id| self.entities.get(&id))
            .and_then(|&entity| self.junctions.get(entity).ok())
            .map(|(.., signal, _)| *signal);
        let Some(leader) = leader else {
            return CommandResult::Error(CommandError::NotFound);
        };

        let mut synced = 0;
        for member in group.followers() {
            let Some(&entity) = self.entities.get(&member.junction) else {
                continue;
            };
            let Ok((_, _, _, phases, mut signal, delays)) = self.junctions.get_mut(entity) else {
                continue;
            };
            let count = phases.len();
            let target = target_phase(leader.current_phase, member.phase_offset, count);
            let open_delay = match (target as usize).checked_sub(1) {
                Some(index) => resolve_delay(&phases, delays.as_deref(), index, DelayKind::Open, None),
                None => 0,
            };
            force_sync(&mut signal, &leader, member.phase_offset, count, open_delay);
            synced += 1;
        }
        debug!("Force-synced {} followers of group {}", synced, group.id);
        CommandResult::Success
    }
}

/// Commands after which stored follower offsets no longer match the
/// network.
fn changes_offsets(command: &SignalCommand) -> bool {
    matches!(
        command,
        SignalCommand::AddPhase { .. }
            | SignalCommand::RemovePhase { .. }
            | SignalCommand::SwapPhases { .. }
            | SignalCommand::UpdatePhase { .. }
            | SignalCommand::ApplyTemplate { .. }
            | SignalCommand::CreateGroup { .. }
            | SignalCommand::AddMember { .. }
            | SignalCommand::RemoveMember { .. }
            | SignalCommand::SetLeader { .. }
            | SignalCommand::JoinGroups { .. }
            | SignalCommand::SetGreenWave { .. }
            | SignalCommand::SetEnhancedOffsets { .. }
            | SignalCommand::SetMemberSignalDelay { .. }
    )
}

/// After phases were removed or reordered the running indices no longer
/// point at the same phases; restart the controller.
fn restart_after_reorder(phases: &SignalPhases, signal: &mut JunctionSignalState) {
    if signal.manual_override_phase as usize > phases.len() {
        signal.manual_override_phase = 0;
    }
    signal.fault();
}

fn out_of_range(ticks: i32) -> bool {
    !(0..=MAX_SIGNAL_DELAY).contains(&ticks)
}

fn clamped_warning(requested: i32, stored: i32) -> CommandResult {
    CommandResult::SuccessWithWarning(format!("delay {requested} clamped to {stored}"))
}
