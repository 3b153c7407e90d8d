use bevy::prelude::*;

use super::{execute_signal_commands, CommandResultLog, SignalCommandQueue};
use crate::simulation_sets::SignalSet;

/// Registers the command queue, result log and executor system.
pub struct SignalCommandsPlugin;

impl Plugin for SignalCommandsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SignalCommandQueue>();
        app.init_resource::<CommandResultLog>();

        app.add_systems(
            FixedUpdate,
            execute_signal_commands.in_set(SignalSet::Input),
        );
    }
}
