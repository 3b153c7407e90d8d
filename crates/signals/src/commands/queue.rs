use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::SignalCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandSource {
    Player,
    Agent,
    Replay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedCommand {
    pub tick: u64,
    pub source: CommandSource,
    pub command: SignalCommand,
}

/// Commands waiting for the next `SignalSet::Input` pass.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct SignalCommandQueue {
    pending: Vec<QueuedCommand>,
}

impl SignalCommandQueue {
    pub fn push(&mut self, tick: u64, source: CommandSource, command: SignalCommand) {
        self.pending.push(QueuedCommand {
            tick,
            source,
            command,
        });
    }

    pub fn push_queued(&mut self, queued: QueuedCommand) {
        self.pending.push(queued);
    }

    pub fn drain(&mut self) -> Vec<QueuedCommand> {
        self.pending.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
