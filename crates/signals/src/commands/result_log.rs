//! Ring-buffer log of recently executed signal commands and their results.

use bevy::prelude::*;

use super::{CommandResult, SignalCommand};

/// Maximum number of entries retained in the ring buffer.
const MAX_ENTRIES: usize = 64;

#[derive(Resource, Debug, Clone, Default)]
pub struct CommandResultLog {
    entries: Vec<(SignalCommand, CommandResult)>,
}

impl CommandResultLog {
    /// Record a command/result pair, evicting the oldest entry when full.
    pub fn push(&mut self, command: SignalCommand, result: CommandResult) {
        if self.entries.len() >= MAX_ENTRIES {
            self.entries.remove(0);
        }
        self.entries.push((command, result));
    }

    /// Return the last `n` entries (or fewer if the log is shorter).
    pub fn last_n(&self, n: usize) -> &[(SignalCommand, CommandResult)] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn last_result(&self) -> Option<&CommandResult> {
        self.entries.last().map(|(_, result)| result)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
