use bevy::prelude::*;
use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::config::MAX_SIGNAL_DELAY;
use crate::ids::EdgeId;

/// Which side of a phase a delay applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DelayKind {
    /// Before the phase's edges turn green.
    Open,
    /// Before the phase's edges turn red.
    Close,
}

/// Manual delay override for one edge, in ticks (`0..=MAX_SIGNAL_DELAY`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct SignalDelay {
    pub edge: EdgeId,
    open_delay: i16,
    close_delay: i16,
    pub enabled: bool,
}

impl SignalDelay {
    pub fn new(edge: EdgeId, open_delay: i32, close_delay: i32) -> Self {
        let mut delay = Self {
            edge,
            open_delay: 0,
            close_delay: 0,
            enabled: true,
        };
        delay.set_open_delay(open_delay);
        delay.set_close_delay(close_delay);
        delay
    }

    pub fn open_delay(&self) -> i32 {
        self.open_delay as i32
    }

    pub fn close_delay(&self) -> i32 {
        self.close_delay as i32
    }

    pub fn get(&self, kind: DelayKind) -> i32 {
        match kind {
            DelayKind::Open => self.open_delay(),
            DelayKind::Close => self.close_delay(),
        }
    }

    pub fn set_open_delay(&mut self, ticks: i32) {
        self.open_delay = ticks.clamp(0, MAX_SIGNAL_DELAY) as i16;
    }

    pub fn set_close_delay(&mut self, ticks: i32) {
        self.close_delay = ticks.clamp(0, MAX_SIGNAL_DELAY) as i16;
    }
}

/// Per-edge delay overrides of one junction.
#[derive(Component, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeSignalDelays {
    pub delays: Vec<SignalDelay>,
}

impl EdgeSignalDelays {
    pub fn get(&self, edge: EdgeId) -> Option<&SignalDelay> {
        self.delays.iter().find(|d| d.edge == edge)
    }

    /// Insert or replace the override for `edge`. Values are clamped.
    pub fn set(&mut self, edge: EdgeId, open_delay: i32, close_delay: i32, enabled: bool) {
        let mut delay = SignalDelay::new(edge, open_delay, close_delay);
        delay.enabled = enabled;
        match self.delays.iter_mut().find(|d| d.edge == edge) {
            Some(existing) => *existing = delay,
            None => self.delays.push(delay),
        }
    }

    pub fn remove(&mut self, edge: EdgeId) -> bool {
        let before = self.delays.len();
        self.delays.retain(|d| d.edge != edge);
        self.delays.len() != before
    }
}
