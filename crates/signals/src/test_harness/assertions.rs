//! Assertion helpers for `TestNetwork` integration tests.

use crate::ids::JunctionId;
use crate::junction_control::{JunctionSignalState, SignalState};
use crate::phases::SignalPhases;

use super::TestNetwork;

impl TestNetwork {
    // -----------------------------------------------------------------------
    // Assertions
    // -----------------------------------------------------------------------

    pub fn assert_state(&mut self, junction: u32, state: SignalState) {
        let actual = self.signal(junction).state;
        assert_eq!(
            actual, state,
            "junction {junction}: expected state {state:?}, got {actual:?}"
        );
    }

    /// Assert the 1-based phase currently running (0 for none).
    pub fn assert_current_phase(&mut self, junction: u32, phase: u8) {
        let actual = self.signal(junction).current_phase;
        assert_eq!(
            actual, phase,
            "junction {junction}: expected current phase {phase}, got {actual}"
        );
    }

    /// Assert every non-empty group has exactly one leader.
    pub fn assert_single_leader_per_group(&self) {
        for group in self.registry().groups() {
            if group.is_empty() {
                continue;
            }
            let leaders = group.members.iter().filter(|m| m.is_leader).count();
            assert_eq!(leaders, 1, "group {} has {} leaders", group.id, leaders);
        }
    }

    /// Assert `min_duration <= max_duration` on every phase of every junction
    /// and that mask buffers match phase lists.
    pub fn assert_phase_invariants(&mut self) {
        let world = self.world_mut();
        let mut query = world.query::<(&JunctionId, &SignalPhases)>();
        for (id, phases) in query.iter(world) {
            assert_eq!(
                phases.masks.len(),
                phases.len(),
                "junction {id}: mask buffer out of sync"
            );
            for (index, phase) in phases.phases.iter().enumerate() {
                assert!(
                    phase.min_duration <= phase.max_duration,
                    "junction {id} phase {}: min {} > max {}",
                    index + 1,
                    phase.min_duration,
                    phase.max_duration
                );
            }
        }
    }

    /// Assert every controller refers only to phases that exist.
    pub fn assert_states_in_range(&mut self) {
        let world = self.world_mut();
        let mut query = world.query::<(&JunctionId, &SignalPhases, &JunctionSignalState)>();
        for (id, phases, signal) in query.iter(world) {
            let count = phases.len();
            assert!(
                (signal.current_phase as usize) <= count && (signal.next_phase as usize) <= count,
                "junction {id}: phase {}/{} out of {count}",
                signal.current_phase,
                signal.next_phase
            );
        }
    }
}
