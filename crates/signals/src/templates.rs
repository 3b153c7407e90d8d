//! Named timing presets that replace a junction's phase list in one step.

use serde::{Deserialize, Serialize};

use crate::phase_selector::SignalMode;
use crate::phases::{ChangeMetric, Phase, PhaseOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimingTemplate {
    /// Two alternating phases, demand-responsive.
    TwoPhase,
    /// One phase per approach, demand-responsive.
    FourPhaseSplit,
    /// Through phases each followed by a linked protected-turn phase.
    ProtectedTurns,
    /// Two vehicle phases plus an exclusive pedestrian phase.
    PedestrianScramble,
    /// Fixed-timed main/side split for coordinated corridors.
    FixedCorridor,
}

impl TimingTemplate {
    pub const ALL: [TimingTemplate; 5] = [
        TimingTemplate::TwoPhase,
        TimingTemplate::FourPhaseSplit,
        TimingTemplate::ProtectedTurns,
        TimingTemplate::PedestrianScramble,
        TimingTemplate::FixedCorridor,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TimingTemplate::TwoPhase => "two_phase",
            TimingTemplate::FourPhaseSplit => "four_phase_split",
            TimingTemplate::ProtectedTurns => "protected_turns",
            TimingTemplate::PedestrianScramble => "pedestrian_scramble",
            TimingTemplate::FixedCorridor => "fixed_corridor",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn mode(self) -> SignalMode {
        match self {
            TimingTemplate::FixedCorridor => SignalMode::FixedTimed,
            _ => SignalMode::Dynamic,
        }
    }

    pub fn phases(self) -> Vec<Phase> {
        let transit = PhaseOptions::PRIORITIZE_TRACK | PhaseOptions::PRIORITIZE_PUBLIC_CAR;
        match self {
            TimingTemplate::TwoPhase => vec![
                Phase::with_durations(5, 30).with_options(transit),
                Phase::with_durations(5, 30).with_options(transit),
            ],
            TimingTemplate::FourPhaseSplit => (0..4)
                .map(|_| Phase::with_durations(4, 20).with_options(transit))
                .collect(),
            TimingTemplate::ProtectedTurns => vec![
                Phase::with_durations(6, 30)
                    .with_options(transit | PhaseOptions::LINKED_WITH_NEXT),
                Phase::with_durations(2, 10),
                Phase::with_durations(6, 30)
                    .with_options(transit | PhaseOptions::LINKED_WITH_NEXT),
                Phase::with_durations(2, 10),
            ],
            TimingTemplate::PedestrianScramble => vec![
                Phase::with_durations(5, 25).with_options(transit),
                Phase::with_durations(5, 25).with_options(transit),
                Phase::with_durations(4, 12).with_options(
                    PhaseOptions::PRIORITIZE_PEDESTRIAN | PhaseOptions::PRIORITIZE_BICYCLE,
                ),
            ],
            TimingTemplate::FixedCorridor => vec![
                Phase::with_durations(20, 20),
                Phase::with_durations(10, 10),
                Phase::with_durations(0, 6).with_metric(ChangeMetric::FirstWait),
            ],
        }
    }
}
