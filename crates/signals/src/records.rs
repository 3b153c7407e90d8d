//! Versioned persistence records.
//!
//! Every record is a little-endian `u16` version tag followed by a bitcode
//! payload. Readers accept every version up to [`RECORD_VERSION`] and upgrade
//! older layouts on read:
//!
//! - v1: no bicycle class (no bicycle delays, no `PRIORITIZE_BICYCLE` option).
//! - v2: current layout.
//!
//! Only configuration and the controller `state`/`timer` are persisted;
//! metrics and current/next phase are rebuilt at runtime.

use bitcode::{Decode, Encode};

use crate::coordination::{GroupMember, SignalGroup};
use crate::ids::{EdgeId, GroupId, JunctionId};
use crate::junction_control::{JunctionSignalState, SignalState, TrafficSignalJunction};
use crate::phase_selector::SignalMode;
use crate::phases::{ChangeMetric, ClassDelays, EdgeGroupMask, Phase, PhaseOptions, SignalPhases};

pub const RECORD_VERSION: u16 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// Fewer bytes than the version tag.
    Truncated,
    UnsupportedVersion(u16),
    Malformed(String),
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::Truncated => write!(f, "record shorter than its version tag"),
            RecordError::UnsupportedVersion(v) => write!(f, "unsupported record version {v}"),
            RecordError::Malformed(reason) => write!(f, "malformed record: {reason}"),
        }
    }
}

impl std::error::Error for RecordError {}

/// A record with a stable field set per version tag.
pub trait VersionedRecord: Sized {
    fn encode_payload(&self) -> Vec<u8>;
    fn decode_payload(version: u16, payload: &[u8]) -> Result<Self, RecordError>;
}

pub fn write_record<R: VersionedRecord>(record: &R) -> Vec<u8> {
    let mut bytes = RECORD_VERSION.to_le_bytes().to_vec();
    bytes.extend(record.encode_payload());
    bytes
}

pub fn read_record<R: VersionedRecord>(bytes: &[u8]) -> Result<R, RecordError> {
    let Some((tag, payload)) = bytes.split_first_chunk::<2>() else {
        return Err(RecordError::Truncated);
    };
    let version = u16::from_le_bytes(*tag);
    if version == 0 || version > RECORD_VERSION {
        return Err(RecordError::UnsupportedVersion(version));
    }
    R::decode_payload(version, payload)
}

fn decode<T: bitcode::DecodeOwned>(payload: &[u8]) -> Result<T, RecordError> {
    bitcode::decode(payload).map_err(|e| RecordError::Malformed(e.to_string()))
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Configuration of one phase together with its edge group mask.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct PhaseRecord {
    pub min_duration: u16,
    pub max_duration: u16,
    pub options: u8,
    pub change_metric: ChangeMetric,
    pub edges: Vec<EdgeId>,
    pub open_delay: ClassDelays,
    pub close_delay: ClassDelays,
}

/// Per-class delays before the bicycle class existed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Encode, Decode)]
struct ClassDelaysV1 {
    car: i16,
    public_car: i16,
    track: i16,
    pedestrian: i16,
}

impl From<ClassDelaysV1> for ClassDelays {
    fn from(v1: ClassDelaysV1) -> Self {
        ClassDelays {
            car: v1.car,
            public_car: v1.public_car,
            track: v1.track,
            pedestrian: v1.pedestrian,
            bicycle: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
struct PhaseRecordV1 {
    min_duration: u16,
    max_duration: u16,
    options: u8,
    change_metric: ChangeMetric,
    edges: Vec<EdgeId>,
    open_delay: ClassDelaysV1,
    close_delay: ClassDelaysV1,
}

impl From<PhaseRecordV1> for PhaseRecord {
    fn from(v1: PhaseRecordV1) -> Self {
        PhaseRecord {
            min_duration: v1.min_duration,
            max_duration: v1.max_duration,
            options: v1.options & !PhaseOptions::PRIORITIZE_BICYCLE,
            change_metric: v1.change_metric,
            edges: v1.edges,
            open_delay: v1.open_delay.into(),
            close_delay: v1.close_delay.into(),
        }
    }
}

impl PhaseRecord {
    pub fn capture(phase: &Phase, mask: Option<&EdgeGroupMask>) -> Self {
        let mask = mask.cloned().unwrap_or_default();
        Self {
            min_duration: phase.min_duration,
            max_duration: phase.max_duration,
            options: phase.options.0,
            change_metric: phase.change_metric,
            edges: mask.edges,
            open_delay: mask.open_delay,
            close_delay: mask.close_delay,
        }
    }

    /// Rebuild the phase and its mask. Reversed bounds are reset to the
    /// repair bounds and delays are clamped to range.
    pub fn restore(&self) -> (Phase, EdgeGroupMask) {
        let mut phase = Phase {
            min_duration: self.min_duration,
            max_duration: self.max_duration,
            ..Phase::default()
        };
        phase.repair_bounds();
        phase.options = PhaseOptions(self.options & PhaseOptions::ALL);
        phase.change_metric = self.change_metric;

        let mut mask = EdgeGroupMask {
            edges: self.edges.clone(),
            open_delay: self.open_delay,
            close_delay: self.close_delay,
        };
        mask.open_delay.clamp_all();
        mask.close_delay.clamp_all();
        (phase, mask)
    }
}

impl VersionedRecord for PhaseRecord {
    fn encode_payload(&self) -> Vec<u8> {
        bitcode::encode(self)
    }

    fn decode_payload(version: u16, payload: &[u8]) -> Result<Self, RecordError> {
        match version {
            1 => decode::<PhaseRecordV1>(payload).map(Into::into),
            _ => decode(payload),
        }
    }
}

// ---------------------------------------------------------------------------
// Junction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct JunctionRecord {
    pub junction: JunctionId,
    pub mode: SignalMode,
    pub state: SignalState,
    pub timer: u16,
    pub phases: Vec<PhaseRecord>,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
struct JunctionRecordV1 {
    junction: JunctionId,
    mode: SignalMode,
    state: SignalState,
    timer: u16,
    phases: Vec<PhaseRecordV1>,
}

impl JunctionRecord {
    pub fn capture(
        junction: JunctionId,
        control: &TrafficSignalJunction,
        phases: &SignalPhases,
        signal: &JunctionSignalState,
    ) -> Self {
        Self {
            junction,
            mode: control.mode,
            state: signal.state,
            timer: signal.timer,
            phases: phases
                .phases
                .iter()
                .enumerate()
                .map(|(index, phase)| PhaseRecord::capture(phase, phases.mask(index)))
                .collect(),
        }
    }

    /// Rebuild phases and controller state. Only `state` and `timer` of the
    /// controller are restored; the phase numbers are re-selected at runtime.
    pub fn restore(&self) -> (SignalMode, SignalPhases, JunctionSignalState) {
        let (phases, masks): (Vec<Phase>, Vec<EdgeGroupMask>) =
            self.phases.iter().map(PhaseRecord::restore).unzip();
        let mut signal_phases = SignalPhases::new(phases);
        signal_phases.masks = masks;
        signal_phases.sync_masks();

        let signal = JunctionSignalState {
            state: self.state,
            timer: self.timer,
            ..Default::default()
        };
        (self.mode, signal_phases, signal)
    }
}

impl VersionedRecord for JunctionRecord {
    fn encode_payload(&self) -> Vec<u8> {
        bitcode::encode(self)
    }

    fn decode_payload(version: u16, payload: &[u8]) -> Result<Self, RecordError> {
        match version {
            1 => {
                let v1: JunctionRecordV1 = decode(payload)?;
                Ok(JunctionRecord {
                    junction: v1.junction,
                    mode: v1.mode,
                    state: v1.state,
                    timer: v1.timer,
                    phases: v1.phases.into_iter().map(Into::into).collect(),
                })
            }
            _ => decode(payload),
        }
    }
}

// ---------------------------------------------------------------------------
// Group and member
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct MemberRecord {
    pub junction: JunctionId,
    pub group_index: u16,
    pub is_leader: bool,
    pub distance_to_leader: f32,
    pub phase_offset: i32,
    pub signal_delay: i32,
}

impl MemberRecord {
    pub fn capture(member: &GroupMember) -> Self {
        Self {
            junction: member.junction,
            group_index: member.group_index,
            is_leader: member.is_leader,
            distance_to_leader: member.distance_to_leader,
            phase_offset: member.phase_offset,
            signal_delay: member.signal_delay,
        }
    }

    pub fn restore(&self) -> GroupMember {
        GroupMember {
            junction: self.junction,
            group_index: self.group_index,
            is_leader: self.is_leader,
            distance_to_leader: self.distance_to_leader,
            phase_offset: self.phase_offset,
            signal_delay: self.signal_delay,
        }
    }
}

impl VersionedRecord for MemberRecord {
    fn encode_payload(&self) -> Vec<u8> {
        bitcode::encode(self)
    }

    fn decode_payload(_version: u16, payload: &[u8]) -> Result<Self, RecordError> {
        decode(payload)
    }
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct GroupRecord {
    pub id: GroupId,
    pub is_coordinated: bool,
    pub green_wave_enabled: bool,
    pub green_wave_speed: f32,
    pub green_wave_offset: f32,
    pub max_coordination_distance: f32,
    pub cycle_length: u16,
    pub cycle_timer: u16,
    pub use_enhanced_offsets: bool,
    pub main_phase: u8,
    /// Each entry is a versioned `MemberRecord`.
    pub members: Vec<Vec<u8>>,
}

impl GroupRecord {
    pub fn capture(group: &SignalGroup) -> Self {
        Self {
            id: group.id,
            is_coordinated: group.is_coordinated,
            green_wave_enabled: group.green_wave_enabled,
            green_wave_speed: group.green_wave_speed,
            green_wave_offset: group.green_wave_offset,
            max_coordination_distance: group.max_coordination_distance,
            cycle_length: group.cycle_length,
            cycle_timer: group.cycle_timer,
            use_enhanced_offsets: group.use_enhanced_offsets,
            main_phase: group.main_phase,
            members: group
                .members
                .iter()
                .map(|m| write_record(&MemberRecord::capture(m)))
                .collect(),
        }
    }

    /// Rebuild the group. Members that fail to decode are skipped; numeric
    /// ranges are left for validation to repair.
    pub fn restore(&self) -> SignalGroup {
        let mut group = SignalGroup::new(self.id);
        group.is_coordinated = self.is_coordinated;
        group.green_wave_enabled = self.green_wave_enabled;
        group.green_wave_speed = self.green_wave_speed;
        group.green_wave_offset = self.green_wave_offset;
        group.max_coordination_distance = self.max_coordination_distance;
        group.cycle_length = self.cycle_length;
        group.cycle_timer = self.cycle_timer;
        group.use_enhanced_offsets = self.use_enhanced_offsets;
        group.main_phase = self.main_phase;
        group.members = self
            .members
            .iter()
            .filter_map(|bytes| read_record::<MemberRecord>(bytes).ok())
            .map(|record| record.restore())
            .collect();
        group
    }
}

impl VersionedRecord for GroupRecord {
    fn encode_payload(&self) -> Vec<u8> {
        bitcode::encode(self)
    }

    fn decode_payload(_version: u16, payload: &[u8]) -> Result<Self, RecordError> {
        decode(payload)
    }
}
