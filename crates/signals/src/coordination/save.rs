use bitcode::{Decode, Encode};

use crate::records::{read_record, write_record, GroupRecord};
use crate::Saveable;

use super::SignalGroupRegistry;

#[derive(Encode, Decode, Default)]
struct SignalGroupRegistrySave {
    next_id: u32,
    /// Versioned `GroupRecord`s.
    groups: Vec<Vec<u8>>,
}

impl Saveable for SignalGroupRegistry {
    const SAVE_KEY: &'static str = "signal_groups";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        if self.groups.is_empty() {
            return None;
        }
        let save = SignalGroupRegistrySave {
            next_id: self.next_id,
            groups: self
                .groups
                .values()
                .map(|group| write_record(&GroupRecord::capture(group)))
                .collect(),
        };
        Some(bitcode::encode(&save))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        let save: SignalGroupRegistrySave = crate::decode_or_warn(Self::SAVE_KEY, bytes);
        let mut registry = SignalGroupRegistry {
            next_id: save.next_id,
            ..Default::default()
        };
        for bytes in &save.groups {
            match read_record::<GroupRecord>(bytes) {
                Ok(record) => {
                    let group = record.restore();
                    registry.next_id = registry.next_id.max(group.id.0.wrapping_add(1));
                    registry.groups.insert(group.id, group);
                }
                Err(e) => {
                    bevy::log::warn!("{}: skipping unreadable group record: {}", Self::SAVE_KEY, e);
                }
            }
        }
        registry.rebuild_membership();
        registry
    }
}
