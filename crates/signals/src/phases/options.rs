use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Per-phase option bits.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode,
)]
pub struct PhaseOptions(pub u8);

impl PhaseOptions {
    pub const PRIORITIZE_TRACK: u8 = 1 << 0;
    pub const PRIORITIZE_PUBLIC_CAR: u8 = 1 << 1;
    pub const PRIORITIZE_PEDESTRIAN: u8 = 1 << 2;
    pub const LINKED_WITH_NEXT: u8 = 1 << 3;
    pub const END_PREMATURELY: u8 = 1 << 4;
    pub const PRIORITIZE_BICYCLE: u8 = 1 << 5;

    /// All bits that carry meaning; anything else is dropped on repair.
    pub const ALL: u8 = Self::PRIORITIZE_TRACK
        | Self::PRIORITIZE_PUBLIC_CAR
        | Self::PRIORITIZE_PEDESTRIAN
        | Self::LINKED_WITH_NEXT
        | Self::END_PREMATURELY
        | Self::PRIORITIZE_BICYCLE;

    #[inline]
    pub fn contains(self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    #[inline]
    pub fn insert(&mut self, bit: u8) {
        self.0 |= bit;
    }

    #[inline]
    pub fn remove(&mut self, bit: u8) {
        self.0 &= !bit;
    }

    pub fn set(&mut self, bit: u8, enabled: bool) {
        if enabled {
            self.insert(bit);
        } else {
            self.remove(bit);
        }
    }

    #[inline]
    pub fn linked_with_next(self) -> bool {
        self.contains(Self::LINKED_WITH_NEXT)
    }

    #[inline]
    pub fn end_prematurely(self) -> bool {
        self.contains(Self::END_PREMATURELY)
    }
}
