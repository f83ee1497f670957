//! Two-bit-per-position state packing.
//!
//! Position `i` occupies bits `(2i) mod 8` and `(2i) mod 8 + 1` of byte
//! `2i / 8`, least significant bits first, so byte `k` holds positions
//! `4k..4k+3`.

const BITS_PER_ITEM: usize = 2;
const STATE_MASK: u8 = 0b11;

/// Classification of one catalog position as stored in packed data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ItemState {
    #[default]
    Unclassified = 0,
    Seen = 1,
    NotSeen = 2,
}

impl ItemState {
    /// Map a raw 2-bit value. The reserved value 3 reads as unclassified.
    pub fn from_bits(bits: u8) -> Self {
        match bits & STATE_MASK {
            1 => ItemState::Seen,
            2 => ItemState::NotSeen,
            _ => ItemState::Unclassified,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct PackedStates {
    bytes: Vec<u8>,
}

impl PackedStates {
    /// Zeroed storage for `positions` entries: `ceil(positions * 2 / 8)` bytes.
    pub fn with_positions(positions: usize) -> Self {
        PackedStates {
            bytes: vec![0; (positions * BITS_PER_ITEM).div_ceil(8)],
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        PackedStates { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of positions the bytes can describe.
    pub fn capacity(&self) -> usize {
        self.bytes.len() * 8 / BITS_PER_ITEM
    }

    fn locate(position: usize) -> (usize, u32) {
        let bit = position * BITS_PER_ITEM;
        (bit / 8, (bit % 8) as u32)
    }

    /// Returns false when `position` lies beyond the packed bytes.
    pub fn set(&mut self, position: usize, state: ItemState) -> bool {
        let (byte, shift) = Self::locate(position);
        let Some(slot) = self.bytes.get_mut(byte) else {
            return false;
        };
        *slot = (*slot & !(STATE_MASK << shift)) | (state.bits() << shift);
        true
    }

    /// Raw 2-bit value at `position`; 0 beyond the packed bytes.
    pub fn raw(&self, position: usize) -> u8 {
        let (byte, shift) = Self::locate(position);
        self.bytes
            .get(byte)
            .map_or(0, |value| (value >> shift) & STATE_MASK)
    }

    pub fn get(&self, position: usize) -> ItemState {
        ItemState::from_bits(self.raw(position))
    }
}
