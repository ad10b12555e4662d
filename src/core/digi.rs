//! Digi word decoder: packed 64-bit cluster status into flags
//!
//! Layout (bit 0 = least significant):
//!
//! | field | bits  | content                                         |
//! |-------|-------|-------------------------------------------------|
//! | iso   | 38-39 | bit0 standalone iso WP, bit1 loose-track iso WP |
//! | shape | 51-52 | bit0 standalone shape WP, bit1 loose-track WP   |
//! | brems | 53-54 | bremsstrahlung category, passed through         |
//!
//! Bits outside these fields are ignored, so every word decodes.

use serde::{Deserialize, Serialize};

/// Position of one sub-field inside the packed word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    pub name: &'static str,
    /// Offset of the lowest bit
    pub offset: u32,
    /// Width in bits (1..=32)
    pub width: u32,
}

impl BitField {
    pub const fn new(name: &'static str, offset: u32, width: u32) -> Self {
        Self { name, offset, width }
    }

    /// Value of this field in `word`
    pub const fn extract(&self, word: u64) -> u32 {
        ((word >> self.offset) & ((1u64 << self.width) - 1)) as u32
    }

    /// Bits covered by this field
    pub const fn mask(&self) -> u64 {
        ((1u64 << self.width) - 1) << self.offset
    }
}

pub const ISO_FLAGS: BitField = BitField::new("iso", 38, 2);
pub const SHAPE_FLAGS: BitField = BitField::new("shape", 51, 2);
pub const BREMS: BitField = BitField::new("brems", 53, 2);

/// Every field the decoder reads, lowest offset first
pub const DIGI_LAYOUT: [BitField; 3] = [ISO_FLAGS, SHAPE_FLAGS, BREMS];

const STANDALONE_BIT: u32 = 0x1;
const LOOSE_TK_BIT: u32 = 0x2;

/// Decoded view of one digi word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigiFlags {
    pub iso_flags: u32,
    pub shape_flags: u32,
    pub brems: u32,
}

impl DigiFlags {
    /// Standalone isolation working point
    pub fn passes_iso(&self) -> bool {
        self.iso_flags & STANDALONE_BIT != 0
    }

    /// Loose track-matched isolation working point
    pub fn passes_loose_tk_iso(&self) -> bool {
        self.iso_flags & LOOSE_TK_BIT != 0
    }

    /// Standalone shower-shape working point
    pub fn passes_ss(&self) -> bool {
        self.shape_flags & STANDALONE_BIT != 0
    }

    /// Loose track-matched shower-shape working point
    pub fn passes_loose_tk_ss(&self) -> bool {
        self.shape_flags & LOOSE_TK_BIT != 0
    }

    pub fn standalone_working_point(&self) -> bool {
        self.passes_iso() && self.passes_ss()
    }

    pub fn loose_track_working_point(&self) -> bool {
        self.passes_loose_tk_iso() && self.passes_loose_tk_ss()
    }
}

/// Decode a digi word; pure and total
pub fn decode(word: u64) -> DigiFlags {
    DigiFlags {
        iso_flags: ISO_FLAGS.extract(word),
        shape_flags: SHAPE_FLAGS.extract(word),
        brems: BREMS.extract(word),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_iso_bits() {
        let flags = decode(0xC0_0000_0000);
        assert_eq!(flags.iso_flags, 3);
        assert!(flags.passes_iso());
        assert!(flags.passes_loose_tk_iso());
        assert_eq!(flags.shape_flags, 0);
        assert!(!flags.standalone_working_point());
    }

    #[test]
    fn test_standalone_working_point() {
        let word = (1u64 << 38) | (1u64 << 51);
        let flags = decode(word);
        assert!(flags.standalone_working_point());
        assert!(!flags.loose_track_working_point());
    }

    #[test]
    fn test_loose_track_working_point() {
        let word = (1u64 << 39) | (1u64 << 52);
        let flags = decode(word);
        assert!(!flags.standalone_working_point());
        assert!(flags.loose_track_working_point());
    }

    #[test]
    fn test_brems_passthrough() {
        assert_eq!(decode(0b10 << 53).brems, 2);
        assert_eq!(decode(u64::MAX).brems, 3);
    }

    #[test]
    fn test_layout_fields_do_not_overlap() {
        for (i, a) in DIGI_LAYOUT.iter().enumerate() {
            for b in DIGI_LAYOUT.iter().skip(i + 1) {
                assert_eq!(a.mask() & b.mask(), 0, "{} overlaps {}", a.name, b.name);
            }
        }
    }

    proptest! {
        #[test]
        fn property_unrelated_bits_are_ignored(word in any::<u64>()) {
            let used = DIGI_LAYOUT.iter().fold(0u64, |acc, f| acc | f.mask());
            prop_assert_eq!(decode(word), decode(word & used));
        }

        #[test]
        fn property_working_points_follow_flags(word in any::<u64>()) {
            let flags = decode(word);
            prop_assert!(flags.iso_flags <= 3 && flags.shape_flags <= 3 && flags.brems <= 3);
            prop_assert_eq!(
                flags.standalone_working_point(),
                (word >> 38) & 1 == 1 && (word >> 51) & 1 == 1
            );
            prop_assert_eq!(
                flags.loose_track_working_point(),
                (word >> 39) & 1 == 1 && (word >> 52) & 1 == 1
            );
        }
    }
}
