//! Track-to-truth association records and the packed match code

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::types::TrackRef;

/// The four truth categories of one track, computed independently upstream.
///
/// Nothing here assumes they are mutually exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TruthCategories {
    pub genuine: bool,
    pub loosely_genuine: bool,
    pub unknown: bool,
    pub combinatoric: bool,
}

impl TruthCategories {
    pub fn new(genuine: bool, loosely_genuine: bool, unknown: bool, combinatoric: bool) -> Self {
        Self { genuine, loosely_genuine, unknown, combinatoric }
    }

    /// Pack into the 4-bit code: bit0 combinatoric, bit1 unknown,
    /// bit2 loosely genuine, bit3 genuine
    pub fn code(&self) -> TruthMatchCode {
        TruthMatchCode(
            (self.combinatoric as u8)
                | (self.unknown as u8) << 1
                | (self.loosely_genuine as u8) << 2
                | (self.genuine as u8) << 3,
        )
    }
}

/// 4-bit packed truth category code (0..=15)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TruthMatchCode(u8);

impl TruthMatchCode {
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Unpack back into the four categories
    pub fn categories(&self) -> TruthCategories {
        TruthCategories {
            combinatoric: self.0 & 0x1 != 0,
            unknown: self.0 & 0x2 != 0,
            loosely_genuine: self.0 & 0x4 != 0,
            genuine: self.0 & 0x8 != 0,
        }
    }
}

/// One association record as it appears on the wire
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TruthEntry {
    pub track: TrackRef,
    #[serde(flatten)]
    pub categories: TruthCategories,
}

/// External truth association, keyed by track reference.
///
/// On the wire it is a list of entries; a track listed twice is rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TruthEntry>", into = "Vec<TruthEntry>")]
pub struct TruthAssociationMap {
    records: BTreeMap<TrackRef, TruthCategories>,
}

impl TruthAssociationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `track`
    pub fn insert(&mut self, track: TrackRef, categories: TruthCategories) {
        self.records.insert(track, categories);
    }

    pub fn get(&self, track: TrackRef) -> Option<&TruthCategories> {
        self.records.get(&track)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TryFrom<Vec<TruthEntry>> for TruthAssociationMap {
    type Error = String;

    fn try_from(entries: Vec<TruthEntry>) -> Result<Self, Self::Error> {
        let mut records = BTreeMap::new();
        for entry in entries {
            if records.insert(entry.track, entry.categories).is_some() {
                return Err(format!("{} listed twice in truth association", entry.track));
            }
        }
        Ok(Self { records })
    }
}

impl From<TruthAssociationMap> for Vec<TruthEntry> {
    fn from(map: TruthAssociationMap) -> Self {
        map.records
            .into_iter()
            .map(|(track, categories)| TruthEntry { track, categories })
            .collect()
    }
}

impl FromIterator<(TrackRef, TruthCategories)> for TruthAssociationMap {
    fn from_iter<I: IntoIterator<Item = (TrackRef, TruthCategories)>>(iter: I) -> Self {
        Self { records: iter.into_iter().collect() }
    }
}

// =============================================================================
// TESTS
// =============================================================================
