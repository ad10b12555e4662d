//! Truth matcher: track reference → truth categories → 4-bit code

use tracing::trace;
use crate::error::{Error, Result};
use crate::types::{Event, TrackRef, TruthAssociationMap, TruthCategories, TruthMatchCode};

/// Resolves tracks against the association map stored under one label
#[derive(Debug, Clone)]
pub struct TruthMatcher {
    label: String,
}

/// Truth map of one event, bound to the label it came from
#[derive(Debug, Clone, Copy)]
pub struct BoundTruth<'e> {
    label: &'e str,
    map: &'e TruthAssociationMap,
}

impl TruthMatcher {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }

    /// Fetch this event's association map; absent is fatal for the event
    pub fn bind<'e>(&'e self, event: &'e Event) -> Result<BoundTruth<'e>> {
        let map = event
            .truth
            .get(&self.label)
            .ok_or_else(|| Error::missing_truth_map(&self.label))?;
        Ok(BoundTruth { label: &self.label, map })
    }
}

impl<'e> BoundTruth<'e> {
    /// Categories recorded for `track`; an unassociated track has none set
    pub fn categories(&self, track: TrackRef) -> TruthCategories {
        match self.map.get(track) {
            Some(categories) => *categories,
            None => {
                trace!(map = self.label, %track, "track not associated");
                TruthCategories::default()
            }
        }
    }

    /// Categories and their packed code
    pub fn classify(&self, track: TrackRef) -> (TruthCategories, TruthMatchCode) {
        let categories = self.categories(track);
        (categories, categories.code())
    }
}
