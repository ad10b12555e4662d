//! Per-event input snapshot

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::types::{Cluster3d, DecodedTrack, PfCluster, TruthAssociationMap};

/// Everything one event offers to the producers, keyed by input label
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    /// Event number, carried through to the output
    pub id: u64,
    pub clusters_3d: BTreeMap<String, Vec<Cluster3d>>,
    pub pf_clusters: BTreeMap<String, Vec<PfCluster>>,
    pub tracks: BTreeMap<String, Vec<DecodedTrack>>,
    /// Track-to-truth association maps
    pub truth: BTreeMap<String, TruthAssociationMap>,
}

impl Event {
    /// Empty event with the given number
    pub fn new(id: u64) -> Self {
        Self { id, ..Default::default() }
    }

    pub fn with_clusters_3d(mut self, label: &str, clusters: Vec<Cluster3d>) -> Self {
        self.clusters_3d.insert(label.to_string(), clusters);
        self
    }

    pub fn with_pf_clusters(mut self, label: &str, clusters: Vec<PfCluster>) -> Self {
        self.pf_clusters.insert(label.to_string(), clusters);
        self
    }

    pub fn with_tracks(mut self, label: &str, tracks: Vec<DecodedTrack>) -> Self {
        self.tracks.insert(label.to_string(), tracks);
        self
    }

    pub fn with_truth(mut self, label: &str, truth: TruthAssociationMap) -> Self {
        self.truth.insert(label.to_string(), truth);
        self
    }
}
