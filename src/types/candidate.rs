//! Reconstructed objects that can become table rows
//!
//! Every candidate kind exposes a fixed set of named numeric features. The
//! selector and the classifier models resolve feature names against that set
//! once, at construction, so a per-event lookup can never miss.

use serde::{Deserialize, Serialize};
use crate::types::Event;

/// Common surface of anything a pipeline can tabulate
pub trait Candidate: Clone + std::fmt::Debug {
    /// Collection kind, used in fetch errors and logs
    const KIND: &'static str;

    /// Names accepted by [`Candidate::feature`]
    fn feature_names() -> &'static [&'static str];

    /// Numeric feature by name, `None` for names outside [`Candidate::feature_names`]
    fn feature(&self, name: &str) -> Option<f64>;

    /// Borrow this kind's collection stored under `label`
    fn collection<'e>(event: &'e Event, label: &str) -> Option<&'e [Self]>;

    /// Is `name` a known feature of this kind?
    fn knows_feature(name: &str) -> bool {
        Self::feature_names().iter().any(|f| *f == name)
    }
}

// =============================================================================
// 3D CALORIMETER CLUSTER
// =============================================================================

/// 3D calorimeter cluster with its shower-shape variables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cluster3d {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub energy: f64,
    /// Hadronic over electromagnetic energy
    pub hoe: f64,
    pub showerlength: f64,
    pub coreshowerlength: f64,
    pub firstlayer: f64,
    pub maxlayer: f64,
    pub seetot: f64,
    pub seemax: f64,
    pub spptot: f64,
    pub sppmax: f64,
    pub szz: f64,
    pub srrtot: f64,
    pub srrmax: f64,
    pub srrmean: f64,
    /// Energy fraction in the most energetic layer
    pub emaxe: f64,
    pub meanz: f64,
    pub layer10: f64,
    pub layer50: f64,
    pub layer90: f64,
    pub ntc67: f64,
    pub ntc90: f64,
}

const CLUSTER_3D_FEATURES: &[&str] = &[
    "pt", "eta", "abseta", "phi", "energy", "hoe",
    "showerlength", "coreshowerlength", "firstlayer", "maxlayer",
    "seetot", "seemax", "spptot", "sppmax", "szz",
    "srrtot", "srrmax", "srrmean", "emaxe", "meanz",
    "layer10", "layer50", "layer90", "ntc67", "ntc90",
];

impl Candidate for Cluster3d {
    const KIND: &'static str = "cluster_3d";

    fn feature_names() -> &'static [&'static str] {
        CLUSTER_3D_FEATURES
    }

    fn feature(&self, name: &str) -> Option<f64> {
        let value = match name {
            "pt" => self.pt,
            "eta" => self.eta,
            "abseta" => self.eta.abs(),
            "phi" => self.phi,
            "energy" => self.energy,
            "hoe" => self.hoe,
            "showerlength" => self.showerlength,
            "coreshowerlength" => self.coreshowerlength,
            "firstlayer" => self.firstlayer,
            "maxlayer" => self.maxlayer,
            "seetot" => self.seetot,
            "seemax" => self.seemax,
            "spptot" => self.spptot,
            "sppmax" => self.sppmax,
            "szz" => self.szz,
            "srrtot" => self.srrtot,
            "srrmax" => self.srrmax,
            "srrmean" => self.srrmean,
            "emaxe" => self.emaxe,
            "meanz" => self.meanz,
            "layer10" => self.layer10,
            "layer50" => self.layer50,
            "layer90" => self.layer90,
            "ntc67" => self.ntc67,
            "ntc90" => self.ntc90,
            _ => return None,
        };
        Some(value)
    }

    fn collection<'e>(event: &'e Event, label: &str) -> Option<&'e [Self]> {
        event.clusters_3d.get(label).map(Vec::as_slice)
    }
}

// =============================================================================
// PARTICLE-FLOW CLUSTER
// =============================================================================

/// Particle-flow cluster carrying the packed firmware word
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PfCluster {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    /// Packed status word, see [`crate::core::digi`]
    pub digi_word: u64,
}

const PF_CLUSTER_FEATURES: &[&str] = &["pt", "eta", "abseta", "phi"];

impl Candidate for PfCluster {
    const KIND: &'static str = "pf_cluster";

    fn feature_names() -> &'static [&'static str] {
        PF_CLUSTER_FEATURES
    }

    fn feature(&self, name: &str) -> Option<f64> {
        match name {
            "pt" => Some(self.pt),
            "eta" => Some(self.eta),
            "abseta" => Some(self.eta.abs()),
            "phi" => Some(self.phi),
            _ => None,
        }
    }

    fn collection<'e>(event: &'e Event, label: &str) -> Option<&'e [Self]> {
        event.pf_clusters.get(label).map(Vec::as_slice)
    }
}

// =============================================================================
// DECODED TRACK
// =============================================================================

/// Opaque reference to the underlying track, the key of the truth map
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackRef(pub u64);

impl std::fmt::Display for TrackRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "track#{}", self.0)
    }
}

/// Track after firmware decoding, still pointing at its source track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodedTrack {
    pub pt: f64,
    pub eta: f64,
    pub phi: f64,
    pub z0: f64,
    pub chi2: f64,
    pub track: TrackRef,
}

const DECODED_TRACK_FEATURES: &[&str] = &["pt", "eta", "abseta", "phi", "z0", "chi2"];

impl Candidate for DecodedTrack {
    const KIND: &'static str = "decoded_track";

    fn feature_names() -> &'static [&'static str] {
        DECODED_TRACK_FEATURES
    }

    fn feature(&self, name: &str) -> Option<f64> {
        match name {
            "pt" => Some(self.pt),
            "eta" => Some(self.eta),
            "abseta" => Some(self.eta.abs()),
            "phi" => Some(self.phi),
            "z0" => Some(self.z0),
            "chi2" => Some(self.chi2),
            _ => None,
        }
    }

    fn collection<'e>(event: &'e Event, label: &str) -> Option<&'e [Self]> {
        event.tracks.get(label).map(Vec::as_slice)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listed_feature_resolves() {
        let cl = Cluster3d::default();
        for name in Cluster3d::feature_names() {
            assert!(cl.feature(name).is_some(), "{} should resolve", name);
        }
        let pf = PfCluster::default();
        for name in PfCluster::feature_names() {
            assert!(pf.feature(name).is_some(), "{} should resolve", name);
        }
        let tk = DecodedTrack::default();
        for name in DecodedTrack::feature_names() {
            assert!(tk.feature(name).is_some(), "{} should resolve", name);
        }
    }

    #[test]
    fn test_unknown_feature_is_none() {
        let pf = PfCluster::default();
        assert_eq!(pf.feature("digi_word"), None);
        assert!(!PfCluster::knows_feature("hoe"));
        assert!(Cluster3d::knows_feature("hoe"));
    }

    #[test]
    fn test_abseta_is_derived() {
        let tk = DecodedTrack { eta: -2.1, ..Default::default() };
        assert_eq!(tk.feature("abseta"), Some(2.1));
    }

    #[test]
    fn test_track_ref_is_transparent_in_json() {
        let tk = DecodedTrack { track: TrackRef(42), ..Default::default() };
        let json = serde_json::to_value(&tk).unwrap();
        assert_eq!(json["track"], 42);
    }
}
