//! Configuration: TOML description of the tables to produce
//!
//! Read once at start-up. [`Config::build`] compiles every cut and prepares
//! every model, so an invalid configuration never reaches event processing.

use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::core::ProducerSet;
use crate::error::Result;

/// Weighted-sum model parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Feature names, in weight order
    pub variables: Vec<String>,
    pub weights: Vec<f64>,
    pub bias: f64,
}

/// One binary ID classifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinaryClassifierConfig {
    /// Response function (`linear`, `logistic`, `tanh`); empty disables
    pub method: String,
    pub variables: Vec<String>,
    pub weights: Vec<f64>,
    pub bias: f64,
    /// Pass when score > wp
    pub wp: f64,
    /// Cut a candidate must pass before being scored
    pub preselection: String,
}

impl BinaryClassifierConfig {
    /// Model part of this classifier
    pub fn model(&self) -> ModelConfig {
        ModelConfig {
            variables: self.variables.clone(),
            weights: self.weights.clone(),
            bias: self.bias,
        }
    }
}

/// EG identification: one model per |eta| bin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EgIdConfig {
    pub method: String,
    /// Ascending bin edges; `models.len() == eta_bins.len() - 1`
    pub eta_bins: Vec<f64>,
    pub models: Vec<ModelConfig>,
}

impl Default for EgIdConfig {
    fn default() -> Self {
        Self {
            method: "tanh".to_string(),
            eta_bins: vec![1.5, 3.0],
            models: vec![ModelConfig::default()],
        }
    }
}

/// Multi-class PID: one logit model per category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiClassConfig {
    pub pu: ModelConfig,
    pub pion: ModelConfig,
    pub em: ModelConfig,
}

/// Classification table over 3D clusters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterIdConfig {
    /// Output table name
    pub name: String,
    /// Input collection label
    pub src: String,
    pub cut: String,
    pub extension: bool,
    /// Written to the `pf_pu_id_*` columns
    pub em_vs_pu_id: BinaryClassifierConfig,
    /// Written to the `pf_em_id_*` columns
    pub em_vs_pion_id: BinaryClassifierConfig,
    pub eg_identification: EgIdConfig,
    pub multi_class_pid: MultiClassConfig,
}

impl Default for ClusterIdConfig {
    fn default() -> Self {
        Self {
            name: "HGC3DCl".to_string(),
            src: "hgc3d_clusters".to_string(),
            cut: String::new(),
            extension: true,
            em_vs_pu_id: BinaryClassifierConfig::default(),
            em_vs_pion_id: BinaryClassifierConfig::default(),
            eg_identification: EgIdConfig::default(),
            multi_class_pid: MultiClassConfig::default(),
        }
    }
}

/// Digi flag table over particle-flow clusters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigiFlagsConfig {
    pub name: String,
    pub src: String,
    pub cut: String,
    pub extension: bool,
}

impl Default for DigiFlagsConfig {
    fn default() -> Self {
        Self {
            name: "PFClusterDigi".to_string(),
            src: "pf_clusters".to_string(),
            cut: String::new(),
            extension: true,
        }
    }
}

/// Truth-match table over decoded tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackTruthConfig {
    pub name: String,
    pub src: String,
    /// Label of the track-to-truth association map
    pub truth_src: String,
    pub cut: String,
    pub extension: bool,
}

impl Default for TrackTruthConfig {
    fn default() -> Self {
        Self {
            name: "DecTkTruth".to_string(),
            src: "decoded_tracks".to_string(),
            truth_src: "tt_track_truth".to_string(),
            cut: String::new(),
            extension: true,
        }
    }
}

/// One configured table producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProducerConfig {
    ClusterId(ClusterIdConfig),
    DigiFlags(DigiFlagsConfig),
    TrackTruth(TrackTruthConfig),
}

impl ProducerConfig {
    /// Output table name
    pub fn name(&self) -> &str {
        match self {
            ProducerConfig::ClusterId(c) => &c.name,
            ProducerConfig::DigiFlags(c) => &c.name,
            ProducerConfig::TrackTruth(c) => &c.name,
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tables: Vec<ProducerConfig>,
}

impl Default for Config {
    /// One table of each kind, binary classifiers disabled
    fn default() -> Self {
        Self {
            tables: vec![
                ProducerConfig::ClusterId(ClusterIdConfig::default()),
                ProducerConfig::DigiFlags(DigiFlagsConfig::default()),
                ProducerConfig::TrackTruth(TrackTruthConfig::default()),
            ],
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Compile cuts and prepare models for every table
    pub fn build(&self) -> Result<ProducerSet> {
        ProducerSet::from_config(self)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tagged_tables() {
        let toml = r#"
            [[tables]]
            kind = "digi_flags"
            name = "Digi"
            src = "pf"

            [[tables]]
            kind = "cluster_id"
            cut = "pt > 2"

            [tables.em_vs_pu_id]
            method = "logistic"
            variables = ["hoe"]
            weights = [-1.5]
            wp = 0.4
        "#;
        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.tables.len(), 2);
        assert_eq!(config.tables[0].name(), "Digi");
        match &config.tables[1] {
            ProducerConfig::ClusterId(c) => {
                assert_eq!(c.name, "HGC3DCl");
                assert_eq!(c.cut, "pt > 2");
                assert!(c.extension);
                assert_eq!(c.em_vs_pu_id.method, "logistic");
                assert_eq!(c.em_vs_pu_id.wp, 0.4);
                assert!(c.em_vs_pion_id.method.is_empty());
            }
            other => panic!("expected cluster_id, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let toml = r#"
            [[tables]]
            kind = "jets"
        "#;
        assert!(Config::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string(&config).unwrap();
        assert_eq!(Config::from_toml_str(&text).unwrap(), config);
    }
}
