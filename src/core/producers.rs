//! Column producers for the three table kinds
//!
//! - [`ClusterIdProducer`]: classifier bank over 3D clusters
//! - [`DigiFlagProducer`]: digi word flags of particle-flow clusters
//! - [`TrackTruthProducer`]: truth categories of decoded tracks

use std::sync::Arc;
use crate::config::{ClusterIdConfig, DigiFlagsConfig, TrackTruthConfig};
use crate::core::classifier::{ClassifierBank, EgIdentification, MultiClassClassifier, NamedBinary};
use crate::core::pipeline::{ColumnProducer, Pipeline};
use crate::core::truth_matcher::{BoundTruth, TruthMatcher};
use crate::core::{digi, Selector};
use crate::error::Result;
use crate::types::{Cluster3d, ColumnKind, ColumnSpec, DecodedTrack, Event, PfCluster, Value};

/// Output prefix of the EM vs pileup classifier
pub const PU_ID_PREFIX: &str = "pf_pu_id";
/// Output prefix of the EM vs pion classifier
pub const EM_ID_PREFIX: &str = "pf_em_id";

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Classifier scores for 3D clusters
#[derive(Debug)]
pub struct ClusterIdProducer {
    bank: Arc<ClassifierBank<Cluster3d>>,
    columns: Vec<ColumnSpec>,
}

impl ClusterIdProducer {
    pub fn new(bank: Arc<ClassifierBank<Cluster3d>>) -> Self {
        let names: Vec<&str> = bank.binaries().iter().map(|b| b.name.as_str()).collect();
        let mut columns = Vec::with_capacity(2 * names.len() + 5);

        for name in &names {
            columns.push(ColumnSpec::new(
                format!("{}_score", name),
                ColumnKind::Float,
                format!("{} classifier score", name),
            ));
        }
        columns.push(ColumnSpec::new("eg_em_id_score", ColumnKind::Float, "EG identification score"));
        for name in &names {
            columns.push(ColumnSpec::new(
                format!("{}_pass", name),
                ColumnKind::Bool,
                format!("{} working point passed", name),
            ));
        }
        columns.extend([
            ColumnSpec::new("multi_class_max_score", ColumnKind::Float, "largest multi-class score"),
            ColumnSpec::new("multi_class_pu_id_score", ColumnKind::Float, "multi-class pileup score"),
            ColumnSpec::new("multi_class_pion_id_score", ColumnKind::Float, "multi-class pion score"),
            ColumnSpec::new("multi_class_em_id_score", ColumnKind::Float, "multi-class EM score"),
        ]);

        Self { bank, columns }
    }

    /// Prepare the bank and wrap it in a pipeline
    pub fn pipeline(config: &ClusterIdConfig) -> Result<Pipeline<Self>> {
        let bank = ClassifierBank::new(
            vec![
                NamedBinary::prepare(PU_ID_PREFIX, &config.em_vs_pu_id)?,
                NamedBinary::prepare(EM_ID_PREFIX, &config.em_vs_pion_id)?,
            ],
            EgIdentification::prepare(&config.eg_identification)?,
            MultiClassClassifier::prepare(&config.multi_class_pid)?,
        )?;
        Ok(Pipeline::new(
            &config.name,
            &config.src,
            config.extension,
            Selector::new(&config.cut)?,
            Self::new(Arc::new(bank)),
        ))
    }
}

impl ColumnProducer for ClusterIdProducer {
    type Candidate = Cluster3d;
    type Context<'e> = () where Self: 'e;

    fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    fn context<'e>(&'e self, _event: &'e Event) -> Result<()> {
        Ok(())
    }

    fn compute(&self, candidate: &Cluster3d, _ctx: &()) -> Result<Vec<Value>> {
        let scores = self.bank.evaluate(candidate);
        let mut row = Vec::with_capacity(self.columns.len());

        row.extend(scores.binary.iter().map(|s| Value::Float(s.value)));
        row.push(Value::Float(scores.eg_em_id));
        row.extend(scores.binary.iter().map(|s| Value::Bool(s.pass)));

        let mc = scores.multi_class;
        row.extend([
            Value::Float(mc.max_score),
            Value::Float(mc.pu_score),
            Value::Float(mc.pion_score),
            Value::Float(mc.em_score),
        ]);
        Ok(row)
    }
}

// =============================================================================
// DIGI FLAGS
// =============================================================================

/// Decoded digi flags for particle-flow clusters
#[derive(Debug)]
pub struct DigiFlagProducer {
    columns: Vec<ColumnSpec>,
}

impl Default for DigiFlagProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl DigiFlagProducer {
    pub fn new() -> Self {
        let uint = |name: &str, doc: &str| ColumnSpec::new(name, ColumnKind::UInt, doc);
        Self {
            columns: vec![
                uint("is_iso", "standalone isolation flag"),
                uint("is_ss", "standalone shower-shape flag"),
                uint("is_loose_tk_iso", "loose track isolation flag"),
                uint("is_loose_tk_ss", "loose track shower-shape flag"),
                uint("brems", "bremsstrahlung category"),
                uint("standalone_working_point", "iso and shape standalone flags both set"),
                uint("loose_track_working_point", "iso and shape loose track flags both set"),
            ],
        }
    }

    pub fn pipeline(config: &DigiFlagsConfig) -> Result<Pipeline<Self>> {
        Ok(Pipeline::new(
            &config.name,
            &config.src,
            config.extension,
            Selector::new(&config.cut)?,
            Self::new(),
        ))
    }
}

impl ColumnProducer for DigiFlagProducer {
    type Candidate = PfCluster;
    type Context<'e> = () where Self: 'e;

    fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    fn context<'e>(&'e self, _event: &'e Event) -> Result<()> {
        Ok(())
    }

    fn compute(&self, candidate: &PfCluster, _ctx: &()) -> Result<Vec<Value>> {
        let flags = digi::decode(candidate.digi_word);
        let bit = |b: bool| Value::UInt(b as u32);
        Ok(vec![
            bit(flags.passes_iso()),
            bit(flags.passes_ss()),
            bit(flags.passes_loose_tk_iso()),
            bit(flags.passes_loose_tk_ss()),
            Value::UInt(flags.brems),
            bit(flags.standalone_working_point()),
            bit(flags.loose_track_working_point()),
        ])
    }
}

// =============================================================================
// TRUTH MATCH
// =============================================================================

/// Truth categories for decoded tracks
#[derive(Debug)]
pub struct TrackTruthProducer {
    matcher: TruthMatcher,
    columns: Vec<ColumnSpec>,
}

impl TrackTruthProducer {
    pub fn new(matcher: TruthMatcher) -> Self {
        let uint = |name: &str, doc: &str| ColumnSpec::new(name, ColumnKind::UInt, doc);
        Self {
            matcher,
            columns: vec![
                uint("is_genuine", "track matched to a genuine particle"),
                uint("is_loosely_genuine", "track loosely matched to a genuine particle"),
                uint("is_unknown", "track origin unknown"),
                uint("is_combinatoric", "combinatoric track"),
                uint("truth_match_code", "comb | unk << 1 | loose << 2 | gen << 3"),
            ],
        }
    }

    pub fn pipeline(config: &TrackTruthConfig) -> Result<Pipeline<Self>> {
        Ok(Pipeline::new(
            &config.name,
            &config.src,
            config.extension,
            Selector::new(&config.cut)?,
            Self::new(TruthMatcher::new(&config.truth_src)),
        ))
    }
}

impl ColumnProducer for TrackTruthProducer {
    type Candidate = DecodedTrack;
    type Context<'e> = BoundTruth<'e> where Self: 'e;

    fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    fn context<'e>(&'e self, event: &'e Event) -> Result<BoundTruth<'e>> {
        self.matcher.bind(event)
    }

    fn compute(&self, candidate: &DecodedTrack, ctx: &BoundTruth<'_>) -> Result<Vec<Value>> {
        let (categories, code) = ctx.classify(candidate.track);
        let bit = |b: bool| Value::UInt(b as u32);
        Ok(vec![
            bit(categories.genuine),
            bit(categories.loosely_genuine),
            bit(categories.unknown),
            bit(categories.combinatoric),
            Value::UInt(code.value() as u32),
        ])
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BinaryClassifierConfig;
    use crate::types::{TrackRef, TruthAssociationMap, TruthCategories};
    use crate::UNSET_SCORE;

    #[test]
    fn test_cluster_id_column_order() {
        let pipeline = ClusterIdProducer::pipeline(&ClusterIdConfig::default()).unwrap();
        let names: Vec<&str> = pipeline.producer().columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "pf_pu_id_score",
                "pf_em_id_score",
                "eg_em_id_score",
                "pf_pu_id_pass",
                "pf_em_id_pass",
                "multi_class_max_score",
                "multi_class_pu_id_score",
                "multi_class_pion_id_score",
                "multi_class_em_id_score",
            ]
        );
    }

    #[test]
    fn test_cluster_id_enabled_classifier() {
        let mut config = ClusterIdConfig::default();
        config.em_vs_pion_id = BinaryClassifierConfig {
            method: "linear".to_string(),
            variables: vec!["pt".to_string()],
            weights: vec![0.1],
            bias: 0.0,
            wp: 0.5,
            preselection: String::new(),
        };
        let pipeline = ClusterIdProducer::pipeline(&config).unwrap();
        let cl = Cluster3d { pt: 10.0, eta: 2.0, ..Default::default() };
        let row = pipeline.producer().compute(&cl, &()).unwrap();
        assert_eq!(row[0], Value::Float(UNSET_SCORE));
        assert_eq!(row[1], Value::Float(1.0));
        assert_eq!(row[3], Value::Bool(false));
        assert_eq!(row[4], Value::Bool(true));
    }

    #[test]
    fn test_digi_row() {
        let producer = DigiFlagProducer::new();
        let pf = PfCluster { digi_word: (1u64 << 38) | (1u64 << 51) | (2u64 << 53), ..Default::default() };
        let row = producer.compute(&pf, &()).unwrap();
        let values: Vec<u32> = row
            .into_iter()
            .map(|v| match v {
                Value::UInt(u) => u,
                other => panic!("expected uint, got {:?}", other),
            })
            .collect();
        assert_eq!(values, vec![1, 1, 0, 0, 2, 1, 0]);
    }

    #[test]
    fn test_truth_row() {
        let producer = TrackTruthProducer::new(TruthMatcher::new("tt"));
        let map: TruthAssociationMap =
            [(TrackRef(5), TruthCategories::new(false, true, false, true))].into_iter().collect();
        let event = Event::new(1).with_truth("tt", map);
        let ctx = producer.context(&event).unwrap();
        let track = DecodedTrack { track: TrackRef(5), ..Default::default() };
        let row = producer.compute(&track, &ctx).unwrap();
        assert_eq!(row[4], Value::UInt(5));
        assert_eq!(row[1], Value::UInt(1));
        assert_eq!(row[0], Value::UInt(0));
    }
}
