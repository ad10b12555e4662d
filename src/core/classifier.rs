//! Classifier bank: binary ID models, EG identification and the multi-class PID
//!
//! Every model is prepared once from configuration into an immutable value.
//! Feature names are resolved at preparation, so evaluation never fails.
//! The bank is `Send + Sync` and is shared between event streams through
//! `Arc` without locking.

use std::marker::PhantomData;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::info;
use crate::config::{BinaryClassifierConfig, EgIdConfig, ModelConfig, MultiClassConfig};
use crate::core::Selector;
use crate::error::{Error, Result};
use crate::types::{BankScores, Candidate, ClassifierScore, MultiClassScores};
use crate::UNSET_SCORE;

// =============================================================================
// LINEAR MODEL
// =============================================================================

/// Output transform applied to the weighted sum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    /// Raw weighted sum
    Linear,
    /// 1 / (1 + e^-x), in (0, 1)
    Logistic,
    /// tanh(x), in (-1, 1), BDT-like range
    Tanh,
}

impl Response {
    /// Parse a configured method name
    pub fn from_method(method: &str) -> Option<Self> {
        match method.to_ascii_lowercase().as_str() {
            "linear" => Some(Response::Linear),
            "logistic" => Some(Response::Logistic),
            "tanh" => Some(Response::Tanh),
            _ => None,
        }
    }

    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Response::Linear => x,
            Response::Logistic => 1.0 / (1.0 + (-x).exp()),
            Response::Tanh => x.tanh(),
        }
    }
}

/// Weighted sum over named features, followed by a response function
#[derive(Debug, Clone)]
pub struct LinearModel<C> {
    inputs: Vec<&'static str>,
    weights: Vec<f64>,
    bias: f64,
    response: Response,
    _kind: PhantomData<fn(&C) -> f64>,
}

impl<C: Candidate> LinearModel<C> {
    /// Resolve the feature list and check weights against it
    pub fn prepare(config: &ModelConfig, response: Response) -> Result<Self> {
        if config.variables.len() != config.weights.len() {
            return Err(Error::Config(format!(
                "model has {} variables but {} weights",
                config.variables.len(),
                config.weights.len()
            )));
        }
        let inputs = config
            .variables
            .iter()
            .map(|v| resolve_feature::<C>(v))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            inputs,
            weights: config.weights.clone(),
            bias: config.bias,
            response,
            _kind: PhantomData,
        })
    }

    /// Weighted sum before the response function
    pub fn raw(&self, candidate: &C) -> f64 {
        self.inputs
            .iter()
            .zip(&self.weights)
            .map(|(name, w)| w * candidate.feature(name).unwrap_or(0.0))
            .sum::<f64>()
            + self.bias
    }

    pub fn score(&self, candidate: &C) -> f64 {
        self.response.apply(self.raw(candidate))
    }

    pub fn inputs(&self) -> &[&'static str] {
        &self.inputs
    }
}

fn resolve_feature<C: Candidate>(name: &str) -> Result<&'static str> {
    C::feature_names()
        .iter()
        .copied()
        .find(|f| *f == name)
        .ok_or_else(|| Error::Config(format!("unknown {} feature '{}'", C::KIND, name)))
}

// =============================================================================
// BINARY CLASSIFIERS
// =============================================================================

/// Enabled binary classifier: score, working point and preselection
#[derive(Debug, Clone)]
pub struct BinaryClassifier<C> {
    model: LinearModel<C>,
    wp: f64,
    preselection: Selector<C>,
}

impl<C: Candidate> BinaryClassifier<C> {
    /// Score and pass decision; preselection failures score [`UNSET_SCORE`]
    pub fn evaluate(&self, candidate: &C) -> (f32, bool) {
        if !self.preselection.select(candidate) {
            return (UNSET_SCORE, false);
        }
        let score = self.model.score(candidate);
        (score as f32, score > self.wp)
    }
}

/// A binary classifier slot, resolved once from its method string
#[derive(Debug, Clone)]
pub enum BinarySlot<C> {
    Enabled(Arc<BinaryClassifier<C>>),
    Disabled,
}

impl<C: Candidate> BinarySlot<C> {
    /// One-time preparation; an empty method yields [`BinarySlot::Disabled`]
    pub fn prepare(name: &str, config: &BinaryClassifierConfig) -> Result<Self> {
        let method = config.method.trim();
        if method.is_empty() {
            info!(classifier = name, "binary classifier disabled");
            return Ok(BinarySlot::Disabled);
        }
        let response = Response::from_method(method).ok_or_else(|| {
            Error::Config(format!("classifier '{}': unknown method '{}'", name, method))
        })?;
        let model = LinearModel::prepare(&config.model(), response)
            .map_err(|e| Error::Config(format!("classifier '{}': {}", name, e)))?;
        let preselection = Selector::new(&config.preselection)?;

        info!(
            classifier = name,
            method = method,
            inputs = model.inputs().len(),
            wp = config.wp,
            "binary classifier prepared"
        );
        Ok(BinarySlot::Enabled(Arc::new(BinaryClassifier {
            model,
            wp: config.wp,
            preselection,
        })))
    }

    /// Disabled slots always give `(UNSET_SCORE, false)`
    pub fn evaluate(&self, candidate: &C) -> (f32, bool) {
        match self {
            BinarySlot::Enabled(classifier) => classifier.evaluate(candidate),
            BinarySlot::Disabled => (UNSET_SCORE, false),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, BinarySlot::Enabled(_))
    }
}

/// Binary slot with the prefix of its output columns
#[derive(Debug, Clone)]
pub struct NamedBinary<C> {
    pub name: String,
    pub slot: BinarySlot<C>,
}

impl<C: Candidate> NamedBinary<C> {
    pub fn prepare(name: &str, config: &BinaryClassifierConfig) -> Result<Self> {
        Ok(Self { name: name.to_string(), slot: BinarySlot::prepare(name, config)? })
    }
}

// =============================================================================
// EG IDENTIFICATION
// =============================================================================

/// Always-on EG score with one model per |eta| bin
#[derive(Debug, Clone)]
pub struct EgIdentification<C> {
    edges: Vec<f64>,
    models: Vec<LinearModel<C>>,
}

impl<C: Candidate> EgIdentification<C> {
    pub fn prepare(config: &EgIdConfig) -> Result<Self> {
        let response = Response::from_method(&config.method).ok_or_else(|| {
            Error::Config(format!("eg identification: unknown method '{}'", config.method))
        })?;
        if config.eta_bins.len() < 2 || config.models.len() != config.eta_bins.len() - 1 {
            return Err(Error::Config(format!(
                "eg identification: {} eta edges need {} models, got {}",
                config.eta_bins.len(),
                config.eta_bins.len().saturating_sub(1),
                config.models.len()
            )));
        }
        if config.eta_bins.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(Error::Config("eg identification: eta edges must ascend".to_string()));
        }
        resolve_feature::<C>("abseta")?;
        let models = config
            .models
            .iter()
            .map(|m| LinearModel::prepare(m, response))
            .collect::<Result<Vec<_>>>()?;

        info!(bins = models.len(), "eg identification prepared");
        Ok(Self { edges: config.eta_bins.clone(), models })
    }

    /// Score of the bin containing |eta|; [`UNSET_SCORE`] outside all bins
    pub fn value(&self, candidate: &C) -> f32 {
        let abseta = candidate.feature("abseta").unwrap_or(f64::NAN);
        self.edges
            .windows(2)
            .position(|w| abseta >= w[0] && abseta < w[1])
            .map(|bin| self.models[bin].score(candidate) as f32)
            .unwrap_or(UNSET_SCORE)
    }
}

// =============================================================================
// MULTI-CLASS PID
// =============================================================================

/// Pileup / pion / EM classifier with soft-max normalised scores
#[derive(Debug, Clone)]
pub struct MultiClassClassifier<C> {
    pu: LinearModel<C>,
    pion: LinearModel<C>,
    em: LinearModel<C>,
}

impl<C: Candidate> MultiClassClassifier<C> {
    pub fn prepare(config: &MultiClassConfig) -> Result<Self> {
        let prepare = |label: &str, m: &ModelConfig| {
            LinearModel::<C>::prepare(m, Response::Linear)
                .map_err(|e| Error::Config(format!("multi-class {} model: {}", label, e)))
        };
        let classifier = Self {
            pu: prepare("pu", &config.pu)?,
            pion: prepare("pion", &config.pion)?,
            em: prepare("em", &config.em)?,
        };
        info!("multi-class classifier prepared");
        Ok(classifier)
    }

    /// All three category scores and their maximum
    pub fn evaluate(&self, candidate: &C) -> MultiClassScores {
        let logits = [
            self.pu.raw(candidate),
            self.pion.raw(candidate),
            self.em.raw(candidate),
        ];
        let exps = softmax_weights(logits);
        let total: f64 = exps.iter().sum();

        MultiClassScores::from_categories(
            (exps[0] / total) as f32,
            (exps[1] / total) as f32,
            (exps[2] / total) as f32,
        )
    }
}

/// Unnormalised softmax weights, finite for any logits.
///
/// NaN logits count as -inf. Infinite logits share all the weight, and
/// if no logit is above -inf the weights are uniform.
fn softmax_weights(logits: [f64; 3]) -> [f64; 3] {
    let logits = logits.map(|l| if l.is_nan() { f64::NEG_INFINITY } else { l });
    let top = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if top == f64::INFINITY {
        logits.map(|l| if l == f64::INFINITY { 1.0 } else { 0.0 })
    } else if top == f64::NEG_INFINITY {
        [1.0; 3]
    } else {
        logits.map(|l| (l - top).exp())
    }
}

// =============================================================================
// BANK
// =============================================================================

/// Every model run against a candidate, in a fixed order
#[derive(Debug, Clone)]
pub struct ClassifierBank<C> {
    binaries: Vec<NamedBinary<C>>,
    eg_id: EgIdentification<C>,
    multi_class: MultiClassClassifier<C>,
}

impl<C: Candidate> ClassifierBank<C> {
    pub fn new(
        binaries: Vec<NamedBinary<C>>,
        eg_id: EgIdentification<C>,
        multi_class: MultiClassClassifier<C>,
    ) -> Result<Self> {
        for (i, b) in binaries.iter().enumerate() {
            if binaries[..i].iter().any(|other| other.name == b.name) {
                return Err(Error::Config(format!("binary classifier '{}' listed twice", b.name)));
            }
        }
        Ok(Self { binaries, eg_id, multi_class })
    }

    /// Evaluate every model against `candidate`
    pub fn evaluate(&self, candidate: &C) -> BankScores {
        let binary = self
            .binaries
            .iter()
            .map(|b| {
                let (value, pass) = b.slot.evaluate(candidate);
                ClassifierScore { name: b.name.clone(), value, pass }
            })
            .collect();

        BankScores {
            binary,
            eg_em_id: self.eg_id.value(candidate),
            multi_class: self.multi_class.evaluate(candidate),
        }
    }

    pub fn binaries(&self) -> &[NamedBinary<C>] {
        &self.binaries
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cluster3d;
    use proptest::prelude::*;

    fn model(vars: &[&str], weights: &[f64], bias: f64) -> ModelConfig {
        ModelConfig {
            variables: vars.iter().map(|s| s.to_string()).collect(),
            weights: weights.to_vec(),
            bias,
        }
    }

    fn hoe_classifier(method: &str) -> BinaryClassifierConfig {
        BinaryClassifierConfig {
            method: method.to_string(),
            variables: vec!["hoe".to_string()],
            weights: vec![-2.0],
            bias: 1.0,
            wp: 0.0,
            preselection: String::new(),
        }
    }

    fn cluster(pt: f64, eta: f64, hoe: f64) -> Cluster3d {
        Cluster3d { pt, eta, hoe, ..Default::default() }
    }

    #[test]
    fn test_empty_method_disables() {
        let slot = BinarySlot::<Cluster3d>::prepare("pu", &hoe_classifier("")).unwrap();
        assert!(!slot.is_enabled());
        assert_eq!(slot.evaluate(&cluster(10.0, 2.0, 0.1)), (UNSET_SCORE, false));
    }

    #[test]
    fn test_enabled_linear_scores_and_passes() {
        let slot = BinarySlot::<Cluster3d>::prepare("pu", &hoe_classifier("linear")).unwrap();
        assert_eq!(slot.evaluate(&cluster(10.0, 2.0, 0.25)), (0.5, true));
        assert_eq!(slot.evaluate(&cluster(10.0, 2.0, 0.75)), (-0.5, false));
    }

    #[test]
    fn test_preselection_failure_scores_unset() {
        let mut config = hoe_classifier("logistic");
        config.preselection = "pt > 5".to_string();
        let slot = BinarySlot::<Cluster3d>::prepare("em", &config).unwrap();
        assert_eq!(slot.evaluate(&cluster(2.0, 2.0, 0.0)), (UNSET_SCORE, false));
        let (score, pass) = slot.evaluate(&cluster(6.0, 2.0, 0.0));
        assert!(score > 0.5 && pass);
    }

    #[test]
    fn test_bad_configs_fail_preparation() {
        assert!(BinarySlot::<Cluster3d>::prepare("x", &hoe_classifier("BDTG")).is_err());

        let mut config = hoe_classifier("tanh");
        config.weights.push(1.0);
        assert!(BinarySlot::<Cluster3d>::prepare("x", &config).is_err());

        let mut config = hoe_classifier("tanh");
        config.variables = vec!["digi_word".to_string()];
        assert!(BinarySlot::<Cluster3d>::prepare("x", &config).is_err());

        let mut config = hoe_classifier("tanh");
        config.preselection = "pt >".to_string();
        assert!(matches!(
            BinarySlot::<Cluster3d>::prepare("x", &config),
            Err(Error::Selection(_))
        ));
    }

    #[test]
    fn test_eg_id_bins() {
        let config = EgIdConfig {
            method: "linear".to_string(),
            eta_bins: vec![1.5, 2.7, 3.0],
            models: vec![model(&[], &[], 0.25), model(&["pt"], &[0.1], 0.0)],
        };
        let eg = EgIdentification::<Cluster3d>::prepare(&config).unwrap();
        assert_eq!(eg.value(&cluster(10.0, -2.0, 0.0)), 0.25);
        assert_eq!(eg.value(&cluster(10.0, 2.8, 0.0)), 1.0);
        assert_eq!(eg.value(&cluster(10.0, 1.0, 0.0)), UNSET_SCORE);
        assert_eq!(eg.value(&cluster(10.0, 3.0, 0.0)), UNSET_SCORE);
    }

    #[test]
    fn test_eg_id_rejects_bad_bins() {
        let config = EgIdConfig {
            method: "linear".to_string(),
            eta_bins: vec![2.0, 1.5],
            models: vec![model(&[], &[], 0.0)],
        };
        assert!(EgIdentification::<Cluster3d>::prepare(&config).is_err());
        let config = EgIdConfig {
            method: "linear".to_string(),
            eta_bins: vec![1.5, 2.0],
            models: vec![],
        };
        assert!(EgIdentification::<Cluster3d>::prepare(&config).is_err());
    }

    #[test]
    fn test_multi_class_uniform_without_weights() {
        let mc = MultiClassClassifier::<Cluster3d>::prepare(&MultiClassConfig::default()).unwrap();
        let scores = mc.evaluate(&cluster(1.0, 2.0, 0.0));
        assert!((scores.pu_score - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(scores.max_score, scores.pu_score);
    }

    #[test]
    fn test_bank_rejects_duplicate_names() {
        let eg = EgIdentification::prepare(&EgIdConfig::default()).unwrap();
        let mc = MultiClassClassifier::prepare(&MultiClassConfig::default()).unwrap();
        let a = NamedBinary::<Cluster3d>::prepare("pf_pu_id", &hoe_classifier("")).unwrap();
        let b = NamedBinary::<Cluster3d>::prepare("pf_pu_id", &hoe_classifier("")).unwrap();
        assert!(ClassifierBank::new(vec![a, b], eg, mc).is_err());
    }

    #[test]
    fn test_multi_class_overflowing_logit() {
        let config = MultiClassConfig {
            pu: model(&["pt"], &[2.0], 0.0),
            ..Default::default()
        };
        let mc = MultiClassClassifier::<Cluster3d>::prepare(&config).unwrap();
        let s = mc.evaluate(&cluster(1e308, 2.0, 0.0));
        assert_eq!(s.pu_score, 1.0);
        assert_eq!(s.pion_score, 0.0);
        assert_eq!(s.max_score, 1.0);

        // both +inf and -inf contributions: NaN logit is dropped
        let config = MultiClassConfig {
            pu: model(&["pt", "hoe"], &[2.0, -2.0], 0.0),
            em: model(&["pt"], &[-2.0], 0.0),
            ..Default::default()
        };
        let mc = MultiClassClassifier::<Cluster3d>::prepare(&config).unwrap();
        let s = mc.evaluate(&cluster(1e308, 2.0, 1e308));
        assert_eq!(s.pion_score, 1.0);
        assert_eq!(s.max_score, s.pion_score);
        assert_eq!(s.pu_score + s.em_score, 0.0);
    }

    #[test]
    fn test_softmax_weights_all_nan_is_uniform() {
        assert_eq!(softmax_weights([f64::NAN; 3]), [1.0; 3]);
        assert_eq!(
            softmax_weights([f64::INFINITY, 0.0, f64::INFINITY]),
            [1.0, 0.0, 1.0]
        );
    }

    fn extreme_f64() -> impl Strategy<Value = f64> {
        prop_oneof![
            Just(f64::MAX),
            Just(-f64::MAX),
            Just(f64::NAN),
            Just(f64::INFINITY),
            -1e308f64..1e308,
            prop::num::f64::ANY,
        ]
    }

    proptest! {
        #[test]
        fn property_max_score_defined_for_extreme_features(
            pt in extreme_f64(),
            eta in extreme_f64(),
            hoe in extreme_f64(),
            w in prop::array::uniform3(-5.0f64..5.0),
        ) {
            let config = MultiClassConfig {
                pu: model(&["pt", "hoe"], &[w[0], 1.0], 0.5),
                pion: model(&["hoe", "eta"], &[w[1], -0.3], 0.0),
                em: model(&["pt"], &[w[2]], -1.0),
            };
            let mc = MultiClassClassifier::<Cluster3d>::prepare(&config).unwrap();
            let s = mc.evaluate(&cluster(pt, eta, hoe));
            for score in [s.max_score, s.pu_score, s.pion_score, s.em_score] {
                prop_assert!((0.0..=1.0).contains(&score), "score {} out of range", score);
            }
            prop_assert_eq!(s.max_score, s.pu_score.max(s.pion_score).max(s.em_score));
        }

        #[test]
        fn property_max_score_is_max_of_categories(
            pt in 0.0f64..500.0,
            eta in -3.0f64..3.0,
            hoe in -1.0f64..50.0,
            w in prop::array::uniform3(-5.0f64..5.0),
        ) {
            let config = MultiClassConfig {
                pu: model(&["pt", "hoe"], &[w[0], 1.0], 0.5),
                pion: model(&["hoe", "eta"], &[w[1], -0.3], 0.0),
                em: model(&["pt"], &[w[2]], -1.0),
            };
            let mc = MultiClassClassifier::<Cluster3d>::prepare(&config).unwrap();
            let s = mc.evaluate(&cluster(pt, eta, hoe));
            prop_assert_eq!(s.max_score, s.pu_score.max(s.pion_score).max(s.em_score));
            prop_assert!(s.max_score == s.pu_score || s.max_score == s.pion_score || s.max_score == s.em_score);
        }
    }
}
