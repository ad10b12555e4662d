//! Classifier outputs for one candidate

use serde::{Deserialize, Serialize};

/// Output of one binary classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierScore {
    /// Output prefix, e.g. `pf_pu_id`
    pub name: String,
    pub value: f32,
    pub pass: bool,
}

/// Category picked by the multi-class model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleClass {
    Pileup,
    Pion,
    Em,
}

/// Multi-class scores; `max_score` is always the largest of the three
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiClassScores {
    pub max_score: f32,
    pub pu_score: f32,
    pub pion_score: f32,
    pub em_score: f32,
}

impl MultiClassScores {
    /// Build from the three category scores
    pub fn from_categories(pu_score: f32, pion_score: f32, em_score: f32) -> Self {
        Self {
            max_score: pu_score.max(pion_score).max(em_score),
            pu_score,
            pion_score,
            em_score,
        }
    }

    /// Winning category (ties resolve pu, then pion, then em)
    pub fn predicted(&self) -> ParticleClass {
        if self.pu_score >= self.pion_score && self.pu_score >= self.em_score {
            ParticleClass::Pileup
        } else if self.pion_score >= self.em_score {
            ParticleClass::Pion
        } else {
            ParticleClass::Em
        }
    }
}

/// Everything the classifier bank says about one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankScores {
    /// One entry per configured binary classifier, in configuration order
    pub binary: Vec<ClassifierScore>,
    /// Always-on EG identification score
    pub eg_em_id: f32,
    pub multi_class: MultiClassScores,
}

// =============================================================================
// TESTS
// =============================================================================
