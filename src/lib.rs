//! ntuplizer: flat annotation tables for trigger-level clusters and tracks
//!
//! Per event, every configured pipeline fetches one candidate collection,
//! keeps the candidates passing its cut, and writes one row per survivor:
//! classifier scores for 3D clusters, decoded digi flags for particle-flow
//! clusters, or truth-match categories for decoded tracks.

pub mod config;
pub mod core;
pub mod error;
pub mod types;

pub use error::{Error, Result};

// =============================================================================
// SENTINELS
// =============================================================================

/// Score written for a disabled classifier, a failed preselection, or a
/// cluster outside every EG identification eta bin
pub const UNSET_SCORE: f32 = -999.0;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
