//! Core data types for the ntuplizer

mod candidate;
mod event;
mod score;
mod table;
mod truth;

pub use candidate::{Candidate, Cluster3d, PfCluster, DecodedTrack, TrackRef};
pub use event::Event;
pub use score::{ClassifierScore, MultiClassScores, ParticleClass, BankScores};
pub use table::{ColumnKind, ColumnData, ColumnSpec, Column, Table, Value};
pub use truth::{TruthCategories, TruthMatchCode, TruthEntry, TruthAssociationMap};
