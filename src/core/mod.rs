//! Core modules for the ntuplizer

pub mod selector;
pub mod classifier;
pub mod digi;
pub mod truth_matcher;
pub mod table_builder;
pub mod pipeline;
pub mod producers;
pub mod api;

pub use selector::Selector;
pub use classifier::{BinarySlot, ClassifierBank, EgIdentification, MultiClassClassifier, NamedBinary, Response};
pub use digi::{decode, DigiFlags};
pub use truth_matcher::{BoundTruth, TruthMatcher};
pub use table_builder::{BuildState, TableBuilder};
pub use pipeline::{ColumnProducer, Pipeline, ProducerSet, TableProducer};
pub use producers::{ClusterIdProducer, DigiFlagProducer, TrackTruthProducer};
pub use api::{create_router, run_server};
