//! Pipeline: fetch → select → size → compute rows → assemble table
//!
//! One generic pipeline serves every table kind. What differs between kinds
//! is captured by [`ColumnProducer`]: the column layout, the per-event
//! context and the values computed for a single candidate.

use std::collections::HashSet;
use tracing::debug;
use crate::config::{Config, ProducerConfig};
use crate::core::producers::{ClusterIdProducer, DigiFlagProducer, TrackTruthProducer};
use crate::core::{Selector, TableBuilder};
use crate::error::{Error, Result, TableError};
use crate::types::{Candidate, ColumnData, ColumnSpec, Event, Table, Value};

/// Per-kind column computation
pub trait ColumnProducer: Send + Sync {
    type Candidate: Candidate;
    /// Extra per-event input beyond the candidate collection
    type Context<'e>
    where
        Self: 'e;

    /// Output columns, in table order
    fn columns(&self) -> &[ColumnSpec];

    /// Fetch the context for one event; failure aborts the event
    fn context<'e>(&'e self, event: &'e Event) -> Result<Self::Context<'e>>;

    /// One value per column for `candidate`, in [`ColumnProducer::columns`] order
    fn compute(&self, candidate: &Self::Candidate, ctx: &Self::Context<'_>) -> Result<Vec<Value>>;
}

/// Selection plus column producer for one output table
#[derive(Debug)]
pub struct Pipeline<P: ColumnProducer> {
    name: String,
    src: String,
    extension: bool,
    selector: Selector<P::Candidate>,
    producer: P,
}

impl<P: ColumnProducer> Pipeline<P> {
    pub fn new(
        name: impl Into<String>,
        src: impl Into<String>,
        extension: bool,
        selector: Selector<P::Candidate>,
        producer: P,
    ) -> Self {
        Self {
            name: name.into(),
            src: src.into(),
            extension,
            selector,
            producer,
        }
    }

    pub fn producer(&self) -> &P {
        &self.producer
    }

    pub fn selector(&self) -> &Selector<P::Candidate> {
        &self.selector
    }

    /// Build this event's table
    pub fn run(&self, event: &Event) -> Result<Table> {
        let candidates = <P::Candidate as Candidate>::collection(event, &self.src).ok_or_else(|| {
            Error::MissingCollection {
                kind: <P::Candidate as Candidate>::KIND,
                label: self.src.clone(),
            }
        })?;
        let ctx = self.producer.context(event)?;

        let mut builder = TableBuilder::new(&self.name, self.extension);

        // Selection covers the whole collection before the size is fixed
        builder.begin_selection()?;
        let selected: Vec<&P::Candidate> =
            candidates.iter().filter(|c| self.selector.select(c)).collect();
        builder.fix_row_count(selected.len())?;

        let specs = self.producer.columns();
        let mut data: Vec<ColumnData> = specs
            .iter()
            .map(|s| ColumnData::with_capacity(s.kind, selected.len()))
            .collect();

        for candidate in &selected {
            let row = self.producer.compute(candidate, &ctx)?;
            if row.len() != specs.len() {
                return Err(TableError::RowWidth { expected: specs.len(), got: row.len() }.into());
            }
            for ((column, spec), value) in data.iter_mut().zip(specs).zip(row) {
                column.push(value).map_err(|v| TableError::KindMismatch {
                    name: spec.name.clone(),
                    expected: spec.kind,
                    got: v.kind(),
                })?;
            }
        }

        for (spec, column) in specs.iter().zip(data) {
            builder.add_column(&spec.name, column, &spec.doc)?;
        }

        debug!(
            table = %self.name,
            event = event.id,
            total = candidates.len(),
            selected = selected.len(),
            "table built"
        );
        Ok(builder.build()?)
    }
}

// =============================================================================
// TYPE-ERASED PRODUCERS
// =============================================================================

/// Object-safe view of a configured pipeline
pub trait TableProducer: Send + Sync + std::fmt::Debug {
    /// Output table name
    fn name(&self) -> &str;
    /// Input collection label
    fn src(&self) -> &str;
    fn candidate_kind(&self) -> &'static str;
    /// Selection expression, empty when everything is kept
    fn cut(&self) -> &str;
    fn columns(&self) -> &[ColumnSpec];
    fn produce(&self, event: &Event) -> Result<Table>;
}

impl<P> TableProducer for Pipeline<P>
where
    P: ColumnProducer + std::fmt::Debug,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn src(&self) -> &str {
        &self.src
    }

    fn candidate_kind(&self) -> &'static str {
        <P::Candidate as Candidate>::KIND
    }

    fn cut(&self) -> &str {
        self.selector.expression()
    }

    fn columns(&self) -> &[ColumnSpec] {
        self.producer.columns()
    }

    fn produce(&self, event: &Event) -> Result<Table> {
        self.run(event)
    }
}

/// Every configured table, run in configuration order
#[derive(Debug, Default)]
pub struct ProducerSet {
    producers: Vec<Box<dyn TableProducer>>,
}

impl ProducerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a producer; table names must be unique
    pub fn push(&mut self, producer: Box<dyn TableProducer>) -> Result<()> {
        if self.producers.iter().any(|p| p.name() == producer.name()) {
            return Err(Error::Config(format!("table '{}' configured twice", producer.name())));
        }
        self.producers.push(producer);
        Ok(())
    }

    /// Prepare every table named in `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut set = Self::new();
        let mut seen = HashSet::new();
        for table in &config.tables {
            if !seen.insert(table.name().to_string()) {
                return Err(Error::Config(format!("table '{}' configured twice", table.name())));
            }
            let producer: Box<dyn TableProducer> = match table {
                ProducerConfig::ClusterId(c) => Box::new(ClusterIdProducer::pipeline(c)?),
                ProducerConfig::DigiFlags(c) => Box::new(DigiFlagProducer::pipeline(c)?),
                ProducerConfig::TrackTruth(c) => Box::new(TrackTruthProducer::pipeline(c)?),
            };
            set.push(producer)?;
        }
        Ok(set)
    }

    /// All tables for one event; the first failure aborts the event
    pub fn run(&self, event: &Event) -> Result<Vec<Table>> {
        self.producers.iter().map(|p| p.produce(event)).collect()
    }

    pub fn producers(&self) -> &[Box<dyn TableProducer>] {
        &self.producers
    }

    pub fn len(&self) -> usize {
        self.producers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnKind, PfCluster};

    /// Emits pt and a constant, or a malformed row on request
    #[derive(Debug)]
    struct PtProducer {
        columns: Vec<ColumnSpec>,
        bad_row: bool,
    }

    impl PtProducer {
        fn new(bad_row: bool) -> Self {
            Self {
                columns: vec![
                    ColumnSpec::new("pt", ColumnKind::Float, "transverse momentum"),
                    ColumnSpec::new("one", ColumnKind::UInt, ""),
                ],
                bad_row,
            }
        }
    }

    impl ColumnProducer for PtProducer {
        type Candidate = PfCluster;
        type Context<'e> = () where Self: 'e;

        fn columns(&self) -> &[ColumnSpec] {
            &self.columns
        }

        fn context<'e>(&'e self, _event: &'e Event) -> Result<()> {
            Ok(())
        }

        fn compute(&self, candidate: &PfCluster, _ctx: &()) -> Result<Vec<Value>> {
            if self.bad_row {
                return Ok(vec![Value::Bool(true), Value::UInt(1)]);
            }
            Ok(vec![Value::Float(candidate.pt as f32), Value::UInt(1)])
        }
    }

    fn pf(pt: f64) -> PfCluster {
        PfCluster { pt, ..Default::default() }
    }

    #[test]
    fn test_selection_preserves_order() {
        let pipeline = Pipeline::new(
            "T",
            "pf",
            true,
            Selector::new("pt > 1").unwrap(),
            PtProducer::new(false),
        );
        let event = Event::new(3).with_pf_clusters("pf", vec![pf(5.0), pf(0.5), pf(2.0)]);
        let table = pipeline.run(&event).unwrap();
        assert_eq!(table.row_count, 2);
        assert_eq!(table.floats("pt").unwrap(), &[5.0, 2.0]);
        assert_eq!(table.uints("one").unwrap(), &[1, 1]);
        assert_eq!(table.column("pt").unwrap().doc, "transverse momentum");
    }

    #[test]
    fn test_missing_collection_is_fatal() {
        let pipeline = Pipeline::new("T", "pf", true, Selector::all(), PtProducer::new(false));
        let err = pipeline.run(&Event::new(1)).unwrap_err();
        assert!(matches!(err, Error::MissingCollection { kind: "pf_cluster", .. }));
    }

    #[test]
    fn test_kind_mismatch_fails_loudly() {
        let pipeline = Pipeline::new("T", "pf", true, Selector::all(), PtProducer::new(true));
        let event = Event::new(1).with_pf_clusters("pf", vec![pf(1.0)]);
        let err = pipeline.run(&event).unwrap_err();
        assert!(matches!(err, Error::Table(TableError::KindMismatch { .. })));
    }

    #[test]
    fn test_empty_collection_gives_empty_columns() {
        let pipeline = Pipeline::new("T", "pf", false, Selector::all(), PtProducer::new(true));
        let event = Event::new(1).with_pf_clusters("pf", vec![]);
        let table = pipeline.run(&event).unwrap();
        assert_eq!(table.row_count, 0);
        assert_eq!(table.columns.len(), 2);
    }

    #[test]
    fn test_duplicate_table_names_rejected() {
        let mut set = ProducerSet::new();
        set.push(Box::new(Pipeline::new("T", "a", true, Selector::all(), PtProducer::new(false))))
            .unwrap();
        let err = set
            .push(Box::new(Pipeline::new("T", "b", true, Selector::all(), PtProducer::new(false))))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
