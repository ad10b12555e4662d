//! Table builder: per-event state machine that assembles a flat table
//!
//! State transitions:
//! - EMPTY → SELECTING: `begin_selection`
//! - SELECTING → FIXED_SIZE: `fix_row_count` (exactly once)
//! - FIXED_SIZE / POPULATING → POPULATING: `add_column`
//! - FIXED_SIZE / POPULATING → BUILT: `build`
//!
//! BUILT is terminal. A new event starts with a new builder.

use std::collections::HashSet;
use crate::error::TableError;
use crate::types::{Column, ColumnData, Table};

/// Builder lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// Nothing happened yet
    Empty,
    /// Candidates are being filtered
    Selecting,
    /// Row count known, no columns yet
    FixedSize,
    /// At least one column added
    Populating,
    /// Table handed out
    Built,
}

impl std::fmt::Display for BuildState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl BuildState {
    fn label(&self) -> &'static str {
        match self {
            BuildState::Empty => "EMPTY",
            BuildState::Selecting => "SELECTING",
            BuildState::FixedSize => "FIXED_SIZE",
            BuildState::Populating => "POPULATING",
            BuildState::Built => "BUILT",
        }
    }
}

/// Accumulates equal-length, uniquely named columns for one table
#[derive(Debug)]
pub struct TableBuilder {
    name: String,
    extension: bool,
    state: BuildState,
    row_count: usize,
    columns: Vec<Column>,
    names: HashSet<String>,
}

impl TableBuilder {
    /// New builder in EMPTY state
    pub fn new(name: impl Into<String>, extension: bool) -> Self {
        Self {
            name: name.into(),
            extension,
            state: BuildState::Empty,
            row_count: 0,
            columns: Vec::new(),
            names: HashSet::new(),
        }
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Row count; meaningful from FIXED_SIZE on
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    fn transition(
        &mut self,
        action: &'static str,
        allowed: &[BuildState],
        next: BuildState,
    ) -> Result<(), TableError> {
        if !allowed.contains(&self.state) {
            return Err(TableError::InvalidTransition { action, state: self.state.label() });
        }
        self.state = next;
        Ok(())
    }

    /// EMPTY → SELECTING
    pub fn begin_selection(&mut self) -> Result<(), TableError> {
        self.transition("begin selection", &[BuildState::Empty], BuildState::Selecting)
    }

    /// SELECTING → FIXED_SIZE; the row count never changes afterwards
    pub fn fix_row_count(&mut self, rows: usize) -> Result<(), TableError> {
        self.transition("fix row count", &[BuildState::Selecting], BuildState::FixedSize)?;
        self.row_count = rows;
        Ok(())
    }

    /// Append a column. Fails on length mismatch or a repeated name.
    pub fn add_column(
        &mut self,
        name: impl Into<String>,
        data: ColumnData,
        doc: impl Into<String>,
    ) -> Result<(), TableError> {
        let name = name.into();
        if !matches!(self.state, BuildState::FixedSize | BuildState::Populating) {
            return Err(TableError::InvalidTransition {
                action: "add column",
                state: self.state.label(),
            });
        }
        if data.len() != self.row_count {
            return Err(TableError::LengthMismatch {
                name,
                expected: self.row_count,
                got: data.len(),
            });
        }
        if !self.names.insert(name.clone()) {
            return Err(TableError::DuplicateColumn(name));
        }

        self.columns.push(Column { name, doc: doc.into(), data });
        self.state = BuildState::Populating;
        Ok(())
    }

    /// Hand out the finished table; the builder is spent afterwards
    pub fn build(&mut self) -> Result<Table, TableError> {
        self.transition(
            "build",
            &[BuildState::FixedSize, BuildState::Populating],
            BuildState::Built,
        )?;
        self.names.clear();
        Ok(Table {
            name: self.name.clone(),
            extension: self.extension,
            row_count: self.row_count,
            columns: std::mem::take(&mut self.columns),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
