use std::collections::HashMap;

use qdsl_data::{Entity, Value};

/// Rows of one table, values in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<&'static str>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: &[&'static str]) -> Self {
        Self {
            columns: columns.to_vec(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| *c == name)
    }

    pub fn push(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Vec<Value>> {
        &mut self.rows
    }
}

/// Tables keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    tables: HashMap<&'static str, Table>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `entity`, creating its table on first use.
    pub fn insert<E: Entity>(&mut self, entity: &E) {
        self.tables
            .entry(E::table_name())
            .or_insert_with(|| Table::new(E::columns()))
            .push(entity.values());
    }

    pub fn with<E: Entity>(mut self, entities: &[E]) -> Self {
        for entity in entities {
            self.insert(entity);
        }
        self
    }

    /// Register an empty table so queries against it succeed.
    pub fn with_table<E: Entity>(mut self) -> Self {
        self.tables
            .entry(E::table_name())
            .or_insert_with(|| Table::new(E::columns()));
        self
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub(crate) fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    pub fn row_count(&self, name: &str) -> usize {
        self.table(name).map_or(0, Table::len)
    }
}
