//! Reference-passing dataset store
//!
//! Steps never hand tables to each other directly. Each step output is saved
//! under a fresh [`DatasetRef`] and later steps fetch it by that reference.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::table::Table;
use crate::types::DatasetRef;

/// Write-once, read-many table storage
///
/// `save` always allocates a new reference, so two writers can never race on
/// the same key. `get` never fails: a missing reference is `None`.
pub trait DatasetStore: Send + Sync {
    fn save(&self, table: Table) -> DatasetRef;

    fn get(&self, reference: &DatasetRef) -> Option<Arc<Table>>;

    fn contains(&self, reference: &DatasetRef) -> bool {
        self.get(reference).is_some()
    }
}

/// Summary of a stored table
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetInfo {
    pub reference: DatasetRef,
    pub row_count: usize,
    pub column_names: Vec<String>,
    pub stored_at: DateTime<Utc>,
}

struct StoredTable {
    table: Arc<Table>,
    stored_at: DateTime<Utc>,
}

/// In-process store backed by a hash map
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<DatasetRef, StoredTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn info(&self, reference: &DatasetRef) -> Option<DatasetInfo> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.get(reference).map(|stored| DatasetInfo {
            reference: *reference,
            row_count: stored.table.row_count(),
            column_names: stored.table.column_names(),
            stored_at: stored.stored_at,
        })
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("tables", &self.len())
            .finish()
    }
}

impl DatasetStore for MemoryStore {
    fn save(&self, table: Table) -> DatasetRef {
        let reference = DatasetRef::new();
        let stored = StoredTable {
            table: Arc::new(table),
            stored_at: Utc::now(),
        };
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(reference, stored);
        reference
    }

    fn get(&self, reference: &DatasetRef) -> Option<Arc<Table>> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(reference)
            .map(|stored| Arc::clone(&stored.table))
    }
}
