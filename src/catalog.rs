//! Table registry: resolves a table id to its backing heap file.

use crate::storage::disk::heap_file::HeapFile;
use crate::storage::error::{StorageError, StorageResult};
use dashmap::DashMap;
use std::sync::Arc;

pub type TableId = u32;

/// Maps table ids to their heap files. The buffer pool consults this on
/// every cache miss and flush.
#[derive(Debug, Default)]
pub struct Catalog {
    tables: DashMap<TableId, Arc<HeapFile>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a heap file under its own table id, replacing any previous
    /// registration.
    pub fn register(&self, file: Arc<HeapFile>) {
        self.tables.insert(file.table_id(), file);
    }

    /// Removes a table's registration, returning its heap file if it was
    /// registered.
    pub fn unregister(&self, table_id: TableId) -> Option<Arc<HeapFile>> {
        self.tables.remove(&table_id).map(|(_, file)| file)
    }

    pub fn file(&self, table_id: TableId) -> StorageResult<Arc<HeapFile>> {
        self.tables
            .get(&table_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(StorageError::UnknownTable(table_id))
    }

    pub fn table_ids(&self) -> Vec<TableId> {
        self.tables.iter().map(|entry| *entry.key()).collect()
    }
}
