//! Top-level wiring: one catalog, one buffer pool, one id generator.

use crate::catalog::Catalog;
use crate::storage::buffer::lru::LruReplacer;
use crate::storage::buffer::{BufferPool, DEFAULT_CAPACITY};
use crate::transaction::{TransactionId, TransactionIdGenerator};
use std::sync::Arc;

/// Owns the storage engine's shared state. Query operators and tests reach
/// the buffer pool and catalog through this.
pub struct Database {
    catalog: Arc<Catalog>,
    buffer_pool: Arc<BufferPool>,
    txn_ids: TransactionIdGenerator,
}

impl Database {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let catalog = Arc::new(Catalog::new());
        let buffer_pool = Arc::new(BufferPool::new(
            Arc::clone(&catalog),
            Box::new(LruReplacer::new()),
            capacity,
        ));
        Self {
            catalog,
            buffer_pool,
            txn_ids: TransactionIdGenerator::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }

    /// Starts a new transaction and returns its id.
    pub fn begin(&self) -> TransactionId {
        self.txn_ids.next()
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}
