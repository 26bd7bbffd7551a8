//! Storage layer error types.

use crate::catalog::TableId;
use crate::storage::page::PageId;
use crate::transaction::TransactionId;
use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The 150ms lock-wait bound elapsed. The caller is expected to abort
    /// the transaction and may retry it from the top.
    #[error("transaction {0} aborted: lock wait timed out")]
    TransactionAborted(TransactionId),

    /// Eviction found no clean resident page. The active write set exceeds
    /// the buffer pool capacity; not a transient condition.
    #[error("buffer pool exhausted: every resident page is dirty")]
    CacheExhausted,

    #[error("page not found: {0}")]
    PageNotFound(PageId),

    #[error("unknown table: {0}")]
    UnknownTable(TableId),

    #[error("page {0} has no free slot")]
    PageFull(PageId),

    #[error("slot {slot} of page {page_id} is empty")]
    EmptySlot { page_id: PageId, slot: u16 },

    #[error("tuple has no record id")]
    MissingRecordId,

    #[error("record id names page {expected} but was applied to page {actual}")]
    WrongPage { expected: PageId, actual: PageId },

    #[error("tuple size mismatch: expected {expected} bytes, got {actual}")]
    TupleSizeMismatch { expected: usize, actual: usize },

    #[error("invalid page data: expected {expected} bytes, got {actual}")]
    InvalidPageData { expected: usize, actual: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
