//! Storage engine kernel.
//!
//! Everything here revolves around fixed-size pages as the unit of I/O and
//! caching:
//!
//! - **HeapPage**: bitmap-delimited slotted page holding fixed-width tuples
//! - **HeapFile**: a table's backing file, an unordered array of pages
//! - **BufferPool**: bounded page cache fronting the heap files, mediating
//!   every access through the lock manager
//!
//! Durability follows a no-steal / force-at-commit discipline: dirty pages
//! are never evicted, and a transaction's dirty pages are flushed
//! synchronously when it commits.

pub mod buffer;
pub mod disk;
pub mod error;
pub mod page;

pub use buffer::{BufferPool, SharedPage, DEFAULT_CAPACITY};
pub use disk::{heap_file::HeapFile, page_size, DEFAULT_PAGE_SIZE};
pub use error::{StorageError, StorageResult};
pub use page::{HeapPage, PageId};
