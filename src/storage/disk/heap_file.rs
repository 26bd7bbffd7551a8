use crate::access::tuple::Tuple;
use crate::catalog::TableId;
use crate::concurrency::lock::Permission;
use crate::storage::buffer::{BufferPool, SharedPage};
use crate::storage::disk::page_size;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{HeapPage, PageId};
use crate::transaction::TransactionId;
use log::debug;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// A table's backing file: an unordered array of fixed-size slotted pages.
///
/// The file handle sits behind a mutex so the buffer pool can share one
/// `HeapFile` across transactions; page-level isolation comes from the lock
/// manager, not from here.
#[derive(Debug)]
pub struct HeapFile {
    file: Mutex<File>,
    table_id: TableId,
    tuple_size: usize,
}

impl HeapFile {
    /// Creates a new empty heap file, truncating anything at `path`.
    pub fn create(path: &Path, table_id: TableId, tuple_size: usize) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            file: Mutex::new(file),
            table_id,
            tuple_size,
        })
    }

    /// Opens an existing heap file.
    pub fn open(path: &Path, table_id: TableId, tuple_size: usize) -> StorageResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
            table_id,
            tuple_size,
        })
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn tuple_size(&self) -> usize {
        self.tuple_size
    }

    /// Pages in the file, recomputed from the current file length so pages
    /// appended behind our back are visible.
    pub fn num_pages(&self) -> StorageResult<u32> {
        let len = self.file.lock().metadata()?.len();
        Ok((len / page_size() as u64) as u32)
    }

    /// Reads the full page at `pid`'s offset. Partial pages are never read;
    /// a page number at or beyond the file end is an error.
    pub fn read_page(&self, pid: PageId) -> StorageResult<HeapPage> {
        if pid.table_id != self.table_id || pid.page_no >= self.num_pages()? {
            return Err(StorageError::PageNotFound(pid));
        }
        let mut buf = vec![0u8; page_size()];
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(Self::page_offset(pid.page_no)))?;
            file.read_exact(&mut buf)?;
        }
        HeapPage::from_bytes(pid, buf, self.tuple_size)
    }

    /// Writes the page's full serialized form back to its offset, growing
    /// the file if needed, and syncs (force-at-commit durability).
    pub fn write_page(&self, page: &HeapPage) -> StorageResult<()> {
        let offset = Self::page_offset(page.id().page_no);
        let mut file = self.file.lock();
        if offset >= file.metadata()?.len() {
            file.set_len(offset + page_size() as u64)?;
        }
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(page.bytes())?;
        file.sync_all()?;
        Ok(())
    }

    /// Inserts a tuple into the first page with a free slot, fetching pages
    /// through the buffer pool under exclusive permission. When every page
    /// is full, allocates exactly one new page and persists it immediately,
    /// so the file grows before the page is ever cached. Returns the one
    /// page this call dirtied.
    pub fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> StorageResult<Vec<SharedPage>> {
        if tuple.data.len() != self.tuple_size {
            return Err(StorageError::TupleSizeMismatch {
                expected: self.tuple_size,
                actual: tuple.data.len(),
            });
        }

        for page_no in 0..self.num_pages()? {
            let pid = PageId::new(self.table_id, page_no);
            let page = pool.get_page(Some(tid), pid, Permission::Exclusive)?;
            let mut guard = page.write();
            if guard.empty_slot_count() > 0 {
                guard.insert_tuple(tuple)?;
                drop(guard);
                return Ok(vec![page]);
            }
        }

        // Every existing page is full: append page number num_pages(),
        // persisting it empty so the file grows before the page is cached,
        // then insert into the cached copy under the exclusive lock.
        let pid = PageId::new(self.table_id, self.num_pages()?);
        self.write_page(&HeapPage::new_empty(pid, self.tuple_size))?;
        debug!("table {} grew to page {}", self.table_id, pid.page_no);
        let page = pool.get_page(Some(tid), pid, Permission::Exclusive)?;
        page.write().insert_tuple(tuple)?;
        Ok(vec![page])
    }

    /// Clears the slot named by the tuple's record id. Returns the one page
    /// this call dirtied.
    pub fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> StorageResult<Vec<SharedPage>> {
        let rid = tuple.record_id().ok_or(StorageError::MissingRecordId)?;
        let page = pool.get_page(Some(tid), rid.page_id, Permission::Exclusive)?;
        page.write().delete_tuple(rid)?;
        Ok(vec![page])
    }

    /// Lazy scan over every occupied slot in (page, slot) order. Each page
    /// is fetched through the buffer pool under the given transaction, so
    /// the scan participates in locking.
    pub fn iter<'a>(
        &'a self,
        pool: &'a BufferPool,
        tid: TransactionId,
    ) -> StorageResult<HeapFileIterator<'a>> {
        Ok(HeapFileIterator {
            file: self,
            pool,
            tid,
            num_pages: self.num_pages()?,
            next_page: 0,
            current: Vec::new().into_iter(),
        })
    }

    fn page_offset(page_no: u32) -> u64 {
        page_no as u64 * page_size() as u64
    }
}

/// Forward-only tuple scan over a heap file. Pages are fetched one at a
/// time, only once the previous page's slots are exhausted.
pub struct HeapFileIterator<'a> {
    file: &'a HeapFile,
    pool: &'a BufferPool,
    tid: TransactionId,
    num_pages: u32,
    next_page: u32,
    current: std::vec::IntoIter<Tuple>,
}

impl HeapFileIterator<'_> {
    /// Restarts the scan from the first page, re-snapshotting the page
    /// count.
    pub fn rewind(&mut self) -> StorageResult<()> {
        self.num_pages = self.file.num_pages()?;
        self.next_page = 0;
        self.current = Vec::new().into_iter();
        Ok(())
    }
}

impl Iterator for HeapFileIterator<'_> {
    type Item = StorageResult<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(tuple) = self.current.next() {
                return Some(Ok(tuple));
            }
            if self.next_page >= self.num_pages {
                return None;
            }
            let pid = PageId::new(self.file.table_id(), self.next_page);
            self.next_page += 1;
            let page = match self.pool.get_page(Some(self.tid), pid, Permission::Shared) {
                Ok(page) => page,
                Err(err) => return Some(Err(err)),
            };
            self.current = page.read().iter().collect::<Vec<_>>().into_iter();
        }
    }
}
