pub mod lru;
pub mod replacer;

use crate::access::tuple::Tuple;
use crate::catalog::{Catalog, TableId};
use crate::concurrency::lock::{LockManager, Permission};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{HeapPage, PageId};
use crate::transaction::TransactionId;
use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use replacer::Replacer;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// A cached page, shared between the pool and every transaction touching it.
/// Content mutation is only safe while holding the page's exclusive lock in
/// the lock manager; the RwLock guards the bytes themselves.
pub type SharedPage = Arc<RwLock<HeapPage>>;

/// Default number of resident pages.
pub const DEFAULT_CAPACITY: usize = 50;

/// How long `get_page` keeps polling the lock manager before declaring the
/// transaction aborted. Crude deadlock avoidance: two genuinely deadlocked
/// transactions each time out independently.
const LOCK_WAIT_TIMEOUT: Duration = Duration::from_millis(150);

struct PoolInner {
    pages: HashMap<PageId, SharedPage>,
    replacer: Box<dyn Replacer>,
}

/// Bounded page cache fronting the heap files. Every page access goes
/// through here, which is what makes the lock manager's two-phase locking
/// actually cover all traffic.
///
/// Eviction is LRU over clean pages only (no-steal); a transaction's dirty
/// pages are flushed at commit (force) or dropped at abort.
pub struct BufferPool {
    capacity: usize,
    catalog: Arc<Catalog>,
    lock_manager: LockManager,
    inner: Mutex<PoolInner>,
}

impl BufferPool {
    pub fn new(catalog: Arc<Catalog>, replacer: Box<dyn Replacer>, capacity: usize) -> Self {
        Self {
            capacity,
            catalog,
            lock_manager: LockManager::new(),
            inner: Mutex::new(PoolInner {
                pages: HashMap::with_capacity(capacity),
                replacer,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of pages currently resident; never exceeds `capacity`.
    pub fn resident_page_count(&self) -> usize {
        self.inner.lock().pages.len()
    }

    /// Fetches a page on behalf of a transaction, blocking (bounded
    /// busy-poll) until the requested lock is granted. A `None` transaction
    /// id bypasses locking entirely.
    pub fn get_page(
        &self,
        tid: Option<TransactionId>,
        pid: PageId,
        perm: Permission,
    ) -> StorageResult<SharedPage> {
        if let Some(tid) = tid {
            let start = Instant::now();
            while !self.lock_manager.try_acquire(Some(tid), pid, perm) {
                if start.elapsed() > LOCK_WAIT_TIMEOUT {
                    warn!("{} timed out waiting for {:?} on page {}", tid, perm, pid);
                    return Err(StorageError::TransactionAborted(tid));
                }
                thread::yield_now();
            }
        }

        let mut inner = self.inner.lock();
        if let Some(page) = inner.pages.get(&pid).map(Arc::clone) {
            inner.replacer.record_access(pid);
            return Ok(page);
        }

        if inner.pages.len() >= self.capacity {
            Self::evict_page(&mut inner)?;
        }
        let file = self.catalog.file(pid.table_id)?;
        let page = Arc::new(RwLock::new(file.read_page(pid)?));
        inner.pages.insert(pid, Arc::clone(&page));
        inner.replacer.record_access(pid);
        Ok(page)
    }

    /// Inserts a tuple into the given table under an exclusive page lock,
    /// then marks every touched page dirtied-by-`tid` and (re)admits it.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: TableId,
        tuple: &mut Tuple,
    ) -> StorageResult<()> {
        let file = self.catalog.file(table_id)?;
        let dirtied = file.insert_tuple(self, tid, tuple)?;
        self.admit_dirtied(tid, dirtied)
    }

    /// Clears the tuple's slot under an exclusive page lock. The tuple must
    /// carry a record id from a previous insertion.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> StorageResult<()> {
        let rid = tuple.record_id().ok_or(StorageError::MissingRecordId)?;
        let file = self.catalog.file(rid.page_id.table_id)?;
        let dirtied = file.delete_tuple(self, tid, tuple)?;
        self.admit_dirtied(tid, dirtied)
    }

    fn admit_dirtied(&self, tid: TransactionId, pages: Vec<SharedPage>) -> StorageResult<()> {
        let mut inner = self.inner.lock();
        for page in pages {
            let pid = {
                let mut guard = page.write();
                guard.mark_dirty(Some(tid));
                guard.id()
            };
            if !inner.pages.contains_key(&pid) && inner.pages.len() >= self.capacity {
                Self::evict_page(&mut inner)?;
            }
            // Overwrites any stale cached copy of the page.
            inner.pages.insert(pid, page);
            inner.replacer.record_access(pid);
        }
        Ok(())
    }

    /// Commits (`true`) or aborts (`false`) a transaction: flushes or
    /// discards exactly the pages it dirtied, then releases all its locks.
    /// No-op when the transaction holds nothing.
    ///
    /// Locks are released even when a commit-time flush fails; the failed
    /// flush's page and any not yet flushed are discarded like an abort, so
    /// the error never strands locks or dirty pages in the cache. Pages
    /// flushed before the failure stay committed.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> StorageResult<()> {
        let locked = self.lock_manager.locked_pages(tid);
        let mut failed = None;
        if !locked.is_empty() {
            let mut inner = self.inner.lock();
            for pid in locked {
                let Some(page) = inner.pages.get(&pid).map(Arc::clone) else {
                    continue;
                };
                if page.read().dirtier() != Some(tid) {
                    continue;
                }
                if commit && failed.is_none() {
                    match self.flush_committed(pid, &page) {
                        Ok(()) => continue,
                        Err(err) => failed = Some(err),
                    }
                }
                // Drop the uncommitted copy so the next reader re-reads
                // the last committed version from disk.
                inner.pages.remove(&pid);
                inner.replacer.remove(pid);
                debug!("dropped uncommitted page {} of {}", pid, tid);
            }
        }
        self.lock_manager.release_all(tid);
        match failed {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn flush_committed(&self, pid: PageId, page: &SharedPage) -> StorageResult<()> {
        let file = self.catalog.file(pid.table_id)?;
        let mut guard = page.write();
        file.write_page(&guard)?;
        guard.mark_dirty(None);
        Ok(())
    }

    /// Commits the transaction. Equivalent to `transaction_complete(tid, true)`.
    pub fn commit(&self, tid: TransactionId) -> StorageResult<()> {
        self.transaction_complete(tid, true)
    }

    /// Flushes every dirty resident page to its heap file.
    pub fn flush_all_pages(&self) -> StorageResult<()> {
        let inner = self.inner.lock();
        for (pid, page) in &inner.pages {
            let mut guard = page.write();
            if guard.is_dirty() {
                self.catalog.file(pid.table_id)?.write_page(&guard)?;
                guard.mark_dirty(None);
            }
        }
        Ok(())
    }

    /// Drops a page from the cache without flushing it.
    pub fn discard_page(&self, pid: PageId) {
        let mut inner = self.inner.lock();
        inner.pages.remove(&pid);
        inner.replacer.remove(pid);
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_manager.holds(tid, pid)
    }

    /// Releases a single page lock before transaction end. This breaks
    /// two-phase locking; callers must know the page was not modified and
    /// will not be re-read.
    pub fn release_page(&self, tid: TransactionId, pid: PageId) {
        self.lock_manager.release(tid, pid);
    }

    fn evict_page(inner: &mut PoolInner) -> StorageResult<()> {
        let PoolInner { pages, replacer } = inner;
        let victim = replacer
            .victim(&|pid| pages.get(&pid).map_or(true, |page| !page.read().is_dirty()))
            .ok_or(StorageError::CacheExhausted)?;
        pages.remove(&victim);
        debug!("evicted clean page {}", victim);
        Ok(())
    }
}
