//! Page-level lock management for strict two-phase locking.
//!
//! The manager grants shared and exclusive page locks per transaction,
//! supporting upgrade of a sole-holder shared lock. It never waits: every
//! acquisition attempt returns immediately, and the 150ms backoff loop lives
//! in the buffer pool's `get_page`.

use crate::storage::page::PageId;
use crate::transaction::TransactionId;
use log::trace;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Access level requested on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Shared lock for read access.
    Shared,
    /// Exclusive lock for write access.
    Exclusive,
}

impl Permission {
    pub fn is_exclusive(&self) -> bool {
        matches!(self, Permission::Exclusive)
    }

    /// Two locks may coexist on one page only if both are shared.
    pub fn is_compatible_with(&self, other: &Permission) -> bool {
        matches!((self, other), (Permission::Shared, Permission::Shared))
    }
}

/// The two lock-table views: by transaction and by page. Both live behind
/// one mutex so they can never drift apart.
#[derive(Debug, Default)]
struct LockTable {
    by_txn: HashMap<TransactionId, HashMap<PageId, Permission>>,
    by_page: HashMap<PageId, HashMap<TransactionId, Permission>>,
}

impl LockTable {
    fn grant(&mut self, tid: TransactionId, pid: PageId, perm: Permission) {
        self.by_txn.entry(tid).or_default().insert(pid, perm);
        self.by_page.entry(pid).or_default().insert(tid, perm);
    }

    fn try_acquire(&mut self, tid: TransactionId, pid: PageId, perm: Permission) -> bool {
        let held = self
            .by_page
            .get(&pid)
            .and_then(|holders| holders.get(&tid))
            .copied();

        match held {
            // An exclusive lock satisfies any request.
            Some(Permission::Exclusive) => true,
            Some(Permission::Shared) if !perm.is_exclusive() => true,
            Some(Permission::Shared) => {
                // Upgrade only when tid is the page's sole shared holder.
                let sole_holder = self.by_page.get(&pid).map_or(false, |h| h.len() == 1);
                if sole_holder {
                    self.grant(tid, pid, Permission::Exclusive);
                    trace!("{} upgraded to exclusive on page {}", tid, pid);
                }
                sole_holder
            }
            None => {
                let grantable = self.by_page.get(&pid).map_or(true, |holders| {
                    holders.values().all(|held| held.is_compatible_with(&perm))
                });
                if grantable {
                    self.grant(tid, pid, perm);
                    trace!("{} acquired {:?} on page {}", tid, perm, pid);
                }
                grantable
            }
        }
    }

    fn release(&mut self, tid: TransactionId, pid: PageId) {
        if let Some(pages) = self.by_txn.get_mut(&tid) {
            pages.remove(&pid);
            if pages.is_empty() {
                self.by_txn.remove(&tid);
            }
        }
        if let Some(holders) = self.by_page.get_mut(&pid) {
            holders.remove(&tid);
            if holders.is_empty() {
                self.by_page.remove(&pid);
            }
        }
    }
}

/// Grants and tracks page locks. All mutations run under a single critical
/// section; callers poll `try_acquire` rather than blocking here.
#[derive(Debug, Default)]
pub struct LockManager {
    table: Mutex<LockTable>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-blocking acquisition attempt. A `None` transaction id is an
    /// internal system access that bypasses two-phase locking: it always
    /// succeeds and records nothing.
    pub fn try_acquire(
        &self,
        tid: Option<TransactionId>,
        pid: PageId,
        perm: Permission,
    ) -> bool {
        let Some(tid) = tid else {
            return true;
        };
        self.table.lock().try_acquire(tid, pid, perm)
    }

    /// Drops tid's lock on pid if present; no-op otherwise.
    pub fn release(&self, tid: TransactionId, pid: PageId) {
        self.table.lock().release(tid, pid);
    }

    /// Drops every lock held by tid.
    pub fn release_all(&self, tid: TransactionId) {
        let mut table = self.table.lock();
        if let Some(pages) = table.by_txn.remove(&tid) {
            for pid in pages.keys() {
                if let Some(holders) = table.by_page.get_mut(pid) {
                    holders.remove(&tid);
                    if holders.is_empty() {
                        table.by_page.remove(pid);
                    }
                }
            }
            trace!("{} released all locks", tid);
        }
    }

    pub fn holds(&self, tid: TransactionId, pid: PageId) -> bool {
        self.table
            .lock()
            .by_txn
            .get(&tid)
            .map_or(false, |pages| pages.contains_key(&pid))
    }

    /// Every page tid currently holds a lock on; empty if none.
    pub fn locked_pages(&self, tid: TransactionId) -> Vec<PageId> {
        self.table
            .lock()
            .by_txn
            .get(&tid)
            .map(|pages| pages.keys().copied().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: u32) -> PageId {
        PageId::new(1, n)
    }

    fn tid(n: u64) -> Option<TransactionId> {
        Some(TransactionId::new(n))
    }

    #[test]
    fn test_permission_compatibility() {
        assert!(Permission::Shared.is_compatible_with(&Permission::Shared));
        assert!(!Permission::Shared.is_compatible_with(&Permission::Exclusive));
        assert!(!Permission::Exclusive.is_compatible_with(&Permission::Shared));
        assert!(!Permission::Exclusive.is_compatible_with(&Permission::Exclusive));
    }

    #[test]
    fn test_none_tid_always_succeeds_without_recording() {
        let manager = LockManager::new();
        assert!(manager.try_acquire(tid(1), pid(0), Permission::Exclusive));
        // System access ignores the existing exclusive lock.
        assert!(manager.try_acquire(None, pid(0), Permission::Exclusive));
        assert!(manager.try_acquire(None, pid(0), Permission::Shared));
    }

    #[test]
    fn test_shared_locks_coexist() {
        let manager = LockManager::new();
        assert!(manager.try_acquire(tid(1), pid(0), Permission::Shared));
        assert!(manager.try_acquire(tid(2), pid(0), Permission::Shared));
        assert!(manager.try_acquire(tid(3), pid(0), Permission::Shared));
        assert!(manager.holds(TransactionId::new(1), pid(0)));
        assert!(manager.holds(TransactionId::new(3), pid(0)));
    }

    #[test]
    fn test_exclusive_excludes_everyone() {
        let manager = LockManager::new();
        assert!(manager.try_acquire(tid(1), pid(0), Permission::Exclusive));
        assert!(!manager.try_acquire(tid(2), pid(0), Permission::Shared));
        assert!(!manager.try_acquire(tid(2), pid(0), Permission::Exclusive));
        // Other pages are unaffected.
        assert!(manager.try_acquire(tid(2), pid(1), Permission::Exclusive));
    }

    #[test]
    fn test_shared_blocks_fresh_exclusive() {
        let manager = LockManager::new();
        assert!(manager.try_acquire(tid(1), pid(0), Permission::Shared));
        assert!(!manager.try_acquire(tid(2), pid(0), Permission::Exclusive));
    }

    #[test]
    fn test_grant_checks_compatibility_with_every_holder() {
        let manager = LockManager::new();
        assert!(manager.try_acquire(tid(1), pid(0), Permission::Shared));
        assert!(manager.try_acquire(tid(2), pid(0), Permission::Shared));
        // A third party can still join the readers but not write.
        assert!(!manager.try_acquire(tid(3), pid(0), Permission::Exclusive));
        assert!(manager.try_acquire(tid(3), pid(0), Permission::Shared));
    }

    #[test]
    fn test_reacquire_is_a_noop() {
        let manager = LockManager::new();
        assert!(manager.try_acquire(tid(1), pid(0), Permission::Exclusive));
        assert!(manager.try_acquire(tid(1), pid(0), Permission::Exclusive));
        // A shared request is satisfied by the held exclusive lock.
        assert!(manager.try_acquire(tid(1), pid(0), Permission::Shared));
        assert_eq!(manager.locked_pages(TransactionId::new(1)), vec![pid(0)]);
    }

    #[test]
    fn test_upgrade_succeeds_for_sole_holder() {
        let manager = LockManager::new();
        assert!(manager.try_acquire(tid(1), pid(0), Permission::Shared));
        assert!(manager.try_acquire(tid(1), pid(0), Permission::Exclusive));
        // The upgrade is real: a second shared request now fails.
        assert!(!manager.try_acquire(tid(2), pid(0), Permission::Shared));
    }

    #[test]
    fn test_upgrade_fails_with_other_shared_holders() {
        let manager = LockManager::new();
        assert!(manager.try_acquire(tid(1), pid(0), Permission::Shared));
        assert!(manager.try_acquire(tid(2), pid(0), Permission::Shared));
        assert!(!manager.try_acquire(tid(1), pid(0), Permission::Exclusive));
        // The failed upgrade leaves the shared lock in place.
        assert!(manager.holds(TransactionId::new(1), pid(0)));

        // Once the other holder releases, a retry upgrades.
        manager.release(TransactionId::new(2), pid(0));
        assert!(manager.try_acquire(tid(1), pid(0), Permission::Exclusive));
    }

    #[test]
    fn test_release_frees_the_page() {
        let manager = LockManager::new();
        assert!(manager.try_acquire(tid(1), pid(0), Permission::Exclusive));
        manager.release(TransactionId::new(1), pid(0));
        assert!(!manager.holds(TransactionId::new(1), pid(0)));
        assert!(manager.try_acquire(tid(2), pid(0), Permission::Exclusive));
    }

    #[test]
    fn test_release_unheld_lock_is_a_noop() {
        let manager = LockManager::new();
        manager.release(TransactionId::new(1), pid(0));
        assert!(manager.locked_pages(TransactionId::new(1)).is_empty());
    }

    #[test]
    fn test_release_all() {
        let manager = LockManager::new();
        assert!(manager.try_acquire(tid(1), pid(0), Permission::Shared));
        assert!(manager.try_acquire(tid(1), pid(1), Permission::Exclusive));
        assert!(manager.try_acquire(tid(2), pid(0), Permission::Shared));
        assert_eq!(manager.locked_pages(TransactionId::new(1)).len(), 2);

        manager.release_all(TransactionId::new(1));
        assert!(manager.locked_pages(TransactionId::new(1)).is_empty());
        // tid 2's shared lock survives.
        assert!(manager.holds(TransactionId::new(2), pid(0)));
        // pid 1 is free again.
        assert!(manager.try_acquire(tid(3), pid(1), Permission::Exclusive));
    }

    #[test]
    fn test_locked_pages_lists_every_held_page() {
        let manager = LockManager::new();
        for n in 0..4 {
            assert!(manager.try_acquire(tid(9), pid(n), Permission::Shared));
        }
        let mut pages = manager.locked_pages(TransactionId::new(9));
        pages.sort_by_key(|p| p.page_no);
        assert_eq!(pages, vec![pid(0), pid(1), pid(2), pid(3)]);
    }
}
