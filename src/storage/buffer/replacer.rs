use crate::storage::page::PageId;
use std::fmt::Debug;

/// Eviction policy seam for the buffer pool. Tracks access recency over
/// resident pages; the pool decides which pages are eligible (clean) via the
/// predicate passed to `victim`.
pub trait Replacer: Send + Debug {
    /// Note that a page was just accessed (or admitted).
    fn record_access(&mut self, pid: PageId);

    /// Forget a page that left the cache.
    fn remove(&mut self, pid: PageId);

    /// Pick the least-recently-used page satisfying `can_evict` and remove
    /// it from the recency structure. None if no tracked page qualifies.
    fn victim(&mut self, can_evict: &dyn Fn(PageId) -> bool) -> Option<PageId>;

    /// Number of tracked pages.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
