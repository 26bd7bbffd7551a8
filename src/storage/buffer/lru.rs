use super::replacer::Replacer;
use crate::storage::page::PageId;
use std::collections::{HashSet, VecDeque};

/// Access-order recency list: least recently used at the front. The list is
/// the authority on eviction order; it never relies on map iteration order.
#[derive(Debug, Default)]
pub struct LruReplacer {
    recency: VecDeque<PageId>,
    tracked: HashSet<PageId>,
}

impl LruReplacer {
    pub fn new() -> Self {
        Self::default()
    }

    fn unlink(&mut self, pid: PageId) {
        if self.tracked.remove(&pid) {
            if let Some(pos) = self.recency.iter().position(|&p| p == pid) {
                self.recency.remove(pos);
            }
        }
    }
}

impl Replacer for LruReplacer {
    fn record_access(&mut self, pid: PageId) {
        self.unlink(pid);
        self.recency.push_back(pid);
        self.tracked.insert(pid);
    }

    fn remove(&mut self, pid: PageId) {
        self.unlink(pid);
    }

    fn victim(&mut self, can_evict: &dyn Fn(PageId) -> bool) -> Option<PageId> {
        let pos = self.recency.iter().position(|&pid| can_evict(pid))?;
        let pid = self.recency.remove(pos)?;
        self.tracked.remove(&pid);
        Some(pid)
    }

    fn len(&self) -> usize {
        self.recency.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: u32) -> PageId {
        PageId::new(1, n)
    }

    #[test]
    fn test_evicts_least_recently_used_first() {
        let mut replacer = LruReplacer::new();
        replacer.record_access(pid(0));
        replacer.record_access(pid(1));
        replacer.record_access(pid(2));

        assert_eq!(replacer.victim(&|_| true), Some(pid(0)));
        assert_eq!(replacer.victim(&|_| true), Some(pid(1)));
        assert_eq!(replacer.victim(&|_| true), Some(pid(2)));
        assert_eq!(replacer.victim(&|_| true), None);
    }

    #[test]
    fn test_access_refreshes_recency() {
        let mut replacer = LruReplacer::new();
        replacer.record_access(pid(0));
        replacer.record_access(pid(1));
        replacer.record_access(pid(0));

        assert_eq!(replacer.victim(&|_| true), Some(pid(1)));
        assert_eq!(replacer.victim(&|_| true), Some(pid(0)));
    }

    #[test]
    fn test_victim_skips_ineligible_pages() {
        let mut replacer = LruReplacer::new();
        replacer.record_access(pid(0));
        replacer.record_access(pid(1));
        replacer.record_access(pid(2));

        // Page 0 is ineligible (e.g. dirty); the next oldest wins.
        assert_eq!(replacer.victim(&|p| p != pid(0)), Some(pid(1)));
        // Page 0 stays tracked for a later attempt.
        assert_eq!(replacer.len(), 2);
        assert_eq!(replacer.victim(&|_| false), None);
    }

    #[test]
    fn test_remove_forgets_page() {
        let mut replacer = LruReplacer::new();
        replacer.record_access(pid(0));
        replacer.record_access(pid(1));
        replacer.remove(pid(0));

        assert_eq!(replacer.len(), 1);
        assert_eq!(replacer.victim(&|_| true), Some(pid(1)));
        // Removing an untracked page is a no-op.
        replacer.remove(pid(9));
        assert!(replacer.is_empty());
    }
}
