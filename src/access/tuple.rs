use crate::storage::page::PageId;
use std::cmp::Ordering;

/// Locates a tuple's storage slot within the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: u16,
}

impl RecordId {
    pub fn new(page_id: PageId, slot: u16) -> Self {
        Self { page_id, slot }
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> Ordering {
        // Page order first, slot order within a page.
        (self.page_id.table_id, self.page_id.page_no, self.slot).cmp(&(
            other.page_id.table_id,
            other.page_id.page_no,
            other.slot,
        ))
    }
}

/// An opaque fixed-width record. The storage engine never interprets the
/// payload; `record_id` is set once the tuple has been placed into a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    pub record_id: Option<RecordId>,
    pub data: Vec<u8>,
}

impl Tuple {
    /// A tuple not yet stored anywhere.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            record_id: None,
            data,
        }
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }
}
