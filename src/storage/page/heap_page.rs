use crate::access::tuple::{RecordId, Tuple};
use crate::storage::disk::page_size;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageId;
use crate::transaction::TransactionId;

/// A slotted page of fixed-width tuples.
///
/// Layout: a slot-occupancy bitmap (one bit per slot, lowest bit of byte 0 is
/// slot 0) followed by `slot_count` tuple slots of `tuple_size` bytes each.
/// The slot count solves for the bitmap overhead:
/// `floor(8 * page_size / (8 * tuple_size + 1))`.
///
/// The page mutates its serialized buffer in place, so serialization is the
/// identity; bytes of a cleared slot go stale rather than being zeroed.
#[derive(Debug)]
pub struct HeapPage {
    pid: PageId,
    tuple_size: usize,
    slot_count: usize,
    header_size: usize,
    data: Vec<u8>,
    dirtier: Option<TransactionId>,
}

/// Number of slots a page of `page_bytes` can hold at the given tuple width.
pub fn slots_per_page(page_bytes: usize, tuple_size: usize) -> usize {
    (page_bytes * 8) / (tuple_size * 8 + 1)
}

fn header_bytes(slot_count: usize) -> usize {
    slot_count.div_ceil(8)
}

impl HeapPage {
    /// Creates an empty page, all slots free.
    pub fn new_empty(pid: PageId, tuple_size: usize) -> Self {
        let size = page_size();
        let slot_count = slots_per_page(size, tuple_size);
        Self {
            pid,
            tuple_size,
            slot_count,
            header_size: header_bytes(slot_count),
            data: vec![0u8; size],
            dirtier: None,
        }
    }

    /// Deserializes a page from a full-page byte buffer.
    pub fn from_bytes(pid: PageId, data: Vec<u8>, tuple_size: usize) -> StorageResult<Self> {
        let size = page_size();
        if data.len() != size {
            return Err(StorageError::InvalidPageData {
                expected: size,
                actual: data.len(),
            });
        }
        let slot_count = slots_per_page(size, tuple_size);
        Ok(Self {
            pid,
            tuple_size,
            slot_count,
            header_size: header_bytes(slot_count),
            data,
            dirtier: None,
        })
    }

    /// The serialized form; always exactly `page_size()` bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn id(&self) -> PageId {
        self.pid
    }

    pub fn tuple_size(&self) -> usize {
        self.tuple_size
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    fn slot_offset(&self, slot: u16) -> usize {
        self.header_size + slot as usize * self.tuple_size
    }

    fn is_slot_used(&self, slot: u16) -> bool {
        let bit = slot as usize;
        self.data[bit / 8] & (1 << (bit % 8)) != 0
    }

    fn set_slot_used(&mut self, slot: u16, used: bool) {
        let bit = slot as usize;
        if used {
            self.data[bit / 8] |= 1 << (bit % 8);
        } else {
            self.data[bit / 8] &= !(1 << (bit % 8));
        }
    }

    pub fn empty_slot_count(&self) -> usize {
        (0..self.slot_count as u16)
            .filter(|&slot| !self.is_slot_used(slot))
            .count()
    }

    /// Places the tuple into the lowest free slot and stamps its record id.
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> StorageResult<u16> {
        if tuple.data.len() != self.tuple_size {
            return Err(StorageError::TupleSizeMismatch {
                expected: self.tuple_size,
                actual: tuple.data.len(),
            });
        }
        let slot = (0..self.slot_count as u16)
            .find(|&slot| !self.is_slot_used(slot))
            .ok_or(StorageError::PageFull(self.pid))?;

        let offset = self.slot_offset(slot);
        self.data[offset..offset + self.tuple_size].copy_from_slice(&tuple.data);
        self.set_slot_used(slot, true);
        tuple.record_id = Some(RecordId::new(self.pid, slot));
        Ok(slot)
    }

    /// Clears the slot named by the record id. Deleting an empty slot is a
    /// caller contract violation and surfaces as an error.
    pub fn delete_tuple(&mut self, rid: RecordId) -> StorageResult<()> {
        if rid.page_id != self.pid {
            return Err(StorageError::WrongPage {
                expected: rid.page_id,
                actual: self.pid,
            });
        }
        if rid.slot as usize >= self.slot_count || !self.is_slot_used(rid.slot) {
            return Err(StorageError::EmptySlot {
                page_id: self.pid,
                slot: rid.slot,
            });
        }
        self.set_slot_used(rid.slot, false);
        Ok(())
    }

    /// Reads the tuple in the given slot, if occupied.
    pub fn tuple_at(&self, slot: u16) -> Option<Tuple> {
        if slot as usize >= self.slot_count || !self.is_slot_used(slot) {
            return None;
        }
        let offset = self.slot_offset(slot);
        let data = self.data[offset..offset + self.tuple_size].to_vec();
        Some(Tuple {
            record_id: Some(RecordId::new(self.pid, slot)),
            data,
        })
    }

    /// Occupied tuples in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = Tuple> + '_ {
        (0..self.slot_count as u16).filter_map(|slot| self.tuple_at(slot))
    }

    pub fn mark_dirty(&mut self, dirtier: Option<TransactionId>) {
        self.dirtier = dirtier;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirtier.is_some()
    }

    /// The transaction that last dirtied this page, if any.
    pub fn dirtier(&self) -> Option<TransactionId> {
        self.dirtier
    }
}
