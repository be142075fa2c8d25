//! Slot addressing and allocation
//!
//! Slot `n` lives at `data_offset + n * (record_size + 1)`. Slots are never
//! removed from the file: deleting a record flags its slot, and the slot
//! number goes into the free set until a later create reuses it.

use std::collections::BTreeSet;

/// Pure arithmetic between record numbers and file offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    data_offset: u64,
    slot_size: u64,
}

impl SlotLayout {
    /// `slot_size` includes the deletion flag byte.
    pub fn new(data_offset: u64, slot_size: usize) -> Self {
        Self {
            data_offset,
            slot_size: slot_size as u64,
        }
    }

    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    pub fn slot_size(&self) -> u64 {
        self.slot_size
    }

    /// Byte offset of the slot holding `record_number`
    pub fn position_of(&self, record_number: u32) -> u64 {
        self.data_offset + u64::from(record_number) * self.slot_size
    }

    /// Number of whole slots in a file of `file_len` bytes and the leftover bytes
    pub fn slots_in(&self, file_len: u64) -> (u64, u64) {
        let region = file_len.saturating_sub(self.data_offset);
        (region / self.slot_size, region % self.slot_size)
    }
}

/// A slot handed out by the allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub record_number: u32,
    /// True when a deleted slot is being reused rather than appended
    pub reused: bool,
}

/// Tracks how many slots exist and which of them are free.
///
/// Invariant: a record number is in the free set exactly when its slot is
/// flagged deleted and has not been reused since.
#[derive(Debug, Clone)]
pub struct SlotAllocator {
    record_count: u32,
    free: BTreeSet<u32>,
}

impl SlotAllocator {
    /// Seed from the open-time scan.
    pub fn new(record_count: u32, free: BTreeSet<u32>) -> Self {
        debug_assert!(free.iter().all(|n| *n < record_count));
        Self {
            record_count,
            free,
        }
    }

    /// Slots in the file, live and deleted
    pub fn record_count(&self) -> u32 {
        self.record_count
    }

    /// Takes the smallest free slot, or appends one past end of file.
    pub fn next_free_slot(&mut self) -> Allocation {
        match self.free.pop_first() {
            Some(record_number) => Allocation {
                record_number,
                reused: true,
            },
            None => {
                let record_number = self.record_count;
                self.record_count += 1;
                Allocation {
                    record_number,
                    reused: false,
                }
            }
        }
    }

    /// Returns an allocation whose slot was put back the way it was found:
    /// flagged deleted when reused, cut off the file when appended.
    pub fn abandon(&mut self, allocation: Allocation) {
        if !allocation.reused && allocation.record_number + 1 == self.record_count {
            self.record_count -= 1;
        } else {
            self.free.insert(allocation.record_number);
        }
    }

    /// Marks a slot reusable after its record was deleted.
    pub fn release(&mut self, record_number: u32) {
        debug_assert!(record_number < self.record_count);
        self.free.insert(record_number);
    }

    /// Free slot numbers in ascending order
    pub fn free_slots(&self) -> Vec<u32> {
        self.free.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> SlotLayout {
        SlotLayout::new(36, 73)
    }

    #[test]
    fn test_position_of() {
        let layout = layout();
        for n in [0u32, 1, 2, 99, 4096] {
            assert_eq!(layout.position_of(n), 36 + u64::from(n) * 73);
        }
    }

    #[test]
    fn test_slots_in() {
        let layout = layout();
        assert_eq!(layout.slots_in(36), (0, 0));
        assert_eq!(layout.slots_in(36 + 73 * 3), (3, 0));
        assert_eq!(layout.slots_in(36 + 73 * 3 + 5), (3, 5));
    }

    #[test]
    fn test_append_when_no_free_slot() {
        let mut alloc = SlotAllocator::new(2, BTreeSet::new());
        let a = alloc.next_free_slot();
        assert_eq!(a, Allocation { record_number: 2, reused: false });
        assert_eq!(alloc.record_count(), 3);
    }

    #[test]
    fn test_smallest_free_slot_first() {
        let free: BTreeSet<u32> = [4, 1, 3].into_iter().collect();
        let mut alloc = SlotAllocator::new(5, free);

        assert_eq!(alloc.next_free_slot().record_number, 1);
        assert_eq!(alloc.next_free_slot().record_number, 3);
        assert_eq!(alloc.next_free_slot().record_number, 4);
        assert_eq!(alloc.next_free_slot(), Allocation { record_number: 5, reused: false });
    }

    #[test]
    fn test_release_then_reuse() {
        let mut alloc = SlotAllocator::new(3, BTreeSet::new());
        alloc.release(1);
        assert_eq!(alloc.free_slots(), vec![1]);

        let a = alloc.next_free_slot();
        assert_eq!(a, Allocation { record_number: 1, reused: true });
        assert!(alloc.free_slots().is_empty());
    }

    #[test]
    fn test_abandon_restores_state() {
        let mut alloc = SlotAllocator::new(3, BTreeSet::new());
        let appended = alloc.next_free_slot();
        alloc.abandon(appended);
        assert_eq!(alloc.record_count(), 3);

        alloc.release(0);
        let reused = alloc.next_free_slot();
        alloc.abandon(reused);
        assert_eq!(alloc.free_slots(), vec![0]);
    }
}
