/*
    AltairPC

    Copyright 2022-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    devices::dcdd::patch_pool.rs

    A fixed-capacity pool of copy-on-write sector patches.

*/

//! Sector writes to a read-only disk image are kept as patches in a [PatchPool].
//!
//! The pool is a fixed arena of slots that is shared by every drive of a controller. Each
//! drive owns a [PatchTable], a small hash table whose buckets hold the index of the first
//! patch in a chain; chains are linked through the `next` field of each slot. Nothing is
//! allocated after construction, and a full pool drops writes instead of failing.

use crate::device_types::dcdd::SECTOR_SIZE;

pub const PATCH_POOL_SIZE: usize = 256;
/// Number of hash buckets per drive. Must be a power of two.
pub const PATCH_HASH_SIZE: usize = 64;

const _: () = assert!(PATCH_HASH_SIZE.is_power_of_two());

#[inline]
fn hash_sector(index: u16) -> usize {
    index as usize & (PATCH_HASH_SIZE - 1)
}

#[derive(Clone)]
pub struct SectorPatch {
    /// Logical sector index this patch overrides. None marks a free slot.
    index: Option<u16>,
    data:  [u8; SECTOR_SIZE],
    next:  Option<u16>,
}

impl Default for SectorPatch {
    fn default() -> Self {
        Self {
            index: None,
            data:  [0; SECTOR_SIZE],
            next:  None,
        }
    }
}

impl SectorPatch {
    pub fn index(&self) -> Option<u16> {
        self.index
    }
    pub fn data(&self) -> &[u8; SECTOR_SIZE] {
        &self.data
    }
}

/// Per-drive hash table of patch chains.
#[derive(Clone, Debug)]
pub struct PatchTable {
    heads: [Option<u16>; PATCH_HASH_SIZE],
    len:   usize,
}

impl Default for PatchTable {
    fn default() -> Self {
        Self {
            heads: [None; PATCH_HASH_SIZE],
            len:   0,
        }
    }
}

impl PatchTable {
    /// Return the number of patches linked into this table.
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PatchPoolStats {
    pub used: usize,
    pub capacity: usize,
    pub dropped_writes: u64,
    pub exhaustion_reports: u32,
}

pub struct PatchPool {
    slots: Vec<SectorPatch>,
    next_free: usize,
    used: usize,
    exhausted: bool,
    dropped_writes: u64,
    exhaustion_reports: u32,
}

impl Default for PatchPool {
    fn default() -> Self {
        Self::new(PATCH_POOL_SIZE)
    }
}

impl PatchPool {
    /// Create a pool with `capacity` slots. Slot links are 16 bits wide, so the capacity is
    /// limited to `u16::MAX` slots.
    pub fn new(capacity: usize) -> Self {
        let max_capacity = u16::MAX as usize;
        if capacity > max_capacity {
            log::warn!(
                "Requested patch pool of {} slots exceeds the maximum, limiting to {}",
                capacity,
                max_capacity
            );
        }
        let capacity = capacity.min(max_capacity);
        log::debug!(
            "Patch pool initialized: {} slots ({} KB)",
            capacity,
            (capacity * std::mem::size_of::<SectorPatch>()) / 1024
        );
        Self {
            slots: vec![SectorPatch::default(); capacity],
            next_free: 0,
            used: 0,
            exhausted: false,
            dropped_writes: 0,
            exhaustion_reports: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn used(&self) -> usize {
        self.used
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn stats(&self) -> PatchPoolStats {
        PatchPoolStats {
            used: self.used,
            capacity: self.capacity(),
            dropped_writes: self.dropped_writes,
            exhaustion_reports: self.exhaustion_reports,
        }
    }

    /// Find the slot holding the patch for `index` in `table`.
    pub fn find(&self, table: &PatchTable, index: u16) -> Option<usize> {
        let mut cursor = table.heads[hash_sector(index)];
        while let Some(slot_idx) = cursor {
            let slot = &self.slots[slot_idx as usize];
            if slot.index == Some(index) {
                return Some(slot_idx as usize);
            }
            cursor = slot.next;
        }
        None
    }

    /// Return the patched contents of sector `index`, if that sector has been written.
    pub fn patch(&self, table: &PatchTable, index: u16) -> Option<&[u8; SECTOR_SIZE]> {
        self.find(table, index).map(|slot_idx| &self.slots[slot_idx].data)
    }

    /// Claim a free slot, scanning from the rotating cursor.
    fn alloc(&mut self) -> Option<usize> {
        let capacity = self.capacity();
        for i in 0..capacity {
            let slot_idx = (self.next_free + i) % capacity;
            if self.slots[slot_idx].index.is_none() {
                self.next_free = (slot_idx + 1) % capacity;
                self.used += 1;
                return Some(slot_idx);
            }
        }

        if !self.exhausted {
            self.exhausted = true;
            self.exhaustion_reports += 1;
            log::error!(
                "Patch pool exhausted ({}/{}). Disk writes will be lost!",
                self.used,
                capacity
            );
        }
        None
    }

    /// Return the slot holding the patch for `index`, allocating and linking a zeroed patch on
    /// first use. Returns None if the pool is exhausted.
    pub fn get_or_alloc(&mut self, table: &mut PatchTable, index: u16) -> Option<usize> {
        if let Some(existing) = self.find(table, index) {
            return Some(existing);
        }

        let slot_idx = self.alloc()?;
        let bucket = hash_sector(index);
        let slot = &mut self.slots[slot_idx];
        slot.index = Some(index);
        slot.data.fill(0);
        slot.next = table.heads[bucket];
        table.heads[bucket] = Some(slot_idx as u16);
        table.len += 1;
        Some(slot_idx)
    }

    /// Store a sector's contents as the patch for `index`.
    /// Returns false if the pool is exhausted and the data was dropped.
    pub fn store(&mut self, table: &mut PatchTable, index: u16, data: &[u8]) -> bool {
        match self.get_or_alloc(table, index) {
            Some(slot_idx) => {
                let len = data.len().min(SECTOR_SIZE);
                self.slots[slot_idx].data[..len].copy_from_slice(&data[..len]);
                true
            }
            None => {
                self.dropped_writes += 1;
                log::trace!("Dropped write to sector index {}", index);
                false
            }
        }
    }

    /// Return every patch linked into `table` to the pool. Returns the number of patches freed.
    pub fn clear(&mut self, table: &mut PatchTable) -> usize {
        let mut freed = 0;
        for head in table.heads.iter_mut() {
            let mut cursor = head.take();
            while let Some(slot_idx) = cursor {
                let slot = &mut self.slots[slot_idx as usize];
                cursor = slot.next.take();
                slot.index = None;
                self.used = self.used.saturating_sub(1);
                freed += 1;
            }
        }
        table.len = 0;
        // Capacity may be available again.
        self.exhausted = false;
        freed
    }
}
