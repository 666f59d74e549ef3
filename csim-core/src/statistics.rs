use serde::{Deserialize, Serialize};

/// Counters accumulated over a whole trace. Can be serialised to the JSON output format
///
/// Only the replacement engine changes these, everything else gets read access
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    hits: u64,
    misses: u64,
    evictions: u64,
    /// Bytes held in dirty lines right now, never more than the cache capacity
    dirty_bytes_resident: u64,
    /// Bytes written back by evicting dirty lines, over the whole run. Unbounded by the capacity,
    /// hence the wider type
    dirty_bytes_evicted: u128,
}

impl Statistics {
    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    pub fn dirty_bytes_resident(&self) -> u64 {
        self.dirty_bytes_resident
    }

    pub fn dirty_bytes_evicted(&self) -> u128 {
        self.dirty_bytes_evicted
    }

    /// Number of accesses counted so far
    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    pub(crate) fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub(crate) fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub(crate) fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// A clean line became dirty
    pub(crate) fn add_dirty_bytes(&mut self, block_size: u64) {
        self.dirty_bytes_resident += block_size;
    }

    /// A dirty line was evicted, moving its bytes from resident to evicted
    pub(crate) fn write_back(&mut self, block_size: u64) {
        debug_assert!(self.dirty_bytes_resident >= block_size, "write back of a block that was never dirtied");
        self.dirty_bytes_resident -= block_size;
        self.dirty_bytes_evicted += u128::from(block_size);
    }
}
