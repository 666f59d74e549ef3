use crate::error::SimError;
use crate::geometry::Geometry;
use crate::replacement::{self, AccessOutcome};
use crate::statistics::Statistics;
use crate::trace::AccessKind;

/// One cache slot
///
/// Lines start out invalid, clean, with a zero tag and zero recency. Eviction overwrites the tag
/// and flags in place rather than clearing them first
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct CacheLine {
    pub(crate) valid: bool,
    pub(crate) dirty: bool,
    pub(crate) tag: u64,
    /// Accesses to the owning set since this line was last hit or filled. Larger is older
    pub(crate) recency: u64,
}

impl CacheLine {
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn tag(&self) -> u64 {
        self.tag
    }

    pub fn recency(&self) -> u64 {
        self.recency
    }
}

/// A set-associative cache
///
/// All `2^s * E` lines live in one flat allocation owned by the cache. Set `i` is the slice
/// `lines[i * E..(i + 1) * E]`, and the position of a line within its set never changes
#[derive(Debug)]
pub struct Cache {
    geometry: Geometry,
    lines: Vec<CacheLine>,
}

impl Cache {
    /// Allocates a cache with every line invalid
    ///
    /// The storage is reserved in a single step before any line is written, so either the whole
    /// cache exists or `AllocationFailure` is returned and nothing does
    ///
    /// # Arguments
    ///
    /// * `geometry`: A validated geometry
    ///
    /// returns: Result<Cache, SimError>
    pub fn new(geometry: Geometry) -> Result<Self, SimError> {
        let allocation_failure = || SimError::AllocationFailure {
            sets: geometry.num_sets(),
            associativity: geometry.associativity(),
        };
        let num_lines = geometry.num_lines().ok_or_else(allocation_failure)?;
        let mut lines = Vec::new();
        lines
            .try_reserve_exact(num_lines)
            .map_err(|_| allocation_failure())?;
        lines.resize(num_lines, CacheLine::default());
        tracing::trace!(num_lines, "allocated cache storage");
        Ok(Self { geometry, lines })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// The lines of one set, in index order
    pub fn set(&self, set_index: usize) -> &[CacheLine] {
        let associativity = self.geometry.associativity();
        let start = set_index * associativity;
        &self.lines[start..start + associativity]
    }

    pub(crate) fn set_mut(&mut self, set_index: usize) -> &mut [CacheLine] {
        let associativity = self.geometry.associativity();
        let start = set_index * associativity;
        &mut self.lines[start..start + associativity]
    }

    /// Simulates one access: decodes the address, finds its set, and runs the replacement engine
    /// on it, recording the result in `stats`
    ///
    /// The block, not the byte, is the unit of access, so the transfer size doesn't matter here
    pub fn access(&mut self, address: u64, kind: AccessKind, stats: &mut Statistics) -> AccessOutcome {
        let decoded = self.geometry.decode(address);
        let block_size = self.geometry.block_size();
        let set = self.set_mut(decoded.set_index);
        replacement::access(set, decoded.tag, kind, block_size, stats)
    }

    /// Gets the number of lines that have never been filled. Useful for judging whether a trace
    /// is large enough to exercise the cache
    pub fn invalid_line_count(&self) -> usize {
        self.lines.iter().filter(|line| !line.valid).count()
    }

    /// Recounts the dirty bytes currently held, independently of any running statistics
    pub fn resident_dirty_bytes(&self) -> u64 {
        let dirty_lines = self.lines.iter().filter(|line| line.valid && line.dirty).count() as u64;
        dirty_lines * self.geometry.block_size()
    }

    /// Releases the cache storage. Equivalent to dropping the cache, consuming it means it can only
    /// happen once
    pub fn teardown(self) {
        tracing::trace!(num_lines = self.lines.len(), "releasing cache storage");
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_cache_is_invalid_and_clean() {
        let cache = Cache::new(Geometry::new(3, 2, 4).unwrap()).unwrap();
        assert_eq!(cache.invalid_line_count(), 16);
        assert_eq!(cache.resident_dirty_bytes(), 0);
        for set_index in 0..8 {
            let set = cache.set(set_index);
            assert_eq!(set.len(), 2);
            assert!(set.iter().all(|line| *line == CacheLine::default()));
        }
        cache.teardown();
    }

    #[test]
    fn sets_are_disjoint() {
        let mut cache = Cache::new(Geometry::new(1, 2, 0).unwrap()).unwrap();
        let mut stats = Statistics::default();
        // 0x0 and 0x1 land in different sets
        cache.access(0x0, AccessKind::Store, &mut stats);
        cache.access(0x1, AccessKind::Load, &mut stats);
        assert!(cache.set(0)[0].is_dirty());
        assert!(cache.set(1)[0].is_valid());
        assert!(!cache.set(1)[0].is_dirty());
        assert_eq!(cache.invalid_line_count(), 2);
        assert_eq!(cache.resident_dirty_bytes(), 1);
    }

    #[test]
    fn line_count_beyond_memory_is_allocation_failure() {
        // 3 * 2^62 one-byte lines is a valid geometry, but the line storage can never be reserved
        let geometry = Geometry::new(62, 3, 0).unwrap();
        assert!(matches!(Cache::new(geometry), Err(SimError::AllocationFailure { .. })));
    }

    #[test]
    fn unreservable_storage_is_allocation_failure() {
        // Fits in usize as a line count, but not as a byte count
        let geometry = Geometry::new(60, 1, 0).unwrap();
        assert!(matches!(Cache::new(geometry), Err(SimError::AllocationFailure { .. })));
    }
}
