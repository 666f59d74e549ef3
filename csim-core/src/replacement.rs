//! Least recently used replacement with write-back, write-allocate dirty tracking
//!
//! Each line carries a recency counter: the number of accesses to its set since it was last hit or
//! filled. Every access resets the touched line to 0 and ages every other line in the set by 1,
//! invalid lines included, so the line with the largest counter is the least recently used.

use crate::cache::CacheLine;
use crate::statistics::Statistics;
use crate::trace::AccessKind;

/// What a single access did to its set
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AccessOutcome {
    Hit,
    /// Miss filled into an empty line
    Miss,
    /// Miss that displaced the least recently used line
    MissEviction,
}

/// Runs one access against a set, updating recency, dirty flags, and `stats`
///
/// In order: a valid line with a matching tag is a hit; otherwise the block is filled into the
/// first invalid line; otherwise the least recently used line is evicted (see [`select_victim`])
/// and the block filled there. A dirty victim is always written back, whatever the new access is.
///
/// Dirty bytes move in whole blocks of `block_size`, regardless of how many bytes the access
/// itself transferred
///
/// # Arguments
///
/// * `set`: The `E` lines of the set the address maps to
/// * `tag`: The tag of the address
/// * `kind`: Load or store. Stores dirty the line they touch
/// * `block_size`: `2^b`
/// * `stats`: The counters for the whole run
///
/// returns: AccessOutcome
pub fn access(set: &mut [CacheLine], tag: u64, kind: AccessKind, block_size: u64, stats: &mut Statistics) -> AccessOutcome {
    if let Some(index) = set.iter().position(|line| line.valid && line.tag == tag) {
        stats.record_hit();
        touch(set, index);
        let line = &mut set[index];
        if kind == AccessKind::Store && !line.dirty {
            line.dirty = true;
            stats.add_dirty_bytes(block_size);
        }
        return AccessOutcome::Hit;
    }

    stats.record_miss();
    if let Some(index) = set.iter().position(|line| !line.valid) {
        fill(set, index, tag, kind, block_size, stats);
        return AccessOutcome::Miss;
    }

    stats.record_eviction();
    let victim = select_victim(set);
    if set[victim].dirty {
        stats.write_back(block_size);
    }
    fill(set, victim, tag, kind, block_size, stats);
    AccessOutcome::MissEviction
}

/// Picks the line to evict from a full set: the one with the largest recency
///
/// Ties go to the lowest index. A full set never holds two lines with equal recency, since each
/// was last touched by a different access
pub fn select_victim(set: &[CacheLine]) -> usize {
    let mut victim = 0;
    let mut max_recency = set[0].recency;
    let mut index = 1;
    while index < set.len() {
        if set[index].recency > max_recency {
            max_recency = set[index].recency;
            victim = index;
        }
        index += 1;
    }
    victim
}

/// Installs `tag` at `index`, clean unless the access is a store
fn fill(set: &mut [CacheLine], index: usize, tag: u64, kind: AccessKind, block_size: u64, stats: &mut Statistics) {
    let line = &mut set[index];
    line.valid = true;
    line.tag = tag;
    // Write-allocate: a store miss fetches the block and dirties it straight away
    line.dirty = kind == AccessKind::Store;
    if line.dirty {
        stats.add_dirty_bytes(block_size);
    }
    touch(set, index);
}

/// Makes `index` the most recently used line and ages the rest
fn touch(set: &mut [CacheLine], index: usize) {
    for (i, line) in set.iter_mut().enumerate() {
        if i == index {
            line.recency = 0;
        } else {
            line.recency += 1;
        }
    }
}
