//! # csim-core
//!
//! A simulator for a single set-associative cache with least recently used replacement and
//! write-back, write-allocate stores.
//!
//! A trace of loads and stores is replayed against a cache of `2^s` sets, `E` lines per set and
//! `2^b` byte blocks, counting hits, misses, evictions, and the dirty bytes left in the cache or
//! written back by evictions. Runs are single threaded and fully deterministic

/// Contains the cache line and the flat cache store
pub mod cache;

/// Contains the JSON configuration format for a cache geometry
pub mod config;

/// Contains the error type shared by the whole crate
pub mod error;

/// Contains cache geometry validation and address decoding
pub mod geometry;

/// Contains the trace file reader
pub mod io;

/// Contains the least recently used replacement engine with dirty tracking
pub mod replacement;

/// Contains the simulator used to replay a trace on a cache
pub mod simulator;

/// Contains the statistics accumulated during a simulation
pub mod statistics;

/// Contains the trace record types and the trace line parser
pub mod trace;

// Generated from the build.rs, private
mod hex {
    include!(concat!(env!("OUT_DIR"), "/hex.rs"));
}

/// Contains utilities for running tests and benchmarks on the bundled traces
pub mod util;

pub use error::SimError;
pub use geometry::Geometry;
pub use simulator::Simulator;
pub use statistics::Statistics;
