use thiserror::Error;

/// Everything that can stop a simulation from producing statistics
///
/// Hit scans, victim selection, and counter updates cannot fail, so every variant here is raised
/// while building the cache, while reading the trace, or when replaying on a simulator whose
/// earlier run was aborted
#[derive(Debug, Error)]
pub enum SimError {
    /// The requested `(s, E, b)` cannot describe a cache
    #[error("invalid cache geometry: {reason}")]
    InvalidGeometry { reason: String },

    /// The line storage could not be reserved. Nothing was constructed
    #[error("couldn't allocate storage for {sets} sets of {associativity} lines")]
    AllocationFailure { sets: usize, associativity: usize },

    /// A trace record whose operation is neither a load nor a store
    #[error("trace line {line}: unknown access kind '{kind}', expected 'L' or 'S'")]
    MalformedAccessKind { line: u64, kind: char },

    /// A trace record that doesn't have the `<kind> <hex-address>,<size>` shape
    #[error("trace line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    /// An earlier run on this simulator stopped at a malformed trace line, leaving the cache and
    /// counters partway through that trace
    #[error("simulation was aborted at trace line {line}, the cache state is no longer valid")]
    Aborted { line: u64 },

    #[error("couldn't parse the cache configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
