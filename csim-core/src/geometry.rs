use crate::error::SimError;

/// The shape of a cache: `2^s` sets of `E` lines, each holding a `2^b` byte block
///
/// A `Geometry` can only be obtained through [`Geometry::new`], so every value in circulation
/// has `E >= 1`, `s + b < 64`, and a capacity that fits in a `u64`
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Geometry {
    set_bits: u32,
    associativity: usize,
    block_bits: u32,
}

/// An address split into its three bit fields
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DecodedAddress {
    pub tag: u64,
    pub set_index: usize,
    pub block_offset: u64,
}

impl Geometry {
    /// Validates and creates a geometry
    ///
    /// # Arguments
    ///
    /// * `set_bits`: `s`, the number of set index bits
    /// * `associativity`: `E`, the number of lines per set
    /// * `block_bits`: `b`, the number of block offset bits
    ///
    /// returns: Result<Geometry, SimError>, `InvalidGeometry` when `E < 1`, a bit field doesn't fit
    /// in an address, or the capacity in bytes doesn't fit in a `u64`
    pub fn new(set_bits: u32, associativity: usize, block_bits: u32) -> Result<Self, SimError> {
        if associativity < 1 {
            return Err(SimError::InvalidGeometry {
                reason: "associativity (E) must be at least 1".to_string(),
            });
        }
        if block_bits >= u64::BITS {
            return Err(SimError::InvalidGeometry {
                reason: format!("block bits (b = {block_bits}) must be below {}", u64::BITS),
            });
        }
        if set_bits >= usize::BITS {
            return Err(SimError::InvalidGeometry {
                reason: format!("set bits (s = {set_bits}) must be below {}", usize::BITS),
            });
        }
        // Resident dirty bytes are bounded by the capacity, so it has to fit the byte counters
        let capacity = (1u64 << set_bits)
            .checked_mul(associativity as u64)
            .and_then(|bytes| bytes.checked_mul(1u64 << block_bits));
        if capacity.is_none() {
            return Err(SimError::InvalidGeometry {
                reason: format!("capacity 2^{set_bits} * {associativity} * 2^{block_bits} exceeds {} bytes", u64::MAX),
            });
        }
        Ok(Self {
            set_bits,
            associativity,
            block_bits,
        })
    }

    pub fn set_bits(&self) -> u32 {
        self.set_bits
    }

    pub fn associativity(&self) -> usize {
        self.associativity
    }

    pub fn block_bits(&self) -> u32 {
        self.block_bits
    }

    /// `S = 2^s`
    pub fn num_sets(&self) -> usize {
        1 << self.set_bits
    }

    /// `B = 2^b`, the unit of all dirty byte accounting
    pub fn block_size(&self) -> u64 {
        1 << self.block_bits
    }

    /// Total number of lines, `None` if it doesn't fit in memory indices
    pub fn num_lines(&self) -> Option<usize> {
        self.num_sets().checked_mul(self.associativity)
    }

    /// Capacity in bytes, `2^s * E * 2^b`
    pub fn capacity(&self) -> u64 {
        (self.num_sets() as u64) * (self.associativity as u64) * self.block_size()
    }

    /// Splits an address into tag, set index, and block offset
    ///
    /// Tags are not re-aligned, so two addresses share a tag exactly when their bits above
    /// `s + b` agree
    pub fn decode(&self, address: u64) -> DecodedAddress {
        let set_mask = (1u64 << self.set_bits) - 1;
        DecodedAddress {
            block_offset: address & (self.block_size() - 1),
            set_index: ((address >> self.block_bits) & set_mask) as usize,
            tag: address >> (self.set_bits + self.block_bits),
        }
    }
}
