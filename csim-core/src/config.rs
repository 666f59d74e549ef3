use std::io::Read;
use serde::{Deserialize, Serialize};
use crate::error::SimError;
use crate::geometry::Geometry;

/// A cache configuration, as read from JSON or assembled from command line flags
///
/// Every field is optional so that a file can be partially overridden. Fields may be given by
/// their long name or by the single letter used on the command line, e.g.
/// `{"s": 4, "E": 1, "b": 4}`
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// `s`, set index bits
    #[serde(alias = "s")]
    pub set_bits: Option<u32>,
    /// `E`, lines per set
    #[serde(alias = "E")]
    pub associativity: Option<usize>,
    /// `b`, block offset bits
    #[serde(alias = "b")]
    pub block_bits: Option<u32>,
}

impl CacheConfig {
    /// Reads a configuration from JSON
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SimError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Layers `overrides` on top of this configuration. Values present in `overrides` win
    pub fn merge(self, overrides: CacheConfig) -> CacheConfig {
        CacheConfig {
            set_bits: overrides.set_bits.or(self.set_bits),
            associativity: overrides.associativity.or(self.associativity),
            block_bits: overrides.block_bits.or(self.block_bits),
        }
    }

    /// Validates the configuration into a geometry. Every field must be present
    pub fn geometry(&self) -> Result<Geometry, SimError> {
        let missing = |name: &str| SimError::InvalidGeometry {
            reason: format!("{name} was not given"),
        };
        Geometry::new(
            self.set_bits.ok_or_else(|| missing("set bits (s)"))?,
            self.associativity.ok_or_else(|| missing("associativity (E)"))?,
            self.block_bits.ok_or_else(|| missing("block bits (b)"))?,
        )
    }
}
