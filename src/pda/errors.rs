//! Error types for program address derivation

use thiserror::Error;

/// Errors raised by the derivation engine
///
/// All of these are properties of the inputs: retrying with the same seeds
/// fails the same way.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DerivationError {
    /// A single seed is longer than [`super::MAX_SEED_LEN`]
    #[error("Seed {index} is {len} bytes, maximum is {max}")]
    SeedTooLong { index: usize, len: usize, max: usize },

    /// A numeric seed does not fit its declared byte width
    #[error("Seed {index} value {value} does not fit in {width} bytes")]
    SeedValueOutOfRange { index: usize, value: u64, width: usize },

    /// More seeds than the protocol accepts
    #[error("Too many seeds: {count} (maximum {max})")]
    TooManySeeds { count: usize, max: usize },

    /// Sum of seed lengths exceeds [`super::MAX_TOTAL_SEED_LEN`]
    #[error("Total seed length {total} exceeds maximum of {max}")]
    TotalSeedLengthExceeded { total: usize, max: usize },

    /// Every bump from 255 down to 0 produced an on-curve address
    #[error("No viable bump seed for program {program_id}")]
    NoViableBump { program_id: String },

    /// `create_address` hashed to a point on the curve
    #[error("Derived address {address} lies on the curve")]
    InvalidDerivedAddress { address: String },
}

impl DerivationError {
    pub fn category(&self) -> &'static str {
        match self {
            Self::SeedTooLong { .. }
            | Self::SeedValueOutOfRange { .. }
            | Self::TooManySeeds { .. }
            | Self::TotalSeedLengthExceeded { .. } => "seeds",
            Self::NoViableBump { .. } | Self::InvalidDerivedAddress { .. } => "curve",
        }
    }
}

pub type DerivationResult<T> = Result<T, DerivationError>;
