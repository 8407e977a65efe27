//! wirekit - client-side wire toolkit for Solana programs
//!
//! Everything a client needs to talk to an on-chain program without a
//! network connection:
//!
//! - **codec**: schema-driven binary encoding plus the compact-length prefix
//! - **discriminator**: 8-byte type tags and their validation
//! - **pda**: program-derived address search, validation and caching
//! - **tx_builder**: message compilation, signing and transaction assembly
//! - **idl**: JSON interface descriptions driving the codec
//! - **compat**: conversions to and from `solana-sdk` message types

pub mod codec;
pub mod compat;
pub mod config;
pub mod discriminator;
pub mod errors;
pub mod idl;
pub mod metrics;
pub mod pda;
pub mod structured_logging;
pub mod tx_builder;

// Re-export commonly used types
pub use codec::{BinaryCodec, CodecError, TypeDescriptor, TypeRegistry, Value};
pub use discriminator::{Discriminator, DiscriminatorKind, DiscriminatorMismatch};
pub use errors::{WireError, WireResult};
pub use pda::{AddressCache, AddressDerivationEngine, CachedDeriver, CurvePolicy, DerivedAddress, SeedValue};
pub use solana_sdk::{hash::Hash, pubkey::Pubkey, signature::Signature};
pub use tx_builder::{compile, CompiledMessage, SignedTransaction, TransactionSigner};

#[cfg(test)]
mod tests {
    mod fully_signed_scenario;
    mod idl_scenarios;
}
