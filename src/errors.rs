//! Crate-level error type
//!
//! Each subsystem keeps its own `thiserror` enum; [`WireError`] wraps them so
//! callers that drive several subsystems can use a single `?`.

use crate::codec::CodecError;
use crate::discriminator::DiscriminatorMismatch;
use crate::idl::IdlError;
use crate::pda::{DerivationError, SeedParseError};
use crate::tx_builder::TransactionBuilderError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Derivation error: {0}")]
    Derivation(#[from] DerivationError),

    #[error(transparent)]
    Discriminator(#[from] DiscriminatorMismatch),

    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionBuilderError),

    #[error("IDL error: {0}")]
    Idl(#[from] IdlError),

    #[error(transparent)]
    SeedParse(#[from] SeedParseError),
}

impl WireError {
    /// Every failure is a property of the inputs
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Label used for the `errors_total` metric
    pub fn category(&self) -> &'static str {
        match self {
            Self::Codec(e) => e.category(),
            Self::Derivation(e) => e.category(),
            Self::Discriminator(_) => "discriminator",
            Self::Transaction(e) => e.category(),
            Self::Idl(e) => e.category(),
            Self::SeedParse(_) => "seeds",
        }
    }

    /// Count this error in the global metrics and hand it back
    pub fn recorded(self) -> Self {
        crate::metrics::metrics().record_error(self.category());
        self
    }
}

pub type WireResult<T> = Result<T, WireError>;
