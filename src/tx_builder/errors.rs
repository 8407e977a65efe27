//! Error types for message compilation and transaction assembly
//!
//! Every variant describes a property of the inputs, so none of them is
//! retryable: compiling or signing the same inputs again fails identically.

use crate::codec::CodecError;
use thiserror::Error;

/// Errors raised while compiling, signing or serializing a transaction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionBuilderError {
    /// An instruction references an account missing from the account table
    ///
    /// Only reachable through hand-built messages; `compile` always records
    /// every referenced account first.
    #[error("Account {pubkey} is not in the message account table")]
    AccountNotInMessage { pubkey: String },

    /// Account indices are single bytes, so at most 256 accounts fit
    #[error("Too many accounts: {count} (maximum {max})")]
    TooManyAccounts { count: usize, max: usize },

    /// A header count must fit in one byte
    #[error("Too many signers: {count} (maximum {max})")]
    TooManySigners { count: usize, max: usize },

    /// A required signer has no signature attached
    #[error("Missing signature for required signer {pubkey}")]
    MissingSignature { pubkey: String },

    /// A signature was offered for a key the message does not require
    #[error("Key {pubkey} is not a required signer of this message")]
    SignerNotRequired { pubkey: String },

    /// The signing collaborator failed
    #[error("Signing failed: {0}")]
    Signing(String),

    /// A stored signature does not verify against the message bytes
    #[error("Invalid signature for {pubkey}")]
    InvalidSignature { pubkey: String },

    /// Parsed message violates a structural rule (header counts, indices)
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Shortvec or structural failure while writing or parsing wire bytes
    #[error("Wire format error: {0}")]
    Codec(#[from] CodecError),
}

impl TransactionBuilderError {
    /// Always `false`; kept for parity with the other subsystem errors
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::AccountNotInMessage { .. }
            | Self::TooManyAccounts { .. }
            | Self::TooManySigners { .. } => "compile",
            Self::MissingSignature { .. } | Self::SignerNotRequired { .. } => "assembly",
            Self::Signing(_) | Self::InvalidSignature { .. } => "signing",
            Self::MalformedMessage(_) | Self::Codec(_) => "codec",
        }
    }
}

// Convenience constructors
impl TransactionBuilderError {
    pub fn missing_signature(pubkey: impl ToString) -> Self {
        Self::MissingSignature {
            pubkey: pubkey.to_string(),
        }
    }

    pub fn signer_not_required(pubkey: impl ToString) -> Self {
        Self::SignerNotRequired {
            pubkey: pubkey.to_string(),
        }
    }

    pub fn account_not_in_message(pubkey: impl ToString) -> Self {
        Self::AccountNotInMessage {
            pubkey: pubkey.to_string(),
        }
    }

    pub fn signing_failed(reason: impl Into<String>) -> Self {
        Self::Signing(reason.into())
    }
}

pub type TxResult<T> = Result<T, TransactionBuilderError>;
