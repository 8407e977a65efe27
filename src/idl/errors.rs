//! Error types for IDL loading and the account/instruction/event coders

use crate::codec::CodecError;
use crate::discriminator::DiscriminatorMismatch;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdlError {
    /// No account, instruction, event or type with this name
    #[error("Unknown {kind} `{name}`")]
    UnknownItem { kind: &'static str, name: String },

    /// No item of this kind carries the data's leading 8 bytes
    #[error("No {kind} matches discriminator {hex}")]
    UnknownDiscriminator { kind: &'static str, hex: String },

    /// An explicit discriminator in the document is not 8 bytes
    #[error("Discriminator for `{name}` is {len} bytes, expected 8")]
    InvalidDiscriminator { name: String, len: usize },

    /// Two items of the same kind share a discriminator
    #[error("Discriminator collision between `{first}` and `{second}`")]
    DuplicateDiscriminator { first: String, second: String },

    /// `build_instruction` was not given a required account
    #[error("Instruction `{instruction}` is missing account `{account}`")]
    MissingAccount { instruction: String, account: String },

    /// JSON argument does not fit the declared type
    #[error("Invalid JSON for {expected}: {reason}")]
    InvalidJson { expected: String, reason: String },

    /// The document itself could not be parsed
    #[error("Failed to parse IDL: {0}")]
    Parse(String),

    #[error(transparent)]
    Discriminator(#[from] DiscriminatorMismatch),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl IdlError {
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnknownItem { .. } | Self::MissingAccount { .. } => "lookup",
            Self::UnknownDiscriminator { .. }
            | Self::InvalidDiscriminator { .. }
            | Self::DuplicateDiscriminator { .. }
            | Self::Discriminator(_) => "discriminator",
            Self::InvalidJson { .. } | Self::Parse(_) => "schema",
            Self::Codec(e) => e.category(),
        }
    }

    pub(crate) fn unknown(kind: &'static str, name: impl Into<String>) -> Self {
        Self::UnknownItem {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn json(expected: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidJson {
            expected: expected.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for IdlError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

pub type IdlResult<T> = Result<T, IdlError>;
