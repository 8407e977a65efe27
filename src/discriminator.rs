//! Type discriminators
//!
//! An 8-byte tag prefixed to encoded account, instruction and event data.
//! The tag is the first 8 bytes of `sha256("<namespace>:<name>")`; a schema
//! may pin an explicit value instead.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Discriminator length in bytes
pub const DISCRIMINATOR_LEN: usize = 8;

pub type Discriminator = [u8; DISCRIMINATOR_LEN];

/// What kind of item a discriminator identifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscriminatorKind {
    Account,
    Instruction,
    Event,
}

impl DiscriminatorKind {
    /// Hash namespace; instructions live in the `global` namespace
    pub const fn namespace(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Instruction => "global",
            Self::Event => "event",
        }
    }
}

impl fmt::Display for DiscriminatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Account => "account",
            Self::Instruction => "instruction",
            Self::Event => "event",
        };
        f.write_str(name)
    }
}

/// Compute the discriminator for `name` in the namespace of `kind`
pub fn compute(kind: DiscriminatorKind, name: &str) -> Discriminator {
    let mut hasher = Sha256::new();
    hasher.update(kind.namespace().as_bytes());
    hasher.update(b":");
    hasher.update(name.as_bytes());
    let digest = hasher.finalize();

    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    out
}

/// Schema entry describing one discriminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscriminatorSpec {
    pub kind: DiscriminatorKind,
    pub name: String,
    /// Explicit bytes supplied by the schema, used instead of the hash
    pub override_bytes: Option<Discriminator>,
}

impl DiscriminatorSpec {
    pub fn new(kind: DiscriminatorKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            override_bytes: None,
        }
    }

    pub fn with_override(mut self, bytes: Discriminator) -> Self {
        self.override_bytes = Some(bytes);
        self
    }

    /// The effective tag: the override when present, the hash otherwise
    pub fn resolve(&self) -> Discriminator {
        self.override_bytes
            .unwrap_or_else(|| compute(self.kind, &self.name))
    }
}

/// Mismatch between an expected and an observed discriminator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Discriminator mismatch: expected={expected_hex}, actual={actual_hex}")]
pub struct DiscriminatorMismatch {
    pub expected_hex: String,
    pub actual_hex: String,
}

/// Outcome of [`validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    Match,
    Mismatch(DiscriminatorMismatch),
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }

    /// Convert into a `Result` for `?` propagation
    pub fn into_result(self) -> Result<(), DiscriminatorMismatch> {
        match self {
            Self::Match => Ok(()),
            Self::Mismatch(err) => Err(err),
        }
    }
}

/// Byte-wise comparison of two discriminators
pub fn validate(expected: &Discriminator, actual: &Discriminator) -> MatchResult {
    if expected == actual {
        return MatchResult::Match;
    }
    MatchResult::Mismatch(DiscriminatorMismatch {
        expected_hex: hex::encode_upper(expected),
        actual_hex: hex::encode_upper(actual),
    })
}
