//! Seed values
//!
//! The closed set of things a program address can be derived from. Every
//! variant reduces to a byte slice through [`SeedValue::to_bytes`].

use super::errors::{DerivationError, DerivationResult};
use super::MAX_SEED_LEN;
use solana_sdk::pubkey::Pubkey;
use std::borrow::Cow;
use std::str::FromStr;

/// Byte order of a numeric seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
    Little,
    Big,
}

/// Width of a numeric seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberWidth {
    W1 = 1,
    W2 = 2,
    W4 = 4,
    W8 = 8,
}

impl NumberWidth {
    pub const fn bytes(self) -> usize {
        self as usize
    }

    /// Largest value that fits the width
    pub const fn max(self) -> u64 {
        match self {
            Self::W8 => u64::MAX,
            w => (1u64 << (w as u64 * 8)) - 1,
        }
    }
}

/// A single derivation seed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SeedValue {
    Bytes(Vec<u8>),
    Utf8(String),
    Address(Pubkey),
    Number {
        value: u64,
        width: NumberWidth,
        endianness: Endianness,
    },
}

impl SeedValue {
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    pub fn utf8(s: impl Into<String>) -> Self {
        Self::Utf8(s.into())
    }

    pub fn u8(value: u8) -> Self {
        Self::number(value as u64, NumberWidth::W1, Endianness::Little)
    }

    pub fn u16_le(value: u16) -> Self {
        Self::number(value as u64, NumberWidth::W2, Endianness::Little)
    }

    pub fn u32_le(value: u32) -> Self {
        Self::number(value as u64, NumberWidth::W4, Endianness::Little)
    }

    pub fn u64_le(value: u64) -> Self {
        Self::number(value, NumberWidth::W8, Endianness::Little)
    }

    pub fn u64_be(value: u64) -> Self {
        Self::number(value, NumberWidth::W8, Endianness::Big)
    }

    pub fn number(value: u64, width: NumberWidth, endianness: Endianness) -> Self {
        Self::Number {
            value,
            width,
            endianness,
        }
    }

    /// Canonical byte form of the seed
    ///
    /// Numbers are truncated to their width; use [`SeedValue::validated`] to
    /// reject values that do not fit.
    pub fn to_bytes(&self) -> Cow<'_, [u8]> {
        match self {
            Self::Bytes(bytes) => Cow::Borrowed(bytes),
            Self::Utf8(s) => Cow::Borrowed(s.as_bytes()),
            Self::Address(key) => Cow::Borrowed(key.as_ref()),
            Self::Number {
                value,
                width,
                endianness,
            } => {
                let n = width.bytes();
                let bytes = match endianness {
                    Endianness::Little => value.to_le_bytes()[..n].to_vec(),
                    Endianness::Big => value.to_be_bytes()[8 - n..].to_vec(),
                };
                Cow::Owned(bytes)
            }
        }
    }

    /// Numeric seeds must fit their width; other kinds always pass
    pub fn check_range(&self, index: usize) -> DerivationResult<()> {
        match self {
            Self::Number { value, width, .. } if *value > width.max() => {
                Err(DerivationError::SeedValueOutOfRange {
                    index,
                    value: *value,
                    width: width.bytes(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Check the seed against the per-seed limits; `index` is used in errors
    pub fn validated(&self, index: usize) -> DerivationResult<&Self> {
        self.check_range(index)?;
        let len = self.to_bytes().len();
        if len > MAX_SEED_LEN {
            return Err(DerivationError::SeedTooLong {
                index,
                len,
                max: MAX_SEED_LEN,
            });
        }
        Ok(self)
    }
}

impl From<Pubkey> for SeedValue {
    fn from(key: Pubkey) -> Self {
        Self::Address(key)
    }
}

impl From<&str> for SeedValue {
    fn from(s: &str) -> Self {
        Self::Utf8(s.to_string())
    }
}

impl From<&[u8]> for SeedValue {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

/// Parse error for the `kind:value` seed syntax
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid seed `{input}`: {reason}")]
pub struct SeedParseError {
    pub input: String,
    pub reason: String,
}

impl FromStr for SeedValue {
    type Err = SeedParseError;

    /// Parse `kind:value`, e.g. `str:vault`, `pubkey:<base58>`, `u64le:42`,
    /// `hex:deadbeef`
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let fail = |reason: &str| SeedParseError {
            input: input.to_string(),
            reason: reason.to_string(),
        };
        let (kind, raw) = input
            .split_once(':')
            .ok_or_else(|| fail("expected kind:value"))?;

        let number = |width: NumberWidth, endianness: Endianness| {
            raw.parse::<u64>()
                .map_err(|e| fail(&e.to_string()))
                .and_then(|value| {
                    if value > width.max() {
                        Err(fail("number does not fit width"))
                    } else {
                        Ok(SeedValue::number(value, width, endianness))
                    }
                })
        };

        match kind {
            "str" => Ok(Self::Utf8(raw.to_string())),
            "hex" => hex::decode(raw)
                .map(Self::Bytes)
                .map_err(|e| fail(&e.to_string())),
            "pubkey" => Pubkey::from_str(raw)
                .map(Self::Address)
                .map_err(|e| fail(&e.to_string())),
            "u8" => number(NumberWidth::W1, Endianness::Little),
            "u16le" => number(NumberWidth::W2, Endianness::Little),
            "u32le" => number(NumberWidth::W4, Endianness::Little),
            "u64le" => number(NumberWidth::W8, Endianness::Little),
            "u16be" => number(NumberWidth::W2, Endianness::Big),
            "u32be" => number(NumberWidth::W4, Endianness::Big),
            "u64be" => number(NumberWidth::W8, Endianness::Big),
            _ => Err(fail("unknown seed kind")),
        }
    }
}
