//! Compiled message and its wire layout
//!
//! ```text
//! [num_required_signatures:1][num_readonly_signed:1][num_readonly_unsigned:1]
//! [shortvec n][n x 32-byte account]
//! [32-byte recent block reference]
//! [shortvec m][m x ([program_index:1][shortvec k][k x account_index:1]
//!                   [shortvec len][len x data])]
//! ```
//!
//! Accounts are ordered signer+writable, signer+readonly, writable,
//! readonly; the header counts are what lets a reader recover each
//! account's flags from its position alone.

use super::errors::{TransactionBuilderError, TxResult};
use crate::codec::shortvec;
use crate::codec::CodecError;
use serde::{Deserialize, Serialize};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;

/// Account indices are a single byte
pub const MAX_ACCOUNTS: usize = 256;

const HEADER_LEN: usize = 3;
const KEY_LEN: usize = 32;

/// Counts that partition the ordered account table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Leading accounts that must sign; the first is the fee payer
    pub num_required_signatures: u8,
    /// Trailing signers that are read-only
    pub num_readonly_signed_accounts: u8,
    /// Trailing non-signers that are read-only
    pub num_readonly_unsigned_accounts: u8,
}

/// Instruction with accounts replaced by table indices
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

/// Header, ordered account table, block reference and compiled instructions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledMessage {
    pub header: MessageHeader,
    pub account_keys: Vec<Pubkey>,
    pub recent_blockhash: Hash,
    pub instructions: Vec<CompiledInstruction>,
}

impl CompiledMessage {
    /// The account at index 0
    pub fn fee_payer(&self) -> Option<&Pubkey> {
        self.account_keys.first()
    }

    /// Required signers, in the order their signatures are serialized
    pub fn signer_keys(&self) -> &[Pubkey] {
        let n = (self.header.num_required_signatures as usize).min(self.account_keys.len());
        &self.account_keys[..n]
    }

    pub fn is_signer(&self, index: usize) -> bool {
        index < self.header.num_required_signatures as usize
    }

    pub fn is_writable(&self, index: usize) -> bool {
        let num_signed = self.header.num_required_signatures as usize;
        let total = self.account_keys.len();
        if index >= total {
            return false;
        }
        if index < num_signed {
            index < num_signed.saturating_sub(self.header.num_readonly_signed_accounts as usize)
        } else {
            index < total.saturating_sub(self.header.num_readonly_unsigned_accounts as usize)
        }
    }

    /// Position of `pubkey` in the account table
    pub fn account_index(&self, pubkey: &Pubkey) -> TxResult<u8> {
        self.account_keys
            .iter()
            .position(|key| key == pubkey)
            .map(|index| index as u8)
            .ok_or_else(|| TransactionBuilderError::account_not_in_message(pubkey))
    }

    /// Canonical wire bytes; these are the bytes every signer signs
    pub fn serialize(&self) -> TxResult<Vec<u8>> {
        if self.account_keys.len() > MAX_ACCOUNTS {
            return Err(TransactionBuilderError::TooManyAccounts {
                count: self.account_keys.len(),
                max: MAX_ACCOUNTS,
            });
        }

        let data_len: usize = self
            .instructions
            .iter()
            .map(|ix| 1 + 2 * shortvec::MAX_SHORTVEC_BYTES + ix.accounts.len() + ix.data.len())
            .sum();
        let mut out = Vec::with_capacity(
            HEADER_LEN
                + shortvec::MAX_SHORTVEC_BYTES * 2
                + self.account_keys.len() * KEY_LEN
                + KEY_LEN
                + data_len,
        );

        out.push(self.header.num_required_signatures);
        out.push(self.header.num_readonly_signed_accounts);
        out.push(self.header.num_readonly_unsigned_accounts);

        shortvec::write_len(&mut out, self.account_keys.len())?;
        for key in &self.account_keys {
            out.extend_from_slice(key.as_ref());
        }

        out.extend_from_slice(self.recent_blockhash.as_ref());

        shortvec::write_len(&mut out, self.instructions.len())?;
        for ix in &self.instructions {
            out.push(ix.program_id_index);
            shortvec::write_len(&mut out, ix.accounts.len())?;
            out.extend_from_slice(&ix.accounts);
            shortvec::write_len(&mut out, ix.data.len())?;
            out.extend_from_slice(&ix.data);
        }

        Ok(out)
    }

    /// Parse wire bytes produced by [`serialize`](Self::serialize)
    ///
    /// Rejects trailing bytes, header counts that do not fit the account
    /// table and instruction indices past its end.
    pub fn deserialize(bytes: &[u8]) -> TxResult<Self> {
        let mut reader = WireReader::new(bytes);

        let header_bytes = reader.take(HEADER_LEN)?;
        let header = MessageHeader {
            num_required_signatures: header_bytes[0],
            num_readonly_signed_accounts: header_bytes[1],
            num_readonly_unsigned_accounts: header_bytes[2],
        };

        let key_count = reader.shortvec()?;
        let mut account_keys = Vec::with_capacity(key_count.min(MAX_ACCOUNTS));
        for _ in 0..key_count {
            account_keys.push(reader.pubkey()?);
        }

        let recent_blockhash = Hash::new_from_array(reader.array32()?);

        let ix_count = reader.shortvec()?;
        let mut instructions = Vec::with_capacity(ix_count.min(64));
        for _ in 0..ix_count {
            let program_id_index = reader.take(1)?[0];
            let n = reader.shortvec()?;
            let accounts = reader.take(n)?.to_vec();
            let len = reader.shortvec()?;
            let data = reader.take(len)?.to_vec();
            instructions.push(CompiledInstruction {
                program_id_index,
                accounts,
                data,
            });
        }

        let remaining = reader.remaining();
        if remaining > 0 {
            return Err(CodecError::TrailingBytes { remaining }.into());
        }

        let message = Self {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        };
        message.check_structure()?;
        Ok(message)
    }

    fn check_structure(&self) -> TxResult<()> {
        let total = self.account_keys.len();
        let signed = self.header.num_required_signatures as usize;

        if total > MAX_ACCOUNTS {
            return Err(TransactionBuilderError::TooManyAccounts {
                count: total,
                max: MAX_ACCOUNTS,
            });
        }
        if signed == 0 || signed > total {
            return Err(TransactionBuilderError::MalformedMessage(format!(
                "{} required signatures for {} accounts",
                signed, total
            )));
        }
        // The fee payer must stay writable
        if self.header.num_readonly_signed_accounts as usize >= signed {
            return Err(TransactionBuilderError::MalformedMessage(
                "every signer is read-only".to_string(),
            ));
        }
        if self.header.num_readonly_unsigned_accounts as usize > total - signed {
            return Err(TransactionBuilderError::MalformedMessage(
                "read-only count exceeds unsigned accounts".to_string(),
            ));
        }

        for (i, key) in self.account_keys.iter().enumerate() {
            if self.account_keys[..i].contains(key) {
                return Err(TransactionBuilderError::MalformedMessage(format!(
                    "duplicate account {}",
                    key
                )));
            }
        }

        for ix in &self.instructions {
            let out_of_range = std::iter::once(&ix.program_id_index)
                .chain(ix.accounts.iter())
                .find(|&&index| index as usize >= total);
            if let Some(index) = out_of_range {
                return Err(TransactionBuilderError::MalformedMessage(format!(
                    "account index {} out of range for {} accounts",
                    index, total
                )));
            }
        }
        Ok(())
    }
}

/// Bounds-checked cursor over message bytes
pub(crate) struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn take(&mut self, n: usize) -> TxResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(CodecError::BufferUnderflow {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            }
            .into());
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub(crate) fn shortvec(&mut self) -> TxResult<usize> {
        let (len, consumed) = shortvec::decode_len_at(self.data, self.pos)?;
        self.pos += consumed;
        Ok(len)
    }

    pub(crate) fn array32(&mut self) -> TxResult<[u8; 32]> {
        let mut out = [0u8; 32];
        out.copy_from_slice(self.take(KEY_LEN)?);
        Ok(out)
    }

    pub(crate) fn pubkey(&mut self) -> TxResult<Pubkey> {
        Ok(Pubkey::new_from_array(self.array32()?))
    }
}
