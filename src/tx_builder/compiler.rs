//! Message compilation
//!
//! Turns instructions into a [`CompiledMessage`]:
//!
//! 1. record the fee payer, then each instruction's accounts and program id
//! 2. merge repeated accounts by OR-ing their flags
//! 3. force the fee payer to signer + writable
//! 4. stable sort into four tiers, first-seen order within a tier
//! 5. count the header and rewrite instructions as table indices
//!
//! The merge is a fold over an ordered sequence, so the output never depends
//! on hash-map iteration order.

use super::errors::{TransactionBuilderError, TxResult};
use super::message::{CompiledInstruction, CompiledMessage, MessageHeader, MAX_ACCOUNTS};
use crate::metrics::{metrics, Timer};
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use tracing::debug;

/// One occurrence of an account and the access it asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountAccess {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountAccess {
    pub fn new(pubkey: Pubkey, is_signer: bool, is_writable: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable,
        }
    }

    /// Sort tier: signer+writable, signer+readonly, writable, readonly
    pub fn tier(&self) -> u8 {
        match (self.is_signer, self.is_writable) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        }
    }
}

/// Every account occurrence, fee payer first, in instruction order
pub fn collect_accesses(instructions: &[Instruction], fee_payer: &Pubkey) -> Vec<AccountAccess> {
    let mut accesses = Vec::with_capacity(1 + instructions.iter().map(|ix| ix.accounts.len() + 1).sum::<usize>());
    accesses.push(AccountAccess::new(*fee_payer, true, true));
    for ix in instructions {
        accesses.extend(
            ix.accounts
                .iter()
                .map(|meta| AccountAccess::new(meta.pubkey, meta.is_signer, meta.is_writable)),
        );
        accesses.push(AccountAccess::new(ix.program_id, false, false));
    }
    accesses
}

/// Fold occurrences into one entry per account, kept at first-seen position
pub fn merge_accesses<I>(accesses: I) -> Vec<AccountAccess>
where
    I: IntoIterator<Item = AccountAccess>,
{
    let mut merged: Vec<AccountAccess> = Vec::new();
    let mut position: HashMap<Pubkey, usize> = HashMap::new();

    for access in accesses {
        match position.get(&access.pubkey) {
            Some(&index) => {
                let entry = &mut merged[index];
                entry.is_signer |= access.is_signer;
                entry.is_writable |= access.is_writable;
            }
            None => {
                position.insert(access.pubkey, merged.len());
                merged.push(access);
            }
        }
    }
    merged
}

/// Four-tier order with the fee payer pinned to index 0
///
/// `sort_by_key` is stable, so first-seen order survives within a tier.
pub fn order_accounts(mut merged: Vec<AccountAccess>, fee_payer: &Pubkey) -> Vec<AccountAccess> {
    if let Some(payer) = merged.iter_mut().find(|a| &a.pubkey == fee_payer) {
        payer.is_signer = true;
        payer.is_writable = true;
    }
    merged.sort_by_key(|a| (a.pubkey != *fee_payer, a.tier()));
    merged
}

fn header_for(ordered: &[AccountAccess]) -> TxResult<MessageHeader> {
    let count = |pred: fn(&AccountAccess) -> bool| {
        let count = ordered.iter().filter(|a| pred(a)).count();
        u8::try_from(count).map_err(|_| TransactionBuilderError::TooManySigners {
            count,
            max: u8::MAX as usize,
        })
    };
    Ok(MessageHeader {
        num_required_signatures: count(|a| a.is_signer)?,
        num_readonly_signed_accounts: count(|a| a.is_signer && !a.is_writable)?,
        num_readonly_unsigned_accounts: count(|a| !a.is_signer && !a.is_writable)?,
    })
}

/// Compile `instructions` into a message paid for by `fee_payer`
///
/// # Errors
///
/// `TooManyAccounts` when more than 256 distinct accounts are referenced,
/// `TooManySigners` when more than 255 of them must sign.
pub fn compile(
    instructions: &[Instruction],
    fee_payer: &Pubkey,
    recent_blockhash: Hash,
) -> TxResult<CompiledMessage> {
    let timer = Timer::new();

    let merged = merge_accesses(collect_accesses(instructions, fee_payer));
    let ordered = order_accounts(merged, fee_payer);

    if ordered.len() > MAX_ACCOUNTS {
        return Err(TransactionBuilderError::TooManyAccounts {
            count: ordered.len(),
            max: MAX_ACCOUNTS,
        });
    }

    let header = header_for(&ordered)?;
    let account_keys: Vec<Pubkey> = ordered.iter().map(|a| a.pubkey).collect();
    let index: HashMap<Pubkey, u8> = account_keys
        .iter()
        .enumerate()
        .map(|(i, key)| (*key, i as u8))
        .collect();
    let lookup = |key: &Pubkey| {
        index
            .get(key)
            .copied()
            .ok_or_else(|| TransactionBuilderError::account_not_in_message(key))
    };

    let compiled = instructions
        .iter()
        .map(|ix| {
            Ok(CompiledInstruction {
                program_id_index: lookup(&ix.program_id)?,
                accounts: ix
                    .accounts
                    .iter()
                    .map(|meta| lookup(&meta.pubkey))
                    .collect::<TxResult<Vec<u8>>>()?,
                data: ix.data.clone(),
            })
        })
        .collect::<TxResult<Vec<_>>>()?;

    let message = CompiledMessage {
        header,
        account_keys,
        recent_blockhash,
        instructions: compiled,
    };

    let m = metrics();
    m.messages_compiled.inc();
    timer.observe_duration(&m.compile_latency);
    debug!(
        fee_payer = %fee_payer,
        accounts = message.account_keys.len(),
        instructions = message.instructions.len(),
        signers = header.num_required_signatures,
        "compiled message"
    );

    Ok(message)
}

impl CompiledMessage {
    /// Shorthand for [`compile`]
    pub fn new(instructions: &[Instruction], fee_payer: &Pubkey, recent_blockhash: Hash) -> TxResult<Self> {
        compile(instructions, fee_payer, recent_blockhash)
    }
}
