//! Compatibility layer for Solana SDK types
//!
//! Converts compiled messages and signed transactions to and from the
//! `solana-sdk` legacy types, so callers can hand them to the network SDK
//! and network-sourced messages can be inspected with this crate's API.
//!
//! ## Wire equivalence
//!
//! A [`CompiledMessage`] and the legacy message produced by
//! [`to_legacy_message`] serialize to identical bytes. The SDK's own
//! `Message::new` orders accounts within a tier by address rather than by
//! first appearance, so the two compilers agree only when those orders
//! coincide.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use solana_sdk::{hash::Hash, pubkey::Pubkey};
//! use wirekit::{compat, tx_builder::compile};
//!
//! let payer = Pubkey::new_unique();
//! let message = compile(&[], &payer, Hash::default()).unwrap();
//! let legacy = compat::to_legacy_message(&message);
//! assert_eq!(legacy.serialize(), message.serialize().unwrap());
//! ```

use crate::tx_builder::{
    CompiledInstruction, CompiledMessage, MessageHeader, SignedTransaction, TransactionBuilderError,
    TxResult,
};
use solana_sdk::{
    instruction::CompiledInstruction as SdkCompiledInstruction,
    message::{Message, MessageHeader as SdkMessageHeader, VersionedMessage},
    pubkey::Pubkey,
    transaction::Transaction,
};

/// Get the message header from a `VersionedMessage`.
///
/// Works uniformly for both Legacy and V0 message formats.
#[inline]
#[must_use]
pub fn get_message_header(message: &VersionedMessage) -> &SdkMessageHeader {
    match message {
        VersionedMessage::Legacy(legacy_msg) => &legacy_msg.header,
        VersionedMessage::V0(v0_msg) => &v0_msg.header,
    }
}

/// Get the static account keys from a `VersionedMessage`.
///
/// For V0 messages this excludes addresses loaded from lookup tables.
#[inline]
#[must_use]
pub fn get_static_account_keys(message: &VersionedMessage) -> &[Pubkey] {
    match message {
        VersionedMessage::Legacy(legacy_msg) => &legacy_msg.account_keys,
        VersionedMessage::V0(v0_msg) => &v0_msg.account_keys,
    }
}

/// Get the required signers from a `VersionedMessage`.
///
/// Required signers are always the first `num_required_signatures` static
/// accounts.
#[inline]
#[must_use]
pub fn get_required_signers(message: &VersionedMessage) -> &[Pubkey] {
    let header = get_message_header(message);
    let account_keys = get_static_account_keys(message);
    let num_signers = header.num_required_signatures as usize;

    &account_keys[..num_signers.min(account_keys.len())]
}

/// Legacy SDK message with the same accounts, order and bytes
#[must_use]
pub fn to_legacy_message(message: &CompiledMessage) -> Message {
    Message {
        header: SdkMessageHeader {
            num_required_signatures: message.header.num_required_signatures,
            num_readonly_signed_accounts: message.header.num_readonly_signed_accounts,
            num_readonly_unsigned_accounts: message.header.num_readonly_unsigned_accounts,
        },
        account_keys: message.account_keys.clone(),
        recent_blockhash: message.recent_blockhash,
        instructions: message
            .instructions
            .iter()
            .map(|ix| SdkCompiledInstruction {
                program_id_index: ix.program_id_index,
                accounts: ix.accounts.clone(),
                data: ix.data.clone(),
            })
            .collect(),
    }
}

#[must_use]
pub fn from_legacy_message(message: &Message) -> CompiledMessage {
    CompiledMessage {
        header: MessageHeader {
            num_required_signatures: message.header.num_required_signatures,
            num_readonly_signed_accounts: message.header.num_readonly_signed_accounts,
            num_readonly_unsigned_accounts: message.header.num_readonly_unsigned_accounts,
        },
        account_keys: message.account_keys.clone(),
        recent_blockhash: message.recent_blockhash,
        instructions: message
            .instructions
            .iter()
            .map(|ix| CompiledInstruction {
                program_id_index: ix.program_id_index,
                accounts: ix.accounts.clone(),
                data: ix.data.clone(),
            })
            .collect(),
    }
}

/// Convert a versioned message; only the legacy format has a compiled form here
pub fn from_versioned_message(message: &VersionedMessage) -> TxResult<CompiledMessage> {
    match message {
        VersionedMessage::Legacy(legacy) => Ok(from_legacy_message(legacy)),
        VersionedMessage::V0(_) => Err(TransactionBuilderError::MalformedMessage(format!(
            "v0 message with {} static accounts uses lookup tables",
            get_static_account_keys(message).len()
        ))),
    }
}

/// Legacy SDK transaction with signatures in signer order
///
/// # Errors
///
/// `MissingSignature` when the transaction is not fully signed.
pub fn to_legacy_transaction(tx: &SignedTransaction) -> TxResult<Transaction> {
    let signatures = tx
        .message()
        .signer_keys()
        .iter()
        .map(|key| {
            tx.signature(key)
                .copied()
                .ok_or_else(|| TransactionBuilderError::missing_signature(key))
        })
        .collect::<TxResult<Vec<_>>>()?;

    Ok(Transaction {
        signatures,
        message: to_legacy_message(tx.message()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::hash::Hash;
    use solana_sdk::instruction::{AccountMeta, Instruction};

    #[test]
    fn test_legacy_round_trip() {
        let payer = Pubkey::new_unique();
        let ix = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[4, 5],
            vec![AccountMeta::new(Pubkey::new_unique(), false)],
        );
        let compiled = crate::tx_builder::compile(&[ix], &payer, Hash::new_unique()).unwrap();
        let legacy = to_legacy_message(&compiled);

        assert_eq!(legacy.serialize(), compiled.serialize().unwrap());
        assert_eq!(from_legacy_message(&legacy), compiled);

        let versioned = VersionedMessage::Legacy(legacy);
        assert_eq!(get_required_signers(&versioned), &[payer]);
        assert_eq!(get_message_header(&versioned).num_required_signatures, 1);
        assert_eq!(from_versioned_message(&versioned).unwrap(), compiled);
    }

    #[test]
    fn test_unsigned_transaction_rejected() {
        let payer = Pubkey::new_unique();
        let compiled = crate::tx_builder::compile(&[], &payer, Hash::default()).unwrap();
        let tx = SignedTransaction::new(compiled).unwrap();
        assert_eq!(
            to_legacy_transaction(&tx).unwrap_err(),
            TransactionBuilderError::missing_signature(payer)
        );
    }
}
