//! End-to-end signing: compile, collect signatures from two signers,
//! serialize and read the wire bytes back

use crate::codec::shortvec;
use crate::tx_builder::{
    compile, LocalSigner, SignedTransaction, TransactionBuilderError, TransactionSigner,
    SIGNATURE_LEN,
};
use solana_sdk::hash::Hash;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

fn two_signer_transfer(fee_payer: &Pubkey, co_signer: &Pubkey) -> Instruction {
    Instruction::new_with_bytes(
        Pubkey::new_unique(),
        &[2, 0, 0, 0, 64, 66, 15, 0, 0, 0, 0, 0],
        vec![
            AccountMeta::new(*co_signer, true),
            AccountMeta::new(Pubkey::new_unique(), false),
            AccountMeta::new_readonly(*fee_payer, false),
        ],
    )
}

#[test]
fn test_fully_signed_after_both_signers() {
    let fee_payer = LocalSigner::from_seed(&[7u8; 32]).unwrap();
    let co_signer = LocalSigner::from_seed(&[9u8; 32]).unwrap();

    let ix = two_signer_transfer(&fee_payer.pubkey(), &co_signer.pubkey());
    let message = compile(&[ix], &fee_payer.pubkey(), Hash::new_unique()).unwrap();
    assert_eq!(message.header.num_required_signatures, 2);
    assert_eq!(message.signer_keys(), &[fee_payer.pubkey(), co_signer.pubkey()]);

    let mut tx = SignedTransaction::new(message).unwrap();
    assert!(!tx.is_fully_signed());
    assert_eq!(
        tx.serialize().unwrap_err(),
        TransactionBuilderError::missing_signature(fee_payer.pubkey())
    );

    // Signing order does not matter
    tx.sign(&co_signer).unwrap();
    assert!(!tx.is_fully_signed());
    assert_eq!(tx.missing_signers(), vec![fee_payer.pubkey()]);
    assert_eq!(
        tx.serialize().unwrap_err(),
        TransactionBuilderError::missing_signature(fee_payer.pubkey())
    );

    tx.sign(&fee_payer).unwrap();
    assert!(tx.is_fully_signed());
    tx.verify_signatures().unwrap();

    let wire = tx.serialize().unwrap();
    let (count, prefix) = shortvec::decode_len(&wire).unwrap();
    assert_eq!(count, 2);
    assert_eq!(prefix, 1);

    let first = &wire[prefix..prefix + SIGNATURE_LEN];
    let second = &wire[prefix + SIGNATURE_LEN..prefix + 2 * SIGNATURE_LEN];
    assert_eq!(Signature::try_from(first).unwrap(), *tx.signature(&fee_payer.pubkey()).unwrap());
    assert_eq!(Signature::try_from(second).unwrap(), *tx.signature(&co_signer.pubkey()).unwrap());
    assert_eq!(&wire[prefix + 2 * SIGNATURE_LEN..], tx.message_bytes());

    let parsed = SignedTransaction::deserialize(&wire).unwrap();
    assert!(parsed.is_fully_signed());
    assert_eq!(parsed.message(), tx.message());
    parsed.verify_signatures().unwrap();
}

#[test]
fn test_resigning_replaces_signature() {
    let fee_payer = LocalSigner::random();
    let message = compile(&[], &fee_payer.pubkey(), Hash::default()).unwrap();
    let mut tx = SignedTransaction::new(message).unwrap();

    tx.sign(&fee_payer).unwrap();
    let first = tx.serialize().unwrap();
    tx.sign(&fee_payer).unwrap();
    // ed25519 signatures are deterministic
    assert_eq!(tx.serialize().unwrap(), first);
}

#[test]
fn test_non_signer_cannot_sign() {
    let fee_payer = LocalSigner::random();
    let bystander = LocalSigner::random();
    let message = compile(&[], &fee_payer.pubkey(), Hash::default()).unwrap();
    let mut tx = SignedTransaction::new(message).unwrap();

    assert_eq!(
        tx.sign(&bystander).unwrap_err(),
        TransactionBuilderError::signer_not_required(bystander.pubkey())
    );
    assert!(!tx.is_fully_signed());
}
