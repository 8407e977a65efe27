//! Signed transaction assembly
//!
//! Wire layout: `[shortvec n][n x 64-byte signature][message bytes]`, with
//! signatures in the order of the message's signer accounts. The message is
//! serialized once at construction and those exact bytes are what every
//! signer signs.

use super::errors::{TransactionBuilderError, TxResult};
use super::message::{CompiledMessage, WireReader};
use super::signer::TransactionSigner;
use crate::codec::shortvec;
use crate::metrics::metrics;
use ed25519_dalek::{Signature as DalekSignature, VerifyingKey};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Length of an ed25519 signature
pub const SIGNATURE_LEN: usize = 64;

/// A compiled message plus the signatures collected for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    message: CompiledMessage,
    message_bytes: Vec<u8>,
    signatures: HashMap<Pubkey, Signature>,
}

impl SignedTransaction {
    /// Wrap `message`; fails if the message cannot be serialized
    pub fn new(message: CompiledMessage) -> TxResult<Self> {
        let message_bytes = message.serialize()?;
        Ok(Self {
            message,
            message_bytes,
            signatures: HashMap::new(),
        })
    }

    pub fn message(&self) -> &CompiledMessage {
        &self.message
    }

    /// The bytes signers sign
    pub fn message_bytes(&self) -> &[u8] {
        &self.message_bytes
    }

    pub fn signature(&self, pubkey: &Pubkey) -> Option<&Signature> {
        self.signatures.get(pubkey)
    }

    /// Sign with `signer` and store the result under its address
    ///
    /// Call once per required signer for multisig messages. Signing twice
    /// with the same key replaces the earlier signature.
    pub fn sign(&mut self, signer: &dyn TransactionSigner) -> TxResult<()> {
        let pubkey = signer.pubkey();
        self.require_signer(&pubkey)?;
        let signature = signer.sign_message(&self.message_bytes)?;
        self.insert(pubkey, signature);
        Ok(())
    }

    /// Attach a signature produced elsewhere
    pub fn add_signature(&mut self, pubkey: Pubkey, signature: Signature) -> TxResult<()> {
        self.require_signer(&pubkey)?;
        self.insert(pubkey, signature);
        Ok(())
    }

    /// Every required signer has a signature
    pub fn is_fully_signed(&self) -> bool {
        self.message
            .signer_keys()
            .iter()
            .all(|key| self.signatures.contains_key(key))
    }

    /// Required signers still without a signature, in account-table order
    pub fn missing_signers(&self) -> Vec<Pubkey> {
        self.message
            .signer_keys()
            .iter()
            .filter(|key| !self.signatures.contains_key(key))
            .copied()
            .collect()
    }

    /// Wire bytes of the fully signed transaction
    ///
    /// # Errors
    ///
    /// `MissingSignature` naming the first signer in account order without a
    /// signature.
    pub fn serialize(&self) -> TxResult<Vec<u8>> {
        let signers = self.message.signer_keys();
        let mut out = Vec::with_capacity(
            shortvec::MAX_SHORTVEC_BYTES + signers.len() * SIGNATURE_LEN + self.message_bytes.len(),
        );

        shortvec::write_len(&mut out, signers.len())?;
        for key in signers {
            let signature = self
                .signatures
                .get(key)
                .ok_or_else(|| TransactionBuilderError::missing_signature(key))?;
            out.extend_from_slice(signature.as_ref());
        }
        out.extend_from_slice(&self.message_bytes);

        metrics().transactions_serialized.inc();
        debug!(
            signatures = signers.len(),
            bytes = out.len(),
            "serialized transaction"
        );
        Ok(out)
    }

    /// Parse wire bytes; signatures are attached but not verified
    pub fn deserialize(bytes: &[u8]) -> TxResult<Self> {
        let mut reader = WireReader::new(bytes);
        let count = reader.shortvec()?;
        let mut raw = Vec::with_capacity(count.min(super::message::MAX_ACCOUNTS));
        for _ in 0..count {
            let mut sig = [0u8; SIGNATURE_LEN];
            sig.copy_from_slice(reader.take(SIGNATURE_LEN)?);
            raw.push(Signature::from(sig));
        }
        let message = CompiledMessage::deserialize(reader.take(reader.remaining())?)?;

        let signers = message.signer_keys();
        if signers.len() != raw.len() {
            return Err(TransactionBuilderError::MalformedMessage(format!(
                "{} signatures for {} required signers",
                raw.len(),
                signers.len()
            )));
        }
        let signatures = signers.iter().copied().zip(raw).collect();

        let mut tx = Self::new(message)?;
        tx.signatures = signatures;
        Ok(tx)
    }

    /// Check every stored signature against the message bytes
    pub fn verify_signatures(&self) -> TxResult<()> {
        for (pubkey, signature) in &self.signatures {
            let invalid = || TransactionBuilderError::InvalidSignature {
                pubkey: pubkey.to_string(),
            };
            let key = VerifyingKey::from_bytes(&pubkey.to_bytes()).map_err(|_| invalid())?;
            let mut sig_bytes = [0u8; SIGNATURE_LEN];
            sig_bytes.copy_from_slice(signature.as_ref());
            let sig = DalekSignature::from_bytes(&sig_bytes);
            if key.verify_strict(&self.message_bytes, &sig).is_err() {
                warn!(pubkey = %pubkey, "signature failed verification");
                return Err(invalid());
            }
        }
        Ok(())
    }

    fn require_signer(&self, pubkey: &Pubkey) -> TxResult<()> {
        if self.message.signer_keys().contains(pubkey) {
            Ok(())
        } else {
            Err(TransactionBuilderError::signer_not_required(pubkey))
        }
    }

    fn insert(&mut self, pubkey: Pubkey, signature: Signature) {
        metrics().signatures_attached.inc();
        debug!(pubkey = %pubkey, "attached signature");
        self.signatures.insert(pubkey, signature);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx_builder::compiler::compile;
    use crate::tx_builder::signer::{LocalSigner, MockSigner};
    use solana_sdk::hash::Hash;
    use solana_sdk::instruction::{AccountMeta, Instruction};

    fn two_signer_tx(payer: &LocalSigner, other: &LocalSigner) -> SignedTransaction {
        let ix = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[1, 2, 3],
            vec![AccountMeta::new(other.pubkey(), true)],
        );
        let msg = compile(&[ix], &payer.pubkey(), Hash::new_from_array([3; 32])).unwrap();
        SignedTransaction::new(msg).unwrap()
    }

    #[test]
    fn test_signature_order_follows_account_table() {
        let payer = LocalSigner::random();
        let other = LocalSigner::random();
        let mut tx = two_signer_tx(&payer, &other);

        // Sign out of order
        tx.sign(&other).unwrap();
        assert!(!tx.is_fully_signed());
        assert_eq!(tx.missing_signers(), vec![payer.pubkey()]);
        tx.sign(&payer).unwrap();
        assert!(tx.is_fully_signed());

        let bytes = tx.serialize().unwrap();
        assert_eq!(bytes[0], 2);
        assert_eq!(&bytes[1..65], tx.signature(&payer.pubkey()).unwrap().as_ref());
        assert_eq!(&bytes[65..129], tx.signature(&other.pubkey()).unwrap().as_ref());
        assert_eq!(&bytes[129..], tx.message_bytes());
        tx.verify_signatures().unwrap();
    }

    #[test]
    fn test_missing_signature_names_first_gap() {
        let payer = LocalSigner::random();
        let other = LocalSigner::random();
        let mut tx = two_signer_tx(&payer, &other);
        tx.sign(&payer).unwrap();
        assert_eq!(
            tx.serialize().unwrap_err(),
            TransactionBuilderError::missing_signature(other.pubkey())
        );
    }

    #[test]
    fn test_foreign_signer_rejected() {
        let payer = LocalSigner::random();
        let other = LocalSigner::random();
        let mut tx = two_signer_tx(&payer, &other);
        let stranger = LocalSigner::random();
        assert_eq!(
            tx.sign(&stranger).unwrap_err(),
            TransactionBuilderError::signer_not_required(stranger.pubkey())
        );
        assert!(tx.signature(&stranger.pubkey()).is_none());
    }

    #[test]
    fn test_signing_failure_propagates() {
        let payer = Pubkey::new_unique();
        let msg = compile(&[], &payer, Hash::default()).unwrap();
        let mut tx = SignedTransaction::new(msg).unwrap();
        let err = tx.sign(&MockSigner::failing(payer, "locked")).unwrap_err();
        assert_eq!(err, TransactionBuilderError::Signing("locked".to_string()));
        assert!(!tx.is_fully_signed());
    }

    #[test]
    fn test_verify_rejects_bogus_signature() {
        let payer = LocalSigner::random();
        let msg = compile(&[], &payer.pubkey(), Hash::default()).unwrap();
        let mut tx = SignedTransaction::new(msg).unwrap();
        tx.add_signature(payer.pubkey(), Signature::from([1u8; 64])).unwrap();
        assert!(tx.is_fully_signed());
        assert!(matches!(
            tx.verify_signatures(),
            Err(TransactionBuilderError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn test_deserialize_restores_signatures() {
        let payer = LocalSigner::random();
        let other = LocalSigner::random();
        let mut tx = two_signer_tx(&payer, &other);
        tx.sign(&payer).unwrap();
        tx.sign(&other).unwrap();

        let parsed = SignedTransaction::deserialize(&tx.serialize().unwrap()).unwrap();
        assert_eq!(parsed, tx);
        parsed.verify_signatures().unwrap();
    }
}
