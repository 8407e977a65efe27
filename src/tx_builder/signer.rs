//! Signing collaborators
//!
//! The assembler never touches key material directly; it hands message bytes
//! to a [`TransactionSigner`] and stores whatever 64-byte signature comes
//! back. Hardware wallets and remote signers plug in here.

use super::errors::{TransactionBuilderError, TxResult};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;

/// Produces ed25519 signatures over message bytes
pub trait TransactionSigner: Send + Sync {
    /// Address the signature is stored under
    fn pubkey(&self) -> Pubkey;

    fn sign_message(&self, message: &[u8]) -> TxResult<Signature>;
}

/// In-process keypair
pub struct LocalSigner {
    keypair: Keypair,
}

impl LocalSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    /// Generate a fresh random keypair
    pub fn random() -> Self {
        Self::new(Keypair::new())
    }

    /// Deterministic keypair from a seed of at least 32 bytes
    pub fn from_seed(seed: &[u8]) -> TxResult<Self> {
        solana_sdk::signer::keypair::keypair_from_seed(seed)
            .map(Self::new)
            .map_err(|e| TransactionBuilderError::signing_failed(e.to_string()))
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("pubkey", &self.keypair.pubkey())
            .finish_non_exhaustive()
    }
}

impl TransactionSigner for LocalSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    fn sign_message(&self, message: &[u8]) -> TxResult<Signature> {
        self.keypair
            .try_sign_message(message)
            .map_err(|e| TransactionBuilderError::signing_failed(e.to_string()))
    }
}

/// Signer with a fixed address and canned output
///
/// Signatures are the address bytes repeated twice, which is enough to check
/// placement but will not pass verification.
#[cfg(any(test, feature = "test_utils"))]
#[derive(Debug, Clone)]
pub struct MockSigner {
    pubkey: Pubkey,
    fail_with: Option<String>,
}

#[cfg(any(test, feature = "test_utils"))]
impl MockSigner {
    pub fn new(pubkey: Pubkey) -> Self {
        Self {
            pubkey,
            fail_with: None,
        }
    }

    pub fn failing(pubkey: Pubkey, reason: impl Into<String>) -> Self {
        Self {
            pubkey,
            fail_with: Some(reason.into()),
        }
    }

    pub fn expected_signature(&self) -> Signature {
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(self.pubkey.as_ref());
        bytes[32..].copy_from_slice(self.pubkey.as_ref());
        Signature::from(bytes)
    }
}

#[cfg(any(test, feature = "test_utils"))]
impl TransactionSigner for MockSigner {
    fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    fn sign_message(&self, _message: &[u8]) -> TxResult<Signature> {
        match &self.fail_with {
            Some(reason) => Err(TransactionBuilderError::signing_failed(reason.clone())),
            None => Ok(self.expected_signature()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_signer_verifies() {
        let signer = LocalSigner::random();
        let sig = signer.sign_message(b"hello").unwrap();
        assert!(sig.verify(signer.pubkey().as_ref(), b"hello"));
        assert!(!sig.verify(signer.pubkey().as_ref(), b"hellO"));
    }

    #[test]
    fn test_seeded_signer_is_deterministic() {
        let a = LocalSigner::from_seed(&[7u8; 32]).unwrap();
        let b = LocalSigner::from_seed(&[7u8; 32]).unwrap();
        assert_eq!(TransactionSigner::pubkey(&a), TransactionSigner::pubkey(&b));
        assert!(LocalSigner::from_seed(&[1u8; 4]).is_err());
    }

    #[test]
    fn test_mock_signer() {
        let key = Pubkey::new_unique();
        let mock = MockSigner::new(key);
        assert_eq!(mock.sign_message(b"x").unwrap(), mock.expected_signature());

        let failing = MockSigner::failing(key, "device unplugged");
        assert_eq!(
            failing.sign_message(b"x").unwrap_err(),
            TransactionBuilderError::Signing("device unplugged".to_string())
        );
    }
}
