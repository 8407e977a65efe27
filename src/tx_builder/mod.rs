//! Transaction message compilation and assembly
//!
//! ## Architecture
//!
//! - **compiler**: merges account access flags and orders the account table
//! - **message**: the compiled message and its canonical wire layout
//! - **transaction**: collects signatures and produces wire transaction bytes
//! - **signer**: the signing collaborator seam
//! - **errors**: error taxonomy shared by all of the above
//!
//! ## Account ordering
//!
//! Accounts are grouped signer+writable, signer+readonly, non-signer
//! writable, non-signer readonly. Within a group the first-seen position
//! wins, and the fee payer is always index 0. Flags of an account that
//! appears more than once are OR-ed together before ordering.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use solana_sdk::{hash::Hash, instruction::{AccountMeta, Instruction}, pubkey::Pubkey};
//! use wirekit::tx_builder::{compile, LocalSigner, SignedTransaction, TransactionSigner};
//!
//! # fn example() -> Result<(), wirekit::tx_builder::TransactionBuilderError> {
//! let payer = LocalSigner::random();
//! let ix = Instruction::new_with_bytes(
//!     Pubkey::new_unique(),
//!     &[0, 1, 2],
//!     vec![AccountMeta::new(Pubkey::new_unique(), false)],
//! );
//!
//! let message = compile(&[ix], &payer.pubkey(), Hash::default())?;
//! let mut tx = SignedTransaction::new(message)?;
//! tx.sign(&payer)?;
//! let wire = tx.serialize()?;
//! # Ok(())
//! # }
//! ```

pub mod compiler;
pub mod errors;
pub mod message;
pub mod signer;
pub mod transaction;

pub use compiler::{compile, merge_accesses, AccountAccess};
pub use errors::{TransactionBuilderError, TxResult};
pub use message::{CompiledInstruction, CompiledMessage, MessageHeader, MAX_ACCOUNTS};
pub use signer::{LocalSigner, TransactionSigner};
pub use transaction::{SignedTransaction, SIGNATURE_LEN};

#[cfg(any(test, feature = "test_utils"))]
pub use signer::MockSigner;
