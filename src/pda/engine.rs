//! Deterministic program address derivation
//!
//! An address is `sha256(seed_1 || ... || seed_n || bump || program_id ||
//! "ProgramDerivedAddress")`. It is only accepted when it is *not* a valid
//! curve point, so no private key can exist for it. `find_address` searches
//! bumps from 255 down to 0 and returns the first off-curve result.

use super::errors::{DerivationError, DerivationResult};
use super::seeds::SeedValue;
use super::{MAX_SEEDS, MAX_SEED_LEN, MAX_TOTAL_SEED_LEN, PDA_MARKER};
use crate::metrics::metrics;
use curve25519_dalek::edwards::CompressedEdwardsY;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, trace};

/// Result of a bump search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DerivedAddress {
    pub address: Pubkey,
    pub bump: u8,
}

/// How "is this a curve point" is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurvePolicy {
    /// High bit of the final byte set means on-curve
    #[default]
    HighBit,
    /// Full Edwards-point decompression, matching the network's own check
    Ed25519,
}

impl CurvePolicy {
    pub fn is_on_curve(self, bytes: &[u8; 32]) -> bool {
        match self {
            Self::HighBit => bytes[31] & 0x80 != 0,
            Self::Ed25519 => CompressedEdwardsY(*bytes).decompress().is_some(),
        }
    }
}

/// Seed limits enforced before hashing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedLimits {
    /// Per-seed byte limit
    pub max_seed_len: usize,
    /// Seed count limit, bump included
    pub max_seeds: usize,
    /// Sum of seed lengths, bump excluded
    pub max_total_len: usize,
}

impl Default for SeedLimits {
    fn default() -> Self {
        Self {
            max_seed_len: MAX_SEED_LEN,
            max_seeds: MAX_SEEDS,
            max_total_len: MAX_TOTAL_SEED_LEN,
        }
    }
}

/// Stateless derivation engine
///
/// Identical inputs always produce identical outputs; the engine holds only
/// its policy and limits and is freely shareable across threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressDerivationEngine {
    policy: CurvePolicy,
    limits: SeedLimits,
}

impl AddressDerivationEngine {
    pub fn new(policy: CurvePolicy) -> Self {
        Self {
            policy,
            limits: SeedLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: SeedLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn policy(&self) -> CurvePolicy {
        self.policy
    }

    pub fn limits(&self) -> SeedLimits {
        self.limits
    }

    pub fn is_on_curve(&self, bytes: &[u8; 32]) -> bool {
        self.policy.is_on_curve(bytes)
    }

    /// Search bumps 255..=0 for the first off-curve address
    pub fn find_address(&self, seeds: &[SeedValue], program_id: &Pubkey) -> DerivationResult<DerivedAddress> {
        let raw = seed_bytes(seeds, self.limits.max_seed_len)?;
        let refs: Vec<&[u8]> = raw.iter().map(|s| s.as_slice()).collect();
        self.find_address_raw(&refs, program_id)
    }

    /// [`find_address`](Self::find_address) over pre-encoded seed slices
    pub fn find_address_raw(&self, seeds: &[&[u8]], program_id: &Pubkey) -> DerivationResult<DerivedAddress> {
        // One slot is reserved for the bump
        self.check_seeds(seeds, self.limits.max_seeds.saturating_sub(1))?;
        let policy = self.policy;
        search_bump(seeds, program_id, |candidate| policy.is_on_curve(candidate))
    }

    /// Single hash without search; the seeds must already contain any bump
    pub fn create_address(&self, seeds: &[SeedValue], program_id: &Pubkey) -> DerivationResult<Pubkey> {
        let raw = seed_bytes(seeds, self.limits.max_seed_len)?;
        let refs: Vec<&[u8]> = raw.iter().map(|s| s.as_slice()).collect();
        self.create_address_raw(&refs, program_id)
    }

    pub fn create_address_raw(&self, seeds: &[&[u8]], program_id: &Pubkey) -> DerivationResult<Pubkey> {
        self.check_seeds(seeds, self.limits.max_seeds)?;

        let candidate = hash_candidate(seeds, None, program_id);
        let address = Pubkey::new_from_array(candidate);
        if self.policy.is_on_curve(&candidate) {
            metrics().pda_derivation_failures.inc();
            return Err(DerivationError::InvalidDerivedAddress {
                address: address.to_string(),
            });
        }
        Ok(address)
    }

    /// Recompute with an explicit bump and compare
    ///
    /// Returns `false` for invalid seeds or an on-curve result rather than
    /// erroring: the address simply does not validate.
    pub fn validate_address(
        &self,
        address: &Pubkey,
        seeds: &[SeedValue],
        program_id: &Pubkey,
        bump: u8,
    ) -> bool {
        let Ok(raw) = seed_bytes(seeds, self.limits.max_seed_len) else {
            return false;
        };
        let mut refs: Vec<&[u8]> = raw.iter().map(|s| s.as_slice()).collect();
        let bump_seed = [bump];
        refs.push(&bump_seed);

        match self.create_address_raw(&refs, program_id) {
            Ok(expected) => &expected == address,
            Err(_) => false,
        }
    }

    /// Canonical seed bytes, checked against this engine's per-seed limit
    pub fn encode_seeds(&self, seeds: &[SeedValue]) -> DerivationResult<Vec<Vec<u8>>> {
        seed_bytes(seeds, self.limits.max_seed_len)
    }

    fn check_seeds(&self, seeds: &[&[u8]], max_count: usize) -> DerivationResult<()> {
        if seeds.len() > max_count {
            return Err(DerivationError::TooManySeeds {
                count: seeds.len(),
                max: max_count,
            });
        }

        let mut total = 0usize;
        for (index, seed) in seeds.iter().enumerate() {
            if seed.len() > self.limits.max_seed_len {
                return Err(DerivationError::SeedTooLong {
                    index,
                    len: seed.len(),
                    max: self.limits.max_seed_len,
                });
            }
            total += seed.len();
        }

        if total > self.limits.max_total_len {
            return Err(DerivationError::TotalSeedLengthExceeded {
                total,
                max: self.limits.max_total_len,
            });
        }
        Ok(())
    }
}

/// Walk bumps 255..=0 and return the first candidate `on_curve` rejects
fn search_bump<F>(seeds: &[&[u8]], program_id: &Pubkey, on_curve: F) -> DerivationResult<DerivedAddress>
where
    F: Fn(&[u8; 32]) -> bool,
{
    for (attempt, bump) in (0..=u8::MAX).rev().enumerate() {
        let candidate = hash_candidate(seeds, Some(bump), program_id);
        if on_curve(&candidate) {
            trace!(bump, "candidate on curve, trying next bump");
            continue;
        }

        let address = Pubkey::new_from_array(candidate);
        let m = metrics();
        m.pda_derivations_total.inc();
        m.pda_bump_attempts.observe((attempt + 1) as f64);
        debug!(
            program_id = %program_id,
            address = %address,
            bump,
            attempts = attempt + 1,
            "derived program address"
        );
        return Ok(DerivedAddress { address, bump });
    }

    metrics().pda_derivation_failures.inc();
    Err(DerivationError::NoViableBump {
        program_id: program_id.to_string(),
    })
}

/// Validate seed values and collect their canonical bytes
fn seed_bytes(seeds: &[SeedValue], max_seed_len: usize) -> DerivationResult<Vec<Vec<u8>>> {
    seeds
        .iter()
        .enumerate()
        .map(|(index, seed)| {
            seed.check_range(index)?;
            let bytes = seed.to_bytes().into_owned();
            if bytes.len() > max_seed_len {
                return Err(DerivationError::SeedTooLong {
                    index,
                    len: bytes.len(),
                    max: max_seed_len,
                });
            }
            Ok(bytes)
        })
        .collect()
}

fn hash_candidate(seeds: &[&[u8]], bump: Option<u8>, program_id: &Pubkey) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    if let Some(bump) = bump {
        hasher.update([bump]);
    }
    hasher.update(program_id.as_ref());
    hasher.update(PDA_MARKER);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> Pubkey {
        Pubkey::new_from_array([7u8; 32])
    }

    #[test]
    fn test_find_is_deterministic() {
        let engine = AddressDerivationEngine::default();
        let seeds = [SeedValue::utf8("vault"), SeedValue::u64_le(42)];
        let a = engine.find_address(&seeds, &program()).unwrap();
        let b = engine.find_address(&seeds, &program()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_result_is_off_curve() {
        let engine = AddressDerivationEngine::default();
        for i in 0..32u8 {
            let found = engine.find_address(&[SeedValue::u8(i)], &program()).unwrap();
            assert!(!engine.is_on_curve(&found.address.to_bytes()));
        }
    }

    #[test]
    fn test_matches_manual_hash() {
        let engine = AddressDerivationEngine::default();
        let found = engine
            .find_address(&[SeedValue::utf8("abc")], &program())
            .unwrap();

        let mut hasher = Sha256::new();
        hasher.update(b"abc");
        hasher.update([found.bump]);
        hasher.update(program().as_ref());
        hasher.update(b"ProgramDerivedAddress");
        let expected: [u8; 32] = hasher.finalize().into();
        assert_eq!(found.address.to_bytes(), expected);
    }

    #[test]
    fn test_skipped_bumps_were_on_curve() {
        let engine = AddressDerivationEngine::default();
        let seeds: [&[u8]; 1] = [b"skip-check"];
        let found = engine.find_address_raw(&seeds, &program()).unwrap();
        for bump in (found.bump as u16 + 1)..=255 {
            let candidate = hash_candidate(&seeds, Some(bump as u8), &program());
            assert!(engine.is_on_curve(&candidate), "bump {} should be on curve", bump);
        }
    }

    #[test]
    fn test_validate_symmetry() {
        let engine = AddressDerivationEngine::default();
        let seeds = [SeedValue::utf8("escrow"), SeedValue::from(Pubkey::new_unique())];
        let found = engine.find_address(&seeds, &program()).unwrap();

        assert!(engine.validate_address(&found.address, &seeds, &program(), found.bump));
        assert!(!engine.validate_address(
            &found.address,
            &seeds,
            &program(),
            found.bump.wrapping_add(1)
        ));
        assert!(!engine.validate_address(
            &found.address,
            &seeds,
            &program(),
            found.bump.wrapping_sub(1)
        ));
        assert!(!engine.validate_address(&found.address, &seeds, &Pubkey::new_unique(), found.bump));
    }

    #[test]
    fn test_create_with_found_bump() {
        let engine = AddressDerivationEngine::default();
        let found = engine
            .find_address(&[SeedValue::utf8("mint")], &program())
            .unwrap();
        let created = engine
            .create_address(&[SeedValue::utf8("mint"), SeedValue::u8(found.bump)], &program())
            .unwrap();
        assert_eq!(created, found.address);
    }

    #[test]
    fn test_create_rejects_on_curve() {
        let engine = AddressDerivationEngine::default();
        // Find a bump that lands on the curve under the high-bit rule
        let on_curve_bump = (0..=u8::MAX)
            .find(|b| engine.is_on_curve(&hash_candidate(&[b"x".as_slice()], Some(*b), &program())))
            .expect("some bump lands on curve");
        let err = engine
            .create_address(&[SeedValue::utf8("x"), SeedValue::u8(on_curve_bump)], &program())
            .unwrap_err();
        assert!(matches!(err, DerivationError::InvalidDerivedAddress { .. }));
    }

    #[test]
    fn test_seed_limits() {
        let engine = AddressDerivationEngine::default();

        let err = engine
            .find_address(&[SeedValue::bytes(vec![1u8; 33])], &program())
            .unwrap_err();
        assert!(matches!(err, DerivationError::SeedTooLong { index: 0, len: 33, .. }));

        let too_many: Vec<SeedValue> = (0..16).map(SeedValue::u8).collect();
        let err = engine.find_address(&too_many, &program()).unwrap_err();
        assert_eq!(err, DerivationError::TooManySeeds { count: 16, max: 15 });

        let fifteen: Vec<SeedValue> = (0..15).map(|_| SeedValue::bytes(vec![9u8; 32])).collect();
        assert!(engine.find_address(&fifteen, &program()).is_ok());
    }

    #[test]
    fn test_numeric_seed_out_of_range() {
        use crate::pda::{Endianness, NumberWidth};

        let seeds = [
            SeedValue::utf8("slot"),
            SeedValue::number(70_000, NumberWidth::W2, Endianness::Little),
        ];
        let err = AddressDerivationEngine::default()
            .find_address(&seeds, &program())
            .unwrap_err();
        assert_eq!(
            err,
            DerivationError::SeedValueOutOfRange {
                index: 1,
                value: 70_000,
                width: 2
            }
        );
        assert_eq!(err.category(), "seeds");
    }

    #[test]
    fn test_total_length_limit() {
        let engine = AddressDerivationEngine::default().with_limits(SeedLimits {
            max_total_len: 64,
            ..SeedLimits::default()
        });
        let seeds = [
            SeedValue::bytes(vec![1u8; 32]),
            SeedValue::bytes(vec![2u8; 32]),
            SeedValue::utf8("x"),
        ];
        let err = engine.find_address(&seeds, &program()).unwrap_err();
        assert_eq!(
            err,
            DerivationError::TotalSeedLengthExceeded { total: 65, max: 64 }
        );
    }

    #[test]
    fn test_no_viable_bump() {
        let seeds: [&[u8]; 1] = [b"a"];
        let err = search_bump(&seeds, &program(), |_| true).unwrap_err();
        assert_eq!(
            err,
            DerivationError::NoViableBump {
                program_id: program().to_string()
            }
        );
    }

    #[test]
    fn test_bump_slot_is_reserved() {
        let engine = AddressDerivationEngine::default().with_limits(SeedLimits {
            max_seeds: 1,
            ..SeedLimits::default()
        });
        let seeds: [&[u8]; 1] = [b"a"];
        let err = engine.find_address_raw(&seeds, &program()).unwrap_err();
        assert_eq!(err, DerivationError::TooManySeeds { count: 1, max: 0 });

        // create_address has no bump to reserve room for
        let two: [&[u8]; 2] = [b"a", b"b"];
        let err = engine.create_address_raw(&two, &program()).unwrap_err();
        assert_eq!(err, DerivationError::TooManySeeds { count: 2, max: 1 });
    }

    #[test]
    fn test_ed25519_policy_produces_off_curve_points() {
        let engine = AddressDerivationEngine::new(CurvePolicy::Ed25519);
        let found = engine
            .find_address(&[SeedValue::utf8("metadata")], &program())
            .unwrap();
        assert!(CompressedEdwardsY(found.address.to_bytes())
            .decompress()
            .is_none());
    }

    #[test]
    fn test_high_bit_policy() {
        let mut bytes = [0u8; 32];
        assert!(!CurvePolicy::HighBit.is_on_curve(&bytes));
        bytes[31] = 0x80;
        assert!(CurvePolicy::HighBit.is_on_curve(&bytes));
    }
}
