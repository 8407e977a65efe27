//! Program address derivation checked against solana-sdk

use proptest::prelude::*;
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;
use wirekit::pda::{
    AddressCache, AddressDerivationEngine, CachedDeriver, CurvePolicy, DerivationError, SeedValue,
};

fn ed25519() -> AddressDerivationEngine {
    AddressDerivationEngine::new(CurvePolicy::Ed25519)
}

#[test]
fn test_find_matches_sdk() {
    let program = Pubkey::new_unique();
    let owner = Pubkey::new_unique();
    let seeds = [
        SeedValue::utf8("metadata"),
        SeedValue::from(owner),
        SeedValue::u64_le(42),
    ];

    let derived = ed25519().find_address(&seeds, &program).unwrap();
    let (address, bump) = Pubkey::find_program_address(&[&b"metadata"[..], owner.as_ref(), &42u64.to_le_bytes()], &program);
    assert_eq!(derived.address, address);
    assert_eq!(derived.bump, bump);
    assert!(ed25519().validate_address(&address, &seeds, &program, bump));
}

#[test]
fn test_cached_deriver_matches_sdk() {
    let program = Pubkey::new_unique();
    let deriver = CachedDeriver::new(ed25519(), AddressCache::new(16, Duration::from_secs(60)));

    for i in 0..20u8 {
        let (address, bump) = Pubkey::find_program_address(&[&b"slot"[..], &[i]], &program);
        let seeds = [SeedValue::utf8("slot"), SeedValue::u8(i)];
        assert_eq!(deriver.find_address(&seeds, &program).unwrap().address, address);
        // Second lookup is served from the cache
        assert_eq!(deriver.find_address(&seeds, &program).unwrap().bump, bump);
    }

    let stats = deriver.stats();
    assert_eq!(stats.misses, 20);
    assert_eq!(stats.hits, 20);
    assert_eq!(stats.size, 16);
    assert_eq!(stats.evictions, 4);
}

#[test]
fn test_seed_limits_match_sdk() {
    let program = Pubkey::new_unique();
    let long: &[u8] = &[0u8; 33];
    assert!(Pubkey::try_find_program_address(&[long], &program).is_none());
    assert!(matches!(
        ed25519().find_address_raw(&[long], &program),
        Err(DerivationError::SeedTooLong { index: 0, len: 33, max: 32 })
    ));

    // 15 seeds plus the bump is the most the protocol accepts
    let fifteen: Vec<&[u8]> = vec![&b"s"[..]; 15];
    assert!(Pubkey::try_find_program_address(&fifteen, &program).is_some());
    assert!(ed25519().find_address_raw(&fifteen, &program).is_ok());

    let sixteen: Vec<&[u8]> = vec![&b"s"[..]; 16];
    assert!(Pubkey::try_find_program_address(&sixteen, &program).is_none());
    assert!(matches!(
        ed25519().find_address_raw(&sixteen, &program),
        Err(DerivationError::TooManySeeds { count: 16, max: 15 })
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_find_matches_sdk(
        seeds in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..=32), 0..4),
        program in prop::array::uniform32(any::<u8>()),
    ) {
        let program = Pubkey::new_from_array(program);
        let refs: Vec<&[u8]> = seeds.iter().map(Vec::as_slice).collect();

        let (address, bump) = Pubkey::find_program_address(&refs, &program);
        let derived = ed25519().find_address_raw(&refs, &program).unwrap();
        prop_assert_eq!(derived.address, address);
        prop_assert_eq!(derived.bump, bump);
        prop_assert!(!address.is_on_curve());
    }

    #[test]
    fn prop_create_agrees_with_sdk(
        seed in prop::collection::vec(any::<u8>(), 0..=32),
        bump in any::<u8>(),
    ) {
        let program = Pubkey::new_unique();
        let bump_seed = [bump];
        let refs: [&[u8]; 2] = [&seed, &bump_seed];

        let ours = ed25519().create_address_raw(&refs, &program);
        match Pubkey::create_program_address(&refs, &program) {
            Ok(address) => prop_assert_eq!(ours, Ok(address)),
            Err(_) => {
                let rejected = matches!(ours, Err(DerivationError::InvalidDerivedAddress { .. }));
                prop_assert!(rejected);
            }
        }
    }

    #[test]
    fn prop_high_bit_results_have_clear_high_bit(
        seed in prop::collection::vec(any::<u8>(), 0..=32),
    ) {
        let program = Pubkey::new_unique();
        let derived = AddressDerivationEngine::default()
            .find_address_raw(&[seed.as_slice()], &program)
            .unwrap();
        prop_assert_eq!(derived.address.to_bytes()[31] & 0x80, 0);
        let again = AddressDerivationEngine::default()
            .find_address_raw(&[seed.as_slice()], &program)
            .unwrap();
        prop_assert_eq!(derived, again);
    }
}
