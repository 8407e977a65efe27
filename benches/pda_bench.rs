//! Benchmark for program address derivation and the address cache

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use solana_sdk::pubkey::Pubkey;
use wirekit::pda::{AddressDerivationEngine, CachedDeriver, CurvePolicy, SeedValue};

fn bench_find_address(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_address");
    let program = Pubkey::new_unique();
    let seeds = [SeedValue::utf8("vault"), SeedValue::from(Pubkey::new_unique())];

    for policy in [CurvePolicy::HighBit, CurvePolicy::Ed25519] {
        let engine = AddressDerivationEngine::new(policy);
        group.bench_with_input(BenchmarkId::new("policy", format!("{:?}", policy)), &engine, |b, engine| {
            b.iter(|| black_box(engine.find_address(black_box(&seeds), &program)));
        });
    }

    group.finish();
}

fn bench_cached_lookup(c: &mut Criterion) {
    let deriver = CachedDeriver::default();
    let program = Pubkey::new_unique();
    let seeds = [SeedValue::utf8("pool"), SeedValue::u64_le(7)];
    // Warm the cache so every iteration is a hit
    let _ = deriver.find_address(&seeds, &program);

    c.bench_function("cached_find_address", |b| {
        b.iter(|| black_box(deriver.find_address(black_box(&seeds), &program)));
    });
}

criterion_group!(benches, bench_find_address, bench_cached_lookup);
criterion_main!(benches);
