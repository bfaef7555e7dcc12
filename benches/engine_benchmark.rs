use std::sync::Arc;

use cipherlink::{CoreConfig, CryptoAdapter, EncryptionEngine, KeyAgreement, RingAdapter};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn benchmark_payloads(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload");

    let adapter = Arc::new(RingAdapter::new());
    let engine = EncryptionEngine::new(Arc::clone(&adapter), &CoreConfig::default());
    let key = adapter.import_key(&[0u8; 32]).unwrap();

    let sizes = [("100B", 100), ("1KB", 1024), ("10KB", 10 * 1024)];

    for (name, size) in sizes {
        let text = "a".repeat(size);
        let payload = engine.encrypt(&text, &key, "bench").unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("encrypt", name), &text, |b, text| {
            b.iter(|| engine.encrypt(black_box(text), &key, "bench").unwrap());
        });
        group.bench_with_input(BenchmarkId::new("decrypt", name), &payload, |b, payload| {
            b.iter(|| engine.decrypt(black_box(payload), &key).unwrap());
        });
    }
    group.finish();
}

fn benchmark_agreement(c: &mut Criterion) {
    let agreement = KeyAgreement::new(Arc::new(RingAdapter::new()), &CoreConfig::default());
    let alice = agreement.generate_key_pair().unwrap();
    let bob = agreement.generate_key_pair().unwrap();

    c.bench_function("perform_key_agreement", |b| {
        b.iter(|| {
            agreement
                .perform_key_agreement(black_box(&alice.private_key), black_box(&bob.public_key))
                .unwrap()
        });
    });
}

criterion_group!(benches, benchmark_payloads, benchmark_agreement);
criterion_main!(benches);
