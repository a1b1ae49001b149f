use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use qasa_dilithium::dilithium::{
    self, poly::Poly, sampling, DilithiumKeyPair, DilithiumPublicKey, DilithiumVariant,
};

fn dilithium_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("dilithium");
    let message = b"This is a test message for benchmarking signature operations";

    for variant in DilithiumVariant::ALL.iter() {
        group.bench_with_input(
            BenchmarkId::new("key_generation", variant.to_string()),
            variant,
            |b, &variant| b.iter(|| DilithiumKeyPair::derive(&[7u8; 32], variant)),
        );

        let key_pair = DilithiumKeyPair::derive(&[7u8; 32], *variant).unwrap();
        group.bench_with_input(
            BenchmarkId::new("sign", variant.to_string()),
            variant,
            |b, _| b.iter(|| key_pair.sign(black_box(message))),
        );

        let pub_key = key_pair.public_key();
        let signature = key_pair.sign(message).unwrap();
        group.bench_with_input(
            BenchmarkId::new("pub_key_verify", variant.to_string()),
            variant,
            |b, _| b.iter(|| pub_key.verify(black_box(message), &signature)),
        );

        // Batch of three signatures under one key shares the matrix expansion
        let batch: Vec<(&[u8], &[u8], &DilithiumPublicKey)> =
            vec![(&message[..], &signature[..], &pub_key); 3];
        group.bench_with_input(
            BenchmarkId::new("batch_verify", variant.to_string()),
            variant,
            |b, _| b.iter(|| dilithium::verify_batch(&batch)),
        );
    }

    group.finish();
}

fn ring_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring");

    let mut coeffs = [0i32; 256];
    for (i, c) in coeffs.iter_mut().enumerate() {
        *c = (i as i32 * 7919) % 8_380_417;
    }
    let a: Poly = Poly::from_coeffs(coeffs);

    group.bench_function("ntt_forward", |b| b.iter(|| black_box(a).ntt()));
    group.bench_function("ntt_roundtrip", |b| b.iter(|| black_box(a).ntt().inverse()));
    group.bench_function("mul", |b| b.iter(|| black_box(a).mul(&a)));
    group.bench_function("sample_uniform", |b| {
        b.iter(|| sampling::sample_uniform(black_box(&[3u8; 32]), 0))
    });
    group.bench_function("sample_challenge", |b| {
        b.iter(|| sampling::sample_challenge(black_box(&[3u8; 32]), 49))
    });

    group.finish();
}

criterion_group!(benches, dilithium_benchmarks, ring_benchmarks);
criterion_main!(benches);
