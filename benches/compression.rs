use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use qfs::{decompress, Encoder};

fn generate_test_data(size: usize, pattern: &str) -> Vec<u8> {
    match pattern {
        "random" => {
            let mut state = 0x9e37_79b9_7f4a_7c15u64;
            (0..size)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    state as u8
                })
                .collect()
        }
        "repeated" => vec![b'a'; size],
        "text" => {
            let text = b"0x27812810:{\"Occupant Size\"}=Float32:3:{81.58979797,13.94729996,39.44250107}\r\n";
            text.iter().cycle().take(size).copied().collect()
        }
        "sequential" => (0..size).map(|i| (i % 256) as u8).collect(),
        _ => vec![0; size],
    }
}

fn bench_encode(c: &mut Criterion, name: &str, encoder: Encoder, patterns: &[&str]) {
    let mut group = c.benchmark_group(name);

    for size in [1024, 10 * 1024, 100 * 1024] {
        group.throughput(Throughput::Bytes(size as u64));

        for &pattern in patterns {
            let data = generate_test_data(size, pattern);
            group.bench_with_input(BenchmarkId::new(pattern, size), &data, |b, data| {
                b.iter(|| encoder.compress(black_box(data)));
            });
        }
    }
    group.finish();
}

fn bench_encode_fast(c: &mut Criterion) {
    bench_encode(
        c,
        "encode_fast",
        Encoder::fast(),
        &["random", "repeated", "text", "sequential"],
    );
}

fn bench_encode_default(c: &mut Criterion) {
    bench_encode(
        c,
        "encode_default",
        Encoder::new(),
        &["random", "repeated", "text", "sequential"],
    );
}

fn bench_encode_best(c: &mut Criterion) {
    bench_encode(c, "encode_best", Encoder::best(), &["repeated", "text"]);
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let encoder = Encoder::new().keep_unprofitable(true);

    for size in [1024, 10 * 1024, 100 * 1024] {
        for pattern in ["random", "repeated", "text", "sequential"] {
            let data = generate_test_data(size, pattern);
            let compressed = encoder.compress(&data).unwrap();

            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(
                BenchmarkId::new(pattern, size),
                &compressed,
                |b, compressed| {
                    b.iter(|| decompress(black_box(compressed)));
                },
            );
        }
    }
    group.finish();
}

fn bench_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("roundtrip");
    let encoder = Encoder::new();

    for size in [1024, 10 * 1024] {
        group.throughput(Throughput::Bytes(size as u64));

        for pattern in ["text", "repeated"] {
            let data = generate_test_data(size, pattern);
            group.bench_with_input(BenchmarkId::new(pattern, size), &data, |b, data| {
                b.iter(|| {
                    let compressed = encoder.compress(black_box(data)).unwrap();
                    decompress(black_box(&compressed)).unwrap()
                });
            });
        }
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_encode_fast,
    bench_encode_default,
    bench_encode_best,
    bench_decode,
    bench_roundtrip
);
criterion_main!(benches);
