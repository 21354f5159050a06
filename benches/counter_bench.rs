use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use topn_strings::ranking::Ranker;
use topn_strings::{ChainedHashMap, TopNCounter, Watermarks};

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

// Rough Zipf: key rank is the number of leading zeros of a random word,
// plus a uniform tail id so the table keeps filling up.
fn zipf_keys(n: usize, seed: u64) -> Vec<String> {
    lcg(seed)
        .take(n)
        .map(|x| {
            let rank = x.leading_zeros();
            if rank >= 2 {
                format!("hot{rank}")
            } else {
                format!("tail{}", (x >> 16) % 1_000_000)
            }
        })
        .collect()
}

fn bench_stream(c: &mut Criterion) {
    let keys = zipf_keys(200_000, 5);
    let mut group = c.benchmark_group("counter::stream");
    group.throughput(Throughput::Elements(keys.len() as u64));
    group.bench_function("200k_lo5k_hi10k", |b| {
        b.iter_batched(
            || TopNCounter::<String>::new(Watermarks::new(100, 5_000, 10_000).unwrap()).unwrap(),
            |mut c| {
                for k in &keys {
                    c.add(k.as_str(), 1);
                }
                black_box(c.stats().culls)
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_cull(c: &mut Criterion) {
    c.bench_function("ranking::cull_100k_to_50k", |b| {
        let mut ranker = Ranker::with_capacity(100_000);
        b.iter_batched(
            || {
                let mut m = ChainedHashMap::new(50_001).unwrap();
                for (i, x) in lcg(17).take(100_000).enumerate() {
                    m.add(format!("k{i}"), x % 1_000);
                }
                m
            },
            |mut m| black_box(ranker.cull(&mut m, 50_000)),
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_stream, bench_cull);
criterion_main!(benches);
