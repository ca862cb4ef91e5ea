//! Cache benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cinder_cache::LruCache;

fn lru_insert_benchmark(c: &mut Criterion) {
    c.bench_function("lru_insert_1000", |b| {
        b.iter(|| {
            let mut cache = LruCache::new(1000);
            for i in 0..1000u64 {
                cache.insert(i, i * 2);
            }
            black_box(cache.len())
        })
    });
}

fn lru_get_benchmark(c: &mut Criterion) {
    let mut cache = LruCache::new(1000);
    for i in 0..1000u64 {
        cache.insert(i, i * 2);
    }

    c.bench_function("lru_get_1000", |b| {
        b.iter(|| {
            for i in 0..1000u64 {
                black_box(cache.get(&i));
            }
        })
    });
}

fn lru_churn_benchmark(c: &mut Criterion) {
    c.bench_function("lru_churn_capacity_128", |b| {
        b.iter(|| {
            let mut cache = LruCache::new(128);
            for i in 0..4096u64 {
                cache.insert(i, i);
            }
            black_box(cache.len())
        })
    });
}

criterion_group!(
    benches,
    lru_insert_benchmark,
    lru_get_benchmark,
    lru_churn_benchmark
);
criterion_main!(benches);
