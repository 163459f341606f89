use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use rand::Rng;
use tempfile::TempDir;

use burrow_db::{BackendType, Options, Store};

const PRELOAD: usize = 50_000;

fn test_key(i: usize) -> Vec<u8> {
    format!("burrow-key-{i:09}").into_bytes()
}

fn test_value(i: usize) -> Vec<u8> {
    format!("burrow-value-{i:09}-{}", "x".repeat(64)).into_bytes()
}

fn open(backend: BackendType) -> (Store, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path(), "bench", Options::new().with_backend(backend)).unwrap();
    (store, dir)
}

fn preloaded(backend: BackendType) -> (Store, TempDir) {
    let (store, dir) = open(backend);
    for i in 0..PRELOAD {
        store.set(&test_key(i), Some(&test_value(i))).unwrap();
    }
    (store, dir)
}

fn bench_set(c: &mut Criterion) {
    for backend in BackendType::ALL {
        let (store, _dir) = open(backend);
        let mut rnd = rand::thread_rng();
        c.bench_function(&format!("{backend}-set"), |b| {
            b.iter(|| {
                let i = rnd.gen_range(0..u32::MAX) as usize;
                store.set(&test_key(i), Some(&test_value(i))).unwrap();
            })
        });
    }
}

fn bench_set_sync(c: &mut Criterion) {
    let (store, _dir) = open(BackendType::Wal);
    let mut rnd = rand::thread_rng();
    c.bench_function("wal-set-sync", |b| {
        b.iter(|| {
            let i = rnd.gen_range(0..u32::MAX) as usize;
            store.set_sync(&test_key(i), Some(&test_value(i))).unwrap();
        })
    });
}

fn bench_get(c: &mut Criterion) {
    for backend in BackendType::ALL {
        let (store, _dir) = preloaded(backend);
        let mut rnd = rand::thread_rng();
        c.bench_function(&format!("{backend}-get"), |b| {
            b.iter(|| {
                let i = rnd.gen_range(0..PRELOAD * 2);
                let found = store.get(&test_key(i)).unwrap();
                assert_eq!(found.is_some(), i < PRELOAD);
            })
        });
    }
}

fn bench_batch(c: &mut Criterion) {
    let (store, _dir) = open(BackendType::Wal);
    let mut rnd = rand::thread_rng();
    c.bench_function("wal-batch-100", |b| {
        b.iter_batched(
            || {
                let base = rnd.gen_range(0..u32::MAX) as usize;
                let mut batch = store.new_batch().unwrap();
                for i in base..base + 100 {
                    batch.set(&test_key(i), Some(&test_value(i))).unwrap();
                }
                batch
            },
            |mut batch| batch.write().unwrap(),
            BatchSize::SmallInput,
        )
    });
}

fn bench_range_scan(c: &mut Criterion) {
    let (store, _dir) = preloaded(BackendType::Wal);
    let mut rnd = rand::thread_rng();
    c.bench_function("wal-scan-1000", |b| {
        b.iter(|| {
            let start = rnd.gen_range(0..PRELOAD - 1000);
            let seen = store
                .iterator(Some(&test_key(start)), Some(&test_key(start + 1000)))
                .unwrap()
                .count();
            assert_eq!(seen, 1000);
        })
    });
}

criterion_group!(
    benches,
    bench_set,
    bench_set_sync,
    bench_get,
    bench_batch,
    bench_range_scan
);
criterion_main!(benches);
