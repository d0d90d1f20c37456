use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

use store::{MemoryBlobStore, RemoteRangeReader, StoreBuilder, StoreReader};

const N: usize = 10_000;
const DEF_SIZE: usize = 80;

fn source_contents() -> String {
    (0..N)
        .map(|i| format!("word{:06},{}\n", i, "d".repeat(DEF_SIZE)))
        .collect()
}

fn store_build(c: &mut Criterion) {
    let contents = source_contents();
    c.bench_function("store_build_10k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let src = dir.path().join("words.dat");
                fs::write(&src, &contents).unwrap();
                (dir, src)
            },
            |(dir, src)| {
                StoreBuilder::build(&src, None, &dir.path().join("dict.dat")).unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

fn store_query(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let src = dir.path().join("words.dat");
    let path = dir.path().join("dict.dat");
    fs::write(&src, source_contents()).unwrap();
    StoreBuilder::build(&src, None, &path).unwrap();

    let local = StoreReader::open_path(&path).unwrap();
    c.bench_function("store_query_local", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i = (i + 7919) % N;
            local.query(&format!("word{:06}", i)).unwrap().unwrap();
        });
    });

    let blobs = Arc::new(MemoryBlobStore::new());
    blobs.put("dict.dat", fs::read(&path).unwrap());
    let remote = StoreReader::open(RemoteRangeReader::new(blobs, "dict.dat")).unwrap();
    c.bench_function("store_query_memory_blob", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i = (i + 7919) % N;
            remote.query(&format!("word{:06}", i)).unwrap().unwrap();
        });
    });

    c.bench_function("store_open_index_10k", |b| {
        b.iter(|| StoreReader::open_path(&path).unwrap());
    });
}

criterion_group!(benches, store_build, store_query);
criterion_main!(benches);
