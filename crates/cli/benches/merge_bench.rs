use criterion::{criterion_group, criterion_main, Criterion};

use wordfile::{merge, WordFileReader, WordFileWriter};

const N: usize = 20_000;

fn merge_changelog(c: &mut Criterion) {
    let store: String = (0..N).map(|i| format!("w{:06},old {}\n", i, i)).collect();
    let sparse: String = (0..N)
        .step_by(100)
        .map(|i| format!("w{:06},new {}\n", i, i))
        .collect();
    let dense: String = (0..N)
        .step_by(2)
        .map(|i| format!("w{:06},new {}\n", i, i))
        .collect();

    for (name, changelog) in [("merge_20k_sparse", &sparse), ("merge_20k_dense", &dense)] {
        c.bench_function(name, |b| {
            b.iter(|| {
                let mut out = WordFileWriter::from_writer(Vec::with_capacity(store.len()));
                merge(
                    WordFileReader::from_reader(store.as_bytes()),
                    WordFileReader::from_reader(changelog.as_bytes()),
                    &mut out,
                )
                .unwrap()
            });
        });
    }
}

criterion_group!(benches, merge_changelog);
criterion_main!(benches);
