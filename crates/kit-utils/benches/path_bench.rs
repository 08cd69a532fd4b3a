use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kit_utils::path::GitPath;

fn bench_normalize(c: &mut Criterion) {
    c.bench_function("GitPath::new backslash-heavy", |b| {
        b.iter(|| GitPath::new(black_box(b"a\\b\\c\\d\\e\\f\\g.txt".as_slice())))
    });

    c.bench_function("GitPath::new already normalized", |b| {
        b.iter(|| GitPath::new(black_box(b"a/b/c/d/e/f/g.txt".as_slice())))
    });
}

criterion_group!(benches, bench_normalize);
criterion_main!(benches);
