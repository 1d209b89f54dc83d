use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pario_core::{
    CartesianDecomposition, CartesianTopology, ElementType, Order, Subarray, Topology,
};

fn bench_split_work(c: &mut Criterion) {
    c.bench_function("split_work_all_ids", |b| {
        b.iter(|| {
            let mut total = 0;
            for id in 0..1024 {
                total += pario_core::split_work(black_box(1_000_003), 1024, id)
                    .map(|r| r.len())
                    .unwrap_or(0);
            }
            total
        })
    });
}

fn bench_cartesian_commit(c: &mut Criterion) {
    let topology: Topology = CartesianTopology::new(64, 37, 3)
        .expect("valid grid")
        .into();
    let decomposer = CartesianDecomposition::new(&topology).expect("cartesian topology");

    c.bench_function("cartesian_region_commit_256^3", |b| {
        b.iter(|| {
            let d = decomposer
                .decompose(black_box(&[256, 256, 256]))
                .expect("decomposable domain");
            Subarray::new(d, ElementType::F64, Order::C)
                .expect("valid subarray")
                .commit()
                .runs()
                .len()
        })
    });
}

criterion_group!(benches, bench_split_work, bench_cartesian_commit);
criterion_main!(benches);
