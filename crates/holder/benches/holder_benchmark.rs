use criterion::{Criterion, black_box, criterion_group, criterion_main};
use holder::{SharedPtr, UniquePtr, make_shared};
use std::sync::Arc;

#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Clone, Default)]
struct Payload {
    values: [u64; 8],
}

pub fn holder_benchmark(c: &mut Criterion) {
    c.bench_function("make_shared", |b| {
        b.iter(|| black_box(make_shared(Payload::default())));
    });
    c.bench_function("shared_from_box", |b| {
        b.iter(|| black_box(SharedPtr::from_box(Box::new(Payload::default()))));
    });
    c.bench_function("shared_from_unique", |b| {
        b.iter(|| black_box(SharedPtr::from_unique(UniquePtr::new(Payload::default()))));
    });
    c.bench_function("std_arc_new", |b| {
        b.iter(|| black_box(Arc::new(Payload::default())));
    });
    c.bench_function("clone_and_drop", |b| {
        let shared = make_shared(Payload::default());
        b.iter(|| {
            let copy = black_box(shared.clone());
            black_box(copy.values[0]);
        })
    });
    c.bench_function("project", |b| {
        let shared = make_shared(Payload::default());
        b.iter(|| black_box(SharedPtr::project(&shared, |payload| &payload.values[3])));
    });
}

criterion_group!(benches, holder_benchmark);
criterion_main!(benches);
