use criterion::{criterion_group, criterion_main, Criterion};
use metaprune::{parse_document, prune_source, serialize_document, Selector};
use std::hint::black_box;

const LAYOUT: &str = include_str!("../tests/fixtures/Account-Account_Layout.layout-meta.xml");
const PERMISSION_SET: &str = include_str!("../tests/fixtures/Account.permissionset-meta.xml");

fn bench_serialize_layout(c: &mut Criterion) {
    let doc = parse_document(LAYOUT).unwrap();
    c.bench_function("serialize_layout", |b| {
        b.iter(|| {
            let _result = serialize_document(black_box(&doc)).unwrap();
        });
    });
}

fn bench_serialize_permission_set(c: &mut Criterion) {
    let doc = parse_document(PERMISSION_SET).unwrap();
    c.bench_function("serialize_permission_set", |b| {
        b.iter(|| {
            let _result = serialize_document(black_box(&doc)).unwrap();
        });
    });
}

// Whole pipeline in memory: parse, select, remove, serialize
fn bench_prune_layout(c: &mut Criterion) {
    let selector = Selector::new("//ns:relatedLists").unwrap();
    c.bench_function("prune_layout", |b| {
        b.iter(|| {
            let _result = prune_source(black_box(LAYOUT), &selector).unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_serialize_layout,
    bench_serialize_permission_set,
    bench_prune_layout
);
criterion_main!(benches);
