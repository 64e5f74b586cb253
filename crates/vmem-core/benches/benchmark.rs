//! Performance benchmarks for vmem
//!
//! Run with: cargo bench --package vmem-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::fs::{File, OpenOptions};
use std::time::SystemTime;
use vmem_core::{AccessMode, MappedRegion};

fn scratch_file(len: u64) -> File {
    let ts = SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = std::env::temp_dir().join(format!("vmem_bench_{ts}"));
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .unwrap();
    file.set_len(len).unwrap();
    file
}

fn bench_map_unmap(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_unmap");
    for size in [4096u64, 65536, 1048576] {
        group.throughput(Throughput::Bytes(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let file = scratch_file(size);
            b.iter(|| {
                let mapped = MappedRegion::map(&file, AccessMode::ReadWrite, 0, size).unwrap();
                black_box(mapped.len());
            });
        });
    }
    group.finish();
}

fn bench_slot_ops(c: &mut Criterion) {
    let file = scratch_file(4096);
    let mapped = MappedRegion::map(&file, AccessMode::ReadWrite, 0, 4096).unwrap();
    let view = mapped.longs(0, 512).unwrap();

    let mut group = c.benchmark_group("slot_ops");
    group.bench_function("set", |b| {
        b.iter(|| view.set(black_box(7), black_box(42)).unwrap());
    });
    group.bench_function("get", |b| {
        b.iter(|| black_box(view.get(black_box(7)).unwrap()));
    });
    group.bench_function("set_ordered", |b| {
        b.iter(|| view.set_ordered(black_box(7), black_box(42)).unwrap());
    });
    group.bench_function("get_volatile", |b| {
        b.iter(|| black_box(view.get_volatile(black_box(7)).unwrap()));
    });
    group.bench_function("compare_and_set", |b| {
        view.set(9, 0).unwrap();
        b.iter(|| {
            let current = view.get_volatile(9).unwrap();
            black_box(view.compare_and_set(9, current, current + 1).unwrap());
        });
    });
    group.bench_function("bound_slot_set_ordered", |b| {
        let slot = view.bind(11).unwrap();
        b.iter(|| slot.set_ordered(black_box(5)));
    });
    group.finish();
}

fn bench_ref_count_ops(c: &mut Criterion) {
    let file = scratch_file(4096);
    let mapped = MappedRegion::map(&file, AccessMode::ReadWrite, 0, 4096).unwrap();
    let retained = mapped.retained();

    let mut group = c.benchmark_group("ref_count");
    group.bench_function("acquire_release", |b| {
        b.iter(|| {
            retained.acquire();
            retained.release();
        });
    });
    group.bench_function("ref_count", |b| {
        b.iter(|| black_box(retained.ref_count()));
    });
    group.finish();
}

criterion_group!(benches, bench_map_unmap, bench_slot_ops, bench_ref_count_ops);
criterion_main!(benches);
