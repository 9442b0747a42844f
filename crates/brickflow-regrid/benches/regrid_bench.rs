//! Throughput of the three brick-pipeline stages: dense generation,
//! padding, and grid-to-grid regridding.

use brickflow_brick::Brick;
use brickflow_collection::{Backend, Collection};
use brickflow_core::{Box3, Coord3, Dtype, Grid, Result, VolumeAccessor, VoxelBuffer};
use brickflow_regrid::{generate_bricks_dense, pad_brick, realign_to_new_grid};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

struct ConstAccessor;
impl VolumeAccessor for ConstAccessor {
    fn fetch(&self, b: Box3) -> Result<VoxelBuffer> {
        Ok(VoxelBuffer::zeros(b.shape(), Dtype::U8))
    }
    fn dtype(&self) -> Dtype {
        Dtype::U8
    }
}

fn bounding_box(side: i64) -> Box3 {
    Box3::new(Coord3::zero(), Coord3::splat(side))
}

fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_bricks_dense");
    for &side in &[64i64, 256] {
        let bbox = bounding_box(side);
        group.throughput(Throughput::Elements(bbox.volume()));
        let grid = Grid::new(Coord3::splat(32), Coord3::zero()).unwrap();
        group.bench_function(BenchmarkId::new("side", side), |b| {
            b.iter(|| {
                black_box(generate_bricks_dense(bbox, grid, Arc::new(ConstAccessor), false).unwrap())
            });
        });
    }
    group.finish();
}

fn bench_padding(c: &mut Criterion) {
    let mut group = c.benchmark_group("pad_brick");
    let padding_grid = Grid::new(Coord3::splat(64), Coord3::zero()).unwrap();
    let logical = Box3::new(Coord3::zero(), Coord3::splat(64));
    let physical = Box3::new(Coord3::splat(8), Coord3::splat(64));
    group.throughput(Throughput::Elements(physical.volume()));
    group.bench_function("edge_brick", |b| {
        b.iter(|| {
            let brick = Brick::new(
                logical,
                physical,
                VoxelBuffer::zeros(physical.shape(), Dtype::U8),
            )
            .unwrap();
            black_box(pad_brick(padding_grid, &ConstAccessor, &brick).unwrap())
        });
    });
    group.finish();
}

fn bench_regrid(c: &mut Criterion) {
    let mut group = c.benchmark_group("realign_to_new_grid");
    let old_grid = Grid::new(Coord3::splat(64), Coord3::zero()).unwrap();
    let bbox = bounding_box(256);
    group.throughput(Throughput::Elements(bbox.volume()));
    group.bench_function("64_to_32", |b| {
        b.iter_batched(
            || {
                let bricks =
                    generate_bricks_dense(bbox, old_grid, Arc::new(ConstAccessor), false).unwrap();
                Collection::new(bricks, Backend::Sequential)
            },
            |bricks| {
                let new_grid = Grid::new(Coord3::splat(32), Coord3::zero()).unwrap();
                black_box(realign_to_new_grid(new_grid, bricks).unwrap())
            },
            criterion::BatchSize::LargeInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_generation, bench_padding, bench_regrid);
criterion_main!(benches);
