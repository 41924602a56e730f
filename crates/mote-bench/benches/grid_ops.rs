//! Criterion micro-benchmarks for surface grids.

use criterion::{criterion_group, criterion_main, Criterion};
use mote_core::{NotifyLevel, TileIndex, Vec2, WallIndex};
use mote_geom::GeometryStore;
use mote_test_utils::folded_pair;
use std::hint::black_box;

/// Benchmark: uv -> tile for 10K positions on one wall.
fn bench_uv_to_tile_10k(c: &mut Criterion) {
    let mut store = GeometryStore::build(&[folded_pair("fold")], NotifyLevel::Warn).unwrap();
    let frame = store.wall(WallIndex(0)).frame;
    let grid = store.ensure_grid(WallIndex(0)).unwrap();
    let uvs: Vec<Vec2> = (0..10_000u64)
        .map(|i| {
            let a = (i.wrapping_mul(6364136223846793007) % 1000) as f64 / 1000.0;
            let b = (i.wrapping_mul(1442695040888963407) % 1000) as f64 / 1000.0;
            let (a, b) = if a + b > 1.0 { (1.0 - a, 1.0 - b) } else { (a, b) };
            frame.uv_corners()[1] * a + frame.uv_corners()[2] * b
        })
        .collect();
    c.bench_function("grid_uv_to_tile_10k", |b| {
        b.iter(|| {
            for &uv in &uvs {
                black_box(grid.uv_to_tile(uv));
            }
        });
    });
}

/// Benchmark: neighbor tiles of every tile on one wall.
fn bench_neighbor_tiles(c: &mut Criterion) {
    let mut store = GeometryStore::build(&[folded_pair("fold")], NotifyLevel::Warn).unwrap();
    let grid = store.ensure_grid(WallIndex(0)).unwrap();
    let n = grid.tile_count();
    c.bench_function("grid_neighbor_tiles", |b| {
        b.iter(|| {
            for t in 0..n {
                black_box(grid.neighbor_tiles(TileIndex(t)));
            }
        });
    });
}

criterion_group!(benches, bench_uv_to_tile_10k, bench_neighbor_tiles);
criterion_main!(benches);
