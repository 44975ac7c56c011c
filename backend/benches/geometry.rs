use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use runroute::dem::DemGrid;
use runroute::elevation::sample_elevation;
use runroute::models::Coordinate;
use runroute::routing::approximate_distance_km;
use runroute::share::{compress_route, decompress_route};
use runroute::slope::{find_steep_segments, SlopeConfig};

/// Zig-zag path heading north-east, roughly 100 m per step.
fn zigzag(points: usize) -> Vec<Coordinate> {
    (0..points)
        .map(|i| {
            let wiggle = if i % 2 == 0 { 0.0 } else { 0.0004 };
            Coordinate::new(45.0 + i as f64 * 0.0009, 5.0 + wiggle + i as f64 * 0.0002)
        })
        .collect()
}

/// 200x200 grid over the zig-zag area with a steady northward climb.
fn synthetic_grid() -> DemGrid {
    let size = 200;
    let mut text = format!(
        "ncols {size}\nnrows {size}\nxllcorner 4.99\nyllcorner 44.99\ncellsize 0.002\nNODATA_value -9999\n"
    );
    for row in 0..size {
        let elevation = (size - row) as f64 * 3.0;
        let line = vec![format!("{elevation:.1}"); size].join(" ");
        text.push_str(&line);
        text.push('\n');
    }
    DemGrid::from_reader(text.as_bytes()).expect("synthetic grid")
}

fn benchmark_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("approximate_distance");
    for points in [100, 1_000, 10_000] {
        let path = zigzag(points);
        group.bench_with_input(BenchmarkId::from_parameter(points), &path, |b, path| {
            b.iter(|| approximate_distance_km(black_box(path)))
        });
    }
    group.finish();
}

fn benchmark_elevation_profile(c: &mut Criterion) {
    let grid = synthetic_grid();
    let mut group = c.benchmark_group("elevation_profile");
    for points in [100, 400] {
        let path = zigzag(points);
        group.bench_with_input(BenchmarkId::from_parameter(points), &path, |b, path| {
            b.iter(|| {
                let samples = sample_elevation(black_box(path), &grid, 30.0);
                find_steep_segments(&samples, SlopeConfig::default())
            })
        });
    }
    group.finish();
}

fn benchmark_share_encoding(c: &mut Criterion) {
    let path = zigzag(500);
    let encoded = compress_route(&path);

    c.bench_function("compress_route_500", |b| {
        b.iter(|| compress_route(black_box(&path)))
    });
    c.bench_function("decompress_route_500", |b| {
        b.iter(|| decompress_route(black_box(&encoded)))
    });
}

criterion_group!(
    benches,
    benchmark_distance,
    benchmark_elevation_profile,
    benchmark_share_encoding
);
criterion_main!(benches);
