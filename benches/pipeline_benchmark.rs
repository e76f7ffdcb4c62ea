use criterion::{criterion_group, criterion_main, Criterion};
use runningroutes::geo_utils::{GeoDistance, LatLng};
use runningroutes::services::{ElevationProcessor, Resampler};
use std::hint::black_box;

/// A ~10km out-and-back with uneven point spacing, like a phone GPS trace.
fn synthetic_track() -> Vec<LatLng> {
    let geo = GeoDistance::new(6371.0);
    let mut points = vec![LatLng::new(39.414, -77.418)];
    for i in 0..400 {
        let last = points[points.len() - 1];
        let bearing = if i < 200 { 45.0 + (i % 7) as f64 } else { 225.0 - (i % 5) as f64 };
        let step = 5.0 + (i % 13) as f64 * 6.0;
        points.push(geo.destination(last, bearing, step));
    }
    points
}

fn benchmark_pipeline(c: &mut Criterion) {
    let track = synthetic_track();
    let resampler = Resampler::new(GeoDistance::new(6371.0), 30.0);
    let processor = ElevationProcessor::new(5, 8.0, 8.0);

    let resampled = resampler.resample(&track);
    let raw: Vec<f64> = resampled
        .iter()
        .map(|p| 100.0 + (p.cumdist_km * 3.0).sin() * 40.0 + (p.cumdist_km * 50.0).cos())
        .collect();
    let smoothed = processor.smooth(&raw);

    let mut group = c.benchmark_group("ingest_pipeline");

    group.bench_function("resample", |b| {
        b.iter(|| resampler.resample(black_box(&track)))
    });

    group.bench_function("smooth", |b| b.iter(|| processor.smooth(black_box(&raw))));

    group.bench_function("gain", |b| b.iter(|| processor.gain(black_box(&smoothed))));

    group.finish();
}

criterion_group!(benches, benchmark_pipeline);
criterion_main!(benches);
