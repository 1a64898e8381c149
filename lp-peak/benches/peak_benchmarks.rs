use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lp_core::Image;
use lp_peak::{apply_linear_ramp, PeakDetectorBuilder};

/// Create benchmark image with blobs on a textured background
fn create_benchmark_image(width: usize, height: usize) -> Image {
    Image::from_fn(width, height, |x, y| {
        let gradient = ((x as f32 / width as f32) * 50.0) as u8;
        let noise = ((x * 7 + y * 13) % 11) as u8;
        let blob = if (x / 24 + y / 24) % 3 == 0 && x % 24 < 5 && y % 24 < 5 { 80 } else { 0 };
        100 + gradient + noise + blob
    })
}

fn bench_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_peak_detection");

    for &(width, height) in &[(256, 256), (640, 480), (1280, 960)] {
        let img = create_benchmark_image(width, height);
        let detector = PeakDetectorBuilder::new().preset_paper().build().unwrap();

        group.bench_with_input(
            BenchmarkId::new("paper_windows", format!("{}x{}", width, height)),
            &img,
            |b, img| b.iter(|| black_box(detector.detect(black_box(img)))),
        );
    }

    group.finish();
}

fn bench_pipeline_stages(c: &mut Criterion) {
    let img = create_benchmark_image(640, 480);
    let mut group = c.benchmark_group("pipeline_stages");

    group.bench_function("linear_ramp", |b| {
        b.iter(|| black_box(apply_linear_ramp(black_box(&img), 1e-6)))
    });

    let unique = PeakDetectorBuilder::new()
        .window_sizes(vec![32, 64])
        .unique_peaks(true)
        .build()
        .unwrap();
    group.bench_function("unique_peaks", |b| b.iter(|| black_box(unique.detect(black_box(&img)))));

    let sorted = PeakDetectorBuilder::new()
        .window_sizes(vec![32, 64])
        .sort_by_response(true)
        .build()
        .unwrap();
    group.bench_function("sort_by_response", |b| b.iter(|| black_box(sorted.detect(black_box(&img)))));

    group.finish();
}

fn bench_window_sizes(c: &mut Criterion) {
    let img = create_benchmark_image(640, 480);
    let mut group = c.benchmark_group("window_size");

    for &window in &[8usize, 16, 32, 64, 128, 256] {
        let detector = PeakDetectorBuilder::new().window_sizes(vec![window]).build().unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(window), &window, |b, _| {
            b.iter(|| black_box(detector.detect(black_box(&img))))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_detection, bench_pipeline_stages, bench_window_sizes);
criterion_main!(benches);
