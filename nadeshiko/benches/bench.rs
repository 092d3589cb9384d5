use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use image::RgbImage;
use nadeshiko::{DitherMatrix, EncodeOptions, Encoder, Metric, Rgb};

const WIDTH: u32 = 320;
const HEIGHT: u32 = 200;

/// Horizontal bars scrolling down over a gradient.
fn frame(t: u32) -> Vec<Rgb> {
    RgbImage::from_fn(WIDTH, HEIGHT, |x, y| {
        if (y + t * 3) % 40 < 8 {
            image::Rgb([230, 40, 60])
        } else {
            image::Rgb([(x * 255 / WIDTH) as u8, (y * 255 / HEIGHT) as u8, 128])
        }
    })
    .pixels()
    .map(|p| p.0)
    .collect()
}

fn quantize(c: &mut Criterion) {
    let mut group = c.benchmark_group("quantize");
    let metric = Metric::default();
    let input = frame(0);

    group.throughput(criterion::Throughput::Elements(u64::from(WIDTH * HEIGHT)));
    for (name, dither) in [
        ("none", DitherMatrix::none()),
        ("bayer2", DitherMatrix::bayer2()),
        ("bayer4", DitherMatrix::bayer4()),
    ] {
        let encoder = Encoder::with_metric(
            EncodeOptions {
                dither,
                ..Default::default()
            },
            metric.clone(),
        );
        group.bench_with_input(BenchmarkId::new("dither", name), &input, |b, input| {
            b.iter(|| encoder.quantize(WIDTH as usize, HEIGHT as usize, input).unwrap())
        });
    }
}

fn encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    group.sample_size(10);

    let metric = Metric::default();
    let encoder = Encoder::with_metric(EncodeOptions::default(), metric);
    let frames = (0..2)
        .map(|t| {
            encoder
                .quantize(WIDTH as usize, HEIGHT as usize, &frame(t))
                .unwrap()
        })
        .collect::<Vec<_>>();

    group.bench_function("first frame", |b| {
        b.iter(|| {
            let mut encoder = encoder.clone();
            encoder.encode_cells(frames[0].clone()).unwrap()
        })
    });

    let mut primed = encoder.clone();
    primed.encode_cells(frames[0].clone()).unwrap();
    for budget in [64, 254] {
        group.bench_with_input(BenchmarkId::new("next frame", budget), &budget, |b, &budget| {
            let mut primed = primed.clone();
            primed.set_budget(budget);
            b.iter(|| {
                let mut encoder = primed.clone();
                encoder.encode_cells(frames[1].clone()).unwrap()
            })
        });
    }
}

criterion_group!(benches, quantize, encode);
criterion_main!(benches);
