use std::f32::consts::TAU;
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rirnet::reconstruct::{Peak, PeakEncoding, reconstruct};
use rirnet::spectral;

const RATE: u32 = 44_100;

fn tone(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (TAU * 440.0 * i as f32 / RATE as f32).sin() * 0.5)
        .collect()
}

fn bench_mfcc(c: &mut Criterion) {
    let mut group = c.benchmark_group("to_mfcc");
    for seconds in [1usize, 4] {
        let samples = tone(RATE as usize * seconds);
        group.bench_with_input(BenchmarkId::from_parameter(seconds), &samples, |b, samples| {
            b.iter(|| spectral::to_mfcc(black_box(samples), RATE, 40).expect("mfcc"))
        });
    }
    group.finish();
}

fn bench_inverse(c: &mut Criterion) {
    let (phase, mfcc) = spectral::to_mfcc(&tone(RATE as usize), RATE, 40).expect("mfcc");
    c.bench_function("inverse_mfcc_1s", |b| {
        b.iter(|| spectral::inverse(black_box(&mfcc), RATE, Some(&phase)).expect("inverse"))
    });
}

fn bench_reconstruct(c: &mut Criterion) {
    let peaks = (0..256)
        .map(|i| Peak {
            time: i as f32 * 0.37,
            log_amplitude: i as f32 * 0.02,
        })
        .collect();
    let encoding = PeakEncoding::new(peaks);
    c.bench_function("reconstruct_256_peaks", |b| {
        b.iter(|| reconstruct(black_box(&encoding)))
    });
}

criterion_group!(benches, bench_mfcc, bench_inverse, bench_reconstruct);
criterion_main!(benches);
