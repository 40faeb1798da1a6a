use criterion::{black_box, criterion_group, criterion_main, Criterion};
use signal_cleaning::{ButterworthLowPass, LowPassConfig};

fn bench_filtfilt(c: &mut Criterion) {
    let filter = ButterworthLowPass::new(LowPassConfig::default()).unwrap();
    // roughly one hour of samples at 5 Hz
    let signal: Vec<f64> = (0..18_000)
        .map(|i| (i as f64 * 0.05).sin() + 0.3 * (i as f64 * 2.7).sin())
        .collect();

    c.bench_function("filtfilt_order5_18k", |b| {
        b.iter(|| filter.filtfilt(black_box(&signal)))
    });
}

criterion_group!(benches, bench_filtfilt);
criterion_main!(benches);
