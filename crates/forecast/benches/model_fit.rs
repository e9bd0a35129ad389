use std::hint::black_box;

use chrono::{Days, NaiveDate};
use criterion::{Criterion, criterion_group, criterion_main};

use stocksense_forecast::{
    DailySeries, DemandModel, HybridForecaster, SeasonalArima, SeasonalDecomposition,
};

fn synthetic_series(days: usize) -> DailySeries {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    DailySeries::from_points((0..days).map(|t| {
        let weekly = [4.0, 2.0, 6.0, 9.0, 14.0, 22.0, 11.0][t % 7];
        let trend = 0.05 * t as f64;
        (start + Days::new(t as u64), 10.0 + weekly + trend)
    }))
}

fn bench_models(c: &mut Criterion) {
    let series = synthetic_series(90);

    c.bench_function("seasonal_fit_90d", |b| {
        let model = SeasonalArima::default();
        b.iter(|| black_box(model.fit(black_box(&series))));
    });

    c.bench_function("decomposition_fit_90d", |b| {
        let model = SeasonalDecomposition::default();
        b.iter(|| black_box(model.fit(black_box(&series))));
    });

    c.bench_function("hybrid_ladder_90d", |b| {
        let forecaster = HybridForecaster::default();
        b.iter(|| black_box(forecaster.forecast(black_box(&series))));
    });
}

criterion_group!(benches, bench_models);
criterion_main!(benches);
