use chrono::{NaiveDate, TimeDelta};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kolosal_forecast::dataset::GroupKey;
use kolosal_forecast::forecast::{
    ForecastArray, ForecastProjector, GroupForecast, PaddingPolicy, Statistic,
};
use kolosal_forecast::timeseries::{
    Frequency, FrequencyPair, RawSeries, SeriesRegularizer, TimePoint,
};
use ndarray::Array2;

fn origin() -> TimePoint {
    NaiveDate::from_ymd_opt(2022, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Shuffled hourly rows with every seventh hour missing
fn create_raw_series(n_rows: usize, n_features: usize) -> RawSeries {
    let hours: Vec<i64> = (0..n_rows as i64)
        .filter(|h| h % 7 != 3)
        .map(|h| (h * 7919) % n_rows as i64)
        .collect();

    RawSeries {
        timestamps: hours.iter().map(|&h| origin() + TimeDelta::hours(h)).collect(),
        target: hours.iter().map(|&h| (h as f64).sin()).collect(),
        real: Array2::from_shape_fn((hours.len(), n_features), |(i, j)| (hours[i] * (j as i64 + 1)) as f64),
        categorical: vec![hours.iter().map(|h| Some(format!("c{}", h % 5))).collect()],
    }
}

fn bench_regularize(c: &mut Criterion) {
    let mut group = c.benchmark_group("regularize");
    let regularizer = SeriesRegularizer::new(FrequencyPair::uniform(Frequency::hourly()));

    for n_rows in [1_000, 10_000, 100_000].iter() {
        let raw = create_raw_series(*n_rows, 4);

        group.bench_with_input(BenchmarkId::new("hourly", n_rows), &raw, |b, raw| {
            b.iter(|| regularizer.regularize(black_box(raw)).unwrap())
        });
    }

    group.finish();
}

fn bench_project(c: &mut Criterion) {
    let mut group = c.benchmark_group("project");
    let statistics = vec![Statistic::Mean, Statistic::Quantile(0.1), Statistic::Quantile(0.9)];
    let width = 60;

    for n_groups in [10, 100, 1_000].iter() {
        let rows_per_group = 24;
        let groups: Vec<GroupForecast> = (0..*n_groups)
            .map(|g| GroupForecast {
                key: GroupKey::new(vec![Some(format!("g{}", g))]),
                rows: (0..rows_per_group).map(|r| r * n_groups + g).collect(),
                offsets: (0..rows_per_group).map(|r| r as i64 * 3 - 5).collect(),
                forecast: ForecastArray::new(
                    statistics.clone(),
                    Array2::from_shape_fn((statistics.len(), width), |(s, j)| (s * width + j) as f64),
                )
                .unwrap(),
            })
            .collect();
        let rows = n_groups * rows_per_group;

        for padding in [PaddingPolicy::Missing, PaddingPolicy::RepeatLast] {
            let projector = ForecastProjector::new(padding);
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", padding), n_groups),
                &groups,
                |b, groups| {
                    b.iter(|| {
                        projector
                            .project(black_box(groups), rows, statistics.len())
                            .unwrap()
                    })
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_regularize, bench_project);
criterion_main!(benches);
