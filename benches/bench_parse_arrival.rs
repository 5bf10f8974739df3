// benches/bench_parse_arrival.rs
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use intersection_controller::intake::parse_arrival;
use intersection_controller::models::DirectionSet;
use std::time::Duration;

fn bench_parse_arrival(c: &mut Criterion) {
    let directions = DirectionSet::default();
    let lines = ["A,car", " c , AMBULANCE ", "B,accident", "D,car", "A,spaceship", "nonsense"];

    let mut group = c.benchmark_group("parse_arrival");
    group.sample_size(100);
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("mixed_lines", |b| {
        b.iter(|| {
            for line in &lines {
                let _ = black_box(parse_arrival(&directions, black_box(line)));
            }
        });
    });
    group.finish();
}

criterion_group!(benches, bench_parse_arrival);
criterion_main!(benches);
