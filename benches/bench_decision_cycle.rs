// benches/bench_decision_cycle.rs
use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, BatchSize, Criterion, PlotConfiguration,
};
use intersection_controller::models::{Direction, DirectionSet, VehicleClass};
use intersection_controller::shared_data::ControllerState;
use std::time::Duration;

const NON_EMERGENCY: [VehicleClass; 3] = [
    VehicleClass::Car,
    VehicleClass::Pedestrian,
    VehicleClass::Vip,
];

// Four approaches with `per_direction` waiting vehicles each, and optionally
// one emergency vehicle at the very tail of the last queue (worst-case scan).
fn create_state(per_direction: usize, emergency_at_tail: bool) -> ControllerState {
    let directions = DirectionSet::new("NESW".chars().filter_map(Direction::new).collect());
    let mut state = ControllerState::new(directions.clone());
    for direction in directions.iter() {
        for i in 0..per_direction {
            state
                .enqueue(direction, NON_EMERGENCY[i % NON_EMERGENCY.len()])
                .unwrap();
        }
    }
    if emergency_at_tail {
        let last = directions.iter().last().unwrap();
        state.enqueue(last, VehicleClass::Ambulance).unwrap();
    }
    state
}

fn bench_decide(c: &mut Criterion) {
    let mut group = c.benchmark_group("decide");

    group.sample_size(100);
    group.measurement_time(Duration::from_secs(5));
    group.warm_up_time(Duration::from_secs(2));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Linear));

    for &size in [50, 100, 200].iter() {
        group.bench_function(format!("priority_size_{}", size), |b| {
            b.iter_batched(
                || create_state(size, false),
                |mut state| black_box(state.decide()),
                BatchSize::SmallInput,
            );
        });
        group.bench_function(format!("emergency_tail_size_{}", size), |b| {
            b.iter_batched(
                || create_state(size, true),
                |mut state| black_box(state.decide()),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decide);
criterion_main!(benches);
