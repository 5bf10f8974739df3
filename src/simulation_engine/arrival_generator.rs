use crate::intake::Arrival;
use crate::models::{DirectionSet, VehicleClass};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

// Share of each class in generated traffic, in percent.
const CLASS_MIX: [(VehicleClass, u32); 7] = [
    (VehicleClass::Car, 50),
    (VehicleClass::Pedestrian, 20),
    (VehicleClass::Vip, 10),
    (VehicleClass::Police, 5),
    (VehicleClass::Fire, 5),
    (VehicleClass::Ambulance, 6),
    (VehicleClass::Accident, 4),
];

/// Random arrivals for exercising a running controller.
pub struct ArrivalGenerator {
    rng: SmallRng,
    directions: DirectionSet,
    min_gap: Duration,
    max_gap: Duration,
}

impl ArrivalGenerator {
    pub fn new(directions: DirectionSet, min_gap: Duration, max_gap: Duration) -> Self {
        Self::with_rng(SmallRng::from_os_rng(), directions, min_gap, max_gap)
    }

    pub fn seeded(seed: u64, directions: DirectionSet, min_gap: Duration, max_gap: Duration) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed), directions, min_gap, max_gap)
    }

    fn with_rng(rng: SmallRng, directions: DirectionSet, min_gap: Duration, max_gap: Duration) -> Self {
        let max_gap = max_gap.max(min_gap);
        Self {
            rng,
            directions,
            min_gap,
            max_gap,
        }
    }

    /// Picks a direction uniformly and a class by `CLASS_MIX`.
    pub fn next_arrival(&mut self) -> Option<Arrival> {
        let index = self.rng.random_range(0..self.directions.len().max(1));
        let direction = self.directions.iter().nth(index)?;

        let total: u32 = CLASS_MIX.iter().map(|(_, share)| share).sum();
        let mut roll = self.rng.random_range(0..total);
        let mut vehicle = VehicleClass::Car;
        for (class, share) in CLASS_MIX {
            if roll < share {
                vehicle = class;
                break;
            }
            roll -= share;
        }
        Some(Arrival { direction, vehicle })
    }

    /// Time to wait before the next arrival.
    pub fn next_gap(&mut self) -> Duration {
        if self.min_gap == self.max_gap {
            return self.min_gap;
        }
        self.rng.random_range(self.min_gap..=self.max_gap)
    }
}
