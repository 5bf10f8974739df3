//! Arrival intake: validation of `direction,vehicle` events and appends to
//! the shared queues. Every producer (console, AMQP) goes through [`Intake`].

pub mod console;

use crate::error::IntakeError;
use crate::models::{Direction, DirectionSet, VehicleClass};
use crate::shared_data::{lock_state, ControllerSnapshot, SharedState};
use log::debug;
use serde::Serialize;

/// A validated arrival event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Arrival {
    pub direction: Direction,
    pub vehicle: VehicleClass,
}

/// Checks a direction/vehicle token pair against the fixed tables.
pub fn validate(
    directions: &DirectionSet,
    direction_token: &str,
    vehicle_token: &str,
) -> Result<Arrival, IntakeError> {
    let direction = directions
        .resolve(direction_token)
        .ok_or_else(|| IntakeError::UnknownDirection(direction_token.trim().to_string()))?;
    let vehicle = vehicle_token
        .parse::<VehicleClass>()
        .map_err(IntakeError::UnknownVehicle)?;
    Ok(Arrival { direction, vehicle })
}

/// Parses the console form `A,car`.
pub fn parse_arrival(directions: &DirectionSet, line: &str) -> Result<Arrival, IntakeError> {
    let line = line.trim();
    let mut parts = line.split(',');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(direction), Some(vehicle), None) => validate(directions, direction, vehicle),
        _ => Err(IntakeError::Malformed(line.to_string())),
    }
}

/// Cloneable producer handle onto the shared controller state.
#[derive(Clone)]
pub struct Intake {
    state: SharedState,
    directions: DirectionSet,
}

impl Intake {
    pub fn new(state: SharedState, directions: DirectionSet) -> Self {
        Self { state, directions }
    }

    pub fn directions(&self) -> &DirectionSet {
        &self.directions
    }

    /// Appends a validated arrival. The lock is held for the append only.
    pub fn enqueue(&self, arrival: Arrival) -> Result<(), IntakeError> {
        let mut state = lock_state(&self.state).map_err(|_| IntakeError::StateUnavailable)?;
        state
            .enqueue(arrival.direction, arrival.vehicle)
            .map_err(|_| IntakeError::UnknownDirection(arrival.direction.to_string()))?;
        debug!("Queued {} at {}", arrival.vehicle, arrival.direction);
        Ok(())
    }

    pub fn submit(&self, direction_token: &str, vehicle_token: &str) -> Result<Arrival, IntakeError> {
        let arrival = validate(&self.directions, direction_token, vehicle_token)?;
        self.enqueue(arrival)?;
        Ok(arrival)
    }

    pub fn submit_line(&self, line: &str) -> Result<Arrival, IntakeError> {
        let arrival = parse_arrival(&self.directions, line)?;
        self.enqueue(arrival)?;
        Ok(arrival)
    }

    pub fn snapshot(&self) -> Result<ControllerSnapshot, IntakeError> {
        lock_state(&self.state)
            .map(|state| state.snapshot())
            .map_err(|_| IntakeError::StateUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_data::ControllerState;

    fn intake() -> Intake {
        let directions = DirectionSet::default();
        Intake::new(ControllerState::shared(directions.clone()), directions)
    }

    fn queued(intake: &Intake, letter: char) -> usize {
        let direction = Direction::new(letter).unwrap();
        lock_state(&intake.state).unwrap().queues().len(direction)
    }

    #[test]
    fn accepts_case_insensitive_tokens() {
        let intake = intake();
        let arrival = intake.submit_line("b, AMBULANCE").unwrap();
        assert_eq!(arrival.direction, Direction::new('B').unwrap());
        assert_eq!(arrival.vehicle, VehicleClass::Ambulance);
        assert_eq!(queued(&intake, 'B'), 1);
    }

    #[test]
    fn unknown_vehicle_leaves_queue_unchanged() {
        let intake = intake();
        assert_eq!(
            intake.submit_line("A,unknown"),
            Err(IntakeError::UnknownVehicle("unknown".to_string()))
        );
        assert_eq!(queued(&intake, 'A'), 0);
    }

    #[test]
    fn unknown_direction_is_rejected() {
        let intake = intake();
        assert_eq!(
            intake.submit("D", "car"),
            Err(IntakeError::UnknownDirection("D".to_string()))
        );
    }

    #[test]
    fn wrong_arity_is_malformed() {
        let directions = DirectionSet::default();
        for line in ["A", "A,car,extra", "", "car"] {
            assert!(
                matches!(parse_arrival(&directions, line), Err(IntakeError::Malformed(_))),
                "{line:?} should be malformed"
            );
        }
    }

    #[test]
    fn snapshot_reflects_appends() {
        let intake = intake();
        intake.submit("a", "car").unwrap();
        intake.submit("a", "vip").unwrap();
        let snapshot = intake.snapshot().unwrap();
        assert_eq!(snapshot.queue_lengths[0].1, 2);
    }
}
