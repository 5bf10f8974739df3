// src/shared_data.rs

use crate::error::ControllerError;
use crate::models::{Direction, DirectionSet, VehicleClass};
use log::debug;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

/// Sub-phase of a normal (non-emergency) grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ServingPhase {
    Green,
    Yellow,
    AllRed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControllerPhase {
    Idle,
    Emergency {
        direction: Direction,
        vehicle: VehicleClass,
    },
    Serving {
        direction: Direction,
        vehicle: VehicleClass,
        phase: ServingPhase,
    },
}

impl fmt::Display for ControllerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerPhase::Idle => write!(f, "idle"),
            ControllerPhase::Emergency { direction, vehicle } => {
                write!(f, "emergency {} at {}", vehicle, direction)
            }
            ControllerPhase::Serving {
                direction,
                vehicle,
                phase,
            } => write!(f, "serving {} at {} ({:?})", vehicle, direction, phase),
        }
    }
}

/// An emergency entry found by the scan: where it is and what it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmergencyMatch {
    pub direction: Direction,
    pub index: usize,
    pub vehicle: VehicleClass,
}

/// Outcome of one decision cycle. The chosen entry has already been removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Emergency {
        direction: Direction,
        vehicle: VehicleClass,
    },
    Serve {
        direction: Direction,
        vehicle: VehicleClass,
    },
    Idle,
}

/// One FIFO queue per direction, kept in enumeration order.
#[derive(Debug, Clone)]
pub struct ArrivalQueues {
    lanes: Vec<(Direction, VecDeque<VehicleClass>)>,
}

impl ArrivalQueues {
    pub fn new(directions: &DirectionSet) -> Self {
        Self {
            lanes: directions.iter().map(|d| (d, VecDeque::new())).collect(),
        }
    }

    fn lane(&self, direction: Direction) -> Result<&VecDeque<VehicleClass>, ControllerError> {
        self.lanes
            .iter()
            .find(|(d, _)| *d == direction)
            .map(|(_, queue)| queue)
            .ok_or(ControllerError::UnknownDirection(direction))
    }

    fn lane_mut(
        &mut self,
        direction: Direction,
    ) -> Result<&mut VecDeque<VehicleClass>, ControllerError> {
        self.lanes
            .iter_mut()
            .find(|(d, _)| *d == direction)
            .map(|(_, queue)| queue)
            .ok_or(ControllerError::UnknownDirection(direction))
    }

    pub fn enqueue(
        &mut self,
        direction: Direction,
        vehicle: VehicleClass,
    ) -> Result<(), ControllerError> {
        self.lane_mut(direction)?.push_back(vehicle);
        Ok(())
    }

    pub fn peek_head(&self, direction: Direction) -> Option<VehicleClass> {
        self.lane(direction).ok().and_then(|q| q.front().copied())
    }

    pub fn pop_head(&mut self, direction: Direction) -> Result<VehicleClass, ControllerError> {
        self.lane_mut(direction)?
            .pop_front()
            .ok_or(ControllerError::EmptyQueue(direction))
    }

    /// Removes the entry at `index`, which need not be the head.
    pub fn remove_at(
        &mut self,
        direction: Direction,
        index: usize,
    ) -> Result<VehicleClass, ControllerError> {
        self.lane_mut(direction)?
            .remove(index)
            .ok_or(ControllerError::EmptyQueue(direction))
    }

    pub fn len(&self, direction: Direction) -> usize {
        self.lane(direction).map(VecDeque::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.iter().all(|(_, q)| q.is_empty())
    }

    pub fn lengths(&self) -> Vec<(Direction, usize)> {
        self.lanes.iter().map(|(d, q)| (*d, q.len())).collect()
    }

    pub fn entries(&self, direction: Direction) -> Vec<VehicleClass> {
        self.lane(direction)
            .map(|q| q.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Scans every queue head to tail, directions in enumeration order.
    /// The first emergency entry wins, whatever its weight.
    pub fn find_emergency(&self) -> Option<EmergencyMatch> {
        self.lanes.iter().find_map(|(direction, queue)| {
            queue
                .iter()
                .position(|v| v.is_emergency())
                .map(|index| EmergencyMatch {
                    direction: *direction,
                    index,
                    vehicle: queue[index],
                })
        })
    }

    /// Direction whose head has the strictly highest weight; the
    /// enumeration-first direction keeps ties.
    pub fn select_highest_priority(&self) -> Option<Direction> {
        let mut best: Option<(Direction, u32)> = None;
        for (direction, queue) in &self.lanes {
            if let Some(head) = queue.front() {
                let weight = head.weight();
                if best.map_or(true, |(_, w)| weight > w) {
                    best = Some((*direction, weight));
                }
            }
        }
        best.map(|(direction, _)| direction)
    }
}

/// Read-only view for operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerSnapshot {
    pub phase: ControllerPhase,
    pub emergency_active: bool,
    pub in_phase_for: Duration,
    pub queue_lengths: Vec<(Direction, usize)>,
}

impl fmt::Display for ControllerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "phase: {} for {:.1}s, emergency: {}, queues:",
            self.phase,
            self.in_phase_for.as_secs_f64(),
            self.emergency_active
        )?;
        for (direction, len) in &self.queue_lengths {
            write!(f, " {}={}", direction, len)?;
        }
        Ok(())
    }
}

/// Everything the intake producers and the scheduler share.
#[derive(Debug)]
pub struct ControllerState {
    directions: DirectionSet,
    queues: ArrivalQueues,
    phase: ControllerPhase,
    phase_started: Instant,
    emergency_active: bool,
}

pub type SharedState = Arc<Mutex<ControllerState>>;

impl ControllerState {
    pub fn new(directions: DirectionSet) -> Self {
        let queues = ArrivalQueues::new(&directions);
        Self {
            directions,
            queues,
            phase: ControllerPhase::Idle,
            phase_started: Instant::now(),
            emergency_active: false,
        }
    }

    pub fn shared(directions: DirectionSet) -> SharedState {
        Arc::new(Mutex::new(Self::new(directions)))
    }

    pub fn directions(&self) -> &DirectionSet {
        &self.directions
    }

    pub fn queues(&self) -> &ArrivalQueues {
        &self.queues
    }

    pub fn phase(&self) -> ControllerPhase {
        self.phase
    }

    pub fn emergency_active(&self) -> bool {
        self.emergency_active
    }

    pub fn enqueue(
        &mut self,
        direction: Direction,
        vehicle: VehicleClass,
    ) -> Result<(), ControllerError> {
        self.queues.enqueue(direction, vehicle)
    }

    /// Runs one scan + select + pop. Callers hold the lock for the whole call.
    pub fn decide(&mut self) -> Result<Decision, ControllerError> {
        if let Some(found) = self.queues.find_emergency() {
            let vehicle = self.queues.remove_at(found.direction, found.index)?;
            self.emergency_active = true;
            debug!(
                "Emergency scan matched {} at {} (position {})",
                vehicle, found.direction, found.index
            );
            return Ok(Decision::Emergency {
                direction: found.direction,
                vehicle,
            });
        }

        match self.queues.select_highest_priority() {
            Some(direction) => {
                let vehicle = self.queues.pop_head(direction)?;
                Ok(Decision::Serve { direction, vehicle })
            }
            None => Ok(Decision::Idle),
        }
    }

    /// Records a phase transition and restarts the phase clock.
    pub fn enter_phase(&mut self, phase: ControllerPhase) {
        self.emergency_active = matches!(phase, ControllerPhase::Emergency { .. });
        self.phase = phase;
        self.phase_started = Instant::now();
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            phase: self.phase,
            emergency_active: self.emergency_active,
            in_phase_for: self.phase_started.elapsed(),
            queue_lengths: self.queues.lengths(),
        }
    }
}

pub fn lock_state(state: &SharedState) -> Result<MutexGuard<'_, ControllerState>, ControllerError> {
    state.lock().map_err(|_| ControllerError::LockPoisoned)
}

/// Seconds since the Unix epoch.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
