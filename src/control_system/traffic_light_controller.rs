use crate::config::ControllerConfig;
use crate::control_system::signal_sink::{LightColor, SignalSink};
use crate::error::ControllerError;
use crate::models::{Direction, VehicleClass};
use crate::shared_data::{
    lock_state, ControllerPhase, Decision, ServingPhase, SharedState,
};
use log::{error, info, warn};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wait {
    Elapsed,
    Shutdown,
}

/// The phase scheduler. One instance drives the intersection.
///
/// Each decision cycle locks the shared state once for the emergency scan,
/// priority selection and pop, then releases it before any phase is held.
/// A held phase is never cut short by new arrivals, only by shutdown.
pub struct TrafficLightController {
    state: SharedState,
    config: ControllerConfig,
    sink: Box<dyn SignalSink>,
}

impl TrafficLightController {
    pub fn new(state: SharedState, config: ControllerConfig, sink: Box<dyn SignalSink>) -> Self {
        Self {
            state,
            config,
            sink,
        }
    }

    /// Runs decision cycles until `shutdown` turns true (or its sender is
    /// dropped). Every direction is commanded red before this returns, on
    /// both the shutdown and the fatal error path.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), ControllerError> {
        info!("Traffic light controller started");
        self.sink.set_all(LightColor::Red);

        let outcome = self.control_loop(&mut shutdown).await;

        self.sink.set_all(LightColor::Red);
        self.sink.close();
        if let Ok(mut state) = lock_state(&self.state) {
            state.enter_phase(ControllerPhase::Idle);
        }
        match &outcome {
            Ok(()) => info!("[SHUTDOWN] Traffic system turned off, all directions red"),
            Err(e) => error!("[FATAL] Controller stopped, all directions red: {}", e),
        }
        outcome
    }

    async fn control_loop(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), ControllerError> {
        loop {
            if hold(self.config.poll_interval(), shutdown).await == Wait::Shutdown {
                return Ok(());
            }

            let decision = {
                let mut state = lock_state(&self.state)?;
                state.decide()?
            };

            let wait = match decision {
                Decision::Emergency { direction, vehicle } => {
                    self.serve_emergency(direction, vehicle, shutdown).await?
                }
                Decision::Serve { direction, vehicle } => {
                    self.serve(direction, vehicle, shutdown).await?
                }
                Decision::Idle => self.blink_idle(shutdown).await,
            };
            if wait == Wait::Shutdown {
                return Ok(());
            }
        }
    }

    async fn serve_emergency(
        &mut self,
        direction: Direction,
        vehicle: VehicleClass,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Wait, ControllerError> {
        warn!(
            "[EMERGENCY] {} in direction {}",
            vehicle.token().to_uppercase(),
            direction
        );
        self.enter(ControllerPhase::Emergency { direction, vehicle })?;
        self.sink.set_phase(direction, LightColor::Green);
        let wait = hold(self.config.emergency_green(), shutdown).await;

        self.sink.set_all(LightColor::Red);
        self.enter(ControllerPhase::Idle)?;
        Ok(wait)
    }

    async fn serve(
        &mut self,
        direction: Direction,
        vehicle: VehicleClass,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Wait, ControllerError> {
        let green = self.config.green_duration(vehicle.weight());
        info!(
            "[INFO] Granting GREEN for {} at {} ({} ms)",
            vehicle.token().to_uppercase(),
            direction,
            green.as_millis()
        );

        let steps = [
            (ServingPhase::Green, green),
            (ServingPhase::Yellow, self.config.yellow()),
            (ServingPhase::AllRed, self.config.all_red_clearance()),
        ];
        for (phase, duration) in steps {
            self.enter(ControllerPhase::Serving {
                direction,
                vehicle,
                phase,
            })?;
            match phase {
                ServingPhase::Green => self.sink.set_phase(direction, LightColor::Green),
                ServingPhase::Yellow => {
                    info!("[TRANSITION] YELLOW at {}", direction);
                    self.sink.set_phase(direction, LightColor::Yellow)
                }
                ServingPhase::AllRed => self.sink.set_all(LightColor::Red),
            }
            if hold(duration, shutdown).await == Wait::Shutdown {
                return Ok(Wait::Shutdown);
            }
        }

        self.enter(ControllerPhase::Idle)?;
        Ok(Wait::Elapsed)
    }

    // Caution blink while nothing is waiting. Re-scans right after.
    async fn blink_idle(&mut self, shutdown: &mut watch::Receiver<bool>) -> Wait {
        info!("[IDLE] No traffic waiting, blinking yellow");
        let interval = self.config.blink_interval();
        for _ in 0..self.config.idle_blink_cycles {
            for color in [LightColor::Yellow, LightColor::Red] {
                self.sink.set_all(color);
                if hold(interval, shutdown).await == Wait::Shutdown {
                    return Wait::Shutdown;
                }
            }
        }
        Wait::Elapsed
    }

    fn enter(&self, phase: ControllerPhase) -> Result<(), ControllerError> {
        lock_state(&self.state)?.enter_phase(phase);
        Ok(())
    }
}

// Holds the current phase. A closed shutdown channel counts as a stop request.
async fn hold(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> Wait {
    let stopping = *shutdown.borrow();
    if stopping {
        return Wait::Shutdown;
    }
    tokio::select! {
        _ = sleep(duration) => Wait::Elapsed,
        _ = shutdown.wait_for(|stop| *stop) => Wait::Shutdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_system::signal_sink::{RecordingSignalSink, SignalCommand};
    use crate::models::DirectionSet;
    use crate::shared_data::ControllerState;

    fn dir(letter: char) -> Direction {
        Direction::new(letter).unwrap()
    }

    fn start(
        state: &SharedState,
    ) -> (
        RecordingSignalSink,
        watch::Sender<bool>,
        tokio::task::JoinHandle<Result<(), ControllerError>>,
    ) {
        let sink = RecordingSignalSink::new(&DirectionSet::default());
        let (stop, stopped) = watch::channel(false);
        let controller = TrafficLightController::new(
            state.clone(),
            ControllerConfig::default(),
            Box::new(sink.clone()),
        );
        let handle = tokio::spawn(controller.run(stopped));
        (sink, stop, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn grants_green_for_the_weighted_duration() {
        let state = ControllerState::shared(DirectionSet::default());
        state.lock().unwrap().enqueue(dir('B'), VehicleClass::Vip).unwrap();
        let (sink, stop, handle) = start(&state);

        sleep(Duration::from_secs(30)).await;
        stop.send(true).unwrap();
        handle.await.unwrap().unwrap();

        let history = sink.history();
        let green = history
            .iter()
            .position(|r| {
                r.command
                    == SignalCommand::Phase {
                        direction: dir('B'),
                        color: LightColor::Green,
                    }
            })
            .unwrap();
        let yellow = &history[green + 1];
        assert_eq!(
            yellow.command,
            SignalCommand::Phase {
                direction: dir('B'),
                color: LightColor::Yellow
            }
        );
        // 10 s base + 5 * 2 s for a vip.
        assert_eq!(yellow.at - history[green].at, Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn arrivals_during_a_phase_wait_for_the_next_cycle() {
        let state = ControllerState::shared(DirectionSet::default());
        state.lock().unwrap().enqueue(dir('A'), VehicleClass::Car).unwrap();
        let (sink, stop, handle) = start(&state);

        // A is green from t=1s to t=13s. The ambulance lands mid-green.
        sleep(Duration::from_secs(5)).await;
        state
            .lock()
            .unwrap()
            .enqueue(dir('C'), VehicleClass::Ambulance)
            .unwrap();
        assert_eq!(
            state.lock().unwrap().phase(),
            ControllerPhase::Serving {
                direction: dir('A'),
                vehicle: VehicleClass::Car,
                phase: ServingPhase::Green
            }
        );
        sleep(Duration::from_secs(20)).await;
        assert_eq!(
            state.lock().unwrap().phase(),
            ControllerPhase::Emergency {
                direction: dir('C'),
                vehicle: VehicleClass::Ambulance
            }
        );
        assert!(state.lock().unwrap().emergency_active());
        stop.send(true).unwrap();
        handle.await.unwrap().unwrap();

        let commands: Vec<SignalCommand> = sink.history().iter().map(|r| r.command).collect();
        let a_yellow = commands
            .iter()
            .position(|c| {
                *c == SignalCommand::Phase {
                    direction: dir('A'),
                    color: LightColor::Yellow,
                }
            })
            .unwrap();
        let c_green = commands
            .iter()
            .position(|c| {
                *c == SignalCommand::Phase {
                    direction: dir('C'),
                    color: LightColor::Green,
                }
            })
            .unwrap();
        assert!(a_yellow < c_green);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_aborts_the_current_phase_and_goes_all_red() {
        let state = ControllerState::shared(DirectionSet::default());
        state
            .lock()
            .unwrap()
            .enqueue(dir('A'), VehicleClass::Accident)
            .unwrap();
        let (sink, stop, handle) = start(&state);

        sleep(Duration::from_secs(3)).await;
        stop.send(true).unwrap();
        handle.await.unwrap().unwrap();

        let history = sink.history();
        let last = history.last().unwrap();
        assert!(last.board.is_all(LightColor::Red));
        assert!(sink.is_closed());
        // Emergency green started at t=1s and was cut at t=3s.
        assert_eq!(last.at - history[1].at, Duration::from_secs(2));
        assert_eq!(state.lock().unwrap().phase(), ControllerPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_shutdown_sender_stops_the_loop() {
        let state = ControllerState::shared(DirectionSet::default());
        let (sink, stop, handle) = start(&state);
        drop(stop);
        handle.await.unwrap().unwrap();
        assert!(sink.history().last().unwrap().board.is_all(LightColor::Red));
    }

    #[tokio::test(start_paused = true)]
    async fn poisoned_lock_is_fatal_and_still_all_red() {
        let state = ControllerState::shared(DirectionSet::default());
        let poison = state.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poison.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        let (sink, _stop, handle) = start(&state);

        let outcome = handle.await.unwrap();
        assert_eq!(outcome, Err(ControllerError::LockPoisoned));
        assert!(sink.history().last().unwrap().board.is_all(LightColor::Red));
        assert!(sink.is_closed());
    }
}
