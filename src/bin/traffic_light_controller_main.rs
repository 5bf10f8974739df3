use intersection_controller::communication::amqp::{listen_vehicle_arrivals, AmqpSignalSink};
use intersection_controller::config::{ControllerConfig, SinkConfig};
use intersection_controller::control_system::signal_sink::{CsvSignalSink, LogSignalSink};
use intersection_controller::control_system::{ShutdownSignal, ShutdownSignals, SignalSink, TrafficLightController};
use intersection_controller::error::ControllerError;
use intersection_controller::intake::console::{run_console, ConsoleExit};
use intersection_controller::intake::Intake;
use intersection_controller::models::DirectionSet;
use intersection_controller::shared_data::ControllerState;
use log::{error, info, warn};
use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::thread;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

const EXIT_FATAL: u8 = 1;
const EXIT_BAD_CONFIG: u8 = 2;
enum Stop {
    Requested(ExitCode),
    Signalled(ShutdownSignal),
    ControllerEnded(Result<Result<(), ControllerError>, tokio::task::JoinError>),
}

fn build_sink(config: &ControllerConfig, directions: &DirectionSet) -> Result<Box<dyn SignalSink>, String> {
    Ok(match &config.sink {
        SinkConfig::Log => Box::new(LogSignalSink::new(directions)),
        SinkConfig::Csv { path } => Box::new(
            CsvSignalSink::create(path).map_err(|e| format!("cannot open {}: {}", path.display(), e))?,
        ),
        SinkConfig::Amqp => Box::new(AmqpSignalSink::connect(&config.amqp)),
    })
}

// Resolves once the operator asked to stop through the console.
async fn console_stop(
    console: oneshot::Receiver<io::Result<ConsoleExit>>,
    amqp_intake: bool,
) -> ExitCode {
    match console.await {
        Ok(Ok(ConsoleExit::Quit)) => {
            info!("[SHUTDOWN] Quit requested");
            ExitCode::SUCCESS
        }
        Ok(Ok(ConsoleExit::EndOfInput)) if amqp_intake => {
            info!("Console input closed, arrivals still accepted over AMQP");
            std::future::pending().await
        }
        Ok(Ok(ConsoleExit::EndOfInput)) => {
            info!("[SHUTDOWN] Console input closed");
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            error!("Console failed: {}", e);
            ExitCode::from(EXIT_FATAL)
        }
        Err(_) => {
            warn!("Console thread ended without a result");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn controller_exit(result: Result<Result<(), ControllerError>, tokio::task::JoinError>) -> Option<ExitCode> {
    match result {
        Ok(Ok(())) => None,
        Ok(Err(e)) => {
            eprintln!("[FATAL] {}", e);
            Some(ExitCode::from(EXIT_FATAL))
        }
        Err(e) => {
            eprintln!("[FATAL] Controller task failed: {}", e);
            Some(ExitCode::from(EXIT_FATAL))
        }
    }
}

async fn stop_controller(
    stop: watch::Sender<bool>,
    controller: JoinHandle<Result<(), ControllerError>>,
    exit: ExitCode,
) -> ExitCode {
    let _ = stop.send(true);
    controller_exit(controller.await).unwrap_or(exit)
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => ControllerConfig::load(Path::new(&path)),
        None => Ok(ControllerConfig::default()),
    };
    let (config, directions) = match config.and_then(|c| c.direction_set().map(|d| (c, d))) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::from(EXIT_BAD_CONFIG);
        }
    };
    let sink = match build_sink(&config, &directions) {
        Ok(sink) => sink,
        Err(e) => {
            eprintln!("Signal sink error: {}", e);
            return ExitCode::from(EXIT_BAD_CONFIG);
        }
    };

    let mut signals = match ShutdownSignals::install() {
        Ok(signals) => signals,
        Err(e) => {
            eprintln!("Cannot install signal handlers: {}", e);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    let state = ControllerState::shared(directions.clone());
    let intake = Intake::new(state.clone(), directions);

    if config.amqp.intake_enabled {
        let intake = intake.clone();
        let amqp = config.amqp.clone();
        thread::spawn(move || {
            if let Err(e) = listen_vehicle_arrivals(intake, &amqp) {
                error!("Error in vehicle arrivals listener: {}", e);
            }
        });
    }

    let (console_done, console) = oneshot::channel();
    thread::spawn(move || {
        let outcome = run_console(&intake, io::stdin().lock(), io::stdout());
        let _ = console_done.send(outcome);
    });

    let amqp_intake = config.amqp.intake_enabled;
    let (stop, stopped) = watch::channel(false);
    let mut controller = tokio::spawn(TrafficLightController::new(state, config, sink).run(stopped));

    let reason = tokio::select! {
        exit = console_stop(console, amqp_intake) => Stop::Requested(exit),
        signal = signals.recv() => Stop::Signalled(signal),
        result = &mut controller => Stop::ControllerEnded(result),
    };

    match reason {
        Stop::Requested(exit) => stop_controller(stop, controller, exit).await,
        Stop::Signalled(signal) => {
            info!("[SHUTDOWN] Stopping on {:?}", signal);
            stop_controller(stop, controller, ExitCode::from(signal.exit_code())).await
        }
        Stop::ControllerEnded(result) => controller_exit(result).unwrap_or(ExitCode::SUCCESS),
    }
}
