// arrival_simulator_main.rs
use amiquip::{Connection, Exchange, QueueDeclareOptions};
use intersection_controller::communication::amqp::publish_arrival;
use intersection_controller::config::ControllerConfig;
use intersection_controller::simulation_engine::arrival_generator::ArrivalGenerator;
use log::info;
use std::error::Error;
use std::path::Path;
use std::thread;
use std::time::Duration;

const MIN_ARRIVAL_GAP: Duration = Duration::from_millis(500);
const MAX_ARRIVAL_GAP: Duration = Duration::from_millis(4_000);

fn run() -> Result<(), Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => ControllerConfig::load(Path::new(&path))?,
        None => ControllerConfig::default(),
    };
    let directions = config.direction_set()?;
    let mut generator = ArrivalGenerator::new(directions, MIN_ARRIVAL_GAP, MAX_ARRIVAL_GAP);

    let mut connection = Connection::insecure_open(&config.amqp.url)?;
    let channel = connection.open_channel(None)?;
    let exchange = Exchange::direct(&channel);
    channel.queue_declare(&config.amqp.arrivals_queue, QueueDeclareOptions::default())?;
    info!("Publishing random arrivals on '{}'", config.amqp.arrivals_queue);

    while let Some(arrival) = generator.next_arrival() {
        publish_arrival(&exchange, &config.amqp.arrivals_queue, arrival)?;
        info!("Published {} at {}", arrival.vehicle, arrival.direction);
        thread::sleep(generator.next_gap());
    }
    connection.close()?;
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    println!("Starting arrival simulator...");
    if let Err(e) = run() {
        eprintln!("Simulator error: {}", e);
        std::process::exit(1);
    }
}
