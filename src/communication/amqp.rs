use crate::communication::messages::{decode_arrival, ArrivalMessage, SignalCommandMessage};
use crate::config::AmqpConfig;
use crate::control_system::signal_sink::{SignalCommand, SignalSink};
use crate::intake::{Arrival, Intake};
use crate::shared_data::current_timestamp;
use amiquip::{
    Connection, ConsumerMessage, ConsumerOptions, Exchange, Publish, QueueDeclareOptions,
    Result as AmiquipResult,
};
use log::{error, info, warn};
use std::error::Error;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

/// Consumes the arrivals queue and feeds every valid event into `intake`.
/// Blocks until the consumer ends; run it on its own thread.
pub fn listen_vehicle_arrivals(intake: Intake, amqp: &AmqpConfig) -> AmiquipResult<()> {
    let mut connection = Connection::insecure_open(&amqp.url)?;
    let channel = connection.open_channel(None)?;
    let queue = channel.queue_declare(&amqp.arrivals_queue, QueueDeclareOptions::default())?;
    let consumer = queue.consume(ConsumerOptions::default())?;
    info!("[Intake] Waiting for arrivals on '{}'...", amqp.arrivals_queue);

    for message in consumer.receiver() {
        match message {
            ConsumerMessage::Delivery(delivery) => {
                match decode_arrival(intake.directions(), &delivery.body)
                    .and_then(|arrival| intake.enqueue(arrival).map(|_| arrival))
                {
                    Ok(arrival) => info!(
                        "[Intake] Queued {} at {}",
                        arrival.vehicle, arrival.direction
                    ),
                    Err(e) => warn!("[Intake] Discarded arrival message: {}", e),
                }
                // Invalid messages are acknowledged too, they would never become valid.
                consumer.ack(delivery)?;
            }
            other => {
                info!("[Intake] Arrival consumer ended: {:?}", other);
                break;
            }
        }
    }
    connection.close()
}

/// Publishes one arrival to the arrivals queue.
pub fn publish_arrival(
    exchange: &Exchange,
    queue: &str,
    arrival: Arrival,
) -> Result<(), Box<dyn Error>> {
    let payload = serde_json::to_string(&ArrivalMessage::from(arrival))?;
    exchange.publish(Publish::new(payload.as_bytes(), queue))?;
    Ok(())
}

/// Forwards signal commands to a publisher thread that owns the connection.
/// `close` (also run on drop) waits until every queued command is published.
pub struct AmqpSignalSink {
    sender: Option<Sender<SignalCommand>>,
    publisher: Option<JoinHandle<()>>,
}

impl AmqpSignalSink {
    pub fn connect(amqp: &AmqpConfig) -> Self {
        let amqp = amqp.clone();
        Self::with_publisher(move |commands| {
            if let Err(e) = publish_signal_commands(&amqp, commands) {
                error!("[SignalSink] Publisher stopped: {}", e);
            }
        })
    }

    fn with_publisher<F>(publish: F) -> Self
    where
        F: FnOnce(Receiver<SignalCommand>) + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let publisher = thread::spawn(move || publish(receiver));
        Self {
            sender: Some(sender),
            publisher: Some(publisher),
        }
    }
}

impl SignalSink for AmqpSignalSink {
    fn apply(&mut self, command: SignalCommand) {
        let delivered = self
            .sender
            .as_ref()
            .is_some_and(|sender| sender.send(command).is_ok());
        if !delivered {
            warn!("[SignalSink] Publisher is gone, dropped {:?}", command);
        }
    }

    fn close(&mut self) {
        // Dropping the sender ends the publisher loop once the queue is drained.
        self.sender.take();
        if let Some(publisher) = self.publisher.take() {
            if publisher.join().is_err() {
                error!("[SignalSink] Publisher thread panicked");
            }
        }
    }
}

impl Drop for AmqpSignalSink {
    fn drop(&mut self) {
        self.close();
    }
}

fn publish_signal_commands(
    amqp: &AmqpConfig,
    commands: Receiver<SignalCommand>,
) -> AmiquipResult<()> {
    let mut connection = Connection::insecure_open(&amqp.url)?;
    let channel = connection.open_channel(None)?;
    let exchange = Exchange::direct(&channel);
    channel.queue_declare(&amqp.signal_queue, QueueDeclareOptions::default())?;
    info!("[SignalSink] Publishing signal commands on '{}'", amqp.signal_queue);

    for command in commands {
        let message = SignalCommandMessage {
            timestamp: current_timestamp(),
            command,
        };
        match serde_json::to_string(&message) {
            Ok(json) => exchange.publish(Publish::new(json.as_bytes(), &amqp.signal_queue))?,
            Err(e) => warn!("[SignalSink] Cannot encode {:?}: {}", command, e),
        }
    }
    connection.close()
}
