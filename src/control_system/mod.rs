pub mod shutdown;
pub mod signal_sink;
pub mod traffic_light_controller;

pub use shutdown::{ShutdownSignal, ShutdownSignals};
pub use signal_sink::{LightColor, SignalBoard, SignalCommand, SignalSink};
pub use traffic_light_controller::TrafficLightController;
