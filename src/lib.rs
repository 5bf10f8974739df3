//! Priority-preemptive controller for a single signalized intersection.
//!
//! Arrivals enter through [`intake::Intake`], wait in per-direction FIFO
//! queues inside [`shared_data::ControllerState`], and are served by the
//! [`control_system::TrafficLightController`] phase scheduler, which drives a
//! [`control_system::SignalSink`].

pub mod communication;
pub mod config;
pub mod control_system;
pub mod error;
pub mod global_variables;
pub mod intake;
pub mod models;
pub mod shared_data;
pub mod simulation_engine;
