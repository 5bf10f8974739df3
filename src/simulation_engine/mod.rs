// simulation_engine/mod.rs
pub mod arrival_generator;
