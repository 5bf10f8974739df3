pub mod direction;
pub mod vehicle;

pub use direction::{Direction, DirectionSet};
pub use vehicle::{is_emergency, weight_of, VehicleClass};
