use crate::control_system::signal_sink::SignalCommand;
use crate::error::IntakeError;
use crate::intake::{parse_arrival, validate, Arrival};
use crate::models::DirectionSet;
use serde::{Deserialize, Serialize};

/// Arrival as published on the arrivals queue. Tokens are validated on receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrivalMessage {
    pub direction: String,
    pub vehicle: String,
}

impl From<Arrival> for ArrivalMessage {
    fn from(arrival: Arrival) -> Self {
        Self {
            direction: arrival.direction.to_string(),
            vehicle: arrival.vehicle.token().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalCommandMessage {
    pub timestamp: u64,
    #[serde(flatten)]
    pub command: SignalCommand,
}

/// Decodes an arrival body: either JSON `{"direction":"A","vehicle":"car"}`
/// or the console form `A,car`.
pub fn decode_arrival(directions: &DirectionSet, body: &[u8]) -> Result<Arrival, IntakeError> {
    let text = std::str::from_utf8(body)
        .map_err(|_| IntakeError::Malformed(String::from_utf8_lossy(body).into_owned()))?
        .trim();
    if text.starts_with('{') {
        let message: ArrivalMessage = serde_json::from_str(text)
            .map_err(|_| IntakeError::Malformed(text.to_string()))?;
        validate(directions, &message.direction, &message.vehicle)
    } else {
        parse_arrival(directions, text)
    }
}
