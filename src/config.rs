//! Controller configuration, loaded from an optional JSON file.
//!
//! Every field has a default taken from `global_variables`, so an empty
//! object `{}` is a complete configuration.

use crate::error::ConfigError;
use crate::global_variables::*;
use crate::models::{Direction, DirectionSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where signal commands are sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SinkConfig {
    /// Log every board change.
    Log,
    /// Append every command to a CSV file.
    Csv { path: PathBuf },
    /// Publish every command to the signal command queue.
    Amqp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmqpConfig {
    pub url: String,
    /// Consume arrivals from `arrivals_queue` alongside the console.
    pub intake_enabled: bool,
    pub arrivals_queue: String,
    pub signal_queue: String,
}

impl Default for AmqpConfig {
    fn default() -> Self {
        Self {
            url: AMQP_URL.to_string(),
            intake_enabled: false,
            arrivals_queue: QUEUE_VEHICLE_ARRIVALS.to_string(),
            signal_queue: QUEUE_SIGNAL_COMMANDS.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub directions: Vec<Direction>,
    pub min_green_ms: u64,
    pub green_priority_increment_ms: u64,
    pub emergency_green_ms: u64,
    pub yellow_ms: u64,
    pub all_red_clearance_ms: u64,
    pub blink_interval_ms: u64,
    pub idle_blink_cycles: u32,
    pub poll_interval_ms: u64,
    pub sink: SinkConfig,
    pub amqp: AmqpConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            directions: DirectionSet::default().iter().collect(),
            min_green_ms: MIN_GREEN_DURATION_MS,
            green_priority_increment_ms: GREEN_PRIORITY_INCREMENT_MS,
            emergency_green_ms: EMERGENCY_GREEN_DURATION_MS,
            yellow_ms: YELLOW_DURATION_MS,
            all_red_clearance_ms: ALL_RED_CLEARANCE_MS,
            blink_interval_ms: YELLOW_BLINK_INTERVAL_MS,
            idle_blink_cycles: IDLE_BLINK_CYCLES,
            poll_interval_ms: DECISION_POLL_INTERVAL_MS,
            sink: SinkConfig::Log,
            amqp: AmqpConfig::default(),
        }
    }
}

impl ControllerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: ControllerConfig = serde_json::from_str(raw)?;
        config.direction_set()?;
        Ok(config)
    }

    /// Checks the direction list and returns it as the fixed enumeration.
    pub fn direction_set(&self) -> Result<DirectionSet, ConfigError> {
        if self.directions.is_empty() {
            return Err(ConfigError::NoDirections);
        }
        let mut seen = HashSet::new();
        for direction in &self.directions {
            if !seen.insert(*direction) {
                return Err(ConfigError::DuplicateDirection(*direction));
            }
        }
        Ok(DirectionSet::new(self.directions.clone()))
    }

    /// Green time for a vehicle of the given weight: base plus a fixed
    /// increment per weight unit, in whole milliseconds.
    pub fn green_duration(&self, weight: u32) -> Duration {
        let extra = self.green_priority_increment_ms.saturating_mul(u64::from(weight));
        Duration::from_millis(self.min_green_ms.saturating_add(extra))
    }

    pub fn emergency_green(&self) -> Duration {
        Duration::from_millis(self.emergency_green_ms)
    }

    pub fn yellow(&self) -> Duration {
        Duration::from_millis(self.yellow_ms)
    }

    pub fn all_red_clearance(&self) -> Duration {
        Duration::from_millis(self.all_red_clearance_ms)
    }

    pub fn blink_interval(&self) -> Duration {
        Duration::from_millis(self.blink_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VehicleClass;

    #[test]
    fn empty_object_gives_defaults() {
        let config = ControllerConfig::from_json("{}").unwrap();
        assert_eq!(config, ControllerConfig::default());
        assert_eq!(config.sink, SinkConfig::Log);
        assert!(!config.amqp.intake_enabled);
    }

    #[test]
    fn green_duration_scales_with_weight() {
        let config = ControllerConfig::default();
        assert_eq!(
            config.green_duration(VehicleClass::Car.weight()),
            Duration::from_secs(12)
        );
        assert_eq!(
            config.green_duration(VehicleClass::Vip.weight()),
            Duration::from_secs(20)
        );
    }

    #[test]
    fn partial_override() {
        let config = ControllerConfig::from_json(
            r#"{"directions": ["n", "e", "s", "w"], "yellow_ms": 3000, "sink": {"kind": "csv", "path": "signals.csv"}}"#,
        )
        .unwrap();
        assert_eq!(config.direction_set().unwrap().len(), 4);
        assert_eq!(config.yellow(), Duration::from_secs(3));
        assert_eq!(config.min_green_ms, MIN_GREEN_DURATION_MS);
        assert_eq!(
            config.sink,
            SinkConfig::Csv {
                path: PathBuf::from("signals.csv")
            }
        );
    }

    #[test]
    fn rejects_bad_direction_lists() {
        assert!(matches!(
            ControllerConfig::from_json(r#"{"directions": []}"#),
            Err(ConfigError::NoDirections)
        ));
        assert!(matches!(
            ControllerConfig::from_json(r#"{"directions": ["A", "a"]}"#),
            Err(ConfigError::DuplicateDirection(_))
        ));
        assert!(matches!(
            ControllerConfig::from_json(r#"{"directions": ["AB"]}"#),
            Err(ConfigError::Parse(_))
        ));
    }
}
