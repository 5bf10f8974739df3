use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of arrival waiting at an approach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    Car,
    Pedestrian,
    Vip,
    Police,
    Fire,
    Ambulance,
    /// Accident report.
    Accident,
}

struct PriorityEntry {
    class: VehicleClass,
    token: &'static str,
    weight: u32,
    emergency: bool,
}

// Priority table. Higher weight is more urgent.
static PRIORITY_TABLE: [PriorityEntry; 7] = [
    PriorityEntry { class: VehicleClass::Car, token: "car", weight: 1, emergency: false },
    PriorityEntry { class: VehicleClass::Pedestrian, token: "pedestrian", weight: 2, emergency: false },
    PriorityEntry { class: VehicleClass::Vip, token: "vip", weight: 5, emergency: false },
    PriorityEntry { class: VehicleClass::Police, token: "police", weight: 8, emergency: true },
    PriorityEntry { class: VehicleClass::Fire, token: "fire", weight: 9, emergency: true },
    PriorityEntry { class: VehicleClass::Ambulance, token: "ambulance", weight: 10, emergency: true },
    PriorityEntry { class: VehicleClass::Accident, token: "accident", weight: 20, emergency: true },
];

impl VehicleClass {
    pub const ALL: [VehicleClass; 7] = [
        VehicleClass::Car,
        VehicleClass::Pedestrian,
        VehicleClass::Vip,
        VehicleClass::Police,
        VehicleClass::Fire,
        VehicleClass::Ambulance,
        VehicleClass::Accident,
    ];

    fn entry(self) -> &'static PriorityEntry {
        // Table rows follow the declaration order of the enum.
        &PRIORITY_TABLE[self as usize]
    }

    pub fn weight(self) -> u32 {
        self.entry().weight
    }

    pub fn is_emergency(self) -> bool {
        self.entry().emergency
    }

    pub fn token(self) -> &'static str {
        self.entry().token
    }
}

pub fn weight_of(class: VehicleClass) -> u32 {
    class.weight()
}

pub fn is_emergency(class: VehicleClass) -> bool {
    class.is_emergency()
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for VehicleClass {
    type Err = String;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let token = token.trim();
        PRIORITY_TABLE
            .iter()
            .find(|entry| entry.token.eq_ignore_ascii_case(token))
            .map(|entry| entry.class)
            .ok_or_else(|| token.to_string())
    }
}
