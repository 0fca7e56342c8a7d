use std::fmt;

use super::direction::Direction;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Behaviour {
    #[default]
    Idle,
    Moving,
    Stopped,
    Emergency,
}

impl Behaviour {
    pub fn as_u8(self) -> u8 {
        match self {
            Behaviour::Idle => 0,
            Behaviour::Moving => 1,
            Behaviour::Stopped => 2,
            Behaviour::Emergency => 3,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Behaviour::Moving,
            2 => Behaviour::Stopped,
            3 => Behaviour::Emergency,
            _ => Behaviour::Idle,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Behaviour::Idle => "Idle",
            Behaviour::Moving => "Moving",
            Behaviour::Stopped => "Stopped",
            Behaviour::Emergency => "EMERGENCY",
        }
    }
}

impl fmt::Display for Behaviour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of one elevator. Fields are sampled independently, so a
/// snapshot may mix values from either side of a floor change.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElevatorStatus {
    pub id: u8,
    pub floor: u8,
    pub destination: u8,
    pub direction: Direction,
    pub behaviour: Behaviour,
}

impl ElevatorStatus {
    pub fn new(id: u8, floor: u8) -> Self {
        ElevatorStatus {
            id,
            floor,
            destination: floor,
            direction: Direction::Idle,
            behaviour: Behaviour::Idle,
        }
    }

    /// Destination column as shown to operators; meaningless unless travelling.
    pub fn destination_label(&self) -> String {
        match self.direction {
            Direction::Idle => String::from("--"),
            _ => self.destination.to_string(),
        }
    }

    pub fn accepts_trip(&self) -> bool {
        matches!(self.behaviour, Behaviour::Idle | Behaviour::Stopped)
    }
}
