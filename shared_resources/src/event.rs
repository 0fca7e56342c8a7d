use super::elevator_status::ElevatorStatus;

/// Notifications the controller emits for the backup collaborator.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    SystemStarted,
    SystemStopped,
    CallReceived { from_floor: u8, to_floor: u8 },
    ElevatorDispatched { elevator: u8, from_floor: u8, to_floor: u8 },
    EmergencyActivated,
    EmergencyReleased,
    Snapshot { elevators: Vec<ElevatorStatus> },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::SystemStarted => "system_started",
            Event::SystemStopped => "system_stopped",
            Event::CallReceived { .. } => "call_received",
            Event::ElevatorDispatched { .. } => "elevator_dispatched",
            Event::EmergencyActivated => "emergency_activated",
            Event::EmergencyReleased => "emergency_released",
            Event::Snapshot { .. } => "snapshot",
        }
    }
}
