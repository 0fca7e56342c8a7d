use std::time::SystemTime;

use super::direction::Direction;

/// Destination value meaning "summon only"; the trip's destination arrives in a later request.
pub const PICKUP_ONLY: u8 = 0;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Request {
    pub from_floor: u8,
    pub to_floor: u8,
    pub direction: Direction,
    pub created_at: SystemTime,
}

impl Request {
    pub fn new(from_floor: u8, to_floor: u8, direction: Direction) -> Self {
        Request {
            from_floor,
            to_floor,
            direction,
            created_at: SystemTime::now(),
        }
    }

    pub fn pickup(floor: u8, direction: Direction) -> Self {
        Request::new(floor, PICKUP_ONLY, direction)
    }

    pub fn is_pickup_only(&self) -> bool {
        self.to_floor == PICKUP_ONLY
    }

    /// The part of this trip still owed once the pickup floor has been reached.
    /// Keeps the original creation time.
    pub fn remaining_leg(self) -> Self {
        Request {
            from_floor: self.to_floor,
            to_floor: PICKUP_ONLY,
            ..self
        }
    }
}
