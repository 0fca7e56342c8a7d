use std::fmt;
use std::str::FromStr;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Idle,
    Up,
    Down,
}

impl Direction {
    /// Direction of travel from `from` towards `to`, `Idle` when they coincide.
    pub fn towards(from: u8, to: u8) -> Self {
        if to > from {
            Direction::Up
        } else if to < from {
            Direction::Down
        } else {
            Direction::Idle
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Direction::Idle => 0,
            Direction::Up => 1,
            Direction::Down => 2,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Direction::Up,
            2 => Direction::Down,
            _ => Direction::Idle,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Idle => "Idle",
            Direction::Up => "Up",
            Direction::Down => "Down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only the two travel directions a caller may request; `idle` is not a valid token.
impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            _ => Err(s.to_string()),
        }
    }
}
