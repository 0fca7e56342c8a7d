/// ----- OPERATOR COMMANDS -----
/// The line protocol shared by the network service and the console. A line is
/// parsed into a `Command`, which is then executed against the controller to
/// give a `Reply`. Floors are kept signed until execution so that an
/// out-of-range floor gets a range error rather than a format error.

use std::str::FromStr;

use thiserror::Error;

use shared_resources::direction::Direction;
use shared_resources::request::PICKUP_ONLY;

use crate::controller::Controller;
use crate::utilities::debug::status_table;

pub const HELP: &str = concat!(
    "Available commands:\n",
    "  call <floor> <direction>  - Request an elevator (direction: up/down)\n",
    "  go <floor>                - Set destination floor\n",
    "  stop                      - Trigger emergency stop\n",
    "  release                   - Release emergency stop\n",
    "  status                    - Get elevator statuses\n",
    "  help                      - Show this list\n",
    "  exit                      - Disconnect",
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Call { floor: i32, direction: Direction },
    Go { floor: i32 },
    Stop,
    Release,
    Status,
    Help,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Empty command. Type 'help' for available commands.")]
    Empty,

    #[error("Unknown command '{0}'. Type 'help' for available commands.")]
    Unknown(String),

    #[error("Invalid command format. Use '{0}'")]
    Usage(&'static str),

    #[error("Invalid direction. Use 'up' or 'down'.")]
    InvalidDirection,

    #[error("Invalid command format. Lines are limited to {0} bytes.")]
    TooLong(usize),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err(CommandError::Empty);
        };

        match name {
            "call" => {
                const USAGE: &str = "call <floor> <direction>";
                let floor = words.next().and_then(|w| w.parse::<i32>().ok());
                let direction = words.next();
                let (Some(floor), Some(direction)) = (floor, direction) else {
                    return Err(CommandError::Usage(USAGE));
                };
                let direction = direction
                    .parse::<Direction>()
                    .map_err(|_| CommandError::InvalidDirection)?;
                Ok(Command::Call { floor, direction })
            }
            "go" => {
                let floor = words
                    .next()
                    .and_then(|w| w.parse::<i32>().ok())
                    .ok_or(CommandError::Usage("go <floor>"))?;
                Ok(Command::Go { floor })
            }
            "stop" => Ok(Command::Stop),
            "release" => Ok(Command::Release),
            "status" => Ok(Command::Status),
            "help" => Ok(Command::Help),
            "exit" | "quit" => Ok(Command::Exit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// The session ends after this reply.
    pub close: bool,
}

impl Reply {
    fn line(text: impl Into<String>) -> Self {
        Reply { text: text.into(), close: false }
    }
}

impl From<CommandError> for Reply {
    fn from(err: CommandError) -> Self {
        Reply::line(err.to_string())
    }
}

/// Parses and runs one line. `None` for a blank line.
pub fn handle_line(controller: &Controller, line: &str) -> Option<Reply> {
    match line.parse::<Command>() {
        Ok(command) => Some(execute(controller, command)),
        Err(CommandError::Empty) => None,
        Err(err) => Some(err.into()),
    }
}

pub fn execute(controller: &Controller, command: Command) -> Reply {
    let num_floors = controller.num_floors();
    match command {
        Command::Call { floor, direction } => {
            let Some(floor) = in_building(floor, num_floors) else {
                return floor_range(num_floors);
            };
            match controller.add_request(floor, PICKUP_ONLY, direction) {
                Ok(()) => Reply::line(format!(
                    "Elevator requested at floor {floor} going {}",
                    direction.as_str().to_lowercase()
                )),
                Err(err) => Reply::line(err.to_string()),
            }
        }
        Command::Go { floor } => {
            let Some(floor) = in_building(floor, num_floors) else {
                return floor_range(num_floors);
            };
            let closest = controller
                .elevator_statuses()
                .into_iter()
                .filter(|status| status.accepts_trip())
                .min_by_key(|status| status.floor.abs_diff(floor));
            let Some(car) = closest else {
                return Reply::line("No idle elevator available. Try again later.");
            };
            let direction = if floor > car.floor { Direction::Up } else { Direction::Down };
            match controller.add_request(car.floor, floor, direction) {
                Ok(()) => Reply::line(format!("Elevator #{} will go to floor {floor}", car.id)),
                Err(err) => Reply::line(err.to_string()),
            }
        }
        Command::Stop => {
            controller.emergency_stop();
            Reply::line("EMERGENCY STOP activated for all elevators!")
        }
        Command::Release => {
            controller.release_emergency_stop();
            Reply::line("Emergency stop released. Elevators returning to normal operation.")
        }
        Command::Status => Reply::line(status_table(&controller.elevator_statuses())),
        Command::Help => Reply::line(HELP),
        Command::Exit => Reply { text: "Goodbye!".to_string(), close: true },
    }
}

fn in_building(floor: i32, num_floors: u8) -> Option<u8> {
    u8::try_from(floor)
        .ok()
        .filter(|floor| (1..=num_floors).contains(floor))
}

fn floor_range(num_floors: u8) -> Reply {
    Reply::line(format!(
        "Invalid floor number. Floors must be between 1 and {num_floors}"
    ))
}
