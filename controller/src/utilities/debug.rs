use std::fmt::Write as _;
use std::io::{self, stdout, Stdout, Write};

use crossterm::{cursor, terminal, ExecutableCommand};

use shared_resources::elevator_status::ElevatorStatus;

const RULE: &str = "+-------------+-------------+-------------+-------------+-------------+";

/// Fixed-width fleet table. The destination reads `--` for a car with no direction.
pub fn status_table(statuses: &[ElevatorStatus]) -> String {
    let mut table = String::new();
    // writing into a String cannot fail
    let _ = writeln!(table, "{RULE}");
    let _ = writeln!(
        table,
        "| {0:<11} | {1:<11} | {2:<11} | {3:<11} | {4:<11} |",
        "ELEVATOR", "FLOOR", "DESTINATION", "DIRECTION", "STATUS"
    );
    for status in statuses {
        let _ = writeln!(table, "{RULE}");
        let _ = writeln!(
            table,
            "| {0:<11} | {1:<11} | {2:<11} | {3:<11} | {4:<11} |",
            status.id,
            status.floor,
            status.destination_label(),
            status.direction.as_str(),
            status.behaviour.as_str()
        );
    }
    let _ = write!(table, "{RULE}");
    table
}

pub struct Debug {
    stdout: Stdout,
}

impl Debug {
    pub fn new() -> Self {
        Debug { stdout: stdout() }
    }

    /// Redraws the table from the top of a cleared screen. `footer` is printed below it.
    pub fn print_status(&mut self, statuses: &[ElevatorStatus], footer: &str) -> io::Result<()> {
        self.stdout.execute(cursor::MoveTo(0, 0))?;
        self.stdout.execute(terminal::Clear(terminal::ClearType::All))?;

        writeln!(self.stdout, "ELEVATOR BANK")?;
        writeln!(self.stdout, "{}", status_table(statuses))?;
        if !footer.is_empty() {
            writeln!(self.stdout, "{footer}")?;
        }
        write!(self.stdout, "> ")?;
        self.stdout.flush()
    }
}

impl Default for Debug {
    fn default() -> Self {
        Self::new()
    }
}
