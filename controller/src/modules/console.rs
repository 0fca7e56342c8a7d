use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{never, select, tick, unbounded, Receiver};
use tracing::debug;

use crate::controller::Controller;
use crate::utilities::command::{handle_line, HELP};
use crate::utilities::debug::Debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    /// The operator typed `exit`.
    Exit,
    /// Standard input closed.
    Eof,
}

/// Reads commands from stdin until `exit` or end of input. Unless `headless`, the
/// fleet table is redrawn every `refresh` with the last reply below it.
pub fn main(controller: Arc<Controller>, refresh: Duration, headless: bool) -> io::Result<Ending> {
    let lines = spawn_stdin_reader()?;
    run(&controller, lines, refresh, headless)
}

/// Console loop over any line source.
pub fn run(
    controller: &Controller,
    lines: Receiver<String>,
    refresh: Duration,
    headless: bool,
) -> io::Result<Ending> {
    let mut debug = Debug::new();
    let ticker = if headless { never() } else { tick(refresh) };
    let mut last_reply = HELP.to_string();

    if !headless {
        debug.print_status(&controller.elevator_statuses(), &last_reply)?;
    }

    loop {
        select! {
            recv(lines) -> line => {
                let Ok(line) = line else {
                    debug!("stdin closed");
                    return Ok(Ending::Eof);
                };
                let Some(reply) = handle_line(controller, line.trim()) else {
                    continue;
                };
                if headless {
                    println!("{}", reply.text);
                } else {
                    last_reply = reply.text.clone();
                    debug.print_status(&controller.elevator_statuses(), &last_reply)?;
                }
                if reply.close {
                    return Ok(Ending::Exit);
                }
            },
            recv(ticker) -> _ => {
                debug.print_status(&controller.elevator_statuses(), &last_reply)?;
            },
        }
    }
}

/// Blocking reads have no timeout, so this thread is detached and simply ends with stdin.
fn spawn_stdin_reader() -> io::Result<Receiver<String>> {
    let (line_tx, line_rx) = unbounded();
    thread::Builder::new().name("stdin".to_string()).spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    })?;
    Ok(line_rx)
}
