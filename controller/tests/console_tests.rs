use std::time::Duration;

use crossbeam_channel::unbounded;

use controller::modules::console::{self, Ending};
use controller::utilities::command::{execute, handle_line, Command};
use controller::Controller;
use shared_resources::config::Config;
use shared_resources::direction::Direction;

fn controller() -> Controller {
    Controller::new(&Config::default(), None)
}

#[test]
fn lines_run_against_the_controller() {
    let controller = controller();

    let reply = handle_line(&controller, "call 4 down").unwrap();
    assert_eq!(reply.text, "Elevator requested at floor 4 going down");
    assert!(!reply.close);
    assert_eq!(controller.pending_len(), 1);

    let reply = handle_line(&controller, "call 42 up").unwrap();
    assert_eq!(reply.text, "Invalid floor number. Floors must be between 1 and 10");
    assert_eq!(controller.pending_len(), 1);

    assert!(handle_line(&controller, "").is_none());
    assert!(handle_line(&controller, "exit").unwrap().close);
}

#[test]
fn go_uses_the_car_floor_as_origin() {
    let controller = controller();
    let reply = execute(&controller, Command::Go { floor: 1 });
    assert_eq!(reply.text, "Elevator #0 will go to floor 1");

    let reply = execute(&controller, Command::Go { floor: -2 });
    assert_eq!(reply.text, "Invalid floor number. Floors must be between 1 and 10");
    assert_eq!(controller.pending_len(), 1);
}

#[test]
fn status_and_help_replies() {
    let controller = controller();
    let status = execute(&controller, Command::Status).text;
    assert_eq!(status.lines().filter(|line| line.starts_with("| ")).count(), 4);

    let help = execute(&controller, Command::Help).text;
    assert!(help.contains("call <floor> <direction>"));
    assert!(help.contains("release"));
}

#[test]
fn emergency_commands_flip_the_fleet() {
    let controller = controller();
    assert_eq!(
        execute(&controller, Command::Stop).text,
        "EMERGENCY STOP activated for all elevators!"
    );
    assert_eq!(
        execute(&controller, Command::Go { floor: 5 }).text,
        "No idle elevator available. Try again later."
    );
    assert_eq!(
        execute(&controller, Command::Release).text,
        "Emergency stop released. Elevators returning to normal operation."
    );
    assert_eq!(
        execute(&controller, Command::Call { floor: 5, direction: Direction::Up }).text,
        "Elevator requested at floor 5 going up"
    );
}

#[test]
fn headless_console_ends_on_exit() {
    let controller = controller();
    let (line_tx, line_rx) = unbounded();
    line_tx.send("call 3 up".to_string()).unwrap();
    line_tx.send("   ".to_string()).unwrap();
    line_tx.send("exit".to_string()).unwrap();
    line_tx.send("call 5 up".to_string()).unwrap();

    let ending = console::run(&controller, line_rx, Duration::from_millis(50), true).unwrap();
    assert_eq!(ending, Ending::Exit);
    // nothing after exit is executed
    assert_eq!(controller.pending_len(), 1);
}

#[test]
fn headless_console_ends_with_its_input() {
    let controller = controller();
    let (line_tx, line_rx) = unbounded();
    line_tx.send("stop".to_string()).unwrap();
    drop(line_tx);

    let ending = console::run(&controller, line_rx, Duration::from_millis(50), true).unwrap();
    assert_eq!(ending, Ending::Eof);
    assert!(controller.elevator_statuses().iter().all(|s| s.behaviour.as_str() == "EMERGENCY"));
}
