use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{select, Receiver};
use tracing::info;

use shared_resources::direction::Direction;
use shared_resources::elevator_status::Behaviour;
use shared_resources::request::PICKUP_ONLY;

use crate::controller::Controller;

pub struct Step {
    pub description: &'static str,
    pub action: fn(&Controller),
    /// Wait after the action, in floor-travel times.
    pub pause: u32,
}

pub fn steps() -> Vec<Step> {
    vec![
        Step {
            description: "Calling elevator to floor 3 (going up)",
            action: |controller| request(controller, 3, PICKUP_ONLY, Direction::Up),
            pause: 5,
        },
        Step {
            description: "Setting destination to floor 8",
            action: |controller| request(controller, 3, 8, Direction::Up),
            pause: 8,
        },
        Step {
            description: "Calling one elevator per car to spread floors",
            action: spread_calls,
            pause: 10,
        },
        Step {
            description: "Setting destinations for idle elevators",
            action: idle_destinations,
            pause: 15,
        },
        Step {
            description: "Giving idle elevators a short trip",
            action: nudge_idle,
            pause: 2,
        },
        Step {
            description: "Triggering EMERGENCY STOP for all elevators",
            action: Controller::emergency_stop,
            pause: 5,
        },
        Step {
            description: "Releasing emergency stop",
            action: Controller::release_emergency_stop,
            pause: 5,
        },
        Step {
            description: "Returning all elevators to the lobby",
            action: return_to_lobby,
            pause: 15,
        },
    ]
}

/// Runs every step, `pace` being one floor-travel time. Returns early once
/// `shutdown` fires or disconnects.
pub fn main(controller: Arc<Controller>, pace: Duration, shutdown: Receiver<()>) {
    info!("demo started");
    for step in steps() {
        info!("[DEMO] {}", step.description);
        (step.action)(&controller);

        select! {
            recv(shutdown) -> _ => {
                info!("demo interrupted");
                return;
            },
            default(pace * step.pause) => {},
        }
    }
    info!("demo completed");
}

fn request(controller: &Controller, from_floor: u8, to_floor: u8, direction: Direction) {
    // rejections are logged by the controller
    let _ = controller.add_request(from_floor, to_floor, direction);
}

/// `count` floors spread evenly over the building, lobby excluded.
fn spread(count: usize, num_floors: u8) -> Vec<u8> {
    let span = usize::from(num_floors.saturating_sub(1));
    (1..=count)
        .map(|i| 1 + (i * span / (count + 1)) as u8)
        .collect()
}

fn spread_calls(controller: &Controller) {
    for floor in spread(controller.num_elevators(), controller.num_floors()) {
        let direction = if floor > 1 { Direction::Down } else { Direction::Up };
        info!("  calling elevator to floor {floor}");
        request(controller, floor, PICKUP_ONLY, direction);
    }
}

/// The floor mirrored through the middle of the building, never `floor` itself.
fn opposite(floor: u8, num_floors: u8) -> u8 {
    let mirrored = (u16::from(num_floors) + 1 - u16::from(floor)) as u8;
    if mirrored != floor {
        mirrored
    } else {
        floor % num_floors + 1
    }
}

fn idle_destinations(controller: &Controller) {
    let num_floors = controller.num_floors();
    for status in controller.elevator_statuses() {
        if !status.accepts_trip() {
            continue;
        }
        let target = opposite(status.floor, num_floors);
        info!("  elevator #{} at floor {} going to floor {target}", status.id, status.floor);
        request(controller, status.floor, target, Direction::towards(status.floor, target));
    }
}

fn nudge_idle(controller: &Controller) {
    let num_floors = controller.num_floors();
    for status in controller.elevator_statuses() {
        if status.behaviour != Behaviour::Idle {
            continue;
        }
        let target = if status.floor < num_floors { status.floor + 1 } else { status.floor - 1 };
        request(controller, status.floor, target, Direction::towards(status.floor, target));
    }
}

fn return_to_lobby(controller: &Controller) {
    for status in controller.elevator_statuses() {
        if status.floor != 1 {
            info!("  sending elevator #{} back to the lobby", status.id);
            request(controller, status.floor, 1, Direction::Down);
        }
    }
}
