//! A single simulated elevator car: its private FIFO of requests and the timeline
//! that animates it.
//!
//! State is readable from any thread without locking. Only the car's own timeline
//! moves it; callers enqueue requests and raise or clear the emergency halt.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{info, warn};

use shared_resources::config::ElevatorConfig;
use shared_resources::direction::Direction;
use shared_resources::elevator_status::{Behaviour, ElevatorStatus};
use shared_resources::request::Request;

mod cost;
mod fsm;
mod state;

pub use cost::travel_cost;

use state::Shared;

pub struct Elevator {
    shared: Arc<Shared>,
    timeline: Mutex<Option<JoinHandle<()>>>,
}

impl Elevator {
    /// `start_floor` is clamped into `[1, num_floors]`.
    pub fn new(id: u8, start_floor: u8, settings: &ElevatorConfig) -> Self {
        let num_floors = settings.num_floors.max(1);
        let start_floor = start_floor.clamp(1, num_floors);
        Elevator {
            shared: Arc::new(Shared::new(
                id,
                start_floor,
                num_floors,
                settings.floor_travel(),
                settings.door_cycle(),
            )),
            timeline: Mutex::new(None),
        }
    }

    pub fn start(&self) -> io::Result<()> {
        let mut timeline = self.timeline.lock();
        if timeline.is_some() {
            return Ok(());
        }

        self.shared.set_running(true);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("elevator-{}", self.shared.id))
            .spawn(move || fsm::main(shared));
        match spawned {
            Ok(handle) => {
                *timeline = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.shared.set_running(false);
                Err(e)
            }
        }
    }

    /// Abandons any trip in progress and waits for the timeline to exit.
    pub fn stop(&self) {
        let mut timeline = self.timeline.lock();
        let Some(handle) = timeline.take() else {
            return;
        };
        self.shared.set_running(false);
        if handle.join().is_err() {
            warn!(elevator = self.shared.id, "timeline panicked");
        }
    }

    /// Refused, leaving the queue untouched, while the emergency halt is active or
    /// when either floor of `request` lies outside the building.
    pub fn enqueue(&self, request: Request) -> bool {
        let floors = 1..=self.shared.num_floors;
        if !floors.contains(&request.from_floor)
            || !(request.is_pickup_only() || floors.contains(&request.to_floor))
        {
            warn!(
                elevator = self.shared.id,
                from = request.from_floor,
                to = request.to_floor,
                "request outside the building refused"
            );
            return false;
        }

        let mut queue = self.shared.queue.lock();
        if self.shared.in_emergency() {
            return false;
        }
        queue.push_back(request);
        drop(queue);
        self.shared.wakeup.notify_all();
        true
    }

    /// Halts the car within one travel quantum. Queued requests are kept.
    pub fn activate_emergency(&self) {
        self.shared.raise_emergency();
        info!(elevator = self.shared.id, floor = self.shared.floor(), "emergency halt");
    }

    pub fn release_emergency(&self) {
        if self.shared.clear_emergency() {
            info!(elevator = self.shared.id, floor = self.shared.floor(), "emergency released");
        }
    }

    pub fn distance_to(&self, floor: u8) -> i32 {
        travel_cost(
            self.shared.floor(),
            self.shared.direction(),
            self.shared.behaviour(),
            floor,
            self.shared.num_floors,
        )
    }

    pub fn id(&self) -> u8 {
        self.shared.id
    }

    pub fn num_floors(&self) -> u8 {
        self.shared.num_floors
    }

    pub fn current_floor(&self) -> u8 {
        self.shared.floor()
    }

    pub fn destination_floor(&self) -> u8 {
        self.shared.destination()
    }

    pub fn direction(&self) -> Direction {
        self.shared.direction()
    }

    pub fn behaviour(&self) -> Behaviour {
        self.shared.behaviour()
    }

    pub fn is_idle(&self) -> bool {
        self.behaviour() == Behaviour::Idle
    }

    pub fn has_emergency(&self) -> bool {
        self.shared.in_emergency()
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    pub fn queue_len(&self) -> usize {
        self.shared.queue.lock().len()
    }

    pub fn status(&self) -> ElevatorStatus {
        ElevatorStatus {
            id: self.id(),
            floor: self.current_floor(),
            destination: self.destination_floor(),
            direction: self.direction(),
            behaviour: self.behaviour(),
        }
    }
}

impl Drop for Elevator {
    fn drop(&mut self) {
        self.stop();
    }
}
