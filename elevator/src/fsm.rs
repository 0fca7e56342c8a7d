/// ----- FSM MODULE -----
/// The elevator's own timeline. It drains the private queue one request at a time,
/// driving the car floor by floor and cycling the doors at every stop. Emergency
/// and shutdown are observed at every travel quantum and during door cycles.

use std::sync::Arc;

use tracing::{debug, info};

use shared_resources::direction::Direction;
use shared_resources::request::Request;

use crate::state::Shared;

#[derive(Debug, PartialEq)]
enum Leg {
    Arrived,
    Interrupted,
}

pub(crate) fn main(shared: Arc<Shared>) {
    info!(elevator = shared.id, floor = shared.floor(), "timeline started");

    while let Some(request) = next_request(&shared) {
        serve(&shared, request);
        shared.settle();
    }

    info!(elevator = shared.id, floor = shared.floor(), "timeline stopped");
}

/// Blocks until there is work and no emergency. `None` once shutdown is requested.
fn next_request(shared: &Shared) -> Option<Request> {
    let mut queue = shared.queue.lock();
    loop {
        if !shared.is_running() {
            return None;
        }
        if !shared.in_emergency() {
            if let Some(request) = queue.pop_front() {
                return Some(request);
            }
        }
        shared.wakeup.wait(&mut queue);
    }
}

fn serve(shared: &Shared, request: Request) {
    debug!(
        elevator = shared.id,
        from = request.from_floor,
        to = request.to_floor,
        "serving request"
    );

    if travel(shared, request.from_floor) == Leg::Interrupted {
        resume_later(shared, request);
        return;
    }
    if !request.is_pickup_only() && travel(shared, request.to_floor) == Leg::Interrupted {
        resume_later(shared, request.remaining_leg());
    }
}

/// An emergency keeps the unfinished trip for after release; on shutdown it is dropped.
fn resume_later(shared: &Shared, request: Request) {
    if shared.is_running() {
        debug!(elevator = shared.id, floor = shared.floor(), "trip interrupted, kept for resume");
        shared.requeue_front(request);
    }
}

fn travel(shared: &Shared, target: u8) -> Leg {
    let mut floor = shared.floor();
    if floor == target {
        return Leg::Arrived;
    }

    let direction = Direction::towards(floor, target);
    let Some(epoch) = shared.depart(target, direction) else {
        return Leg::Interrupted;
    };

    while floor != target {
        let next = match direction {
            Direction::Up => floor + 1,
            _ => floor - 1,
        };
        if !shared.advance_to(next, epoch) {
            return Leg::Interrupted;
        }
        floor = next;
    }

    // halted on the last step; the car is at the target but the doors stay shut
    if !shared.arrive(epoch) {
        return Leg::Arrived;
    }
    debug!(elevator = shared.id, floor, "doors opening");
    shared.dwell(epoch);
    Leg::Arrived
}
