//! The fleet controller.
//!
//! Requests land in one shared pending queue. A dispatch timeline drains that
//! queue and hands each request to the best-fit elevator. An elevator refuses
//! work while halted. When no car can take the head of the queue, it stays at
//! the front and the dispatcher waits for a release, a new request, or the
//! retry backoff.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, tick, unbounded, Sender};
use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

use elevator::Elevator;
use shared_resources::config::Config;
use shared_resources::direction::Direction;
use shared_resources::elevator_status::ElevatorStatus;
use shared_resources::event::Event;
use shared_resources::request::{Request, PICKUP_ONLY};

use crate::utilities::dispatch::{best_fit, Candidate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Invalid source floor number {floor}. Floors must be between 1 and {num_floors}")]
    InvalidOrigin { floor: u8, num_floors: u8 },

    #[error("Invalid destination floor number {floor}. Floors must be between 1 and {num_floors}")]
    InvalidDestination { floor: u8, num_floors: u8 },
}

struct Fleet {
    elevators: Vec<Elevator>,
    num_floors: u8,
    pending: Mutex<VecDeque<Request>>,
    pending_changed: Condvar,
    running: AtomicBool,
    /// Calls to `assign`, successful or not.
    attempts: AtomicUsize,
    retry: Duration,
    sync_period: Duration,
    events: Option<Sender<Event>>,
}

#[derive(Default)]
struct Timelines {
    dispatcher: Option<JoinHandle<()>>,
    sync: Option<(Sender<()>, JoinHandle<()>)>,
}

pub struct Controller {
    fleet: Arc<Fleet>,
    timelines: Mutex<Timelines>,
}

impl Controller {
    /// Builds `num_elevators` cars, all parked at floor 1. Events are sent to
    /// `events` if given, together with a fleet snapshot every sync period.
    pub fn new(config: &Config, events: Option<Sender<Event>>) -> Self {
        Self::restore(config, events, &[])
    }

    /// Builds the fleet from a persisted snapshot. There are at least
    /// `num_elevators` cars, more if the snapshot names higher ids. Each
    /// persisted car starts at its recorded floor. The fleet is fixed from here on.
    pub fn restore(config: &Config, events: Option<Sender<Event>>, persisted: &[ElevatorStatus]) -> Self {
        let settings = &config.elevator;
        let persisted_size = persisted
            .iter()
            .map(|status| usize::from(status.id) + 1)
            .max()
            .unwrap_or(0);
        let fleet_size = usize::from(settings.num_elevators)
            .max(persisted_size)
            .min(usize::from(u8::MAX) + 1);

        let elevators = (0..fleet_size)
            .map(|index| {
                let id = index as u8;
                let start_floor = persisted
                    .iter()
                    .find(|status| status.id == id)
                    .map_or(1, |status| status.floor);
                Elevator::new(id, start_floor, settings)
            })
            .collect::<Vec<_>>();

        if persisted_size > usize::from(settings.num_elevators) {
            info!(
                configured = settings.num_elevators,
                restored = elevators.len(),
                "fleet enlarged from backup"
            );
        }

        Controller {
            fleet: Arc::new(Fleet {
                elevators,
                num_floors: settings.num_floors,
                pending: Mutex::new(VecDeque::new()),
                pending_changed: Condvar::new(),
                running: AtomicBool::new(false),
                attempts: AtomicUsize::new(0),
                retry: config.dispatch.retry(),
                sync_period: config.dispatch.sync_period(),
                events,
            }),
            timelines: Mutex::new(Timelines::default()),
        }
    }

    /// Launches every car, the dispatcher and the sync timeline. If any of them
    /// cannot be spawned, the ones already running are stopped again.
    pub fn start(&self) -> io::Result<()> {
        let mut timelines = self.timelines.lock();
        if self.fleet.running.load(Ordering::Acquire) {
            return Ok(());
        }

        if let Err(e) = self.launch(&mut timelines) {
            warn!("controller start failed: {e}");
            self.unwind(&mut timelines);
            return Err(e);
        }

        info!(
            elevators = self.fleet.elevators.len(),
            floors = self.fleet.num_floors,
            "controller started"
        );
        self.fleet.emit(Event::SystemStarted);
        Ok(())
    }

    fn launch(&self, timelines: &mut Timelines) -> io::Result<()> {
        for elevator in &self.fleet.elevators {
            elevator.start()?;
        }
        self.fleet.set_running(true);

        let fleet = Arc::clone(&self.fleet);
        timelines.dispatcher = Some(
            thread::Builder::new()
                .name("dispatcher".to_string())
                .spawn(move || dispatch(fleet))?,
        );

        if self.fleet.events.is_some() {
            let (shutdown_tx, shutdown_rx) = unbounded::<()>();
            let fleet = Arc::clone(&self.fleet);
            let handle = thread::Builder::new().name("sync".to_string()).spawn(move || {
                let ticker = tick(fleet.sync_period);
                loop {
                    select! {
                        recv(ticker) -> _ => fleet.emit(Event::Snapshot { elevators: fleet.statuses() }),
                        recv(shutdown_rx) -> _ => break,
                    }
                }
            })?;
            timelines.sync = Some((shutdown_tx, handle));
        }
        Ok(())
    }

    /// Undoes a partial `launch`. The sync timeline is spawned last, so it is never
    /// left behind.
    fn unwind(&self, timelines: &mut Timelines) {
        self.fleet.set_running(false);
        for elevator in &self.fleet.elevators {
            elevator.stop();
        }
        if let Some(handle) = timelines.dispatcher.take() {
            if handle.join().is_err() {
                warn!("dispatcher panicked");
            }
        }
    }

    /// Stops every timeline and waits for all of them. Requests still pending are dropped.
    pub fn stop(&self) {
        let mut timelines = self.timelines.lock();
        if !self.fleet.running.load(Ordering::Acquire) {
            return;
        }

        self.fleet.emit(Event::SystemStopped);
        self.fleet.set_running(false);

        for elevator in &self.fleet.elevators {
            elevator.stop();
        }
        if let Some(handle) = timelines.dispatcher.take() {
            if handle.join().is_err() {
                warn!("dispatcher panicked");
            }
        }
        if let Some((shutdown_tx, handle)) = timelines.sync.take() {
            drop(shutdown_tx);
            if handle.join().is_err() {
                warn!("sync timeline panicked");
            }
        }

        let dropped = self.fleet.pending.lock().len();
        info!(dropped, "controller stopped");
    }

    /// Validates and queues a trip; `to_floor == 0` summons a car without a destination.
    pub fn add_request(&self, from_floor: u8, to_floor: u8, direction: Direction) -> Result<(), RequestError> {
        let num_floors = self.fleet.num_floors;
        if !(1..=num_floors).contains(&from_floor) {
            let err = RequestError::InvalidOrigin { floor: from_floor, num_floors };
            warn!("{err}");
            return Err(err);
        }
        if to_floor != PICKUP_ONLY && !(1..=num_floors).contains(&to_floor) {
            let err = RequestError::InvalidDestination { floor: to_floor, num_floors };
            warn!("{err}");
            return Err(err);
        }

        // announced before the dispatcher can see it
        self.fleet.emit(Event::CallReceived { from_floor, to_floor });
        self.fleet.pending.lock().push_back(Request::new(from_floor, to_floor, direction));
        self.fleet.pending_changed.notify_all();
        Ok(())
    }

    pub fn emergency_stop(&self) {
        for elevator in &self.fleet.elevators {
            elevator.activate_emergency();
        }
        warn!("EMERGENCY STOP activated for all elevators");
        self.fleet.emit(Event::EmergencyActivated);
    }

    pub fn release_emergency_stop(&self) {
        for elevator in &self.fleet.elevators {
            elevator.release_emergency();
        }
        // requests parked while the fleet was halted are retried right away
        {
            let _pending = self.fleet.pending.lock();
            self.fleet.pending_changed.notify_all();
        }
        info!("emergency stop released");
        self.fleet.emit(Event::EmergencyReleased);
    }

    pub fn elevator_statuses(&self) -> Vec<ElevatorStatus> {
        self.fleet.statuses()
    }

    pub fn num_elevators(&self) -> usize {
        self.fleet.elevators.len()
    }

    pub fn num_floors(&self) -> u8 {
        self.fleet.num_floors
    }

    pub fn pending_len(&self) -> usize {
        self.fleet.pending.lock().len()
    }

    pub fn is_running(&self) -> bool {
        self.fleet.running.load(Ordering::Acquire)
    }

    /// How many times the dispatcher has tried to place a request.
    pub fn dispatch_attempts(&self) -> usize {
        self.fleet.attempts.load(Ordering::Relaxed)
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Fleet {
    fn set_running(&self, running: bool) {
        let pending = self.pending.lock();
        self.running.store(running, Ordering::Release);
        drop(pending);
        self.pending_changed.notify_all();
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn statuses(&self) -> Vec<ElevatorStatus> {
        self.elevators.iter().map(Elevator::status).collect()
    }

    /// Best effort; a missing or disconnected backup never holds up dispatch.
    fn emit(&self, event: Event) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    /// Hands `request` to the best-fit car. `None` if every car is halted or the
    /// chosen one was halted before it could take the request.
    fn assign(&self, request: Request) -> Option<u8> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        let candidates = self.elevators.iter().map(Candidate::of);
        let (index, score) = best_fit(candidates, request.from_floor, self.num_floors)?;
        let elevator = &self.elevators[index];
        if !elevator.enqueue(request) {
            return None;
        }
        debug!(
            elevator = elevator.id(),
            from = request.from_floor,
            to = request.to_floor,
            score,
            "dispatched"
        );
        Some(elevator.id())
    }
}

fn dispatch(fleet: Arc<Fleet>) {
    let mut stalled = false;
    loop {
        let request = {
            let mut pending = fleet.pending.lock();
            loop {
                if !fleet.is_running() {
                    return;
                }
                if let Some(request) = pending.pop_front() {
                    break request;
                }
                fleet.pending_changed.wait(&mut pending);
            }
        };

        match fleet.assign(request) {
            Some(elevator) => {
                if stalled {
                    info!("dispatch resumed");
                    stalled = false;
                }
                fleet.emit(Event::ElevatorDispatched {
                    elevator,
                    from_floor: request.from_floor,
                    to_floor: request.to_floor,
                });
            }
            None => {
                if !stalled {
                    warn!(from = request.from_floor, "no elevator available, holding request");
                    stalled = true;
                }
                let mut pending = fleet.pending.lock();
                pending.push_front(request);
                if fleet.is_running() {
                    fleet.pending_changed.wait_for(&mut pending, fleet.retry);
                }
            }
        }
    }
}
