/// ----- SHARED STATE -----
/// State shared between an elevator's timeline and everybody else. Scalars are
/// atomics so readers never lock. Every behaviour transition and every change of
/// the emergency or running flags happens while holding `queue`, so a transition
/// written by the timeline can never overwrite an emergency raised concurrently.
/// `emergencies` counts every halt ever raised. A trip remembers the count it
/// departed under, so a halt that was released before the timeline woke up still
/// interrupts it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use shared_resources::direction::Direction;
use shared_resources::elevator_status::Behaviour;
use shared_resources::request::Request;

pub(crate) struct Shared {
    pub id: u8,
    pub num_floors: u8,
    pub floor_travel: Duration,
    pub door_cycle: Duration,
    floor: AtomicU8,
    destination: AtomicU8,
    direction: AtomicU8,
    behaviour: AtomicU8,
    emergency: AtomicBool,
    emergencies: AtomicU64,
    running: AtomicBool,
    pub queue: Mutex<VecDeque<Request>>,
    pub wakeup: Condvar,
}

impl Shared {
    pub fn new(
        id: u8,
        start_floor: u8,
        num_floors: u8,
        floor_travel: Duration,
        door_cycle: Duration,
    ) -> Self {
        Shared {
            id,
            num_floors,
            floor_travel,
            door_cycle,
            floor: AtomicU8::new(start_floor),
            destination: AtomicU8::new(start_floor),
            direction: AtomicU8::new(Direction::Idle.as_u8()),
            behaviour: AtomicU8::new(Behaviour::Idle.as_u8()),
            emergency: AtomicBool::new(false),
            emergencies: AtomicU64::new(0),
            running: AtomicBool::new(false),
            queue: Mutex::new(VecDeque::new()),
            wakeup: Condvar::new(),
        }
    }

    pub fn floor(&self) -> u8 {
        self.floor.load(Ordering::Acquire)
    }

    pub fn destination(&self) -> u8 {
        self.destination.load(Ordering::Acquire)
    }

    pub fn direction(&self) -> Direction {
        Direction::from_u8(self.direction.load(Ordering::Acquire))
    }

    pub fn behaviour(&self) -> Behaviour {
        Behaviour::from_u8(self.behaviour.load(Ordering::Acquire))
    }

    pub fn in_emergency(&self) -> bool {
        self.emergency.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Neither halted nor shutting down.
    fn may_move(&self) -> bool {
        self.is_running() && !self.in_emergency()
    }

    /// Still free to move and no halt raised since `epoch`.
    fn undisturbed(&self, epoch: u64) -> bool {
        self.may_move() && self.emergencies.load(Ordering::Acquire) == epoch
    }

    fn set_motion(&self, behaviour: Behaviour, direction: Direction) {
        self.direction.store(direction.as_u8(), Ordering::Release);
        self.behaviour.store(behaviour.as_u8(), Ordering::Release);
    }

    pub fn set_running(&self, running: bool) {
        let queue = self.queue.lock();
        self.running.store(running, Ordering::Release);
        drop(queue);
        self.wakeup.notify_all();
    }

    pub fn raise_emergency(&self) {
        let queue = self.queue.lock();
        self.emergency.store(true, Ordering::Release);
        self.emergencies.fetch_add(1, Ordering::AcqRel);
        self.set_motion(Behaviour::Emergency, Direction::Idle);
        drop(queue);
        self.wakeup.notify_all();
    }

    /// Returns false when there was no emergency to clear.
    pub fn clear_emergency(&self) -> bool {
        let queue = self.queue.lock();
        if !self.emergency.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.set_motion(Behaviour::Idle, Direction::Idle);
        drop(queue);
        self.wakeup.notify_all();
        true
    }

    /// Commits to a trip towards `target` and returns the epoch the remaining
    /// steps must be taken under. Refused while halted or shutting down.
    pub fn depart(&self, target: u8, direction: Direction) -> Option<u64> {
        let _queue = self.queue.lock();
        if !self.may_move() {
            return None;
        }
        self.destination.store(target, Ordering::Release);
        self.set_motion(Behaviour::Moving, direction);
        Some(self.emergencies.load(Ordering::Acquire))
    }

    /// Sleeps one floor-travel quantum, then moves to `next`. Wakes early and leaves
    /// the floor untouched if an emergency or shutdown arrives meanwhile.
    pub fn advance_to(&self, next: u8, epoch: u64) -> bool {
        let mut queue = self.queue.lock();
        if !self.hold(&mut queue, self.floor_travel, epoch) {
            return false;
        }
        self.floor.store(next, Ordering::Release);
        true
    }

    /// Returns false, leaving the status alone, if the trip was disturbed.
    pub fn arrive(&self, epoch: u64) -> bool {
        let _queue = self.queue.lock();
        if !self.undisturbed(epoch) {
            return false;
        }
        self.set_motion(Behaviour::Stopped, self.direction());
        true
    }

    /// Door cycle. Returns false when cut short.
    pub fn dwell(&self, epoch: u64) -> bool {
        let mut queue = self.queue.lock();
        self.hold(&mut queue, self.door_cycle, epoch)
    }

    /// Settles to idle if nothing further is queued and no emergency is active.
    pub fn settle(&self) {
        let queue = self.queue.lock();
        if queue.is_empty() && !self.in_emergency() {
            self.set_motion(Behaviour::Idle, Direction::Idle);
        }
    }

    /// Puts an interrupted trip back at the head of the queue, bypassing the
    /// emergency refusal that applies to callers.
    pub fn requeue_front(&self, request: Request) {
        self.queue.lock().push_front(request);
    }

    fn hold(
        &self,
        queue: &mut MutexGuard<'_, VecDeque<Request>>,
        duration: Duration,
        epoch: u64,
    ) -> bool {
        let deadline = Instant::now() + duration;
        while self.undisturbed(epoch) {
            if self.wakeup.wait_until(queue, deadline).timed_out() {
                return self.undisturbed(epoch);
            }
        }
        false
    }
}
