use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver};

use controller::{Controller, RequestError};
use shared_resources::config::{Config, ElevatorConfig};
use shared_resources::direction::Direction;
use shared_resources::elevator_status::{Behaviour, ElevatorStatus};
use shared_resources::event::Event;

const QUANTUM_MS: u64 = 25;

fn config(num_elevators: u8, num_floors: u8) -> Config {
    let mut config = Config::default();
    config.elevator = ElevatorConfig {
        num_elevators,
        num_floors,
        floor_travel_ms: QUANTUM_MS,
        door_cycle_ms: QUANTUM_MS,
    };
    config.dispatch.retry_ms = 10;
    config.dispatch.sync_period_ms = 20;
    config
}

fn quanta(n: u64) -> Duration {
    Duration::from_millis(QUANTUM_MS * n)
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

fn all_idle(controller: &Controller) -> bool {
    controller
        .elevator_statuses()
        .iter()
        .all(|status| status.behaviour == Behaviour::Idle)
}

/// Events received within `timeout`, snapshots left out.
fn drain(events: &Receiver<Event>, timeout: Duration) -> Vec<Event> {
    let deadline = Instant::now() + timeout;
    let mut seen = Vec::new();
    while let Ok(event) = events.recv_deadline(deadline) {
        if !matches!(event, Event::Snapshot { .. }) {
            seen.push(event);
        }
    }
    seen
}

#[test]
fn fresh_fleet_waits_at_the_lobby() {
    let controller = Controller::new(&config(3, 10), None);
    assert_eq!(controller.num_elevators(), 3);
    assert_eq!(controller.num_floors(), 10);

    let statuses = controller.elevator_statuses();
    assert_eq!(statuses.iter().map(|s| s.id).collect::<Vec<_>>(), vec![0, 1, 2]);
    for status in statuses {
        assert_eq!(status.floor, 1);
        assert_eq!(status.direction, Direction::Idle);
        assert_eq!(status.behaviour, Behaviour::Idle);
    }
}

#[test]
fn out_of_range_floors_are_rejected_without_side_effects() {
    let (events_tx, events_rx) = unbounded();
    let controller = Controller::new(&config(3, 10), Some(events_tx));
    controller.start().unwrap();
    assert_eq!(drain(&events_rx, quanta(1)), vec![Event::SystemStarted]);

    assert_eq!(
        controller.add_request(0, 5, Direction::Up),
        Err(RequestError::InvalidOrigin { floor: 0, num_floors: 10 })
    );
    assert_eq!(
        controller.add_request(11, 0, Direction::Down),
        Err(RequestError::InvalidOrigin { floor: 11, num_floors: 10 })
    );
    assert_eq!(
        controller.add_request(1, 11, Direction::Up),
        Err(RequestError::InvalidDestination { floor: 11, num_floors: 10 })
    );

    assert!(drain(&events_rx, quanta(2)).is_empty());
    assert_eq!(controller.pending_len(), 0);
    assert!(controller.elevator_statuses().iter().all(|s| s.floor == 1 && s.behaviour == Behaviour::Idle));
    controller.stop();
}

#[test]
fn request_error_names_the_building_range() {
    let err = RequestError::InvalidDestination { floor: 12, num_floors: 10 };
    assert_eq!(
        err.to_string(),
        "Invalid destination floor number 12. Floors must be between 1 and 10"
    );
}

#[test]
fn single_trip_is_served_and_the_car_settles() {
    let controller = Controller::new(&config(3, 10), None);
    controller.start().unwrap();
    controller.add_request(1, 5, Direction::Up).unwrap();

    let arrived = wait_until(quanta(40), || {
        let statuses = controller.elevator_statuses();
        statuses.iter().any(|s| s.floor == 5) && all_idle(&controller)
    });
    assert!(arrived, "{:?}", controller.elevator_statuses());

    // only the one car moved
    let at_lobby = controller.elevator_statuses().iter().filter(|s| s.floor == 1).count();
    assert_eq!(at_lobby, 2);
    controller.stop();
}

#[test]
fn emergency_stop_halts_the_whole_fleet() {
    let controller = Controller::new(&config(3, 10), None);
    controller.start().unwrap();
    controller.add_request(1, 10, Direction::Up).unwrap();
    assert!(wait_until(quanta(20), || {
        controller.elevator_statuses().iter().any(|s| s.floor >= 3)
    }));

    controller.emergency_stop();
    for status in controller.elevator_statuses() {
        assert_eq!(status.behaviour, Behaviour::Emergency);
        assert_eq!(status.direction, Direction::Idle);
    }

    thread::sleep(quanta(1));
    let halted: Vec<u8> = controller.elevator_statuses().iter().map(|s| s.floor).collect();
    thread::sleep(quanta(6));
    let later: Vec<u8> = controller.elevator_statuses().iter().map(|s| s.floor).collect();
    assert_eq!(halted, later);
    assert!(controller.elevator_statuses().iter().all(|s| s.behaviour != Behaviour::Moving));

    controller.release_emergency_stop();
    assert!(controller.elevator_statuses().iter().all(|s| s.behaviour != Behaviour::Emergency));

    // the interrupted trip is finished after release
    let done = wait_until(quanta(40), || {
        controller.elevator_statuses().iter().any(|s| s.floor == 10) && all_idle(&controller)
    });
    assert!(done, "{:?}", controller.elevator_statuses());
    controller.stop();
}

#[test]
fn request_during_emergency_is_served_after_release() {
    let controller = Controller::new(&config(2, 10), None);
    controller.start().unwrap();
    controller.emergency_stop();
    controller.add_request(1, 4, Direction::Up).unwrap();

    thread::sleep(quanta(6));
    for status in controller.elevator_statuses() {
        assert_eq!(status.floor, 1);
        assert_eq!(status.behaviour, Behaviour::Emergency);
    }

    controller.release_emergency_stop();
    let served = wait_until(quanta(30), || {
        controller.elevator_statuses().iter().any(|s| s.floor == 4) && all_idle(&controller)
    });
    assert!(served, "{:?}", controller.elevator_statuses());
    assert_eq!(controller.pending_len(), 0);
    controller.stop();
}

#[test]
fn halted_fleet_is_retried_at_the_backoff_pace() {
    let mut config = config(2, 10);
    config.dispatch.retry_ms = 50;
    let controller = Controller::new(&config, None);
    controller.start().unwrap();
    controller.emergency_stop();
    controller.add_request(3, 7, Direction::Up).unwrap();

    thread::sleep(Duration::from_millis(500));
    let attempts = controller.dispatch_attempts();
    // one attempt per 50 ms backoff, plus the first one
    assert!((2..=20).contains(&attempts), "{attempts} dispatch attempts in 500 ms");
    // the request is only out of the queue while an attempt runs
    assert!(wait_until(quanta(2), || controller.pending_len() == 1));

    controller.release_emergency_stop();
    let served = wait_until(quanta(30), || {
        controller.pending_len() == 0 && controller.elevator_statuses().iter().any(|s| s.floor == 7)
    });
    assert!(served, "{:?}", controller.elevator_statuses());
    controller.stop();
}

#[test]
fn start_and_stop_are_idempotent() {
    let (events_tx, events_rx) = unbounded();
    let controller = Controller::new(&config(2, 6), Some(events_tx));

    controller.stop();
    controller.start().unwrap();
    controller.start().unwrap();
    assert!(controller.is_running());
    controller.stop();
    controller.stop();
    assert!(!controller.is_running());

    assert_eq!(
        drain(&events_rx, quanta(1)),
        vec![Event::SystemStarted, Event::SystemStopped]
    );
}

#[test]
fn events_trace_a_dispatched_call() {
    let (events_tx, events_rx) = unbounded();
    let controller = Controller::new(&config(2, 10), Some(events_tx));
    controller.start().unwrap();
    controller.add_request(2, 6, Direction::Up).unwrap();

    assert!(wait_until(quanta(30), || {
        controller.elevator_statuses().iter().any(|s| s.floor == 6) && all_idle(&controller)
    }));
    controller.emergency_stop();
    controller.release_emergency_stop();
    controller.stop();

    let events = drain(&events_rx, quanta(1));
    assert_eq!(
        events,
        vec![
            Event::SystemStarted,
            Event::CallReceived { from_floor: 2, to_floor: 6 },
            Event::ElevatorDispatched { elevator: 0, from_floor: 2, to_floor: 6 },
            Event::EmergencyActivated,
            Event::EmergencyReleased,
            Event::SystemStopped,
        ]
    );
}

#[test]
fn snapshots_are_emitted_while_running() {
    let (events_tx, events_rx) = unbounded();
    let controller = Controller::new(&config(2, 10), Some(events_tx));
    controller.start().unwrap();

    let deadline = Instant::now() + quanta(10);
    let mut snapshot = None;
    while let Ok(event) = events_rx.recv_deadline(deadline) {
        if let Event::Snapshot { elevators } = event {
            snapshot = Some(elevators);
            break;
        }
    }
    controller.stop();

    let elevators = snapshot.expect("no snapshot within the sync period");
    assert_eq!(elevators.len(), 2);
    assert!(elevators.iter().all(|s| s.floor == 1));

    // nothing more once the sync timeline is joined
    while events_rx.try_recv().is_ok() {}
    thread::sleep(quanta(3));
    assert!(events_rx.try_recv().is_err());
}

#[test]
fn restore_places_cars_and_grows_the_fleet() {
    let persisted = [
        ElevatorStatus::new(0, 4),
        ElevatorStatus::new(1, 40),
        ElevatorStatus::new(4, 7),
    ];
    let controller = Controller::restore(&config(3, 10), None, &persisted);

    assert_eq!(controller.num_elevators(), 5);
    let floors: Vec<u8> = controller.elevator_statuses().iter().map(|s| s.floor).collect();
    assert_eq!(floors, vec![4, 10, 1, 1, 7]);
}

#[test]
fn restore_never_shrinks_below_configuration() {
    let controller = Controller::restore(&config(3, 10), None, &[ElevatorStatus::new(0, 2)]);
    assert_eq!(controller.num_elevators(), 3);
}

#[test]
fn dropping_a_running_controller_stops_it() {
    let (events_tx, events_rx) = unbounded();
    {
        let controller = Controller::new(&config(1, 5), Some(events_tx));
        controller.start().unwrap();
        controller.add_request(1, 5, Direction::Up).unwrap();
    }
    let events = drain(&events_rx, quanta(2));
    assert_eq!(events.last(), Some(&Event::SystemStopped));
    // the sender went away with the controller
    assert!(events_rx.recv_timeout(quanta(1)).is_err());
}
