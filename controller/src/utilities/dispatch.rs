/// ----- BEST-FIT ASSIGNER -----
/// This stateless module scores elevators against a request's origin floor and
/// picks the one to serve it. A car's score is its travel cost to the floor
/// (including the reversal penalty), less `num_floors` if it is idle. Cars
/// halted by an emergency are never chosen. On a tie the first car wins.

use elevator::{travel_cost, Elevator};
use shared_resources::direction::Direction;
use shared_resources::elevator_status::Behaviour;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub floor: u8,
    pub direction: Direction,
    pub behaviour: Behaviour,
    pub emergency: bool,
}

impl Candidate {
    pub fn of(elevator: &Elevator) -> Self {
        Candidate {
            floor: elevator.current_floor(),
            direction: elevator.direction(),
            behaviour: elevator.behaviour(),
            emergency: elevator.has_emergency(),
        }
    }

    pub fn score(&self, from_floor: u8, num_floors: u8) -> Option<i32> {
        if self.emergency {
            return None;
        }
        let cost = travel_cost(self.floor, self.direction, self.behaviour, from_floor, num_floors);
        if self.behaviour == Behaviour::Idle {
            Some(cost - i32::from(num_floors))
        } else {
            Some(cost)
        }
    }
}

/// Index and score of the best candidate, `None` when every car is halted.
pub fn best_fit(
    candidates: impl IntoIterator<Item = Candidate>,
    from_floor: u8,
    num_floors: u8,
) -> Option<(usize, i32)> {
    let mut best: Option<(usize, i32)> = None;
    for (index, candidate) in candidates.into_iter().enumerate() {
        let Some(score) = candidate.score(from_floor, num_floors) else {
            continue;
        };
        if best.map_or(true, |(_, lowest)| score < lowest) {
            best = Some((index, score));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle(floor: u8) -> Candidate {
        Candidate { floor, direction: Direction::Idle, behaviour: Behaviour::Idle, emergency: false }
    }

    fn moving(floor: u8, direction: Direction) -> Candidate {
        Candidate { floor, direction, behaviour: Behaviour::Moving, emergency: false }
    }

    fn halted(floor: u8) -> Candidate {
        Candidate { floor, direction: Direction::Idle, behaviour: Behaviour::Emergency, emergency: true }
    }

    #[test]
    fn idle_car_beats_closer_busy_car() {
        // idle at 9 scores 4 - 10; the car at 3 heading down to 2 pays the reversal
        let cars = [idle(9), moving(3, Direction::Down)];
        assert_eq!(best_fit(cars, 5, 10), Some((0, -6)));

        let cars = [moving(3, Direction::Down), idle(9)];
        assert_eq!(best_fit(cars, 5, 10).map(|(i, _)| i), Some(1));
    }

    #[test]
    fn reversing_car_loses_to_any_alternative() {
        // heading up past floor 1 from floor 3
        let away = moving(3, Direction::Up);
        let far_but_heading_there = moving(9, Direction::Down);
        assert_eq!(away.score(1, 10), Some(2 + 18));
        assert_eq!(best_fit([away, far_but_heading_there], 1, 10), Some((1, 8)));
    }

    #[test]
    fn busy_car_heading_towards_call_is_scored_by_distance() {
        assert_eq!(moving(2, Direction::Up).score(6, 10), Some(4));
        assert_eq!(best_fit([moving(2, Direction::Up), moving(8, Direction::Down)], 6, 10), Some((1, 2)));
    }

    #[test]
    fn ties_go_to_first_seen() {
        assert_eq!(best_fit([idle(3), idle(7)], 5, 10), Some((0, -8)));
        assert_eq!(best_fit([idle(7), idle(3)], 5, 10), Some((0, -8)));
    }

    #[test]
    fn halted_cars_are_skipped() {
        assert_eq!(best_fit([halted(5), moving(2, Direction::Up)], 5, 10), Some((1, 3)));
        assert_eq!(best_fit([halted(1), halted(5)], 5, 10), None);
        assert_eq!(best_fit(Vec::<Candidate>::new(), 5, 10), None);
    }

    #[test]
    fn stopped_car_gets_no_idle_bonus() {
        let stopped = Candidate { behaviour: Behaviour::Stopped, ..moving(4, Direction::Up) };
        assert_eq!(stopped.score(2, 10), Some(2));
        assert_eq!(best_fit([stopped, idle(8)], 2, 10), Some((1, -4)));
    }
}
