use shared_resources::direction::Direction;
use shared_resources::elevator_status::Behaviour;

/// Floors between `floor` and `target`, plus a reversal penalty of `2 * (num_floors - 1)`
/// when the car is moving away from `target`.
pub fn travel_cost(
    floor: u8,
    direction: Direction,
    behaviour: Behaviour,
    target: u8,
    num_floors: u8,
) -> i32 {
    let distance = (i32::from(floor) - i32::from(target)).abs();
    let reversing = behaviour == Behaviour::Moving
        && match direction {
            Direction::Up => target < floor,
            Direction::Down => target > floor,
            Direction::Idle => false,
        };
    if reversing {
        distance + 2 * (i32::from(num_floors) - 1)
    } else {
        distance
    }
}
