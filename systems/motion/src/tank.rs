use maze_tanks_core::{normalized, rotate, Maze, Number, Point, TankState};
use maze_tanks_system_collision::{
    polygon_collision, resolve_displacement, resolve_rotation, Collision, Polygon,
};

use crate::{
    wall_polygons_at, COLLISION_EPSILON, TANK_LENGTH, TANK_REVERSE_SPEED, TANK_SPEED,
    TANK_WIDTH, TURN_COS, TURN_SIN,
};

/// Hull rectangle of a tank.
#[must_use]
pub fn tank_polygon(tank: &TankState) -> Polygon {
    Polygon::rotated_rectangle(tank.position, tank.direction, TANK_WIDTH, TANK_LENGTH)
}

/// Overlaps between the tank hull and the obstacles reported for its position.
#[must_use]
pub fn tank_collisions<F>(tank: &TankState, obstacles: &F) -> Vec<Collision>
where
    F: Fn(Point) -> Vec<Polygon>,
{
    let hull = tank_polygon(tank);
    obstacles(tank.position)
        .iter()
        .filter_map(|obstacle| polygon_collision(&hull, obstacle))
        .collect()
}

/// Applies one tick of the tank's held controls against the maze walls.
pub fn advance_tank(tank: &mut TankState, maze: &Maze) {
    advance_tank_with(tank, |position| wall_polygons_at(maze, position));
}

/// Applies one tick of the tank's held controls against arbitrary obstacles.
///
/// Turning and driving are resolved separately. A turn that ends in an overlap
/// is repaired by sliding the hull out; a drive that ends in an overlap is
/// repaired by steering the hull by at most twice the turning step. When the
/// repair fails or leaves an overlap behind, that phase is undone entirely.
pub fn advance_tank_with<F>(tank: &mut TankState, obstacles: F)
where
    F: Fn(Point) -> Vec<Polygon>,
{
    let turn = tank.key_state.turn();
    if turn != 0 {
        let previous = (tank.position, tank.direction);
        tank.direction = normalized(rotate(tank.direction, Point::new(TURN_COS, TURN_SIN * turn)));

        let mut collisions = tank_collisions(tank, &obstacles);
        if !collisions.is_empty() {
            pad(&mut collisions);
            if let Some(displacement) = resolve_displacement(&collisions) {
                tank.position -= displacement;
                collisions = tank_collisions(tank, &obstacles);
            }
        }
        if !collisions.is_empty() {
            (tank.position, tank.direction) = previous;
        }
    }

    let speed = drive_speed(tank);
    if speed != Number::ZERO {
        let previous = (tank.position, tank.direction);
        tank.position += tank.direction * speed;

        let mut collisions = tank_collisions(tank, &obstacles);
        if !collisions.is_empty() {
            pad(&mut collisions);
            if let Some(direction) =
                resolve_rotation(&collisions, tank.position, tank.direction, TURN_SIN * 2)
            {
                tank.direction = normalized(direction);
                collisions = tank_collisions(tank, &obstacles);
            }
        }
        if !collisions.is_empty() {
            (tank.position, tank.direction) = previous;
        }
    }
}

fn drive_speed(tank: &TankState) -> Number {
    let forward = if tank.key_state.forward { TANK_SPEED } else { Number::ZERO };
    let back = if tank.key_state.back { TANK_REVERSE_SPEED } else { Number::ZERO };
    forward - back
}

fn pad(collisions: &mut [Collision]) {
    for collision in collisions {
        collision.depth += COLLISION_EPSILON;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_tanks_core::KeyState;

    fn tank_at(x: Number, y: Number, keys: KeyState) -> TankState {
        TankState {
            position: Point::new(x, y),
            direction: Point::new(Number::ONE, Number::ZERO),
            key_state: keys,
            active: true,
            alive: true,
        }
    }

    #[test]
    fn idle_tank_stays_put() {
        let maze = Maze::open(3, 3);
        let mut tank = tank_at(Number::from_ratio(3, 2), Number::from_ratio(3, 2), KeyState::default());
        let before = tank;
        advance_tank(&mut tank, &maze);
        assert_eq!(tank, before);
    }

    #[test]
    fn reverse_drives_at_half_speed() {
        let maze = Maze::open(3, 3);
        let keys = KeyState {
            back: true,
            ..KeyState::default()
        };
        let mut tank = tank_at(Number::from_ratio(3, 2), Number::from_ratio(3, 2), keys);
        advance_tank(&mut tank, &maze);
        assert_eq!(tank.position.x, Number::from_ratio(3, 2) - TANK_REVERSE_SPEED);
        assert_eq!(tank.position.y, Number::from_ratio(3, 2));
    }

    #[test]
    fn forward_and_back_cancel_to_the_difference() {
        let maze = Maze::open(3, 3);
        let keys = KeyState {
            forward: true,
            back: true,
            ..KeyState::default()
        };
        let mut tank = tank_at(Number::from_ratio(3, 2), Number::from_ratio(3, 2), keys);
        advance_tank(&mut tank, &maze);
        assert_eq!(
            tank.position.x,
            Number::from_ratio(3, 2) + (TANK_SPEED - TANK_REVERSE_SPEED)
        );
    }

    #[test]
    fn free_turn_rotates_by_one_step() {
        let maze = Maze::open(3, 3);
        let keys = KeyState {
            right: true,
            ..KeyState::default()
        };
        let mut tank = tank_at(Number::from_ratio(3, 2), Number::from_ratio(3, 2), keys);
        advance_tank(&mut tank, &maze);
        assert_eq!(
            tank.direction,
            normalized(Point::new(TURN_COS, TURN_SIN))
        );
        assert_eq!(tank.position, Point::new(Number::from_ratio(3, 2), Number::from_ratio(3, 2)));
    }
}
