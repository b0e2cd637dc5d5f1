use maze_tanks_core::{
    cross, dot, length, normalized, rotate, CellCoord, Maze, Number, Point, TankId, TankState,
};
use maze_tanks_system_collision::{polygon_collision, swept_circle_vs_polygon, Polygon};

use crate::{tank_polygon, DEATH_RAY_MAX_TURN, DEATH_RAY_STEP, UPGRADE_SIZE};

const MINE_OUTER_RADIUS: Number = Number::from_ratio(15, 100);
const MINE_INNER_RADIUS: Number = Number::from_ratio(10, 100);

/// Cosine and sine of sixty degrees.
const SIXTH_TURN: Point = Point::new(Number::from_ratio(1, 2), Number::from_raw(56_756));

/// Longest death ray path, in segments.
const MAX_DEATH_RAY_SEGMENTS: usize = 1_000;

/// A mine lying on the floor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MineDetails {
    /// Centre of the footprint.
    pub position: Point,
    /// Heading of the tank that dropped the mine, which orients the footprint.
    pub direction: Point,
    /// Tank that dropped the mine.
    pub owner: TankId,
}

/// Hexagonal footprint of a mine with alternating long and short spokes.
#[must_use]
pub fn mine_polygon(mine: &MineDetails) -> Polygon {
    let mut spoke = mine.direction;
    let mut vertices = Vec::with_capacity(6);
    for index in 0..6 {
        let radius = if index % 2 == 0 {
            MINE_OUTER_RADIUS
        } else {
            MINE_INNER_RADIUS
        };
        vertices.push(mine.position + spoke * radius);
        spoke = rotate(spoke, SIXTH_TURN);
    }
    Polygon::new(vertices)
}

/// Whether a live tank is standing on the mine.
#[must_use]
pub fn mine_pressed_by(mine: &MineDetails, tank: &TankState) -> bool {
    tank.alive && polygon_collision(&mine_polygon(mine), &tank_polygon(tank)).is_some()
}

/// Square pickup footprint of an upgrade lying in `cell`.
#[must_use]
pub fn upgrade_polygon(cell: CellCoord) -> Polygon {
    let center = cell.center();
    let half = UPGRADE_SIZE / 2;
    Polygon::rectangle(
        center.x - half,
        center.y - half,
        center.x + half,
        center.y + half,
    )
}

/// Whether a live tank touches the upgrade lying in `cell`.
#[must_use]
pub fn upgrade_touched_by(cell: CellCoord, tank: &TankState) -> bool {
    tank.alive && polygon_collision(&upgrade_polygon(cell), &tank_polygon(tank)).is_some()
}

/// Traces a death ray from `origin` until it leaves the maze.
///
/// Each segment is [`DEATH_RAY_STEP`] long. After every segment the heading
/// bends toward the live enemy ahead of the ray with the smallest aim weight,
/// by at most [`DEATH_RAY_MAX_TURN`] per unit of travel.
#[must_use]
pub fn death_ray_path(
    origin: Point,
    direction: Point,
    owner: TankId,
    tanks: &[TankState],
    maze: &Maze,
) -> Vec<Point> {
    let mut path = vec![origin];
    let mut direction = direction;
    let mut tip = origin;

    while maze.contains(tip) && path.len() <= MAX_DEATH_RAY_SEGMENTS {
        tip += direction * DEATH_RAY_STEP;
        path.push(tip);

        let mut best: Option<(Number, Number)> = None;
        for (index, tank) in tanks.iter().enumerate() {
            if index == owner.index() || !tank.alive {
                continue;
            }
            let way = tank.position - tip;
            let distance_squared = dot(way, way);
            let forward = dot(way, direction);
            if distance_squared.is_zero() || forward < Number::ZERO {
                continue;
            }
            let scale = distance_squared * length(way);
            if scale.is_zero() {
                continue;
            }
            let weight = forward * forward / scale;
            if best.map_or(true, |(current, _)| weight < current) {
                best = Some((weight, bend(cross(direction, way), distance_squared * 2)));
            }
        }

        let turn = best.map_or(Number::ZERO, |(_, turn)| turn);
        direction = normalized(rotate(
            direction,
            Point::new(Number::ONE, DEATH_RAY_STEP * turn),
        ));
    }
    path
}

/// `numerator / denominator` clamped to the death ray turn limit.
fn bend(numerator: Number, denominator: Number) -> Number {
    if numerator.abs() >= DEATH_RAY_MAX_TURN * denominator {
        if numerator < Number::ZERO {
            -DEATH_RAY_MAX_TURN
        } else {
            DEATH_RAY_MAX_TURN
        }
    } else {
        numerator / denominator
    }
}

/// Whether any segment of the path crosses the tank hull.
#[must_use]
pub fn death_ray_hits(path: &[Point], tank: &TankState) -> bool {
    if !tank.alive {
        return false;
    }
    let hull = tank_polygon(tank);
    path.windows(2).any(|segment| {
        swept_circle_vs_polygon(&hull, segment[0], segment[1] - segment[0], Number::ZERO).is_some()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_tanks_core::KeyState;

    fn tank(x: Number, y: Number, alive: bool) -> TankState {
        TankState {
            position: Point::new(x, y),
            direction: Point::new(Number::ONE, Number::ZERO),
            key_state: KeyState::default(),
            active: true,
            alive,
        }
    }

    #[test]
    fn mine_footprint_is_a_hexagon_around_its_centre() {
        let mine = MineDetails {
            position: Point::new(Number::from_int(2), Number::from_int(2)),
            direction: Point::new(Number::ONE, Number::ZERO),
            owner: TankId::new(0),
        };
        let polygon = mine_polygon(&mine);
        assert_eq!(polygon.vertices().len(), 6);
        assert_eq!(
            polygon.vertices()[0],
            Point::new(Number::from_int(2) + MINE_OUTER_RADIUS, Number::from_int(2))
        );
        assert!(polygon.contains(mine.position));
    }

    #[test]
    fn mine_ignores_dead_tanks() {
        let mine = MineDetails {
            position: Point::new(Number::from_int(2), Number::from_int(2)),
            direction: Point::new(Number::ONE, Number::ZERO),
            owner: TankId::new(0),
        };
        let on_top = tank(Number::from_int(2), Number::from_int(2), true);
        assert!(mine_pressed_by(&mine, &on_top));
        assert!(!mine_pressed_by(&mine, &TankState { alive: false, ..on_top }));
        let far = tank(Number::from_int(4), Number::from_int(2), true);
        assert!(!mine_pressed_by(&mine, &far));
    }

    #[test]
    fn upgrade_is_picked_up_from_the_cell_centre() {
        let cell = CellCoord::new(1, 2);
        let inside = tank(Number::from_ratio(3, 2), Number::from_ratio(5, 2), true);
        let elsewhere = tank(Number::from_ratio(7, 2), Number::from_ratio(5, 2), true);
        assert!(upgrade_touched_by(cell, &inside));
        assert!(!upgrade_touched_by(cell, &elsewhere));
    }

    #[test]
    fn straight_ray_crosses_the_maze() {
        let maze = Maze::open(5, 5);
        let origin = Point::new(Number::from_ratio(1, 2), Number::from_ratio(5, 2));
        let direction = Point::new(Number::ONE, Number::ZERO);
        let path = death_ray_path(origin, direction, TankId::new(0), &[], &maze);
        let last = *path.last().expect("path has a start");
        assert!(last.x >= Number::from_int(5));
        assert!(path.iter().all(|point| point.y == origin.y));
    }

    #[test]
    fn ray_bends_toward_enemy_and_hits_it() {
        let maze = Maze::open(8, 8);
        let owner = tank(Number::from_ratio(1, 2), Number::from_ratio(1, 2), true);
        let enemy = tank(Number::from_ratio(9, 2), Number::from_ratio(3, 4), true);
        let tanks = [owner, enemy];
        let path = death_ray_path(
            owner.position,
            owner.direction,
            TankId::new(0),
            &tanks,
            &maze,
        );
        assert!(path[2].y > owner.position.y);
        assert!(death_ray_hits(&path, &enemy));
        let straight = death_ray_path(owner.position, owner.direction, TankId::new(0), &[], &maze);
        assert!(!death_ray_hits(&straight, &enemy));
        assert!(!death_ray_hits(&path, &TankState { alive: false, ..enemy }));
    }
}
