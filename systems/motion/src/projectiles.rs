use maze_tanks_core::{
    dot, length, normalized, rotate, Maze, Number, Point, ShotKind, TankId, TankState,
};
use maze_tanks_system_collision::{
    circle_overlap, polygon_collision, swept_circle_vs_polygon, Polygon, SweptHit,
};

use crate::{
    tank_polygon, wall_polygons_at, MAX_SHOT_STEP, MISSILE_LENGTH, MISSILE_SPEED,
    MISSILE_WIDTH, TURN_COS, TURN_SIN,
};

/// Upper bound on sub-steps, bounces included, within a single tick.
const MAX_SHOT_SEGMENTS: usize = 96;

/// A disc flying in a straight line and bouncing off walls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShotDetails {
    /// Centre of the disc.
    pub position: Point,
    /// Displacement per tick.
    pub velocity: Point,
    /// Disc radius.
    pub radius: Number,
    /// Remaining ticks; negative means the shot never expires.
    pub timer: i32,
    /// Presentation hint for adapters.
    pub kind: ShotKind,
    /// Tank that fired the shot.
    pub owner: TankId,
}

/// Moves a shot through one tick of travel.
///
/// Travel is split into sub-steps no longer than [`MAX_SHOT_STEP`]. Within a
/// sub-step a wall contact wins: the shot moves to the contact, reflects its
/// velocity about the contact normal and carries on with the remaining
/// distance. Otherwise the earliest tank contact ends the flight and the tank
/// is returned. `ignored` names a tank the shot passes through; it is cleared
/// as soon as the shot no longer overlaps that tank. `path` is overwritten
/// with the start point, every bounce point and the final point.
pub fn advance_shot(
    shot: &mut ShotDetails,
    ignored: &mut Option<TankId>,
    maze: &Maze,
    tanks: &[TankState],
    path: &mut Vec<Point>,
) -> Option<TankId> {
    path.clear();
    path.push(shot.position);

    let mut remaining = length(shot.velocity);
    let mut segments = 0;
    while remaining > Number::ZERO && segments < MAX_SHOT_SEGMENTS {
        segments += 1;
        release_ignored(shot, ignored, tanks);

        let heading = normalized(shot.velocity);
        let travel = remaining.min(MAX_SHOT_STEP);
        let step = heading * travel;

        let walls = wall_polygons_at(maze, shot.position);
        let wall_hit = earliest(
            walls
                .iter()
                .filter_map(|wall| swept_circle_vs_polygon(wall, shot.position, step, shot.radius))
                .filter(|hit| dot(step, hit.normal) < Number::ZERO),
        );
        if let Some(hit) = wall_hit {
            let advance = travel * hit.fraction;
            shot.position += heading * advance;
            shot.velocity -= hit.normal * (dot(shot.velocity, hit.normal) * 2);
            remaining -= advance;
            path.push(shot.position);
            continue;
        }

        let tank_hit = tanks
            .iter()
            .enumerate()
            .filter(|(index, tank)| tank.alive && Some(TankId::new(*index as u32)) != *ignored)
            .filter_map(|(index, tank)| {
                swept_circle_vs_polygon(&tank_polygon(tank), shot.position, step, shot.radius)
                    .map(|hit| (hit.fraction, index))
            })
            .min();
        if let Some((fraction, index)) = tank_hit {
            shot.position += heading * (travel * fraction);
            path.push(shot.position);
            return Some(TankId::new(index as u32));
        }

        shot.position += step;
        remaining -= travel;
    }

    if path.last() != Some(&shot.position) {
        path.push(shot.position);
    }
    None
}

fn release_ignored(shot: &ShotDetails, ignored: &mut Option<TankId>, tanks: &[TankState]) {
    let Some(owner) = *ignored else {
        return;
    };
    let still_inside = tanks
        .get(owner.index())
        .map(|tank| circle_overlap(&tank_polygon(tank), shot.position, shot.radius).is_some())
        .unwrap_or(false);
    if !still_inside {
        *ignored = None;
    }
}

fn earliest(hits: impl Iterator<Item = SweptHit>) -> Option<SweptHit> {
    hits.min_by_key(|hit| hit.fraction)
}

/// A steerable missile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MissileDetails {
    /// Centre of the body.
    pub position: Point,
    /// Unit heading.
    pub direction: Point,
    /// Tank that launched the missile.
    pub owner: TankId,
}

/// Body rectangle of a missile.
#[must_use]
pub fn missile_polygon(missile: &MissileDetails) -> Polygon {
    Polygon::rotated_rectangle(missile.position, missile.direction, MISSILE_WIDTH, MISSILE_LENGTH)
}

/// Whether the missile body overlaps the tank hull.
#[must_use]
pub fn missile_overlaps(missile: &MissileDetails, tank: &TankState) -> bool {
    polygon_collision(&missile_polygon(missile), &tank_polygon(tank)).is_some()
}

/// Turns the missile by one step in the sense of `turn`, then flies it forward.
///
/// A missile ending inside a wall is pushed back out along the contact
/// normal, and if it was heading into the wall the component of its heading
/// along the dominant axis of that normal is mirrored.
pub fn advance_missile(missile: &mut MissileDetails, turn: i32, maze: &Maze) {
    if turn != 0 {
        let rotation = Point::new(TURN_COS, TURN_SIN * turn.signum());
        missile.direction = normalized(rotate(missile.direction, rotation));
    }
    missile.position += missile.direction * MISSILE_SPEED;

    for wall in wall_polygons_at(maze, missile.position) {
        let Some(collision) = polygon_collision(&missile_polygon(missile), &wall) else {
            continue;
        };
        missile.position -= collision.normal * collision.depth;
        if dot(missile.direction, collision.normal) > Number::ZERO {
            if collision.normal.x.abs() >= collision.normal.y.abs() {
                missile.direction.x = -missile.direction.x;
            } else {
                missile.direction.y = -missile.direction.y;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WALL_WIDTH;

    fn shot(position: Point, velocity: Point) -> ShotDetails {
        ShotDetails {
            position,
            velocity,
            radius: Number::from_ratio(3, 100),
            timer: 100,
            kind: ShotKind::Bullet,
            owner: TankId::new(0),
        }
    }

    #[test]
    fn free_flight_moves_by_velocity() {
        let maze = Maze::open(3, 3);
        let start = Point::new(Number::from_ratio(3, 2), Number::from_ratio(3, 2));
        let velocity = Point::new(Number::from_ratio(1, 25), Number::ZERO);
        let mut details = shot(start, velocity);
        let mut path = Vec::new();
        let hit = advance_shot(&mut details, &mut None, &maze, &[], &mut path);
        assert_eq!(hit, None);
        assert_eq!(details.position, start + velocity);
        assert_eq!(path, vec![start, start + velocity]);
    }

    #[test]
    fn bounce_negates_normal_component_only() {
        let maze = Maze::open(3, 3);
        let start = Point::new(Number::from_ratio(3, 2), Number::from_ratio(29, 10));
        let velocity = Point::new(Number::from_ratio(4, 100), Number::from_ratio(3, 100));
        let mut details = shot(start, velocity);
        let mut path = Vec::new();
        let _ = advance_shot(&mut details, &mut None, &maze, &[], &mut path);

        assert_eq!(details.velocity.x, velocity.x);
        assert_eq!(details.velocity.y, -velocity.y);
        assert_eq!(path.len(), 3);
        let wall_face = Number::from_int(3) - WALL_WIDTH;
        assert!(path[1].y + details.radius <= wall_face + Number::from_ratio(1, 1000));
        assert!(details.position.y < path[1].y);
    }

    #[test]
    fn shot_kills_tank_in_its_way() {
        let maze = Maze::open(3, 3);
        let tank = TankState {
            position: Point::new(Number::from_ratio(17, 10), Number::from_ratio(3, 2)),
            direction: Point::new(Number::ONE, Number::ZERO),
            key_state: Default::default(),
            active: true,
            alive: true,
        };
        let start = Point::new(Number::from_ratio(13, 10), Number::from_ratio(3, 2));
        let velocity = Point::new(Number::from_ratio(2, 10), Number::ZERO);
        let mut details = shot(start, velocity);
        let mut path = Vec::new();
        let tanks = [TankState { alive: false, ..tank }, tank];
        let hit = advance_shot(&mut details, &mut None, &maze, &tanks, &mut path);
        assert_eq!(hit, Some(TankId::new(1)));
    }

    #[test]
    fn ignored_owner_is_released_after_leaving_the_hull() {
        let maze = Maze::open(3, 3);
        let owner = TankState {
            position: Point::new(Number::from_ratio(3, 2), Number::from_ratio(3, 2)),
            direction: Point::new(Number::ONE, Number::ZERO),
            key_state: Default::default(),
            active: true,
            alive: true,
        };
        let start = owner.position + Point::new(Number::from_ratio(17, 100), Number::ZERO);
        let velocity = Point::new(Number::from_ratio(1, 25), Number::ZERO);
        let mut details = shot(start, velocity);
        let mut ignored = Some(TankId::new(0));
        let mut path = Vec::new();

        let hit = advance_shot(&mut details, &mut ignored, &maze, &[owner], &mut path);
        assert_eq!(hit, None);
        assert_eq!(ignored, Some(TankId::new(0)));

        for _ in 0..4 {
            assert_eq!(advance_shot(&mut details, &mut ignored, &maze, &[owner], &mut path), None);
        }
        assert_eq!(ignored, None);
    }

    #[test]
    fn missile_flies_along_heading() {
        let maze = Maze::open(3, 3);
        let mut missile = MissileDetails {
            position: Point::new(Number::from_ratio(3, 2), Number::from_ratio(3, 2)),
            direction: Point::new(Number::ONE, Number::ZERO),
            owner: TankId::new(0),
        };
        advance_missile(&mut missile, 0, &maze);
        assert_eq!(missile.position.x, Number::from_ratio(3, 2) + MISSILE_SPEED);
    }

    #[test]
    fn missile_reflects_off_boundary() {
        let maze = Maze::open(3, 3);
        let mut missile = MissileDetails {
            position: Point::new(Number::from_ratio(291, 100), Number::from_ratio(3, 2)),
            direction: Point::new(Number::ONE, Number::ZERO),
            owner: TankId::new(0),
        };
        advance_missile(&mut missile, 0, &maze);
        assert_eq!(missile.direction, Point::new(-Number::ONE, Number::ZERO));
        let wall_face = Number::from_int(3) - WALL_WIDTH;
        assert!(missile.position.x + MISSILE_LENGTH / 2 <= wall_face + Number::from_ratio(1, 1000));
    }
}
