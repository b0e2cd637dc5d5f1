#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure per-tick motion rules for everything that moves through the maze.
//!
//! Functions in this crate read the maze and tank snapshots they are handed and
//! mutate only the body they advance. The world owns sequencing, lifetimes and
//! kill bookkeeping; this crate answers where things end up and what they hit.

mod hazards;
mod projectiles;
mod shrapnel;
mod tank;
mod walls;

use maze_tanks_core::{normalized, rotate, Number, Point};

pub use hazards::{
    death_ray_hits, death_ray_path, mine_polygon, mine_pressed_by, upgrade_polygon,
    upgrade_touched_by, MineDetails,
};
pub use projectiles::{
    advance_missile, advance_shot, missile_overlaps, missile_polygon, MissileDetails,
    ShotDetails,
};
pub use shrapnel::{
    shrapnel_position, shrapnel_tank_fraction, shrapnel_wall_fraction, shrapnel_way,
    ShrapnelDetails, SHRAPNEL_TTL,
};
pub use tank::{advance_tank, advance_tank_with, tank_collisions, tank_polygon};
pub use walls::{wall_polygons, wall_polygons_at};

/// Half the thickness of every wall.
pub const WALL_WIDTH: Number = Number::from_ratio(1, 20);

/// Cosine of the per-tick turning angle of five degrees.
pub const TURN_COS: Number = Number::from_raw(65_287);

/// Sine of the per-tick turning angle of five degrees.
pub const TURN_SIN: Number = Number::from_raw(5_712);

/// Number of headings reachable by repeated turning.
pub const DIRECTION_COUNT: u32 = 72;

/// Hull extent across the facing direction.
pub const TANK_WIDTH: Number = Number::from_ratio(30, 100);

/// Hull extent along the facing direction.
pub const TANK_LENGTH: Number = Number::from_ratio(45, 100);

/// Distance covered per tick while driving forward.
pub const TANK_SPEED: Number = Number::from_ratio(3, 100);

/// Distance covered per tick while reversing.
pub const TANK_REVERSE_SPEED: Number = Number::from_ratio(3, 200);

/// Slack added to every penetration depth before resolving it.
pub const COLLISION_EPSILON: Number = Number::from_ratio(1, 10_000);

/// Longest distance a shot travels before walls are looked up again.
pub const MAX_SHOT_STEP: Number = Number::from_ratio(1, 4);

/// Missile body extent across its heading.
pub const MISSILE_WIDTH: Number = Number::from_ratio(6, 100);

/// Missile body extent along its heading.
pub const MISSILE_LENGTH: Number = Number::from_ratio(12, 100);

/// Distance a missile covers per tick.
pub const MISSILE_SPEED: Number = Number::from_ratio(1, 25);

/// Side of the square pickup footprint of an upgrade.
pub const UPGRADE_SIZE: Number = Number::from_ratio(3, 10);

/// Length of one death ray segment.
pub const DEATH_RAY_STEP: Number = Number::from_ratio(3, 10);

/// Largest bend a death ray makes per unit of travel.
pub const DEATH_RAY_MAX_TURN: Number = Number::from_ratio(1, 20);

/// Heading reached after `index` turning steps from the positive x axis.
///
/// Indices wrap at [`DIRECTION_COUNT`], so every heading a tank can face by
/// turning alone is produced exactly.
#[must_use]
pub fn discrete_direction(index: u32) -> Point {
    let mut direction = Point::new(Number::ONE, Number::ZERO);
    let mut step = Point::new(TURN_COS, TURN_SIN);
    let mut remaining = index % DIRECTION_COUNT;
    while remaining > 0 {
        if remaining & 1 == 1 {
            direction = rotate(direction, step);
        }
        step = rotate(step, step);
        remaining >>= 1;
    }
    normalized(direction)
}
