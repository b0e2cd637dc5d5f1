use maze_tanks_core::{length, Maze, Number, Point, TankState};
use maze_tanks_system_collision::swept_circle_vs_polygon;

use crate::{tank_polygon, wall_polygons_at};

/// Ticks a fragment stays in flight.
pub const SHRAPNEL_TTL: i32 = 50;

/// Longest straight piece tested against the walls of a single cell.
const WALL_SEGMENT: Number = Number::from_ratio(1, 2);

/// Fraction of the way covered after each tick, `1 - (1 - t / TTL)^2.6`.
const SHRAPNEL_WAY: [i32; SHRAPNEL_TTL as usize + 1] = [
    0, 3354, 6599, 9739, 12773, 15704, 18532, 21259, 23887, 26416, 28849, 31186, 33429, 35580,
    37640, 39610, 41492, 43288, 44998, 46626, 48171, 49636, 51023, 52332, 53566, 54727, 55815,
    56833, 57783, 58666, 59485, 60240, 60935, 61570, 62149, 62672, 63142, 63562, 63933, 64257,
    64538, 64777, 64977, 65141, 65272, 65371, 65444, 65492, 65521, 65533, 65536,
];

/// A fragment thrown out by an explosion along a fixed straight way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShrapnelDetails {
    /// Point the fragment starts from.
    pub source: Point,
    /// Full displacement the fragment would cover without obstruction.
    pub way: Point,
}

/// Portion of the way covered once `timer` ticks have elapsed.
#[must_use]
pub fn shrapnel_way(timer: i32) -> Number {
    Number::from_raw(SHRAPNEL_WAY[timer.clamp(0, SHRAPNEL_TTL) as usize])
}

/// Portion of the way at which the fragment is stopped by a wall, or one.
///
/// The way is cut into pieces no longer than half a cell and each piece is
/// tested against the walls around its start.
#[must_use]
pub fn shrapnel_wall_fraction(details: &ShrapnelDetails, maze: &Maze) -> Number {
    let total = length(details.way);
    if total.is_zero() {
        return Number::ONE;
    }
    let pieces = ((total.raw() + WALL_SEGMENT.raw() - 1) / WALL_SEGMENT.raw()).max(1);
    let piece = details.way / pieces;

    for index in 0..pieces {
        let start = details.source + details.way * Number::from_ratio(index, pieces);
        let hit = wall_polygons_at(maze, start)
            .iter()
            .filter_map(|wall| swept_circle_vs_polygon(wall, start, piece, Number::ZERO))
            .map(|hit| hit.fraction)
            .min();
        if let Some(fraction) = hit {
            return (Number::from_int(index) + fraction) / pieces;
        }
    }
    Number::ONE
}

/// Portion of the way at which the fragment would strike the tank.
#[must_use]
pub fn shrapnel_tank_fraction(details: &ShrapnelDetails, tank: &TankState) -> Option<Number> {
    swept_circle_vs_polygon(&tank_polygon(tank), details.source, details.way, Number::ZERO)
        .map(|hit| hit.fraction)
}

/// Where the fragment is drawn after `timer` ticks, given its wall stop.
#[must_use]
pub fn shrapnel_position(details: &ShrapnelDetails, collision: Number, timer: i32) -> Point {
    details.source + details.way * shrapnel_way(timer).min(collision)
}
