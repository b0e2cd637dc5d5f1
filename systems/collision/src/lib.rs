#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fixed-point collision kernel for convex polygons and moving discs.
//!
//! Everything here is a pure function of its arguments. Normals returned by
//! [`polygon_collision`] point from the first polygon toward the second, so a
//! body that overlaps an obstacle separates by moving against the normal.

use std::cmp::Ordering;

use maze_tanks_core::{cross, dot, length, normalized, rotate, Number, Point};

/// Tolerance used when checking whether a candidate displacement satisfies a constraint.
const FEASIBILITY_SLACK: Number = Number::from_raw(2);

/// Pairs of constraints whose normals are closer to parallel than this are not intersected.
const PARALLEL_LIMIT: Number = Number::from_ratio(1, 256);

/// Convex polygon described by its vertices in boundary order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl Polygon {
    /// Wraps the provided vertices, which must describe a convex polygon.
    #[must_use]
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    /// Axis-aligned rectangle spanning the given bounds.
    #[must_use]
    pub fn rectangle(left: Number, top: Number, right: Number, bottom: Number) -> Self {
        Self::new(vec![
            Point::new(right, top),
            Point::new(right, bottom),
            Point::new(left, bottom),
            Point::new(left, top),
        ])
    }

    /// Rectangle centred on `center` whose long side follows the unit `direction`.
    #[must_use]
    pub fn rotated_rectangle(center: Point, direction: Point, width: Number, length: Number) -> Self {
        let normal = direction.perpendicular();
        let along = direction * length;
        let across = normal * width;
        Self::new(vec![
            center + (along + across) / 2,
            center + (along - across) / 2,
            center - (along + across) / 2,
            center - (along - across) / 2,
        ])
    }

    /// Vertices in boundary order.
    #[must_use]
    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// Average of the vertices, which lies inside any convex polygon.
    #[must_use]
    pub fn centroid(&self) -> Point {
        let count = self.vertices.len().max(1) as i32;
        let sum = self
            .vertices
            .iter()
            .fold(Point::ZERO, |sum, vertex| sum + *vertex);
        sum / count
    }

    /// Reports whether the point lies inside or on the boundary.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        self.edges()
            .all(|edge| dot(point - edge.start, edge.normal) <= Number::ZERO)
    }

    fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        let centroid = self.centroid();
        let count = self.vertices.len();
        (0..count).filter_map(move |index| {
            let start = self.vertices[index];
            let end = self.vertices[(index + 1) % count];
            Edge::new(start, end, centroid)
        })
    }

    fn project(&self, axis: Point) -> (Number, Number) {
        let mut min = Number::MAX;
        let mut max = Number::MIN;
        for vertex in &self.vertices {
            let projection = dot(*vertex, axis);
            min = min.min(projection);
            max = max.max(projection);
        }
        (min, max)
    }

    fn extreme_vertex(&self, axis: Point) -> Point {
        let mut best = self.vertices.first().copied().unwrap_or(Point::ZERO);
        let mut best_projection = dot(best, axis);
        for vertex in self.vertices.iter().skip(1) {
            let projection = dot(*vertex, axis);
            if projection > best_projection {
                best = *vertex;
                best_projection = projection;
            }
        }
        best
    }

    fn ordering_key(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.vertices.iter().map(|vertex| (vertex.x.raw(), vertex.y.raw()))
    }
}

#[derive(Clone, Copy, Debug)]
struct Edge {
    start: Point,
    direction: Point,
    length: Number,
    normal: Point,
}

impl Edge {
    fn new(start: Point, end: Point, centroid: Point) -> Option<Self> {
        let delta = end - start;
        let length = length(delta);
        if length.is_zero() {
            return None;
        }
        let direction = delta / length;
        let mut normal = direction.perpendicular();
        if dot(start - centroid, normal) < Number::ZERO {
            normal = -normal;
        }
        Some(Self {
            start,
            direction,
            length,
            normal,
        })
    }
}

/// Overlap between two convex shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Collision {
    /// Point inside both shapes where the overlap was detected.
    pub position: Point,
    /// Unit normal pointing from the first shape toward the second.
    pub normal: Point,
    /// Distance the first shape must travel against `normal` to separate.
    pub depth: Number,
}

/// Result of a swept disc test.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SweptHit {
    /// Portion of the motion completed before contact, between zero and one.
    pub fraction: Number,
    /// Unit normal of the contact, pointing from the polygon toward the disc.
    pub normal: Point,
}

#[derive(Clone, Copy, Debug)]
struct AxisCandidate {
    axis: Point,
    depth: Number,
    toward_second: bool,
}

/// Separating-axis test between two convex polygons.
///
/// Returns `None` when any edge normal of either polygon separates them,
/// touching included. Otherwise reports the axis of least penetration. Ties
/// are broken on the axis coordinates so that swapping the arguments yields
/// the same depth with the opposite normal.
#[must_use]
pub fn polygon_collision(first: &Polygon, second: &Polygon) -> Option<Collision> {
    let centroid_offset = second.centroid() - first.centroid();
    let mut best: Option<AxisCandidate> = None;

    for edge in first.edges().chain(second.edges()) {
        let axis = canonical_axis(edge.normal);
        let (first_min, first_max) = first.project(axis);
        let (second_min, second_max) = second.project(axis);
        let forward = first_max - second_min;
        let backward = second_max - first_min;
        if forward <= Number::ZERO || backward <= Number::ZERO {
            return None;
        }

        let toward_second = match forward.cmp(&backward) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => match dot(centroid_offset, axis).cmp(&Number::ZERO) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => first.ordering_key().lt(second.ordering_key()),
            },
        };
        let candidate = AxisCandidate {
            axis,
            depth: forward.min(backward),
            toward_second,
        };

        best = match best {
            Some(current) if !prefer(&candidate, &current) => Some(current),
            _ => Some(candidate),
        };
    }

    let chosen = best?;
    let normal = if chosen.toward_second {
        chosen.axis
    } else {
        -chosen.axis
    };
    Some(Collision {
        position: witness_point(first, second, normal),
        normal,
        depth: chosen.depth,
    })
}

fn canonical_axis(axis: Point) -> Point {
    if axis.x < Number::ZERO || (axis.x.is_zero() && axis.y < Number::ZERO) {
        -axis
    } else {
        axis
    }
}

fn prefer(candidate: &AxisCandidate, current: &AxisCandidate) -> bool {
    let key = |entry: &AxisCandidate| (entry.depth, entry.axis.x, entry.axis.y);
    key(candidate) < key(current)
}

fn witness_point(first: &Polygon, second: &Polygon, normal: Point) -> Point {
    let first_vertex = first.extreme_vertex(normal);
    if second.contains(first_vertex) {
        return first_vertex;
    }
    let second_vertex = second.extreme_vertex(-normal);
    if first.contains(second_vertex) {
        return second_vertex;
    }
    (first_vertex + second_vertex) / 2
}

/// Reports whether a disc overlaps the polygon, touching excluded.
///
/// When it does, returns the unit normal pointing from the nearest boundary
/// point of the polygon toward the disc centre.
#[must_use]
pub fn circle_overlap(polygon: &Polygon, center: Point, radius: Number) -> Option<Point> {
    let mut inside = true;
    let mut nearest: Option<(Number, Point, Point)> = None;

    for edge in polygon.edges() {
        let offset = center - edge.start;
        if dot(offset, edge.normal) > Number::ZERO {
            inside = false;
        }
        let along = dot(offset, edge.direction).max(Number::ZERO).min(edge.length);
        let closest = edge.start + edge.direction * along;
        let distance = length(center - closest);
        let replace = match nearest {
            Some((best, _, _)) => distance < best,
            None => true,
        };
        if replace {
            nearest = Some((distance, closest, edge.normal));
        }
    }

    let (distance, closest, edge_normal) = nearest?;
    if !inside && distance >= radius {
        return None;
    }

    let away = center - closest;
    if inside || away == Point::ZERO {
        return Some(edge_normal);
    }
    Some(normalized(away))
}

/// Continuous collision of a moving disc against a convex polygon.
///
/// The disc starts at `position` and moves by `velocity` during the step.
/// Returns the earliest contact, combining the edge faces pushed out by
/// `radius` with the rounded corners around each vertex. A disc that already
/// overlaps reports fraction zero; a disc that does not move and does not
/// overlap reports nothing.
#[must_use]
pub fn swept_circle_vs_polygon(
    polygon: &Polygon,
    position: Point,
    velocity: Point,
    radius: Number,
) -> Option<SweptHit> {
    if let Some(normal) = circle_overlap(polygon, position, radius) {
        return Some(SweptHit {
            fraction: Number::ZERO,
            normal,
        });
    }

    let travel = length(velocity);
    if travel.is_zero() {
        return None;
    }
    let heading = velocity / travel;

    let mut earliest: Option<(Number, Point)> = None;
    let mut consider = |distance: Number, normal: Point| {
        if distance < Number::ZERO || distance > travel {
            return;
        }
        let replace = match earliest {
            Some((best, _)) => distance < best,
            None => true,
        };
        if replace {
            earliest = Some((distance, normal));
        }
    };

    for edge in polygon.edges() {
        let approach = dot(heading, edge.normal);
        if approach >= Number::ZERO {
            continue;
        }
        let clearance = dot(position - edge.start, edge.normal) - radius;
        if clearance < Number::ZERO || clearance > travel * -approach {
            continue;
        }
        let distance = clearance / -approach;
        let contact = position + heading * distance;
        let along = dot(contact - edge.start, edge.direction);
        if along >= Number::ZERO && along <= edge.length {
            consider(distance, edge.normal);
        }
    }

    if !radius.is_zero() {
        for vertex in polygon.vertices() {
            let offset = position - *vertex;
            let half_b = dot(offset, heading);
            let c = dot(offset, offset) - radius * radius;
            let discriminant = half_b * half_b - c;
            if discriminant < Number::ZERO {
                continue;
            }
            let distance = -half_b - discriminant.sqrt();
            let contact = position + heading * distance;
            let normal = normalized(contact - *vertex);
            consider(distance, normal);
        }
    }

    let (distance, normal) = earliest?;
    Some(SweptHit {
        fraction: (distance / travel).min(Number::ONE),
        normal,
    })
}

/// Minimal displacement that clears every penetration at once.
///
/// Each collision demands that the displacement `d` satisfies
/// `dot(d, normal) >= depth`; the body is then moved by `-d`. The optimum of
/// this two-dimensional problem has at most two active constraints, so every
/// single-constraint projection and every pairwise boundary intersection is
/// tried and the shortest feasible one wins. Returns `None` when no candidate
/// satisfies all constraints, for example when two normals oppose each other.
#[must_use]
pub fn resolve_displacement(collisions: &[Collision]) -> Option<Point> {
    if collisions.is_empty() {
        return Some(Point::ZERO);
    }

    let mut best: Option<(Number, Point)> = None;
    let mut consider = |candidate: Point| {
        let feasible = collisions
            .iter()
            .all(|collision| dot(candidate, collision.normal) >= collision.depth - FEASIBILITY_SLACK);
        if !feasible {
            return;
        }
        let size = length(candidate);
        let replace = match best {
            Some((current, _)) => size < current,
            None => true,
        };
        if replace {
            best = Some((size, candidate));
        }
    };

    for collision in collisions {
        consider(collision.normal * collision.depth);
    }

    for (index, first) in collisions.iter().enumerate() {
        for second in &collisions[index + 1..] {
            let determinant = cross(first.normal, second.normal);
            if determinant.abs() < PARALLEL_LIMIT {
                continue;
            }
            let x = (first.depth * second.normal.y - second.depth * first.normal.y) / determinant;
            let y = (first.normal.x * second.depth - second.normal.x * first.depth) / determinant;
            consider(Point::new(x, y));
        }
    }

    best.map(|(_, displacement)| displacement)
}

/// Smallest same-signed turn, at most `max_turn`, that clears every penetration.
///
/// Turning by a small angle `t` moves a contact point `p` by roughly
/// `t * perpendicular(p - center)`, which changes the penetration along the
/// contact normal by `t * cross(p - center, normal)`. Every constraint must
/// call for the same turning sense. On success the rotated, not yet
/// normalized, direction is returned.
#[must_use]
pub fn resolve_rotation(
    collisions: &[Collision],
    center: Point,
    direction: Point,
    max_turn: Number,
) -> Option<Point> {
    let mut sense = 0;
    let mut turn = Number::ZERO;

    for collision in collisions {
        let lever = cross(collision.position - center, collision.normal);
        if lever.is_zero() {
            return None;
        }
        let required_sense = -lever.signum();
        if sense != 0 && sense != required_sense {
            return None;
        }
        sense = required_sense;
        turn = turn.max(collision.depth / lever.abs());
    }

    if sense == 0 || turn > max_turn {
        return None;
    }

    Some(rotate(direction, Point::new(Number::ONE, turn * sense)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(numerator: i32, denominator: i32) -> Number {
        Number::from_ratio(numerator, denominator)
    }

    fn square(left: i32, top: i32, size: i32) -> Polygon {
        Polygon::rectangle(
            Number::from_int(left),
            Number::from_int(top),
            Number::from_int(left + size),
            Number::from_int(top + size),
        )
    }

    #[test]
    fn separated_polygons_do_not_collide() {
        assert!(polygon_collision(&square(0, 0, 1), &square(2, 0, 1)).is_none());
    }

    #[test]
    fn touching_polygons_do_not_collide() {
        assert!(polygon_collision(&square(0, 0, 1), &square(1, 0, 1)).is_none());
    }

    #[test]
    fn overlap_reports_least_penetration_axis() {
        let first = square(0, 0, 1);
        let second = Polygon::rectangle(n(3, 4), n(-1, 1), n(3, 1), n(2, 1));
        let collision = polygon_collision(&first, &second).expect("overlap");
        assert_eq!(collision.depth, n(1, 4));
        assert_eq!(collision.normal, Point::from_ints(1, 0));
    }

    #[test]
    fn swapping_arguments_flips_normal() {
        let first = square(0, 0, 2);
        let second = Polygon::rotated_rectangle(
            Point::new(n(5, 2), Number::ONE),
            normalized(Point::from_ints(3, 4)),
            n(1, 2),
            Number::ONE,
        );
        let forward = polygon_collision(&first, &second).expect("overlap");
        let backward = polygon_collision(&second, &first).expect("overlap");
        assert_eq!(forward.depth, backward.depth);
        assert_eq!(forward.normal, -backward.normal);
    }

    #[test]
    fn concentric_squares_still_have_opposite_normals() {
        let outer = square(0, 0, 2);
        let inner = Polygon::rectangle(n(1, 2), n(1, 2), n(3, 2), n(3, 2));
        let forward = polygon_collision(&outer, &inner).expect("overlap");
        let backward = polygon_collision(&inner, &outer).expect("overlap");
        assert_eq!(forward.depth, backward.depth);
        assert_eq!(forward.normal, -backward.normal);
    }

    #[test]
    fn stationary_overlapping_disc_reports_zero_fraction() {
        let wall = square(0, 0, 1);
        let hit = swept_circle_vs_polygon(&wall, Point::new(n(21, 20), n(1, 2)), Point::ZERO, n(1, 10))
            .expect("overlap");
        assert_eq!(hit.fraction, Number::ZERO);
        assert_eq!(hit.normal, Point::from_ints(1, 0));
    }

    #[test]
    fn stationary_clear_disc_reports_nothing() {
        let wall = square(0, 0, 1);
        let position = Point::new(n(3, 2), n(1, 2));
        assert!(swept_circle_vs_polygon(&wall, position, Point::ZERO, n(1, 10)).is_none());
    }

    #[test]
    fn swept_disc_hits_face() {
        let wall = square(1, 0, 1);
        let position = Point::new(Number::ZERO, n(1, 2));
        let hit = swept_circle_vs_polygon(&wall, position, Point::from_ints(2, 0), n(1, 4))
            .expect("hit");
        assert_eq!(hit.fraction, n(3, 8));
        assert_eq!(hit.normal, Point::from_ints(-1, 0));
    }

    #[test]
    fn swept_disc_hits_corner() {
        let wall = square(1, 1, 1);
        let position = Point::new(Number::ZERO, n(1, 2));
        let hit = swept_circle_vs_polygon(&wall, position, Point::from_ints(2, 0), n(1, 2))
            .expect("hit");
        assert_eq!(hit.fraction, n(1, 2));
        assert_eq!(hit.normal, Point::from_ints(0, -1));
    }

    #[test]
    fn fast_disc_cannot_tunnel_through_thin_wall() {
        let wall = Polygon::rectangle(n(19, 20), Number::ZERO, n(21, 20), Number::ONE);
        let position = Point::new(Number::ZERO, n(1, 2));
        let hit = swept_circle_vs_polygon(&wall, position, Point::from_ints(10, 0), n(1, 100))
            .expect("hit");
        assert!(hit.fraction < n(1, 10));
    }

    #[test]
    fn displacement_for_single_constraint_is_projection() {
        let collision = Collision {
            position: Point::ZERO,
            normal: Point::from_ints(1, 0),
            depth: n(1, 10),
        };
        assert_eq!(
            resolve_displacement(&[collision]),
            Some(Point::new(n(1, 10), Number::ZERO))
        );
    }

    #[test]
    fn displacement_satisfies_corner_constraints_jointly() {
        let right = Collision {
            position: Point::ZERO,
            normal: Point::from_ints(1, 0),
            depth: n(1, 10),
        };
        let down = Collision {
            position: Point::ZERO,
            normal: Point::from_ints(0, 1),
            depth: n(1, 20),
        };
        assert_eq!(
            resolve_displacement(&[right, down]),
            Some(Point::new(n(1, 10), n(1, 20)))
        );
    }

    #[test]
    fn opposing_constraints_cannot_be_resolved() {
        let right = Collision {
            position: Point::ZERO,
            normal: Point::from_ints(1, 0),
            depth: n(1, 10),
        };
        let left = Collision {
            position: Point::ZERO,
            normal: Point::from_ints(-1, 0),
            depth: n(1, 10),
        };
        assert_eq!(resolve_displacement(&[right, left]), None);
    }

    #[test]
    fn rotation_turns_away_from_contact() {
        let contact = Collision {
            position: Point::new(n(1, 4), n(1, 10)),
            normal: Point::from_ints(1, 0),
            depth: n(1, 100),
        };
        let direction = Point::from_ints(1, 0);
        let rotated = resolve_rotation(&[contact], Point::ZERO, direction, n(1, 5)).expect("turns");
        assert_eq!(rotated.x, Number::ONE);
        assert!(rotated.y > Number::ZERO);
    }

    #[test]
    fn rotation_rejects_conflicting_contacts() {
        let upper = Collision {
            position: Point::new(n(1, 4), n(1, 10)),
            normal: Point::from_ints(1, 0),
            depth: n(1, 100),
        };
        let lower = Collision {
            position: Point::new(n(1, 4), n(-1, 10)),
            normal: Point::from_ints(1, 0),
            depth: n(1, 100),
        };
        let direction = Point::from_ints(1, 0);
        assert_eq!(
            resolve_rotation(&[upper, lower], Point::ZERO, direction, n(1, 5)),
            None
        );
    }

    #[test]
    fn rotation_respects_turn_limit() {
        let contact = Collision {
            position: Point::new(n(1, 4), n(1, 10)),
            normal: Point::from_ints(1, 0),
            depth: n(1, 2),
        };
        let direction = Point::from_ints(1, 0);
        assert_eq!(
            resolve_rotation(&[contact], Point::ZERO, direction, n(1, 20)),
            None
        );
    }
}
