use maze_tanks_core::{Maze, Number, Point};
use maze_tanks_system_collision::Polygon;

use crate::WALL_WIDTH;

/// Wall rectangles that can touch a body centred in cell `(column, row)`.
///
/// Covers the four borders of the cell together with every wall segment that
/// meets them at a corner. Collinear segments are merged into one rectangle, so
/// a body sliding along a straight wall never catches on a seam. Slots outside
/// the maze count as walls.
#[must_use]
pub fn wall_polygons(maze: &Maze, column: i32, row: i32) -> Vec<Polygon> {
    let mut polygons = Vec::with_capacity(8);

    for line in [row, row + 1] {
        for (start, end) in runs(column - 1, column + 1, |x| maze.has_hwall_below(x, line - 1)) {
            polygons.push(Polygon::rectangle(
                Number::from_int(start) - WALL_WIDTH,
                Number::from_int(line) - WALL_WIDTH,
                Number::from_int(end) + WALL_WIDTH,
                Number::from_int(line) + WALL_WIDTH,
            ));
        }
    }

    for line in [column, column + 1] {
        for (start, end) in runs(row - 1, row + 1, |y| maze.has_vwall_right(line - 1, y)) {
            polygons.push(Polygon::rectangle(
                Number::from_int(line) - WALL_WIDTH,
                Number::from_int(start) - WALL_WIDTH,
                Number::from_int(line) + WALL_WIDTH,
                Number::from_int(end) + WALL_WIDTH,
            ));
        }
    }

    polygons
}

/// [`wall_polygons`] for the cell containing `point`, clamped to the maze.
#[must_use]
pub fn wall_polygons_at(maze: &Maze, point: Point) -> Vec<Polygon> {
    let column = point.x.floor().clamp(0, maze.width() as i32 - 1);
    let row = point.y.floor().clamp(0, maze.height() as i32 - 1);
    wall_polygons(maze, column, row)
}

/// Maximal runs of present unit segments in `first..=last`, as `(start, end)` coordinates.
fn runs<F>(first: i32, last: i32, present: F) -> Vec<(i32, i32)>
where
    F: Fn(i32) -> bool,
{
    let mut runs = Vec::new();
    let mut open: Option<i32> = None;
    for index in first..=last {
        match (present(index), open) {
            (true, None) => open = Some(index),
            (false, Some(start)) => {
                runs.push((start, index));
                open = None;
            }
            _ => {}
        }
    }
    if let Some(start) = open {
        runs.push((start, last + 1));
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walled_cell_has_one_rectangle_per_border_line() {
        let maze = Maze::walled(3, 3);
        let polygons = wall_polygons(&maze, 1, 1);
        assert_eq!(polygons.len(), 4);
        let top = Polygon::rectangle(
            Number::from_int(0) - WALL_WIDTH,
            Number::from_int(1) - WALL_WIDTH,
            Number::from_int(3) + WALL_WIDTH,
            Number::from_int(1) + WALL_WIDTH,
        );
        assert!(polygons.contains(&top));
    }

    #[test]
    fn open_interior_cell_has_no_walls() {
        let maze = Maze::open(5, 5);
        assert!(wall_polygons(&maze, 2, 2).is_empty());
    }

    #[test]
    fn corner_stub_is_included() {
        let mut maze = Maze::open(5, 5);
        maze.set_vertical_wall(2, 0, true);
        let polygons = wall_polygons(&maze, 2, 1);
        assert_eq!(polygons.len(), 1);
        let stub = Polygon::rectangle(
            Number::from_int(3) - WALL_WIDTH,
            Number::from_int(0) - WALL_WIDTH,
            Number::from_int(3) + WALL_WIDTH,
            Number::from_int(1) + WALL_WIDTH,
        );
        assert_eq!(polygons[0], stub);
    }

    #[test]
    fn runs_split_on_gaps() {
        assert_eq!(runs(0, 4, |x| x != 2), vec![(0, 2), (3, 5)]);
        assert_eq!(runs(-1, 1, |_| false), Vec::<(i32, i32)>::new());
    }

    #[test]
    fn lookup_clamps_points_outside_the_maze() {
        let maze = Maze::walled(2, 2);
        let outside = Point::new(Number::from_int(-3), Number::from_int(9));
        assert_eq!(wall_polygons_at(&maze, outside), wall_polygons(&maze, 0, 1));
    }
}
