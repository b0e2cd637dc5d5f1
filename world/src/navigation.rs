//! All-pairs breadth-first route table over the open passages of a maze.

use std::collections::VecDeque;

use maze_tanks_core::{CellCoord, Maze};

/// One step of a shortest route between two cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Route {
    dx: i8,
    dy: i8,
    distance: u32,
}

impl Route {
    const START: Self = Self {
        dx: 0,
        dy: 0,
        distance: 0,
    };

    /// Column offset of the next cell on the route, in `-1..=1`.
    #[must_use]
    pub const fn dx(&self) -> i8 {
        self.dx
    }

    /// Row offset of the next cell on the route, in `-1..=1`.
    #[must_use]
    pub const fn dy(&self) -> i8 {
        self.dy
    }

    /// Number of cell-to-cell moves left before the destination.
    #[must_use]
    pub const fn distance(&self) -> u32 {
        self.distance
    }

    /// Cell reached by following one step of the route from `start`.
    #[must_use]
    pub fn next_cell(&self, start: CellCoord) -> CellCoord {
        CellCoord::new(
            start.column().wrapping_add_signed(i32::from(self.dx)),
            start.row().wrapping_add_signed(i32::from(self.dy)),
        )
    }
}

/// Shortest routes between every ordered pair of cells of one maze.
///
/// Built once per round by running a breadth-first search rooted at every
/// destination cell, so lookups never search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MazeMap {
    width: u32,
    height: u32,
    routes: Vec<Option<Route>>,
}

impl MazeMap {
    /// Computes the route table for `maze`.
    #[must_use]
    pub fn new(maze: &Maze) -> Self {
        let width = maze.width();
        let height = maze.height();
        let cells = (width * height) as usize;
        let mut routes = vec![None; cells * cells];
        for row in 0..height {
            for column in 0..width {
                let end = CellCoord::new(column, row);
                let offset = cell_index(width, end) * cells;
                search_from(maze, end, &mut routes[offset..offset + cells]);
            }
        }
        Self {
            width,
            height,
            routes,
        }
    }

    /// Route from `start` toward `end`, or `None` when either cell lies
    /// outside the maze or `end` cannot be reached.
    #[must_use]
    pub fn route(&self, start: CellCoord, end: CellCoord) -> Option<Route> {
        if !self.contains(start) || !self.contains(end) {
            return None;
        }
        let cells = (self.width * self.height) as usize;
        self.routes[cell_index(self.width, end) * cells + cell_index(self.width, start)]
    }

    /// Hop distance from `start` to `end`, if reachable.
    #[must_use]
    pub fn distance(&self, start: CellCoord, end: CellCoord) -> Option<u32> {
        self.route(start, end).map(|route| route.distance())
    }

    /// Maze dimensions as `(width, height)`.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.width && cell.row() < self.height
    }
}

fn cell_index(width: u32, cell: CellCoord) -> usize {
    (cell.row() * width + cell.column()) as usize
}

fn search_from(maze: &Maze, end: CellCoord, routes: &mut [Option<Route>]) {
    let width = maze.width();
    routes[cell_index(width, end)] = Some(Route::START);
    let mut queue = VecDeque::from([end]);

    while let Some(cell) = queue.pop_front() {
        let Some(current) = routes[cell_index(width, cell)] else {
            continue;
        };
        let (x, y) = (cell.column() as i32, cell.row() as i32);
        let moves = [
            (!maze.has_hwall_below(x, y), 0, 1),
            (!maze.has_hwall_below(x, y - 1), 0, -1),
            (!maze.has_vwall_right(x, y), 1, 0),
            (!maze.has_vwall_right(x - 1, y), -1, 0),
        ];
        for (open, dx, dy) in moves {
            if !open {
                continue;
            }
            let neighbor = CellCoord::new((x + dx) as u32, (y + dy) as u32);
            let slot = &mut routes[cell_index(width, neighbor)];
            if slot.is_some() {
                continue;
            }
            *slot = Some(Route {
                dx: -dx as i8,
                dy: -dy as i8,
                distance: current.distance + 1,
            });
            queue.push_back(neighbor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_in_open_maze_follow_manhattan_distance() {
        let maze = Maze::open(4, 3);
        let map = MazeMap::new(&maze);
        let start = CellCoord::new(0, 0);
        let end = CellCoord::new(3, 2);
        assert_eq!(map.distance(start, end), Some(5));
        assert_eq!(map.distance(end, start), Some(5));
        assert_eq!(map.route(end, end), Some(Route::START));
    }

    #[test]
    fn following_routes_reaches_destination() {
        let mut maze = Maze::walled(3, 3);
        for column in 0..2 {
            maze.set_vertical_wall(column, 0, false);
            maze.set_vertical_wall(column, 2, false);
        }
        maze.set_horizontal_wall(2, 0, false);
        maze.set_horizontal_wall(2, 1, false);
        maze.set_vertical_wall(0, 1, false);
        maze.set_horizontal_wall(0, 1, false);

        let map = MazeMap::new(&maze);
        let end = CellCoord::new(1, 1);
        let mut cell = CellCoord::new(0, 0);
        let mut hops = 0;
        while cell != end {
            let route = map.route(cell, end).expect("reachable");
            cell = route.next_cell(cell);
            hops += 1;
            assert!(hops <= 9, "route does not converge");
        }
        assert_eq!(map.distance(CellCoord::new(0, 0), end), Some(hops));
    }

    #[test]
    fn sealed_cells_and_out_of_range_queries_have_no_route() {
        let maze = Maze::walled(2, 2);
        let map = MazeMap::new(&maze);
        assert_eq!(map.route(CellCoord::new(0, 0), CellCoord::new(1, 1)), None);
        assert_eq!(map.route(CellCoord::new(5, 0), CellCoord::new(0, 0)), None);
        assert_eq!(map.distance(CellCoord::new(1, 1), CellCoord::new(1, 1)), Some(0));
    }
}
