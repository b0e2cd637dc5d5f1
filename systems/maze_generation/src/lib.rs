#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic maze layout generation.
//!
//! The only source of randomness is the generator handed in by the caller, so
//! a seeded generator always reproduces the same maze.

use maze_tanks_core::{Maze, MazeGeneration};
use rand::Rng;

/// Builds a `width` x `height` maze using the requested algorithm.
///
/// # Panics
///
/// Panics when either dimension is zero.
pub fn generate<R>(generation: MazeGeneration, width: u32, height: u32, rng: &mut R) -> Maze
where
    R: Rng + ?Sized,
{
    match generation {
        MazeGeneration::Empty => Maze::open(width, height),
        MazeGeneration::ExpandTree => expand_tree(width, height, rng),
    }
}

/// Random-walk spanning tree followed by a batch of extra openings.
///
/// The walk starts at a random cell and repeatedly steps to a random
/// neighbour, opening the wall whenever it enters a cell for the first time.
/// Once every cell has been visited the maze is a perfect maze; removing
/// further walls afterwards only adds loops and never disconnects it.
fn expand_tree<R>(width: u32, height: u32, rng: &mut R) -> Maze
where
    R: Rng + ?Sized,
{
    let mut maze = Maze::walled(width, height);
    let (w, h) = (width as i32, height as i32);

    let mut visited = vec![vec![false; height as usize]; width as usize];
    let mut x = rng.gen_range(0..w);
    let mut y = rng.gen_range(0..h);
    visited[x as usize][y as usize] = true;
    let mut unvisited = width * height - 1;

    while unvisited > 0 {
        let first: i32 = rng.gen_range(0..2);
        let second: i32 = rng.gen_range(0..2);
        let dx = first + second - 1;
        let dy = first - second;

        let (next_x, next_y) = (x + dx, y + dy);
        if next_x < 0 || next_x >= w || next_y < 0 || next_y >= h {
            continue;
        }

        if !visited[next_x as usize][next_y as usize] {
            unvisited -= 1;
            if dx != 0 {
                let left = if dx < 0 { next_x } else { x };
                maze.set_vertical_wall(left as u32, y as u32, false);
            } else {
                let upper = if dy < 0 { next_y } else { y };
                maze.set_horizontal_wall(x as u32, upper as u32, false);
            }
        }
        visited[next_x as usize][next_y as usize] = true;
        x = next_x;
        y = next_y;
    }

    let perimeter = width + height;
    let openings = rng.gen_range(perimeter / 2..perimeter * 3 / 2);
    for _ in 0..openings {
        if rng.gen_range(0..2) == 1 {
            if height > 1 {
                let column = rng.gen_range(0..width);
                let row = rng.gen_range(0..height - 1);
                maze.set_horizontal_wall(column, row, false);
            }
        } else if width > 1 {
            let column = rng.gen_range(0..width - 1);
            let row = rng.gen_range(0..height);
            maze.set_vertical_wall(column, row, false);
        }
    }

    maze
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn empty_generation_has_no_interior_walls() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let maze = generate(MazeGeneration::Empty, 4, 3, &mut rng);
        assert_eq!((maze.width(), maze.height()), (4, 3));
        assert!(maze
            .horizontal_walls()
            .iter()
            .flatten()
            .chain(maze.vertical_walls().iter().flatten())
            .all(|wall| !wall));
    }

    #[test]
    fn same_seed_reproduces_maze() {
        let mut first_rng = ChaCha8Rng::seed_from_u64(0x5eed);
        let mut second_rng = ChaCha8Rng::seed_from_u64(0x5eed);
        let first = generate(MazeGeneration::ExpandTree, 9, 7, &mut first_rng);
        let second = generate(MazeGeneration::ExpandTree, 9, 7, &mut second_rng);
        assert_eq!(first, second);
    }

    #[test]
    fn single_cell_maze_is_trivially_generated() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let maze = generate(MazeGeneration::ExpandTree, 1, 1, &mut rng);
        assert_eq!((maze.width(), maze.height()), (1, 1));
    }

    #[test]
    fn boundary_stays_closed() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let maze = generate(MazeGeneration::ExpandTree, 6, 5, &mut rng);
        for x in 0..6 {
            assert!(maze.has_hwall_below(x, -1));
            assert!(maze.has_hwall_below(x, 4));
        }
        for y in 0..5 {
            assert!(maze.has_vwall_right(-1, y));
            assert!(maze.has_vwall_right(5, y));
        }
    }
}
