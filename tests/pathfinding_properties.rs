//! Property tests for tile pathfinding on randomly walled grids

use std::collections::VecDeque;

use proptest::prelude::*;

use hamlet::agent::execute::meeting_half;
use hamlet::core::types::TileCoord;
use hamlet::maze::{Maze, MazeDefinition, Rect};

const SIZE: usize = 8;

fn walled_maze(walls: &[(usize, usize)]) -> Maze {
    let mut def = MazeDefinition::blank("grid", SIZE, SIZE);
    for &(x, y) in walls {
        def.block(Rect::new(x, y, 1, 1));
    }
    Maze::from_definition(&def).unwrap()
}

/// Breadth-first distance, used as the reference for path length
fn bfs_distance(maze: &Maze, start: TileCoord, goal: TileCoord) -> Option<usize> {
    let mut seen = vec![false; SIZE * SIZE];
    let mut queue = VecDeque::from([(start, 0)]);
    seen[start.y * SIZE + start.x] = true;
    while let Some((tile, dist)) = queue.pop_front() {
        if tile == goal {
            return Some(dist);
        }
        for next in tile.neighbors().filter(|n| maze.is_walkable(*n)) {
            if !seen[next.y * SIZE + next.x] {
                seen[next.y * SIZE + next.x] = true;
                queue.push_back((next, dist + 1));
            }
        }
    }
    None
}

fn coord() -> impl Strategy<Value = TileCoord> {
    (0..SIZE, 0..SIZE).prop_map(|(x, y)| TileCoord::new(x, y))
}

fn walls() -> impl Strategy<Value = Vec<(usize, usize)>> {
    proptest::collection::vec((0..SIZE, 0..SIZE), 0..24)
}

proptest! {
    #[test]
    fn prop_path_to_self_is_empty(walls in walls(), tile in coord()) {
        let maze = walled_maze(&walls);
        prop_assert!(maze.find_path(tile, tile).is_empty());
    }

    #[test]
    fn prop_paths_are_shortest_and_walkable(walls in walls(), start in coord(), goal in coord()) {
        let maze = walled_maze(&walls);
        prop_assume!(maze.is_walkable(start) && start != goal);

        let path = maze.find_path(start, goal);
        match bfs_distance(&maze, start, goal) {
            None => prop_assert!(path.is_empty()),
            Some(distance) => {
                prop_assert_eq!(path.len(), distance);
                prop_assert_eq!(path.last().copied(), Some(goal));
                let mut previous = start;
                for step in &path {
                    prop_assert_eq!(previous.manhattan(step), 1);
                    prop_assert!(maze.is_walkable(*step));
                    previous = *step;
                }
            }
        }
    }

    #[test]
    fn prop_meeting_half_stops_short_of_the_partner(walls in walls(), start in coord(), goal in coord()) {
        let maze = walled_maze(&walls);
        prop_assume!(maze.is_walkable(start));

        let path = maze.find_path(start, goal);
        let half = meeting_half(&path);
        prop_assert!(half.len() <= path.len());
        prop_assert_eq!(&path[..half.len()], &half[..]);
        if path.len() > 1 {
            prop_assert!(!half.contains(&goal));
        }
    }
}
