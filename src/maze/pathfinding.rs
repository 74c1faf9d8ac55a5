//! A* pathfinding over the tile grid
//!
//! 4-directional movement, uniform edge cost 1, Manhattan heuristic.
//! Returned paths never include the start tile: `path[0]` is the first step
//! and `path.last()` is the goal. An empty path means "stay put", either
//! because start == goal or because the goal is unreachable.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::core::types::TileCoord;

/// Node in the A* open set
#[derive(Debug, Clone, PartialEq, Eq)]
struct PathNode {
    coord: TileCoord,
    f_cost: usize, // g_cost + heuristic
    g_cost: usize,
}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; prefer deeper nodes on ties, then coordinates
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| self.g_cost.cmp(&other.g_cost))
            .then_with(|| other.coord.cmp(&self.coord))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find a shortest walkable path from `start` to `goal`
///
/// `walkable` answers whether a coordinate is inside the grid and passable.
pub fn find_path<F>(start: TileCoord, goal: TileCoord, walkable: F) -> Vec<TileCoord>
where
    F: Fn(TileCoord) -> bool,
{
    if start == goal || !walkable(goal) {
        return Vec::new();
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: HashMap<TileCoord, TileCoord> = HashMap::new();
    let mut g_scores: HashMap<TileCoord, usize> = HashMap::new();

    g_scores.insert(start, 0);
    open_set.push(PathNode {
        coord: start,
        f_cost: start.manhattan(&goal),
        g_cost: 0,
    });

    while let Some(current) = open_set.pop() {
        if current.coord == goal {
            return reconstruct_path(&came_from, start, current.coord);
        }

        let current_g = g_scores.get(&current.coord).copied().unwrap_or(usize::MAX);
        // Stale heap entry
        if current.g_cost > current_g {
            continue;
        }

        for neighbor in current.coord.neighbors() {
            if !walkable(neighbor) {
                continue;
            }

            let tentative_g = current_g + 1;
            let neighbor_g = g_scores.get(&neighbor).copied().unwrap_or(usize::MAX);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.coord);
                g_scores.insert(neighbor, tentative_g);
                open_set.push(PathNode {
                    coord: neighbor,
                    f_cost: tentative_g + neighbor.manhattan(&goal),
                    g_cost: tentative_g,
                });
            }
        }
    }

    Vec::new() // No path found
}

/// Reconstruct path from came_from map, dropping the start tile
fn reconstruct_path(
    came_from: &HashMap<TileCoord, TileCoord>,
    start: TileCoord,
    mut current: TileCoord,
) -> Vec<TileCoord> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        if prev == start {
            break;
        }
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}
