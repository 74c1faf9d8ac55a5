//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Grid position of a tile (column, row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: usize,
    pub y: usize,
}

impl TileCoord {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    pub fn euclidean(&self, other: &Self) -> f32 {
        let dx = self.x as f32 - other.x as f32;
        let dy = self.y as f32 - other.y as f32;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn manhattan(&self, other: &Self) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    pub fn chebyshev(&self, other: &Self) -> usize {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// 4-directional neighbours that do not underflow. Upper bounds are
    /// checked by the maze.
    pub fn neighbors(&self) -> impl Iterator<Item = TileCoord> + '_ {
        let deltas: [(isize, isize); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
        deltas.into_iter().filter_map(move |(dx, dy)| {
            let x = self.x.checked_add_signed(dx)?;
            let y = self.y.checked_add_signed(dy)?;
            Some(TileCoord::new(x, y))
        })
    }
}

impl From<(usize, usize)> for TileCoord {
    fn from((x, y): (usize, usize)) -> Self {
        Self::new(x, y)
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Identifier of a memory node inside one agent's partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemoryId(pub u64);

impl std::fmt::Display for MemoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

/// Identifier shared by both participants of one conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub Uuid);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distances() {
        let a = TileCoord::new(1, 1);
        let b = TileCoord::new(4, 5);
        assert_eq!(a.manhattan(&b), 7);
        assert_eq!(a.chebyshev(&b), 4);
        assert!((a.euclidean(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_neighbors_at_origin_skip_negative() {
        let origin = TileCoord::new(0, 0);
        let n: Vec<_> = origin.neighbors().collect();
        assert_eq!(n.len(), 2);
        assert!(n.contains(&TileCoord::new(1, 0)));
        assert!(n.contains(&TileCoord::new(0, 1)));
    }

    #[test]
    fn test_memory_id_display() {
        assert_eq!(MemoryId(7).to_string(), "node_7");
    }
}
