//! One grid cell of the town

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::core::event::Event;
use crate::core::types::TileCoord;

/// Depth of a hierarchical address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AddressLevel {
    World,
    Sector,
    Arena,
    GameObject,
}

/// A tile of the maze
///
/// Identity (equality and hashing) is the coordinate; the address fields are
/// fixed at load time and only `events` changes while the simulation runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    pub coord: TileCoord,
    pub world: String,
    pub sector: String,
    pub arena: String,
    pub game_object: String,
    pub spawning_location: String,
    pub collision: bool,
    /// Subject name -> what that subject is doing on this tile
    pub events: BTreeMap<String, Event>,
}

impl Tile {
    pub fn is_walkable(&self) -> bool {
        !self.collision
    }

    /// Hierarchical address down to `level`, or None when that level is empty
    pub fn address(&self, level: AddressLevel) -> Option<String> {
        let parts: &[&str] = match level {
            AddressLevel::World => &[&self.world],
            AddressLevel::Sector => &[&self.world, &self.sector],
            AddressLevel::Arena => &[&self.world, &self.sector, &self.arena],
            AddressLevel::GameObject => &[&self.world, &self.sector, &self.arena, &self.game_object],
        };
        if parts.iter().any(|p| p.is_empty()) {
            return None;
        }
        Some(parts.join(":"))
    }

    /// Deepest non-empty address of this tile
    pub fn full_address(&self) -> String {
        [
            AddressLevel::GameObject,
            AddressLevel::Arena,
            AddressLevel::Sector,
            AddressLevel::World,
        ]
        .into_iter()
        .find_map(|level| self.address(level))
        .unwrap_or_default()
    }

    /// Every address this tile is indexed under
    pub fn index_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = [
            AddressLevel::World,
            AddressLevel::Sector,
            AddressLevel::Arena,
            AddressLevel::GameObject,
        ]
        .into_iter()
        .filter_map(|level| self.address(level))
        .collect();
        if !self.spawning_location.is_empty() {
            keys.push(format!("<spawn_loc>{}", self.spawning_location));
        }
        keys
    }

    /// Events on this tile that belong to agents other than `me`
    pub fn occupied_by_other(&self, me: &str) -> bool {
        self.events
            .values()
            .any(|e| e.subject_is_agent() && e.subject != me)
    }
}

impl PartialEq for Tile {
    fn eq(&self, other: &Self) -> bool {
        self.coord == other.coord
    }
}

impl Eq for Tile {}

impl Hash for Tile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.coord.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile() -> Tile {
        Tile {
            coord: TileCoord::new(3, 4),
            world: "the Ville".into(),
            sector: "Hobbs Cafe".into(),
            arena: "cafe".into(),
            game_object: String::new(),
            spawning_location: String::new(),
            collision: false,
            events: BTreeMap::new(),
        }
    }

    #[test]
    fn test_address_levels() {
        let t = tile();
        assert_eq!(t.address(AddressLevel::Sector).as_deref(), Some("the Ville:Hobbs Cafe"));
        assert_eq!(t.address(AddressLevel::GameObject), None);
        assert_eq!(t.full_address(), "the Ville:Hobbs Cafe:cafe");
        assert_eq!(t.index_keys().len(), 3);
    }

    #[test]
    fn test_identity_is_coordinate() {
        let a = tile();
        let mut b = tile();
        b.arena = "kitchen".into();
        assert_eq!(a, b);
    }

    #[test]
    fn test_occupied_by_other() {
        let mut t = tile();
        t.events.insert("Klaus".into(), Event::new("Klaus", "is", "reading", "reading"));
        assert!(t.occupied_by_other("Maria"));
        assert!(!t.occupied_by_other("Klaus"));
    }
}
