//! Spatial memory: the places an agent has seen
//!
//! Mirrors the maze hierarchy (world > sector > arena > game object) but only
//! holds what the agent has been near. Queries about unknown branches answer
//! with nothing rather than failing.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::maze::address::components;
use crate::maze::Tile;

type Arenas = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpatialMemory {
    tree: BTreeMap<String, BTreeMap<String, Arenas>>,
}

impl SpatialMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tile's address chain
    pub fn add(&mut self, tile: &Tile) {
        if tile.world.is_empty() {
            return;
        }
        let sectors = self.tree.entry(tile.world.clone()).or_default();
        if tile.sector.is_empty() {
            return;
        }
        let arenas = sectors.entry(tile.sector.clone()).or_default();
        if tile.arena.is_empty() {
            return;
        }
        let objects = arenas.entry(tile.arena.clone()).or_default();
        if !tile.game_object.is_empty() {
            objects.insert(tile.game_object.clone());
        }
    }

    pub fn knows(&self, address: &str) -> bool {
        let parts = components(address);
        match parts.as_slice() {
            [w] => self.tree.contains_key(*w),
            [w, s] => self.tree.get(*w).is_some_and(|x| x.contains_key(*s)),
            [w, s, a] => self
                .tree
                .get(*w)
                .and_then(|x| x.get(*s))
                .is_some_and(|x| x.contains_key(*a)),
            [w, s, a, o] => self
                .tree
                .get(*w)
                .and_then(|x| x.get(*s))
                .and_then(|x| x.get(*a))
                .is_some_and(|x| x.contains(*o)),
            _ => false,
        }
    }

    /// Sectors known in `world`
    pub fn sectors(&self, world: &str) -> Vec<String> {
        self.tree
            .get(world)
            .map(|s| s.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Arenas known under a `world:sector` address
    pub fn arenas(&self, sector_address: &str) -> Vec<String> {
        match components(sector_address).as_slice() {
            [w, s, ..] => self
                .tree
                .get(*w)
                .and_then(|x| x.get(*s))
                .map(|a| a.keys().cloned().collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Game objects known under a `world:sector:arena` address
    pub fn game_objects(&self, arena_address: &str) -> Vec<String> {
        match components(arena_address).as_slice() {
            [w, s, a, ..] => self
                .tree
                .get(*w)
                .and_then(|x| x.get(*s))
                .and_then(|x| x.get(*a))
                .map(|o| o.iter().cloned().collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    pub fn sectors_summary(&self, world: &str) -> String {
        self.sectors(world).join(", ")
    }

    pub fn arenas_summary(&self, sector_address: &str) -> String {
        self.arenas(sector_address).join(", ")
    }

    pub fn game_objects_summary(&self, arena_address: &str) -> String {
        self.game_objects(arena_address).join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TileCoord;
    use std::collections::BTreeMap;

    fn tile(sector: &str, arena: &str, object: &str) -> Tile {
        Tile {
            coord: TileCoord::new(0, 0),
            world: "the Ville".into(),
            sector: sector.into(),
            arena: arena.into(),
            game_object: object.into(),
            spawning_location: String::new(),
            collision: false,
            events: BTreeMap::new(),
        }
    }

    #[test]
    fn test_lazy_population() {
        let mut mem = SpatialMemory::new();
        mem.add(&tile("Hobbs Cafe", "cafe", "counter"));
        mem.add(&tile("Hobbs Cafe", "cafe", "piano"));
        mem.add(&tile("Johnson Park", "park", ""));

        assert_eq!(mem.sectors_summary("the Ville"), "Hobbs Cafe, Johnson Park");
        assert_eq!(mem.arenas("the Ville:Hobbs Cafe"), vec!["cafe".to_string()]);
        assert_eq!(mem.game_objects_summary("the Ville:Hobbs Cafe:cafe"), "counter, piano");
        assert!(mem.game_objects("the Ville:Johnson Park:park").is_empty());
        assert!(mem.knows("the Ville:Hobbs Cafe:cafe:piano"));
    }

    #[test]
    fn test_unknown_branches_are_empty() {
        let mem = SpatialMemory::new();
        assert!(mem.sectors("nowhere").is_empty());
        assert!(mem.arenas("nowhere:at all").is_empty());
        assert!(mem.game_objects("bad").is_empty());
        assert_eq!(mem.arenas_summary("x:y"), "");
        assert!(!mem.knows("the Ville"));
    }
}
