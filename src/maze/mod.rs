//! Tile graph of the town
//!
//! The maze is static after load apart from the per-tile `events` maps,
//! so nearby-tile and path queries are cached.

pub mod address;
pub mod definition;
pub mod pathfinding;
pub mod tile;

use std::collections::BTreeMap;
use std::sync::RwLock;

use ahash::AHashMap;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::error::{Result, TownError};
use crate::core::event::Event;
use crate::core::types::TileCoord;

pub use address::ActionAddress;
pub use definition::{Layer, MazeDefinition, Rect};
pub use tile::{AddressLevel, Tile};

/// Cached paths kept before the path cache starts over
const PATH_CACHE_CAPACITY: usize = 4096;

/// Grid of tiles plus the reverse address index
pub struct Maze {
    name: String,
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
    /// Address -> walkable tiles carrying that address
    address_tiles: AHashMap<String, Vec<TileCoord>>,
    /// Sorted copy of the index keys for deterministic random picks
    address_keys: Vec<String>,
    nearby_cache: RwLock<AHashMap<(TileCoord, usize), Vec<TileCoord>>>,
    path_cache: RwLock<AHashMap<(TileCoord, TileCoord), Vec<TileCoord>>>,
}

impl Maze {
    pub fn from_definition(def: &MazeDefinition) -> Result<Self> {
        def.validate()?;

        let mut tiles = Vec::with_capacity(def.width * def.height);
        let mut address_tiles: AHashMap<String, Vec<TileCoord>> = AHashMap::new();

        for y in 0..def.height {
            for x in 0..def.width {
                let index = y * def.width + x;
                let mut tile = Tile {
                    coord: TileCoord::new(x, y),
                    world: def.label(Layer::World, index),
                    sector: def.label(Layer::Sector, index),
                    arena: def.label(Layer::Arena, index),
                    game_object: def.label(Layer::GameObject, index),
                    spawning_location: def.label(Layer::Spawn, index),
                    collision: def.layers.collision[index] != 0,
                    events: BTreeMap::new(),
                };

                // Objects start out idle on every tile they cover
                if let Some(object) = tile.address(AddressLevel::GameObject) {
                    tile.events.insert(object.clone(), Event::idle(object));
                }

                if tile.is_walkable() {
                    for key in tile.index_keys() {
                        address_tiles.entry(key).or_default().push(tile.coord);
                    }
                }
                tiles.push(tile);
            }
        }

        let mut address_keys: Vec<String> = address_tiles.keys().cloned().collect();
        address_keys.sort();

        tracing::info!(
            "Loaded maze '{}' ({}x{}, {} addresses)",
            def.name,
            def.width,
            def.height,
            address_keys.len()
        );

        Ok(Self {
            name: def.name.clone(),
            width: def.width,
            height: def.height,
            tiles,
            address_tiles,
            address_keys,
            nearby_cache: RwLock::new(AHashMap::new()),
            path_cache: RwLock::new(AHashMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index(&self, coord: TileCoord) -> Option<usize> {
        (coord.x < self.width && coord.y < self.height).then(|| coord.y * self.width + coord.x)
    }

    pub fn get_tile(&self, x: usize, y: usize) -> Result<&Tile> {
        self.tile(TileCoord::new(x, y))
    }

    pub fn tile(&self, coord: TileCoord) -> Result<&Tile> {
        self.index(coord)
            .map(|i| &self.tiles[i])
            .ok_or(TownError::OutOfBounds { x: coord.x, y: coord.y })
    }

    pub fn tile_mut(&mut self, coord: TileCoord) -> Result<&mut Tile> {
        match self.index(coord) {
            Some(i) => Ok(&mut self.tiles[i]),
            None => Err(TownError::OutOfBounds { x: coord.x, y: coord.y }),
        }
    }

    pub fn is_walkable(&self, coord: TileCoord) -> bool {
        self.index(coord)
            .map(|i| self.tiles[i].is_walkable())
            .unwrap_or(false)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Walkable tiles within Chebyshev distance `radius` of `center` (inclusive)
    pub fn get_nearby_tiles(&self, center: TileCoord, radius: usize) -> Vec<TileCoord> {
        if let Ok(cache) = self.nearby_cache.read() {
            if let Some(hit) = cache.get(&(center, radius)) {
                return hit.clone();
            }
        }

        let x_range = center.x.saturating_sub(radius)..=(center.x + radius).min(self.width.saturating_sub(1));
        let y_range = center.y.saturating_sub(radius)..=(center.y + radius).min(self.height.saturating_sub(1));
        let nearby: Vec<TileCoord> = y_range
            .flat_map(|y| x_range.clone().map(move |x| TileCoord::new(x, y)))
            .filter(|&c| self.is_walkable(c))
            .collect();

        if let Ok(mut cache) = self.nearby_cache.write() {
            cache.insert((center, radius), nearby.clone());
        }
        nearby
    }

    /// Walkable tiles indexed under `address`
    pub fn address_tiles(&self, address: &str) -> Option<&[TileCoord]> {
        self.address_tiles
            .get(address)
            .map(|v| v.as_slice())
            .filter(|v| !v.is_empty())
    }

    pub fn has_address(&self, address: &str) -> bool {
        self.address_tiles(address).is_some()
    }

    pub fn address_keys(&self) -> &[String] {
        &self.address_keys
    }

    /// Random tile: a random address bucket, then a random tile inside it
    ///
    /// Not uniform over cells: small addresses are picked as often as large
    /// ones. Tiles in `exclude` are never returned.
    pub fn get_random_tile<R: Rng + ?Sized>(&self, rng: &mut R, exclude: &[TileCoord]) -> Option<TileCoord> {
        const MAX_BUCKET_TRIES: usize = 32;

        for _ in 0..MAX_BUCKET_TRIES {
            let key = self.address_keys.choose(rng)?;
            let candidates: Vec<TileCoord> = self.address_tiles[key]
                .iter()
                .copied()
                .filter(|c| !exclude.contains(c))
                .collect();
            if let Some(tile) = candidates.choose(rng) {
                return Some(*tile);
            }
        }

        // Every sampled bucket was fully excluded; fall back to a scan
        self.tiles
            .iter()
            .filter(|t| t.is_walkable() && !exclude.contains(&t.coord))
            .map(|t| t.coord)
            .collect::<Vec<_>>()
            .choose(rng)
            .copied()
    }

    /// Spawn tile registered under a spawning-location label
    pub fn spawn_tile(&self, label: &str) -> Option<TileCoord> {
        self.address_tiles(&format!("<spawn_loc>{}", label))
            .and_then(|tiles| tiles.first().copied())
    }

    /// Shortest walkable path, excluding `start`; empty when unreachable
    ///
    /// Agents following each other ask from a new start every step, so the
    /// cache is cleared once it holds `PATH_CACHE_CAPACITY` paths.
    pub fn find_path(&self, start: TileCoord, end: TileCoord) -> Vec<TileCoord> {
        if let Ok(cache) = self.path_cache.read() {
            if let Some(hit) = cache.get(&(start, end)) {
                return hit.clone();
            }
        }

        let path = pathfinding::find_path(start, end, |c| self.is_walkable(c));

        if let Ok(mut cache) = self.path_cache.write() {
            if cache.len() >= PATH_CACHE_CAPACITY {
                tracing::debug!("path cache full, clearing {} paths", cache.len());
                cache.clear();
            }
            cache.insert((start, end), path.clone());
        }
        path
    }

    /// Put `event` on a tile under its subject's name
    pub fn add_event(&mut self, coord: TileCoord, event: Event) -> Result<()> {
        let tile = self.tile_mut(coord)?;
        tile.events.insert(event.subject.clone(), event);
        Ok(())
    }

    /// Remove whatever `subject` is doing on a tile
    pub fn remove_event(&mut self, coord: TileCoord, subject: &str) -> Result<Option<Event>> {
        Ok(self.tile_mut(coord)?.events.remove(subject))
    }

    /// Place an object's event on every tile of that object
    pub fn set_object_event(&mut self, object_address: &str, event: Event) {
        let Some(coords) = self.address_tiles.get(object_address).cloned() else {
            return;
        };
        for coord in coords {
            if let Some(i) = self.index(coord) {
                self.tiles[i].events.insert(object_address.to_string(), event.clone());
            }
        }
    }

    /// Reset an object back to "is idle" on all its tiles
    pub fn set_object_idle(&mut self, object_address: &str) {
        self.set_object_event(object_address, Event::idle(object_address));
    }
}
