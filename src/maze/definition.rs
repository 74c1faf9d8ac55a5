//! Serialized maze layout
//!
//! Five aligned integer layers (world, sector, arena, game object, spawn)
//! plus a collision layer. Each non-zero id resolves to a label through the
//! layer's id table. Id 0 always means "nothing here".

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, TownError};

/// Which layer a paint operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    World,
    Sector,
    Arena,
    GameObject,
    Spawn,
}

/// Inclusive rectangle of tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self { x, y, width, height }
    }

    fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.y..self.y + self.height).flat_map(move |y| (self.x..self.x + self.width).map(move |x| (x, y)))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layers {
    pub world: Vec<u32>,
    pub sector: Vec<u32>,
    pub arena: Vec<u32>,
    pub game_object: Vec<u32>,
    pub spawn: Vec<u32>,
    pub collision: Vec<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Labels {
    pub world: BTreeMap<u32, String>,
    pub sector: BTreeMap<u32, String>,
    pub arena: BTreeMap<u32, String>,
    pub game_object: BTreeMap<u32, String>,
    pub spawn: BTreeMap<u32, String>,
}

/// Everything needed to build a [`Maze`](super::Maze)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MazeDefinition {
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub layers: Layers,
    pub labels: Labels,
}

impl MazeDefinition {
    /// An empty, fully walkable grid
    pub fn blank(name: impl Into<String>, width: usize, height: usize) -> Self {
        let cells = width * height;
        Self {
            name: name.into(),
            width,
            height,
            layers: Layers {
                world: vec![0; cells],
                sector: vec![0; cells],
                arena: vec![0; cells],
                game_object: vec![0; cells],
                spawn: vec![0; cells],
                collision: vec![0; cells],
            },
            labels: Labels::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let def: MazeDefinition = serde_json::from_str(json)?;
        def.validate()?;
        Ok(def)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// All layers must match width * height
    pub fn validate(&self) -> Result<()> {
        let cells = self.width * self.height;
        let layers = [
            ("world", &self.layers.world),
            ("sector", &self.layers.sector),
            ("arena", &self.layers.arena),
            ("game_object", &self.layers.game_object),
            ("spawn", &self.layers.spawn),
            ("collision", &self.layers.collision),
        ];
        for (name, layer) in layers {
            if layer.len() != cells {
                return Err(TownError::MazeLoad(format!(
                    "layer '{}' has {} cells, expected {}",
                    name,
                    layer.len(),
                    cells
                )));
            }
        }
        Ok(())
    }

    fn layer_mut(&mut self, layer: Layer) -> (&mut Vec<u32>, &mut BTreeMap<u32, String>) {
        match layer {
            Layer::World => (&mut self.layers.world, &mut self.labels.world),
            Layer::Sector => (&mut self.layers.sector, &mut self.labels.sector),
            Layer::Arena => (&mut self.layers.arena, &mut self.labels.arena),
            Layer::GameObject => (&mut self.layers.game_object, &mut self.labels.game_object),
            Layer::Spawn => (&mut self.layers.spawn, &mut self.labels.spawn),
        }
    }

    /// Label every cell of `rect` on `layer`, reusing the id of an existing label
    pub fn paint(&mut self, layer: Layer, rect: Rect, label: &str) -> &mut Self {
        let width = self.width;
        let height = self.height;
        let (cells, labels) = self.layer_mut(layer);
        let id = match labels.iter().find(|(_, l)| l.as_str() == label) {
            Some((id, _)) => *id,
            None => {
                let id = labels.keys().next_back().copied().unwrap_or(0) + 1;
                labels.insert(id, label.to_string());
                id
            }
        };
        for (x, y) in rect.cells().filter(|&(x, y)| x < width && y < height) {
            cells[y * width + x] = id;
        }
        self
    }

    /// Mark every cell of `rect` as a wall
    pub fn block(&mut self, rect: Rect) -> &mut Self {
        let width = self.width;
        let height = self.height;
        for (x, y) in rect.cells().filter(|&(x, y)| x < width && y < height) {
            self.layers.collision[y * width + x] = 1;
        }
        self
    }

    /// Clear walls in `rect` (doorways)
    pub fn open(&mut self, rect: Rect) -> &mut Self {
        let width = self.width;
        let height = self.height;
        for (x, y) in rect.cells().filter(|&(x, y)| x < width && y < height) {
            self.layers.collision[y * width + x] = 0;
        }
        self
    }

    pub(crate) fn label(&self, layer: Layer, index: usize) -> String {
        let (cells, labels) = match layer {
            Layer::World => (&self.layers.world, &self.labels.world),
            Layer::Sector => (&self.layers.sector, &self.labels.sector),
            Layer::Arena => (&self.layers.arena, &self.labels.arena),
            Layer::GameObject => (&self.layers.game_object, &self.labels.game_object),
            Layer::Spawn => (&self.layers.spawn, &self.labels.spawn),
        };
        cells
            .get(index)
            .and_then(|id| labels.get(id))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_reuses_label_ids() {
        let mut def = MazeDefinition::blank("w", 4, 4);
        def.paint(Layer::Sector, Rect::new(0, 0, 2, 2), "house")
            .paint(Layer::Sector, Rect::new(2, 2, 2, 2), "house");
        assert_eq!(def.labels.sector.len(), 1);
        assert_eq!(def.label(Layer::Sector, 0), "house");
        assert_eq!(def.label(Layer::Sector, 15), "house");
        assert_eq!(def.label(Layer::Sector, 3), "");
    }

    #[test]
    fn test_paint_clips_to_bounds() {
        let mut def = MazeDefinition::blank("w", 3, 3);
        def.block(Rect::new(2, 2, 5, 5));
        assert_eq!(def.layers.collision.iter().filter(|&&c| c != 0).count(), 1);
    }

    #[test]
    fn test_validate_rejects_short_layer() {
        let mut def = MazeDefinition::blank("w", 3, 3);
        def.layers.arena.pop();
        assert!(matches!(def.validate(), Err(TownError::MazeLoad(_))));
    }

    #[test]
    fn test_json_round_trip() {
        let mut def = MazeDefinition::blank("w", 2, 2);
        def.paint(Layer::World, Rect::new(0, 0, 2, 2), "the Ville");
        let json = serde_json::to_string(&def).unwrap();
        let loaded = MazeDefinition::from_json(&json).unwrap();
        assert_eq!(loaded.label(Layer::World, 3), "the Ville");
    }
}
