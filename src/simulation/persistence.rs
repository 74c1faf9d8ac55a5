//! Save and resume a run
//!
//! Layout of a save directory:
//! - `meta.json`: config, clock, agent order and open conversations
//! - `agents/<name>/scratch.json`, `spatial.json`, `associative.json`
//!
//! The maze is not saved; a run is resumed on the same maze definition.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, ConversationBook, Scratch};
use crate::cognition::Cognition;
use crate::core::clock::SimClock;
use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::maze::Maze;
use crate::memory::{AssociativeMemory, SpatialMemory};

use super::world::World;

#[derive(Debug, Serialize, Deserialize)]
struct Meta {
    config: SimulationConfig,
    clock: SimClock,
    agents: Vec<String>,
    conversations: ConversationBook,
}

fn agent_dir(root: &Path, name: &str) -> PathBuf {
    root.join("agents").join(name)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn save(world: &World, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    let meta = Meta {
        config: world.config.clone(),
        clock: world.clock.clone(),
        agents: world.agents.iter().map(|a| a.name().to_string()).collect(),
        conversations: world.conversations.clone(),
    };
    write_json(&dir.join("meta.json"), &meta)?;

    for agent in &world.agents {
        let path = agent_dir(dir, agent.name());
        fs::create_dir_all(&path)?;
        write_json(&path.join("scratch.json"), &agent.scratch)?;
        write_json(&path.join("spatial.json"), &agent.spatial)?;
        write_json(&path.join("associative.json"), world.memory(agent.name())?)?;
    }
    tracing::info!("saved {} agents at step {} to {}", world.agents.len(), world.clock.step(), dir.display());
    Ok(())
}

/// Rebuild a world from a save directory on a freshly loaded maze
pub fn load(dir: &Path, maze: Maze, cognition: Arc<dyn Cognition>) -> Result<World> {
    let meta: Meta = read_json(&dir.join("meta.json"))?;
    let mut world = World::new(meta.config, maze, cognition);
    world.rng = ChaCha8Rng::seed_from_u64(world.config.seed.wrapping_add(meta.clock.step()));
    world.clock = meta.clock;
    world.conversations = meta.conversations;

    for name in &meta.agents {
        let path = agent_dir(dir, name);
        let scratch: Scratch = read_json(&path.join("scratch.json"))?;
        let spatial: SpatialMemory = read_json(&path.join("spatial.json"))?;
        let memory: AssociativeMemory = read_json(&path.join("associative.json"))?;
        world.restore(Agent { scratch, spatial }, memory)?;
    }
    tracing::info!("loaded {} agents at step {} from {}", world.agents.len(), world.clock.step(), dir.display());
    Ok(world)
}
