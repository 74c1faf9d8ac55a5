//! The world: maze, residents, their memories and the clock

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, ConversationBook, Identity, Scratch};
use crate::cognition::Cognition;
use crate::core::clock::SimClock;
use crate::core::config::SimulationConfig;
use crate::core::error::{Result, TownError};
use crate::core::event::Event;
use crate::core::types::TileCoord;
use crate::maze::Maze;
use crate::memory::{AssociativeMemory, RelevanceStore};

use super::whisper::Narrator;

/// Request to add a resident
///
/// The agent starts on `tile` if given and walkable, otherwise on the
/// spawning location named `location`, otherwise on a random tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpawn {
    #[serde(flatten)]
    pub identity: Identity,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tile: Option<TileCoord>,
}

impl AgentSpawn {
    pub fn at_location(identity: Identity, location: impl Into<String>) -> Self {
        Self {
            identity,
            location: Some(location.into()),
            tile: None,
        }
    }
}

pub struct World {
    pub config: SimulationConfig,
    pub maze: Maze,
    pub agents: Vec<Agent>,
    pub store: RelevanceStore,
    pub conversations: ConversationBook,
    pub clock: SimClock,
    pub rng: ChaCha8Rng,
    pub cognition: Arc<dyn Cognition>,
    pub narrator: Narrator,
}

impl World {
    pub fn new(config: SimulationConfig, maze: Maze, cognition: Arc<dyn Cognition>) -> Self {
        let clock = SimClock::new(config.start_time, config.seconds_per_step);
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            maze,
            agents: Vec::new(),
            store: RelevanceStore::new(),
            conversations: ConversationBook::new(),
            clock,
            rng,
            cognition,
            narrator: Narrator::new(),
        }
    }

    /// Add a resident, register its memory partition and show it idling
    pub fn spawn(&mut self, spawn: AgentSpawn) -> Result<TileCoord> {
        let name = spawn.identity.name.clone();
        if self.agent(&name).is_some() {
            return Err(TownError::Config(format!("duplicate agent name: {}", name)));
        }

        let tile = spawn
            .tile
            .filter(|t| self.maze.is_walkable(*t))
            .or_else(|| spawn.location.as_deref().and_then(|l| self.maze.spawn_tile(l)))
            .or_else(|| self.maze.get_random_tile(&mut self.rng, &[]))
            .ok_or_else(|| TownError::MazeLoad("maze has no walkable tile".into()))?;

        self.maze.add_event(tile, Event::idle(&name))?;
        self.store.initialize(&name);
        self.agents.push(Agent::new(Scratch::new(
            spawn.identity,
            tile,
            self.config.reflection_trigger_max,
        )));
        tracing::info!("{} moved in at {}", name, tile);
        Ok(tile)
    }

    /// Re-add an agent restored from disk, with its memories
    pub fn restore(&mut self, agent: Agent, memory: AssociativeMemory) -> Result<()> {
        let name = agent.name().to_string();
        let event = agent
            .scratch
            .action
            .as_ref()
            .map(|a| a.event.clone())
            .unwrap_or_else(|| Event::idle(&name));
        self.maze.add_event(agent.scratch.curr_tile, event)?;
        if let Some(object) = agent.scratch.action.as_ref().and_then(|a| a.object.as_ref()) {
            self.maze.set_object_event(&object.address, object.event.clone());
        }
        self.store.insert(&name, memory);
        self.agents.push(agent);
        Ok(())
    }

    pub fn agent(&self, name: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.name() == name)
    }

    pub fn memory(&self, name: &str) -> Result<&AssociativeMemory> {
        self.store.partition(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cognition::ScriptedCognition;
    use crate::demo::{demo_residents, demo_town};

    fn world() -> World {
        World::new(
            SimulationConfig::default(),
            demo_town().unwrap(),
            Arc::new(ScriptedCognition::new()),
        )
    }

    #[test]
    fn test_spawn_registers_partition_and_idle_event() {
        let mut world = world();
        let spawn = demo_residents().remove(0);
        let name = spawn.identity.name.clone();
        let tile = world.spawn(spawn).unwrap();

        assert!(world.memory(&name).unwrap().is_empty());
        let events = &world.maze.tile(tile).unwrap().events;
        assert!(events.get(&name).is_some_and(|e| e.is_idle()));
        assert_eq!(world.agent(&name).unwrap().scratch.curr_tile, tile);
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut world = world();
        let spawn = demo_residents().remove(0);
        world.spawn(spawn.clone()).unwrap();
        assert!(world.spawn(spawn).is_err());
        assert_eq!(world.agents.len(), 1);
    }

    #[test]
    fn test_unwalkable_tile_falls_back_to_location() {
        let mut world = world();
        let mut spawn = demo_residents().remove(0);
        let expected = world.maze.spawn_tile(spawn.location.as_deref().unwrap()).unwrap();
        spawn.tile = Some(TileCoord::new(0, 0));
        assert_eq!(world.spawn(spawn).unwrap(), expected);
    }
}
