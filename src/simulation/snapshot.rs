//! Per-step world snapshot for the transport/UI layer

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, Execution};
use crate::maze::Maze;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub name: String,
    pub age: u32,
    pub traits: String,
    /// The agent's current status line
    pub description: String,
    /// Full address of the tile the agent stands on
    pub location: String,
    pub emoji: String,
    pub activity: String,
    pub col: usize,
    pub row: usize,
}

impl AgentSnapshot {
    pub fn capture(agent: &Agent, execution: &Execution, maze: &Maze) -> Self {
        let scratch = &agent.scratch;
        let tile = scratch.curr_tile;
        let location = maze.tile(tile).map(|t| t.full_address()).unwrap_or_default();
        Self {
            name: scratch.identity.name.clone(),
            age: scratch.identity.age,
            traits: scratch.identity.innate.clone(),
            description: scratch.identity.currently.clone(),
            location,
            emoji: execution.emoji.clone(),
            activity: execution.description.clone(),
            col: tile.x,
            row: tile.y,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Step that produced this snapshot
    pub step: u64,
    /// Simulated time of that step
    pub time: String,
    pub agents: Vec<AgentSnapshot>,
}

impl WorldSnapshot {
    pub fn agent(&self, name: &str) -> Option<&AgentSnapshot> {
        self.agents.iter().find(|a| a.name == name)
    }
}
