//! Agents and their cognitive cycle
//!
//! Every step each agent runs the same fixed pipeline:
//! perceive -> retrieve -> plan -> reflect -> execute
//!
//! Stages await cognition one call at a time and only write to the agent's
//! scratch once the call they depend on has resolved, so dropping a cycle
//! midway leaves the agent in its previous consistent state.

pub mod action;
pub mod conversation;
pub mod execute;
pub mod perceive;
pub mod plan;
pub mod reflect;
pub mod retrieve;
pub mod schedule;
pub mod scratch;

use std::hash::Hash;

use chrono::NaiveDateTime;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::cognition::{CallKey, Cognition};
use crate::core::clock::SimClock;
use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::maze::Maze;
use crate::memory::{AssociativeMemory, RetrievalParams, SpatialMemory};
use crate::simulation::whisper::Narrator;

pub use action::{Action, ObjectAction};
pub use conversation::{Conversation, ConversationBook};
pub use execute::Execution;
pub use retrieve::Retrieved;
pub use schedule::{DaySchedule, ScheduleSlot};
pub use scratch::{Identity, Scratch};

/// One resident of the town
///
/// The associative memory lives in the world's relevance store, keyed by
/// name, so it can be partitioned and persisted separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub scratch: Scratch,
    pub spatial: SpatialMemory,
}

impl Agent {
    pub fn new(scratch: Scratch) -> Self {
        Self {
            scratch,
            spatial: SpatialMemory::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.scratch.name()
    }
}

/// Read-only view of every agent except the one running its cycle
#[derive(Clone, Copy)]
pub struct Peers<'a> {
    before: &'a [Agent],
    after: &'a [Agent],
}

impl<'a> Peers<'a> {
    pub fn new(before: &'a [Agent], after: &'a [Agent]) -> Self {
        Self { before, after }
    }

    pub fn get(&self, name: &str) -> Option<&'a Agent> {
        self.iter().find(|a| a.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Agent> + 'a {
        self.before.iter().chain(self.after.iter())
    }

    pub fn is_agent(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// Everything one agent's cycle may read or write
pub struct CycleContext<'a> {
    pub agent: &'a mut Agent,
    pub memory: &'a mut AssociativeMemory,
    pub peers: Peers<'a>,
    pub maze: &'a Maze,
    pub conversations: &'a mut ConversationBook,
    pub cognition: &'a dyn Cognition,
    pub config: &'a SimulationConfig,
    pub clock: &'a SimClock,
    pub rng: &'a mut ChaCha8Rng,
    pub narrator: &'a Narrator,
}

impl CycleContext<'_> {
    pub fn name(&self) -> &str {
        self.agent.scratch.name()
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Cache key for a cognitive call made by this agent at this step
    pub fn key(&self, operation: &str, input: impl Hash) -> CallKey {
        CallKey::new(self.name(), operation, self.clock.step(), input)
    }

    pub fn retrieval_params(&self) -> RetrievalParams {
        RetrievalParams::from(self.config)
    }

    pub fn whisper(&self, level: u8, message: impl Into<String>) {
        self.narrator.whisper(self.name(), level, self.clock.step(), message);
    }

    /// Embed `text`, falling back to an empty vector
    pub async fn embed(&self, text: &str) -> Vec<f32> {
        let key = self.key("embed", text);
        recover(self.cognition.embed(&key, text).await, "embed", self.name()).unwrap_or_default()
    }

    /// Descriptions of the memories most relevant to `query`
    pub async fn relevant_memories(&mut self, query: &str, limit: usize) -> Vec<String> {
        let embedding = self.embed(query).await;
        let now = self.now();
        let params = self.retrieval_params();
        let cognition = self.cognition;
        self.memory
            .retrieve_relevant_entries(&embedding, now, limit, &[], &params, |q, c| cognition.similarity(q, c))
            .into_iter()
            .map(|m| m.event.description)
            .collect()
    }
}

/// Log a failed cognitive call and turn it into `None`
pub fn recover<T>(result: Result<T>, operation: &str, agent: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("{} for {} failed, using default: {}", operation, agent, e);
            None
        }
    }
}

/// Run one full cycle and return where the agent goes next
pub async fn run_cycle(ctx: &mut CycleContext<'_>) -> Result<Execution> {
    ctx.agent.scratch.curr_time = Some(ctx.now());

    let perceived = perceive::perceive(ctx).await?;
    tracing::debug!("{} perceived {} new events", ctx.name(), perceived.len());

    let retrieved = retrieve::retrieve(ctx.memory, &perceived);

    plan::plan(ctx, &retrieved).await?;
    reflect::reflect(ctx).await?;

    execute::execute(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TileCoord;

    fn agent(name: &str) -> Agent {
        let identity = Identity {
            name: name.into(),
            age: 30,
            innate: String::new(),
            learned: String::new(),
            currently: String::new(),
            lifestyle: String::new(),
            living_area: String::new(),
        };
        Agent::new(Scratch::new(identity, TileCoord::new(0, 0), 150))
    }

    #[test]
    fn test_peers_skip_self() {
        let mut agents = vec![agent("Isabella"), agent("Klaus"), agent("Maria")];
        let (before, rest) = agents.split_at_mut(1);
        let (me, after) = rest.split_first_mut().unwrap();
        let peers = Peers::new(before, after);
        assert_eq!(me.name(), "Klaus");
        assert!(peers.is_agent("Isabella"));
        assert!(peers.is_agent("Maria"));
        assert!(!peers.is_agent("Klaus"));
        assert_eq!(peers.iter().count(), 2);
    }
}
