//! The relevance store: one associative-memory partition per agent
//!
//! Partitions are disjoint, so an agent can only read its own memories.
//! Touching a partition that was never initialized is a programming error
//! and surfaces as `TownError::UninitializedPartition`.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, TownError};

use super::associative::AssociativeMemory;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelevanceStore {
    partitions: AHashMap<String, AssociativeMemory>,
}

impl RelevanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent; an existing partition is kept as is
    pub fn initialize(&mut self, agent: &str) {
        self.partitions.entry(agent.to_string()).or_default();
    }

    /// Install a restored partition
    pub fn insert(&mut self, agent: &str, memory: AssociativeMemory) {
        self.partitions.insert(agent.to_string(), memory);
    }

    pub fn is_initialized(&self, agent: &str) -> bool {
        self.partitions.contains_key(agent)
    }

    pub fn partition(&self, agent: &str) -> Result<&AssociativeMemory> {
        self.partitions
            .get(agent)
            .ok_or_else(|| TownError::UninitializedPartition(agent.to_string()))
    }

    pub fn partition_mut(&mut self, agent: &str) -> Result<&mut AssociativeMemory> {
        self.partitions
            .get_mut(agent)
            .ok_or_else(|| TownError::UninitializedPartition(agent.to_string()))
    }

    pub fn agents(&self) -> impl Iterator<Item = &str> {
        self.partitions.keys().map(String::as_str)
    }
}
