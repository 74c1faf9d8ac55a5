//! Associative memory: one agent's append-only memory stream
//!
//! Retrieval ranks memories by recency + importance + relevance. Recency is
//! an exponential decay over hours since the memory was last accessed, and
//! every retrieved memory has its access time refreshed, so memories that
//! keep coming up fade more slowly than ones nobody asks about.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::clock::hours_between;
use crate::core::config::SimulationConfig;
use crate::core::types::MemoryId;

use super::node::{ChatTurn, Filling, MemoryKind, NewMemory, PerceivedEvent};

/// Weights and limits for relevance retrieval
#[derive(Debug, Clone, Copy)]
pub struct RetrievalParams {
    pub recency_decay_rate: f32,
    pub recency_weight: f32,
    pub importance_weight: f32,
    pub relevance_weight: f32,
    pub overfetch: usize,
    pub parallel_threshold: usize,
}

impl From<&SimulationConfig> for RetrievalParams {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            recency_decay_rate: config.recency_decay_rate,
            recency_weight: config.recency_weight,
            importance_weight: config.importance_weight,
            relevance_weight: config.relevance_weight,
            overfetch: config.retrieval_overfetch,
            parallel_threshold: config.parallel_threshold,
        }
    }
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self::from(&SimulationConfig::default())
    }
}

/// (1 - decay_rate) ^ hours since the memory was last accessed
pub fn recency_score(node: &PerceivedEvent, now: &NaiveDateTime, decay_rate: f32) -> f32 {
    (1.0 - decay_rate).powf(hours_between(&node.last_accessed, now))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssociativeMemory {
    nodes: Vec<PerceivedEvent>,
    kw_to_event: BTreeMap<String, Vec<MemoryId>>,
    kw_to_thought: BTreeMap<String, Vec<MemoryId>>,
    kw_to_chat: BTreeMap<String, Vec<MemoryId>>,
    /// Partner name -> chat memory still in progress
    open_chats: BTreeMap<String, MemoryId>,
    /// Partner name -> most recently finished chat memory
    last_chats: BTreeMap<String, MemoryId>,
}

impl AssociativeMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: MemoryId) -> Option<&PerceivedEvent> {
        let index = (id.0 as usize).checked_sub(1)?;
        self.nodes.get(index)
    }

    fn get_mut(&mut self, id: MemoryId) -> Option<&mut PerceivedEvent> {
        let index = (id.0 as usize).checked_sub(1)?;
        self.nodes.get_mut(index)
    }

    /// Persist a memory and return it with its final id
    pub fn add(&mut self, memory: NewMemory) -> &PerceivedEvent {
        let id = MemoryId(self.nodes.len() as u64 + 1);
        let index = match memory.kind {
            MemoryKind::Thought => Some(&mut self.kw_to_thought),
            MemoryKind::Chat => Some(&mut self.kw_to_chat),
            MemoryKind::Event => Some(&mut self.kw_to_event),
            MemoryKind::Plan => None,
        };
        if let Some(index) = index {
            for kw in &memory.keywords {
                index.entry(kw.clone()).or_default().push(id);
            }
        }

        self.nodes.push(PerceivedEvent {
            id,
            kind: memory.kind,
            event: memory.event,
            poignancy: memory.poignancy,
            created: memory.created,
            last_accessed: memory.created,
            ended: None,
            expiration: memory.expiration,
            keywords: memory.keywords,
            filling: memory.filling,
            embedding: memory.embedding,
        });
        &self.nodes[self.nodes.len() - 1]
    }

    /// Top `limit` memories for a query embedding, ranked by combined score
    ///
    /// Over-fetches `params.overfetch` candidates by similarity alone, then
    /// re-ranks them by recency + importance + relevance. Every returned
    /// memory has `last_accessed` set to `now`.
    pub fn retrieve_relevant_entries<S>(
        &mut self,
        query: &[f32],
        now: NaiveDateTime,
        limit: usize,
        kinds: &[MemoryKind],
        params: &RetrievalParams,
        similarity: S,
    ) -> Vec<PerceivedEvent>
    where
        S: Fn(&[f32], &[f32]) -> f32 + Sync,
    {
        let candidates: Vec<&PerceivedEvent> = self
            .nodes
            .iter()
            .filter(|n| kinds.is_empty() || kinds.contains(&n.kind))
            .filter(|n| !n.is_expired(&now))
            .collect();

        let score = |node: &&PerceivedEvent| (node.id, similarity(query, &node.embedding));
        let mut by_similarity: Vec<(MemoryId, f32)> = if candidates.len() >= params.parallel_threshold {
            candidates.par_iter().map(score).collect()
        } else {
            candidates.iter().map(score).collect()
        };
        by_similarity.sort_by_key(|&(id, sim)| (std::cmp::Reverse(OrderedFloat(sim)), std::cmp::Reverse(id)));
        by_similarity.truncate(params.overfetch);

        let mut ranked: Vec<(MemoryId, f32)> = by_similarity
            .into_iter()
            .filter_map(|(id, relevance)| {
                let node = self.get(id)?;
                let combined = params.recency_weight * recency_score(node, &now, params.recency_decay_rate)
                    + params.importance_weight * node.poignancy
                    + params.relevance_weight * relevance;
                Some((id, combined))
            })
            .collect();
        ranked.sort_by_key(|&(id, combined)| (std::cmp::Reverse(OrderedFloat(combined)), std::cmp::Reverse(id)));
        ranked.truncate(limit);

        ranked
            .into_iter()
            .filter_map(|(id, _)| {
                let node = self.get_mut(id)?;
                node.last_accessed = now;
                Some(node.clone())
            })
            .collect()
    }

    /// Latest memories (events and thoughts) that are not about idling
    pub fn get_most_recent_memories(&self, n: usize) -> Vec<&PerceivedEvent> {
        self.nodes
            .iter()
            .rev()
            .filter(|m| matches!(m.kind, MemoryKind::Event | MemoryKind::Thought))
            .filter(|m| !m.description().contains("idle"))
            .take(n)
            .collect()
    }

    /// Triples of the latest `retention` event and chat memories
    pub fn latest_event_triples(&self, retention: usize) -> Vec<(String, String, String)> {
        self.nodes
            .iter()
            .rev()
            .filter(|m| matches!(m.kind, MemoryKind::Event | MemoryKind::Chat))
            .take(retention)
            .map(|m| m.event.spo_summary())
            .collect()
    }

    pub fn retrieve_by_type(&self, kind: MemoryKind) -> Vec<&PerceivedEvent> {
        self.nodes.iter().filter(|m| m.kind == kind).collect()
    }

    /// Memories of `kind` sharing any of `keywords`, newest first
    pub fn retrieve_by_keywords(&self, kind: MemoryKind, keywords: &[String]) -> Vec<&PerceivedEvent> {
        let index = match kind {
            MemoryKind::Thought => &self.kw_to_thought,
            MemoryKind::Chat => &self.kw_to_chat,
            MemoryKind::Event => &self.kw_to_event,
            MemoryKind::Plan => return Vec::new(),
        };
        let mut ids: Vec<MemoryId> = keywords
            .iter()
            .filter_map(|kw| index.get(&kw.to_lowercase()))
            .flatten()
            .copied()
            .collect();
        ids.sort_unstable_by(|a, b| b.cmp(a));
        ids.dedup();
        ids.into_iter()
            .filter_map(|id| self.get(id))
            .filter(|m| m.kind == kind)
            .collect()
    }

    /// The chat with `partner` that has not ended yet
    pub fn active_conversation_with(&self, partner: &str) -> Option<&PerceivedEvent> {
        self.open_chats.get(partner).and_then(|id| self.get(*id))
    }

    /// The most recently finished chat with `partner`
    pub fn last_conversation_with(&self, partner: &str) -> Option<&PerceivedEvent> {
        self.last_chats.get(partner).and_then(|id| self.get(*id))
    }

    /// Create or update the chat memory with `partner`
    ///
    /// The first call for a partner creates a CHAT memory; later calls
    /// replace its transcript. Once the transcript's last turn is final the
    /// memory moves from "active" to "last" for that partner.
    pub fn record_conversation(
        &mut self,
        partner: &str,
        memory: NewMemory,
        turns: Vec<ChatTurn>,
    ) -> MemoryId {
        let now = memory.created;
        let ended = turns.last().map(|t| t.final_turn).unwrap_or(false);

        let id = match self.open_chats.get(partner).copied() {
            Some(id) => {
                if let Some(node) = self.get_mut(id) {
                    node.filling = Filling::Conversation(turns);
                    node.event.description = memory.event.description;
                    node.poignancy = node.poignancy.max(memory.poignancy);
                    node.last_accessed = now;
                    if !memory.embedding.is_empty() {
                        node.embedding = memory.embedding;
                    }
                }
                id
            }
            None => {
                let id = self.add(memory.filling(Filling::Conversation(turns))).id;
                self.open_chats.insert(partner.to_string(), id);
                id
            }
        };

        if ended {
            if let Some(node) = self.get_mut(id) {
                node.ended = Some(now);
            }
            self.open_chats.remove(partner);
            self.last_chats.insert(partner.to_string(), id);
        }
        id
    }

    /// Every memory, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &PerceivedEvent> {
        self.nodes.iter()
    }
}
