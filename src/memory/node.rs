//! Stored memories

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::core::event::{short_name, Event};
use crate::core::types::MemoryId;

/// What kind of memory a node is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    Event,
    Thought,
    Chat,
    Plan,
}

/// One utterance of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatTurn {
    pub speaker: String,
    pub utterance: String,
    /// This utterance ended the conversation
    pub final_turn: bool,
}

impl ChatTurn {
    pub fn new(speaker: impl Into<String>, utterance: impl Into<String>, final_turn: bool) -> Self {
        Self {
            speaker: speaker.into(),
            utterance: utterance.into(),
            final_turn,
        }
    }
}

/// Render a transcript as "speaker: utterance" lines
pub fn transcript(turns: &[ChatTurn]) -> String {
    turns
        .iter()
        .map(|t| format!("{}: {}", t.speaker, t.utterance))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extra payload of a memory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Filling {
    #[default]
    None,
    /// Turns of a chat memory, in order
    Conversation(Vec<ChatTurn>),
    /// Source memories a thought was derived from
    Evidence(Vec<MemoryId>),
}

impl Filling {
    pub fn turns(&self) -> &[ChatTurn] {
        match self {
            Filling::Conversation(turns) => turns,
            _ => &[],
        }
    }

    pub fn evidence(&self) -> &[MemoryId] {
        match self {
            Filling::Evidence(ids) => ids,
            _ => &[],
        }
    }
}

/// A memory as stored in an agent's associative memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerceivedEvent {
    pub id: MemoryId,
    pub kind: MemoryKind,
    pub event: Event,
    /// Importance in 0..=1
    pub poignancy: f32,
    pub created: NaiveDateTime,
    pub last_accessed: NaiveDateTime,
    /// When the final turn of a chat memory was recorded
    #[serde(default)]
    pub ended: Option<NaiveDateTime>,
    pub expiration: Option<NaiveDateTime>,
    pub keywords: BTreeSet<String>,
    pub filling: Filling,
    pub embedding: Vec<f32>,
}

impl PerceivedEvent {
    pub fn description(&self) -> &str {
        &self.event.description
    }

    pub fn is_expired(&self, now: &NaiveDateTime) -> bool {
        self.expiration.map(|exp| exp <= *now).unwrap_or(false)
    }

    /// A chat whose final turn has been recorded
    pub fn conversation_ended(&self) -> bool {
        self.filling.turns().last().map(|t| t.final_turn).unwrap_or(false)
    }
}

/// Input for adding a memory; the store assigns the id
#[derive(Debug, Clone)]
pub struct NewMemory {
    pub kind: MemoryKind,
    pub event: Event,
    pub poignancy: f32,
    pub created: NaiveDateTime,
    pub expiration: Option<NaiveDateTime>,
    pub keywords: BTreeSet<String>,
    pub filling: Filling,
    pub embedding: Vec<f32>,
}

impl NewMemory {
    pub fn new(kind: MemoryKind, event: Event, created: NaiveDateTime) -> Self {
        let keywords = keywords_for(&event);
        Self {
            kind,
            event,
            poignancy: 0.0,
            created,
            expiration: None,
            keywords,
            filling: Filling::None,
            embedding: Vec::new(),
        }
    }

    pub fn poignancy(mut self, poignancy: f32) -> Self {
        self.poignancy = poignancy.clamp(0.0, 1.0);
        self
    }

    pub fn expires(mut self, expiration: NaiveDateTime) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn filling(mut self, filling: Filling) -> Self {
        self.filling = filling;
        self
    }

    pub fn embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }
}

/// Lowercase keywords of an event: subject and object tails
pub fn keywords_for(event: &Event) -> BTreeSet<String> {
    [short_name(&event.subject), short_name(&event.object)]
        .into_iter()
        .filter(|k| !k.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_strip_addresses() {
        let event = Event::new("the Ville:cafe:counter:coffee machine", "is", "brewing", "brewing");
        let kws = keywords_for(&event);
        assert!(kws.contains("coffee machine"));
        assert!(kws.contains("brewing"));
    }

    #[test]
    fn test_filling_accessors() {
        let chat = Filling::Conversation(vec![ChatTurn::new("A", "hi", false), ChatTurn::new("B", "bye", true)]);
        assert_eq!(chat.turns().len(), 2);
        assert!(chat.evidence().is_empty());
        assert_eq!(transcript(chat.turns()), "A: hi\nB: bye");
    }
}
