//! Conversations in progress
//!
//! A conversation is the one piece of state two agents share. The world
//! owns every open conversation in a [`ConversationBook`]; each participant
//! reads it during its own cycle, speaks when it is its turn, and closes its
//! own side once the conversation has ended. The record is dropped when both
//! sides are closed.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::core::types::ConversationId;
use crate::memory::ChatTurn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub initiator: String,
    pub partner: String,
    pub started_at: NaiveDateTime,
    pub turns: Vec<ChatTurn>,
    pub next_speaker: String,
    pub ended_at: Option<NaiveDateTime>,
    /// One-line summary written by whoever ended the conversation
    pub summary: Option<String>,
    /// Participants that have closed their side
    pub closed: BTreeSet<String>,
}

impl Conversation {
    pub fn includes(&self, name: &str) -> bool {
        self.initiator == name || self.partner == name
    }

    /// The other participant
    pub fn other(&self, name: &str) -> &str {
        if self.initiator == name {
            &self.partner
        } else {
            &self.initiator
        }
    }

    pub fn has_ended(&self) -> bool {
        self.ended_at.is_some()
    }

    pub fn is_closed_by(&self, name: &str) -> bool {
        self.closed.contains(name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationBook {
    conversations: BTreeMap<String, Conversation>,
}

fn book_key(id: ConversationId) -> String {
    id.0.to_string()
}

impl ConversationBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Open a conversation; the initiator speaks first
    pub fn start(&mut self, initiator: &str, partner: &str, now: NaiveDateTime) -> ConversationId {
        let id = ConversationId::new();
        self.conversations.insert(
            book_key(id),
            Conversation {
                id,
                initiator: initiator.to_string(),
                partner: partner.to_string(),
                started_at: now,
                turns: Vec::new(),
                next_speaker: initiator.to_string(),
                ended_at: None,
                summary: None,
                closed: BTreeSet::new(),
            },
        );
        id
    }

    pub fn get(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.get(&book_key(id))
    }

    /// A conversation `name` takes part in and has not closed yet
    pub fn open_for(&self, name: &str) -> Option<&Conversation> {
        self.conversations
            .values()
            .find(|c| c.includes(name) && !c.is_closed_by(name))
    }

    /// Append a turn and hand the word to the other participant
    ///
    /// A final turn ends the conversation at `now` with `summary`.
    pub fn push_turn(&mut self, id: ConversationId, turn: ChatTurn, now: NaiveDateTime, summary: Option<String>) {
        let Some(conversation) = self.conversations.get_mut(&book_key(id)) else {
            return;
        };
        if conversation.has_ended() {
            return;
        }
        conversation.next_speaker = conversation.other(&turn.speaker).to_string();
        if turn.final_turn {
            conversation.ended_at = Some(now);
            conversation.summary = summary;
        }
        conversation.turns.push(turn);
    }

    /// Mark `name`'s side closed, dropping the record once both are
    pub fn close_side(&mut self, id: ConversationId, name: &str) {
        let key = book_key(id);
        let done = match self.conversations.get_mut(&key) {
            Some(conversation) => {
                conversation.closed.insert(name.to_string());
                conversation.closed.len() >= 2
            }
            None => false,
        };
        if done {
            self.conversations.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 2, 13).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_turns_alternate() {
        let mut book = ConversationBook::new();
        let id = book.start("Isabella", "Klaus", t(9, 0));
        assert_eq!(book.get(id).unwrap().next_speaker, "Isabella");
        book.push_turn(id, ChatTurn::new("Isabella", "Hi!", false), t(9, 0), None);
        assert_eq!(book.get(id).unwrap().next_speaker, "Klaus");
        book.push_turn(id, ChatTurn::new("Klaus", "Bye!", true), t(9, 1), Some("greeting".into()));
        let conversation = book.get(id).unwrap();
        assert!(conversation.has_ended());
        assert_eq!(conversation.summary.as_deref(), Some("greeting"));
        assert_eq!(conversation.turns.len(), 2);
    }

    #[test]
    fn test_ended_conversation_ignores_turns() {
        let mut book = ConversationBook::new();
        let id = book.start("Isabella", "Klaus", t(9, 0));
        book.push_turn(id, ChatTurn::new("Isabella", "Bye!", true), t(9, 0), None);
        book.push_turn(id, ChatTurn::new("Klaus", "Wait", false), t(9, 1), None);
        assert_eq!(book.get(id).unwrap().turns.len(), 1);
    }

    #[test]
    fn test_record_dropped_after_both_close() {
        let mut book = ConversationBook::new();
        let id = book.start("Isabella", "Klaus", t(9, 0));
        assert!(book.open_for("Klaus").is_some());
        book.close_side(id, "Isabella");
        assert!(book.open_for("Isabella").is_none());
        assert!(book.open_for("Klaus").is_some());
        book.close_side(id, "Klaus");
        assert!(book.is_empty());
    }
}
