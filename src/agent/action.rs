//! What an agent is currently doing

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::core::clock::floor_minute;
use crate::core::event::{bracketed, Event};
use crate::core::types::ConversationId;
use crate::maze::address::{ActionAddress, RANDOM_TOKEN, WAITING_TOKEN};

pub const CHAT_PREDICATE: &str = "chat with";
pub const CHAT_EMOJI: &str = "💬";
pub const WAIT_EMOJI: &str = "⌛";
pub const DEFAULT_EMOJI: &str = "🤷";

/// Side effect of an action on the object it uses ("stove is on")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectAction {
    /// Full address of the object, also the subject of `event`
    pub address: String,
    pub description: String,
    pub event: Event,
}

/// An agent's current intentional unit of behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Hierarchical address or a special token target
    pub address: String,
    pub start_time: NaiveDateTime,
    /// Minutes
    pub duration: u32,
    pub emoji: String,
    pub description: String,
    pub event: Event,
    pub object: Option<ObjectAction>,
    /// Set on chat actions; both participants reference the same conversation
    pub conversation: Option<ConversationId>,
}

impl Action {
    pub fn target(&self) -> ActionAddress {
        ActionAddress::parse(&self.address)
    }

    /// Minute-granular end: a start with leftover seconds rounds up first
    pub fn end_time(&self) -> NaiveDateTime {
        let mut start = floor_minute(&self.start_time);
        if start != self.start_time {
            start += Duration::minutes(1);
        }
        start + Duration::minutes(self.duration as i64)
    }

    pub fn is_chat(&self) -> bool {
        self.event.predicate == CHAT_PREDICATE
    }

    pub fn is_waiting(&self) -> bool {
        self.address.contains(WAITING_TOKEN)
    }

    pub fn is_random(&self) -> bool {
        self.address.contains(RANDOM_TOKEN)
    }

    pub fn is_sleeping(&self) -> bool {
        self.description.contains("sleeping")
    }

    /// The sub-activity of a decomposed description, or the description itself
    pub fn activity(&self) -> &str {
        bracketed(&self.description).unwrap_or(&self.description)
    }

    /// "description @ address" as shown to observers
    pub fn display(&self) -> String {
        format!("{} @ {}", self.description, self.address)
    }
}
