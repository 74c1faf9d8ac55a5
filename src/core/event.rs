//! Subject-predicate-object events
//!
//! Events are plain values. Tiles hold copies of them, memories hold copies
//! of them, and the tick driver is the only code that moves them between
//! tiles.

use serde::{Deserialize, Serialize};

pub const IDLE_PREDICATE: &str = "is";
pub const IDLE_OBJECT: &str = "idle";

/// What is happening: a triple plus free-text description
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub description: String,
}

impl Event {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            description: description.into(),
        }
    }

    /// The "nothing is happening" event for a subject
    pub fn idle(subject: impl Into<String>) -> Self {
        Self::new(subject, IDLE_PREDICATE, IDLE_OBJECT, IDLE_OBJECT)
    }

    /// Dedup key for "have I already perceived this"
    pub fn spo_summary(&self) -> (String, String, String) {
        (
            self.subject.clone(),
            self.predicate.clone(),
            self.object.clone(),
        )
    }

    pub fn is_idle(&self) -> bool {
        self.predicate.is_empty()
            || self.object.is_empty()
            || (self.predicate == IDLE_PREDICATE && self.object == IDLE_OBJECT)
            || self.description.contains(IDLE_OBJECT)
    }

    /// Fill in a missing predicate/object/description with "is idle"
    pub fn or_idle(mut self) -> Self {
        if self.predicate.is_empty() || self.object.is_empty() {
            self.predicate = IDLE_PREDICATE.into();
            self.object = IDLE_OBJECT.into();
            self.description = IDLE_OBJECT.into();
        }
        if self.description.is_empty() {
            self.description = IDLE_OBJECT.into();
        }
        self
    }

    /// An agent subject is a bare name; objects are hierarchical addresses.
    pub fn subject_is_agent(&self) -> bool {
        !self.subject.contains(':')
    }
}

/// Last component of a hierarchical name ("the Ville:cafe:counter" -> "counter")
pub fn short_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name).trim()
}

/// Text inside the last parenthesised group, if any ("cook (chop onions)" -> "chop onions")
pub fn bracketed(description: &str) -> Option<&str> {
    let open = description.rfind('(')?;
    let close = description[open..].find(')')? + open;
    let inner = description[open + 1..close].trim();
    (!inner.is_empty()).then_some(inner)
}
