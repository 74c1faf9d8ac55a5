//! Scratch: an agent's mutable working memory

use std::collections::{BTreeMap, VecDeque};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::cognition::DailyPlanItem;
use crate::core::clock::floor_minute;
use crate::core::types::{ConversationId, TileCoord};

use super::action::{Action, CHAT_PREDICATE};
use super::schedule::DaySchedule;

/// Who an agent is; stable apart from `currently`, which daily planning rewrites
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub age: u32,
    /// Innate traits ("friendly, outgoing")
    pub innate: String,
    /// Learned traits and background
    pub learned: String,
    /// What the agent is up to these days
    pub currently: String,
    pub lifestyle: String,
    /// Address of the agent's home arena
    pub living_area: String,
}

impl Identity {
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }

    /// Identity block used as prompt context
    pub fn summary(&self) -> String {
        format!(
            "Name: {}\nAge: {}\nInnate traits: {}\nLearned traits: {}\nCurrently: {}\nLifestyle: {}\nLiving area: {}",
            self.name, self.age, self.innate, self.learned, self.currently, self.lifestyle, self.living_area
        )
    }
}

/// Conversation state of one agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatState {
    pub chatting_with: Option<String>,
    pub conversation: Option<ConversationId>,
    /// Set when the conversation closes; the chat action ends at this time
    pub chatting_end_time: Option<NaiveDateTime>,
    /// Partner name -> steps left before a new chat may be started
    pub buffer: BTreeMap<String, u32>,
}

impl ChatState {
    pub fn clear(&mut self) {
        self.chatting_with = None;
        self.conversation = None;
        self.chatting_end_time = None;
    }

    /// Count down every buffer entry except the current partner's
    pub fn decay_buffer(&mut self) {
        let partner = self.chatting_with.clone();
        for (name, steps) in self.buffer.iter_mut() {
            if partner.as_deref() != Some(name.as_str()) {
                *steps = steps.saturating_sub(1);
            }
        }
        self.buffer.retain(|_, steps| *steps > 0);
    }

    pub fn in_buffer(&self, partner: &str) -> bool {
        self.buffer.get(partner).is_some_and(|steps| *steps > 0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectionState {
    /// Counts down by poignancy; reflection runs at zero
    pub trigger: i32,
    pub trigger_max: i32,
    /// Partner of a just-finished conversation awaiting takeaways
    pub pending_chat: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scratch {
    pub identity: Identity,
    pub home_tile: TileCoord,
    pub curr_tile: TileCoord,
    pub curr_time: Option<NaiveDateTime>,
    /// Day the current plan was made for; None before the first plan
    pub curr_day: Option<NaiveDate>,
    pub wake_up_minutes: u32,
    pub daily_plan: Vec<DailyPlanItem>,
    pub schedule: DaySchedule,
    pub action: Option<Action>,
    /// Replaced action kept until the tick driver has cleaned up its object
    pub finished_action: Option<Action>,
    pub chat: ChatState,
    pub reflection: ReflectionState,
    pub planned_path: VecDeque<TileCoord>,
    pub action_path_set: bool,
}

impl Scratch {
    pub fn new(identity: Identity, tile: TileCoord, reflection_trigger_max: i32) -> Self {
        Self {
            identity,
            home_tile: tile,
            curr_tile: tile,
            curr_time: None,
            curr_day: None,
            wake_up_minutes: crate::cognition::parse::DEFAULT_WAKE_UP_MINUTES,
            daily_plan: Vec::new(),
            schedule: DaySchedule::default(),
            action: None,
            finished_action: None,
            chat: ChatState::default(),
            reflection: ReflectionState {
                trigger: reflection_trigger_max,
                trigger_max: reflection_trigger_max,
                pending_chat: None,
            },
            planned_path: VecDeque::new(),
            action_path_set: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Whether a new action has to be determined at `now`
    ///
    /// True without an action. While chatting the chat's end time decides
    /// (an open chat never finishes by itself); otherwise start + duration,
    /// compared at minute granularity.
    pub fn is_action_finished(&self, now: &NaiveDateTime) -> bool {
        let Some(action) = &self.action else {
            return true;
        };
        let end = if self.chat.chatting_with.is_some() {
            match self.chat.chatting_end_time {
                Some(end) => floor_minute(&end),
                None => return false,
            }
        } else {
            action.end_time()
        };
        floor_minute(now) >= end
    }

    /// Install a new action, archiving the old one and resetting the path
    pub fn set_action(&mut self, action: Action) {
        if let Some(old) = self.action.replace(action) {
            self.finished_action = Some(old);
        }
        self.planned_path.clear();
        self.action_path_set = false;
    }

    pub fn is_chatting(&self) -> bool {
        self.chat.chatting_with.is_some()
    }

    pub fn is_waiting(&self) -> bool {
        self.action.as_ref().is_some_and(Action::is_waiting)
    }

    pub fn is_asleep(&self) -> bool {
        self.action.as_ref().is_some_and(Action::is_sleeping)
    }

    pub fn activity_description(&self) -> String {
        self.action
            .as_ref()
            .map(|a| a.description.clone())
            .unwrap_or_else(|| "idle".to_string())
    }

    /// Drop chat state once the current action is no longer a chat
    pub fn clear_chat_if_done(&mut self) {
        let chatting = self
            .action
            .as_ref()
            .is_some_and(|a| a.event.predicate == CHAT_PREDICATE);
        if !chatting {
            self.chat.clear();
        }
    }
}
