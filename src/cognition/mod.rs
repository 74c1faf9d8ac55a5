//! External cognitive operations
//!
//! Every judgement an agent makes that is not plain arithmetic (how
//! important is this, where do I go, what do I say) goes through the
//! [`Cognition`] trait. Each call carries an explicit [`CallKey`] so an
//! implementation can cache or replay answers without reading any global
//! tick counter.
//!
//! Implementations:
//! - [`llm::LlmCognition`]: prompts a hosted model, retries unparseable
//!   answers and falls back to fixed defaults
//! - [`scripted::ScriptedCognition`]: deterministic heuristics for offline
//!   runs and tests

pub mod choice;
pub mod embed;
pub mod llm;
pub mod parse;
pub mod scripted;

use std::hash::{BuildHasher, Hash};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::schedule::ScheduleSlot;
use crate::agent::scratch::Identity;
use crate::core::error::Result;
use crate::memory::{ChatTurn, MemoryKind};

pub use choice::{resolve_choice, ChoiceLevel, ChoiceRequest};
pub use embed::{cosine_similarity, HashEmbedder};
pub use llm::LlmCognition;
pub use scripted::ScriptedCognition;

/// Fixed seeds so input hashes are stable across processes
const KEY_SEEDS: (u64, u64, u64, u64) = (0x5eed_0001, 0x5eed_0002, 0x5eed_0003, 0x5eed_0004);

/// Explicit cache key of one cognitive call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallKey {
    pub agent: String,
    pub operation: String,
    pub step: u64,
    pub input_hash: u64,
}

impl CallKey {
    pub fn new(agent: &str, operation: &str, step: u64, input: impl Hash) -> Self {
        let (a, b, c, d) = KEY_SEEDS;
        let input_hash = ahash::RandomState::with_seeds(a, b, c, d).hash_one(input);
        Self {
            agent: agent.to_string(),
            operation: operation.to_string(),
            step,
            input_hash,
        }
    }

    /// Key for the n-th retry of the same call
    pub fn retry(&self, attempt: usize) -> Self {
        if attempt == 0 {
            return self.clone();
        }
        let (a, b, c, d) = KEY_SEEDS;
        Self {
            input_hash: ahash::RandomState::with_seeds(a, b, c, d).hash_one((self.input_hash, attempt)),
            ..self.clone()
        }
    }
}

/// Subject, predicate, object
pub type Triple = (String, String, String);

/// One entry of the broad-strokes daily plan
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DailyPlanItem {
    pub time: String,
    pub activity: String,
}

impl DailyPlanItem {
    pub fn new(time: impl Into<String>, activity: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            activity: activity.into(),
        }
    }
}

impl std::fmt::Display for DailyPlanItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.activity, self.time)
    }
}

/// Plan plus status for a new day, derived from yesterday's memories
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DayStatus {
    pub plan: Vec<DailyPlanItem>,
    /// One-line status replacing the agent's "currently" field
    pub status: String,
}

/// What an agent does in one hour of the day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyActivity {
    /// Hour of day, 0..24
    pub hour: u32,
    pub activity: String,
}

/// Inputs for decomposing one coarse schedule slot
#[derive(Debug, Clone, Hash)]
pub struct DecompositionRequest {
    pub activity: String,
    pub duration: u32,
    /// Minute of day the slot starts
    pub start_minute: u32,
    /// Activities of the neighbouring slots
    pub surrounding: Vec<String>,
}

/// Inputs for rewriting a window of the schedule after an interruption
#[derive(Debug, Clone, Hash)]
pub struct RedecompositionRequest {
    /// The original slots of the window
    pub original: Vec<ScheduleSlot>,
    /// Slots already fixed: truncated originals plus the inserted activity
    pub fixed: Vec<ScheduleSlot>,
    /// Minutes that remain to be filled after `fixed`
    pub remaining: u32,
    pub window_start_minute: u32,
}

/// New state of the object an action uses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectState {
    pub description: String,
    pub triple: Triple,
}

/// Context shared by the talk and react decisions
#[derive(Debug, Clone, Hash)]
pub struct SocialContext {
    pub initiator: String,
    pub target: String,
    pub time: String,
    /// Retrieved memories about the target
    pub memories: Vec<String>,
    /// Summary of the last finished conversation, if any
    pub last_chat: Option<String>,
    pub initiator_activity: String,
    pub target_activity: String,
}

/// Answer of the react decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReactMode {
    /// Wait until the other agent's current action ends
    Wait,
    DoOtherThings,
    Keep,
}

impl ReactMode {
    /// Decode the 1/2/3 answer of the react prompt
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ReactMode::Wait),
            2 => Some(ReactMode::DoOtherThings),
            3 => Some(ReactMode::Keep),
            _ => None,
        }
    }
}

/// Everything the speaker knows when producing the next utterance
#[derive(Debug, Clone, Hash)]
pub struct ConversationContext {
    pub speaker: Identity,
    pub listener: String,
    pub time: String,
    pub relationship: String,
    pub listener_activity: String,
    pub transcript: Vec<ChatTurn>,
    pub memories: Vec<String>,
    /// Reminder of a conversation that ended long ago
    pub past_context: Option<String>,
}

/// One generated utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    pub ends_conversation: bool,
}

/// A reflected insight and the statement indices supporting it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub insight: String,
    pub evidence: Vec<usize>,
}

/// The cognitive operations an agent consumes
///
/// Implementations should answer every call; the agent cycle still treats
/// an `Err` as "use the default" and never lets it stop the simulation.
#[async_trait]
pub trait Cognition: Send + Sync {
    /// Importance of a memory, 1 (mundane) to 10 (poignant)
    async fn rate_poignancy(
        &self,
        key: &CallKey,
        identity: &Identity,
        kind: MemoryKind,
        description: &str,
    ) -> Result<u8>;

    async fn decide_to_talk(&self, key: &CallKey, context: &SocialContext) -> Result<bool>;

    async fn decide_to_react(&self, key: &CallKey, context: &SocialContext) -> Result<ReactMode>;

    /// Wake-up time as "HH:MM AM/PM"
    async fn estimate_wake_up_hour(&self, key: &CallKey, identity: &Identity) -> Result<String>;

    async fn create_daily_plan(
        &self,
        key: &CallKey,
        identity: &Identity,
        wake_up_hour: u32,
    ) -> Result<Vec<DailyPlanItem>>;

    async fn create_daily_plan_and_status(
        &self,
        key: &CallKey,
        identity: &Identity,
        yesterday: &[String],
        wake_up_hour: u32,
    ) -> Result<DayStatus>;

    /// Hour-by-hour activities; callers fill gaps and normalize
    async fn create_hourly_schedule(
        &self,
        key: &CallKey,
        identity: &Identity,
        plan: &[DailyPlanItem],
        wake_up_hour: u32,
    ) -> Result<Vec<HourlyActivity>>;

    /// Sub-activities of one slot; callers fix the durations up
    async fn decompose_task(
        &self,
        key: &CallKey,
        identity: &Identity,
        request: &DecompositionRequest,
    ) -> Result<Vec<ScheduleSlot>>;

    /// Slots for the rest of an interrupted schedule window
    async fn redecompose_schedule(
        &self,
        key: &CallKey,
        identity: &Identity,
        request: &RedecompositionRequest,
    ) -> Result<Vec<ScheduleSlot>>;

    /// One answer to a constrained choice; see [`choice::resolve_choice`]
    async fn choose(&self, key: &CallKey, request: &ChoiceRequest) -> Result<String>;

    /// Emoji rendering of an action
    async fn action_pronunciatio(&self, key: &CallKey, description: &str) -> Result<String>;

    async fn action_event_triple(&self, key: &CallKey, name: &str, description: &str) -> Result<Triple>;

    async fn object_state(
        &self,
        key: &CallKey,
        name: &str,
        object: &str,
        action_description: &str,
    ) -> Result<ObjectState>;

    async fn run_conversation_turn(&self, key: &CallKey, context: &ConversationContext) -> Result<Utterance>;

    async fn summarize_conversation(&self, key: &CallKey, turns: &[ChatTurn]) -> Result<String>;

    async fn summarize_relationship(
        &self,
        key: &CallKey,
        initiator: &str,
        target: &str,
        memories: &[String],
    ) -> Result<String>;

    async fn reflection_points(
        &self,
        key: &CallKey,
        name: &str,
        memories: &[String],
        count: usize,
    ) -> Result<Vec<String>>;

    async fn evidence_and_insights(
        &self,
        key: &CallKey,
        name: &str,
        statements: &[String],
        count: usize,
    ) -> Result<Vec<Insight>>;

    async fn memo_on_conversation(&self, key: &CallKey, name: &str, transcript: &str) -> Result<String>;

    async fn planning_on_conversation(&self, key: &CallKey, name: &str, transcript: &str) -> Result<String>;

    async fn embed(&self, key: &CallKey, text: &str) -> Result<Vec<f32>>;

    fn similarity(&self, query: &[f32], content: &[f32]) -> f32 {
        cosine_similarity(query, content)
    }
}
