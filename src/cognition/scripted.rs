//! Deterministic cognition for offline runs and tests
//!
//! Answers come from keyword heuristics over the inputs, so a run with the
//! same seed always plays out the same way. Tests pin individual answers
//! with the `with_*` builders and inspect how often an operation was called.

use std::sync::Mutex;

use ahash::AHashMap;
use async_trait::async_trait;

use crate::agent::schedule::{remainder_after, total, ScheduleSlot};
use crate::agent::scratch::Identity;
use crate::core::error::Result;
use crate::core::event::short_name;
use crate::memory::{ChatTurn, MemoryKind};

use super::embed::HashEmbedder;
use super::{
    CallKey, ChoiceLevel, ChoiceRequest, Cognition, ConversationContext, DailyPlanItem, DayStatus,
    DecompositionRequest, HourlyActivity, Insight, ObjectState, ReactMode, RedecompositionRequest,
    SocialContext, Triple, Utterance,
};

const DEFAULT_CHAT_LENGTH: usize = 4;

/// Place words an activity keyword points at
const PLACE_CUES: &[(&[&str], &[&str])] = &[
    (&["sleep", "bed", "nap", "wake", "morning", "shower", "dress"], &["bed", "bedroom", "bathroom", "house", "home"]),
    (&["breakfast", "lunch", "dinner", "eat", "cook", "coffee", "meal"], &["cafe", "kitchen", "counter", "table", "stove"]),
    (&["work", "study", "read", "write", "research", "paint"], &["desk", "office", "library", "college", "studio"]),
    (&["walk", "relax", "exercise", "stroll", "jog"], &["park", "garden", "bench", "street"]),
];

#[derive(Debug)]
pub struct ScriptedCognition {
    embedder: HashEmbedder,
    poignancy: Option<u8>,
    talk: bool,
    react: ReactMode,
    wake_up: String,
    choice_answer: Option<String>,
    chat_length: usize,
    hourly: Option<Vec<String>>,
    calls: Mutex<AHashMap<String, usize>>,
}

impl Default for ScriptedCognition {
    fn default() -> Self {
        Self {
            embedder: HashEmbedder::default(),
            poignancy: None,
            talk: false,
            react: ReactMode::Keep,
            wake_up: "06:00 AM".into(),
            choice_answer: None,
            chat_length: DEFAULT_CHAT_LENGTH,
            hourly: None,
            calls: Mutex::new(AHashMap::new()),
        }
    }
}

impl ScriptedCognition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rate every non-idle memory with this fixed value
    pub fn with_poignancy(mut self, rating: u8) -> Self {
        self.poignancy = Some(rating.clamp(1, 10));
        self
    }

    pub fn with_talk_decision(mut self, talk: bool) -> Self {
        self.talk = talk;
        self
    }

    pub fn with_react_mode(mut self, mode: ReactMode) -> Self {
        self.react = mode;
        self
    }

    pub fn with_wake_up(mut self, answer: impl Into<String>) -> Self {
        self.wake_up = answer.into();
        self
    }

    /// Answer every constrained choice with this text, valid or not
    pub fn with_choice_answer(mut self, answer: impl Into<String>) -> Self {
        self.choice_answer = Some(answer.into());
        self
    }

    /// Utterances after which a conversation ends
    pub fn with_chat_length(mut self, turns: usize) -> Self {
        self.chat_length = turns.max(1);
        self
    }

    /// Fixed activity per hour, index = hour of day
    pub fn with_hourly_schedule<S: Into<String>>(mut self, hours: impl IntoIterator<Item = S>) -> Self {
        self.hourly = Some(hours.into_iter().map(Into::into).collect());
        self
    }

    /// How many times `operation` has been called
    pub fn calls(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.get(operation).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn record(&self, operation: &str) {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(operation.to_string()).or_insert(0) += 1;
        }
    }

    fn default_hour(hour: u32, wake_hour: u32) -> &'static str {
        match hour {
            h if h < wake_hour => "sleeping",
            h if h == wake_hour => "waking up and completing the morning routine",
            h if h == wake_hour + 1 && h < 12 => "having breakfast",
            12 => "having lunch",
            18 => "having dinner",
            h if h < 18 => "working",
            19..=21 => "relaxing with a walk",
            _ => "sleeping",
        }
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Score options by how many of their words the cues mention
fn best_option(request: &ChoiceRequest) -> Option<String> {
    let activity = request.activity.to_lowercase();
    let mut cues = words(&activity);
    for (triggers, places) in PLACE_CUES {
        if triggers.iter().any(|t| activity.contains(t)) {
            cues.extend(places.iter().map(|p| p.to_string()));
            if places.contains(&"home") {
                cues.extend(words(&request.context));
            }
        }
    }

    let mut best: Option<(&String, usize)> = None;
    for option in &request.options {
        let score = words(option).iter().filter(|w| cues.contains(w)).count();
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((option, score));
        }
    }
    best.map(|(option, _)| option.clone())
}

#[async_trait]
impl Cognition for ScriptedCognition {
    async fn rate_poignancy(&self, _key: &CallKey, _identity: &Identity, kind: MemoryKind, description: &str) -> Result<u8> {
        self.record("rate_poignancy");
        if let Some(rating) = self.poignancy {
            return Ok(rating);
        }
        let rating = match kind {
            MemoryKind::Chat => 5,
            MemoryKind::Thought => 4,
            _ if description.contains("sleep") => 1,
            _ => 3,
        };
        Ok(rating)
    }

    async fn decide_to_talk(&self, _key: &CallKey, _context: &SocialContext) -> Result<bool> {
        self.record("decide_to_talk");
        Ok(self.talk)
    }

    async fn decide_to_react(&self, _key: &CallKey, _context: &SocialContext) -> Result<ReactMode> {
        self.record("decide_to_react");
        Ok(self.react)
    }

    async fn estimate_wake_up_hour(&self, _key: &CallKey, _identity: &Identity) -> Result<String> {
        self.record("estimate_wake_up_hour");
        Ok(self.wake_up.clone())
    }

    async fn create_daily_plan(&self, _key: &CallKey, identity: &Identity, wake_up_hour: u32) -> Result<Vec<DailyPlanItem>> {
        self.record("create_daily_plan");
        Ok(vec![
            DailyPlanItem::new(format!("{}:00", wake_up_hour), "wake up and complete the morning routine"),
            DailyPlanItem::new("12:00", "have lunch"),
            DailyPlanItem::new("13:00", format!("keep on {}", identity.currently)),
            DailyPlanItem::new("18:00", "have dinner"),
            DailyPlanItem::new("22:00", "go to bed"),
        ])
    }

    async fn create_daily_plan_and_status(
        &self,
        key: &CallKey,
        identity: &Identity,
        _yesterday: &[String],
        wake_up_hour: u32,
    ) -> Result<DayStatus> {
        self.record("create_daily_plan_and_status");
        let plan = self.create_daily_plan(key, identity, wake_up_hour).await?;
        Ok(DayStatus {
            plan,
            status: identity.currently.clone(),
        })
    }

    async fn create_hourly_schedule(
        &self,
        _key: &CallKey,
        _identity: &Identity,
        _plan: &[DailyPlanItem],
        wake_up_hour: u32,
    ) -> Result<Vec<HourlyActivity>> {
        self.record("create_hourly_schedule");
        let hours = (0..24u32)
            .map(|hour| {
                let activity = match &self.hourly {
                    Some(fixed) => fixed.get(hour as usize).cloned().unwrap_or_default(),
                    None => Self::default_hour(hour, wake_up_hour).to_string(),
                };
                HourlyActivity { hour, activity }
            })
            .collect();
        Ok(hours)
    }

    async fn decompose_task(&self, _key: &CallKey, _identity: &Identity, request: &DecompositionRequest) -> Result<Vec<ScheduleSlot>> {
        self.record("decompose_task");
        let d = request.duration;
        let edge = ((d / 6) / 5 * 5).max(5);
        let middle = d.saturating_sub(2 * edge);
        Ok(vec![
            ScheduleSlot::new("getting ready", edge),
            ScheduleSlot::new(format!("focusing on {}", request.activity), middle),
            ScheduleSlot::new("wrapping up", edge),
        ])
    }

    async fn redecompose_schedule(
        &self,
        _key: &CallKey,
        _identity: &Identity,
        request: &RedecompositionRequest,
    ) -> Result<Vec<ScheduleSlot>> {
        self.record("redecompose_schedule");
        let resume = request.window_start_minute + total(&request.fixed);
        Ok(remainder_after(&request.original, request.window_start_minute, resume))
    }

    async fn choose(&self, _key: &CallKey, request: &ChoiceRequest) -> Result<String> {
        self.record("choose");
        if let Some(answer) = &self.choice_answer {
            return Ok(answer.clone());
        }
        let fallback = match request.level {
            ChoiceLevel::GameObject => "<random>",
            _ => "",
        };
        Ok(best_option(request).unwrap_or_else(|| fallback.to_string()))
    }

    async fn action_pronunciatio(&self, _key: &CallKey, description: &str) -> Result<String> {
        self.record("action_pronunciatio");
        let d = description.to_lowercase();
        let emoji = if d.contains("sleep") {
            "😴"
        } else if ["breakfast", "lunch", "dinner", "eat", "coffee"].iter().any(|w| d.contains(w)) {
            "🍳"
        } else if d.contains("work") || d.contains("study") {
            "💼"
        } else if d.contains("walk") {
            "🚶"
        } else if d.contains("read") {
            "📖"
        } else {
            "🙂"
        };
        Ok(emoji.to_string())
    }

    async fn action_event_triple(&self, _key: &CallKey, name: &str, description: &str) -> Result<Triple> {
        self.record("action_event_triple");
        let object = description.split('(').next().unwrap_or(description).trim().to_lowercase();
        Ok((name.to_string(), "is".to_string(), object))
    }

    async fn object_state(&self, _key: &CallKey, _name: &str, object: &str, _action_description: &str) -> Result<ObjectState> {
        self.record("object_state");
        let object = short_name(object).to_string();
        Ok(ObjectState {
            description: format!("{} is in use", object),
            triple: (object, "is".into(), "in use".into()),
        })
    }

    async fn run_conversation_turn(&self, _key: &CallKey, context: &ConversationContext) -> Result<Utterance> {
        self.record("run_conversation_turn");
        let n = context.transcript.len();
        let ends = n + 1 >= self.chat_length;
        let listener = context.listener.split_whitespace().next().unwrap_or(&context.listener);
        let text = if ends {
            format!("I should get going. See you later, {}!", listener)
        } else if n == 0 {
            format!("Hi {}, how are you doing?", listener)
        } else {
            format!("I'm {}. What about you?", context.speaker.currently)
        };
        Ok(Utterance {
            text,
            ends_conversation: ends,
        })
    }

    async fn summarize_conversation(&self, _key: &CallKey, turns: &[ChatTurn]) -> Result<String> {
        self.record("summarize_conversation");
        let mut speakers: Vec<&str> = Vec::new();
        for turn in turns {
            if !speakers.contains(&turn.speaker.as_str()) {
                speakers.push(&turn.speaker);
            }
        }
        Ok(format!("conversing about how {} are doing", speakers.join(" and ")))
    }

    async fn summarize_relationship(&self, _key: &CallKey, initiator: &str, target: &str, memories: &[String]) -> Result<String> {
        self.record("summarize_relationship");
        let relation = if memories.is_empty() { "have not met before" } else { "know each other" };
        Ok(format!("{} and {} {}", initiator, target, relation))
    }

    async fn reflection_points(&self, _key: &CallKey, name: &str, memories: &[String], count: usize) -> Result<Vec<String>> {
        self.record("reflection_points");
        if memories.is_empty() {
            return Ok(vec![format!("What is {} focused on?", name)]);
        }
        Ok(memories.iter().take(count).map(|m| format!("What does {} make of {}?", name, m)).collect())
    }

    async fn evidence_and_insights(&self, _key: &CallKey, name: &str, statements: &[String], count: usize) -> Result<Vec<Insight>> {
        self.record("evidence_and_insights");
        Ok(statements
            .iter()
            .take(count)
            .enumerate()
            .map(|(i, s)| Insight {
                insight: format!("{} has noticed {}", name, s),
                evidence: vec![i],
            })
            .collect())
    }

    async fn memo_on_conversation(&self, _key: &CallKey, _name: &str, transcript: &str) -> Result<String> {
        self.record("memo_on_conversation");
        let lines = transcript.lines().count();
        Ok(format!("had a conversation of {} lines", lines))
    }

    async fn planning_on_conversation(&self, _key: &CallKey, _name: &str, _transcript: &str) -> Result<String> {
        self.record("planning_on_conversation");
        Ok("I should follow up on what we talked about".to_string())
    }

    async fn embed(&self, _key: &CallKey, text: &str) -> Result<Vec<f32>> {
        self.record("embed");
        Ok(self.embedder.embed(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(op: &str) -> CallKey {
        CallKey::new("Klaus", op, 0, "")
    }

    #[test]
    fn test_best_option_follows_activity() {
        let request = ChoiceRequest::new(
            ChoiceLevel::Arena,
            "Klaus",
            "having lunch",
            "home: the Ville:house:bedroom",
            vec!["bedroom".into(), "kitchen".into()],
        );
        assert_eq!(best_option(&request).as_deref(), Some("kitchen"));
    }

    #[tokio::test]
    async fn test_pinned_answers_and_call_counts() {
        let c = ScriptedCognition::new().with_talk_decision(true).with_poignancy(8);
        let ctx = SocialContext {
            initiator: "Klaus".into(),
            target: "Maria".into(),
            time: String::new(),
            memories: vec![],
            last_chat: None,
            initiator_activity: String::new(),
            target_activity: String::new(),
        };
        assert!(c.decide_to_talk(&key("decide_to_talk"), &ctx).await.unwrap());
        assert_eq!(c.calls("decide_to_talk"), 1);
        assert_eq!(c.calls("decide_to_react"), 0);
    }

    #[tokio::test]
    async fn test_hourly_schedule_covers_the_day() {
        let c = ScriptedCognition::new();
        let identity = Identity {
            name: "Klaus Mueller".into(),
            age: 20,
            innate: String::new(),
            learned: String::new(),
            currently: "writing a paper".into(),
            lifestyle: String::new(),
            living_area: String::new(),
        };
        let hours = c.create_hourly_schedule(&key("h"), &identity, &[], 7).await.unwrap();
        assert_eq!(hours.len(), 24);
        assert_eq!(hours[6].activity, "sleeping");
        assert_eq!(hours[7].activity, "waking up and completing the morning routine");
        assert_eq!(hours[12].activity, "having lunch");
    }
}
