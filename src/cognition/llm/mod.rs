//! Cognition backed by a hosted language model
//!
//! Each operation renders a prompt, asks for a JSON object, and validates
//! the answer. Unparseable or invalid answers are retried up to
//! `cognition_retries` times; after that the operation returns its fixed
//! default (wake up at 6:00, emoji 🤷, "name is description" triple, ...),
//! so a flaky model degrades an agent's day rather than stopping it.

pub mod cache;
pub mod client;
pub mod prompts;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::agent::action::DEFAULT_EMOJI;
use crate::agent::schedule::ScheduleSlot;
use crate::agent::scratch::Identity;
use crate::core::error::{Result, TownError};
use crate::core::event::short_name;
use crate::memory::{ChatTurn, MemoryKind};

use super::embed::HashEmbedder;
use super::{
    CallKey, ChoiceRequest, Cognition, ConversationContext, DailyPlanItem, DayStatus, DecompositionRequest,
    HourlyActivity, Insight, ObjectState, ReactMode, RedecompositionRequest, SocialContext, Triple, Utterance,
};

pub use cache::ResponseCache;
pub use client::LlmClient;
use prompts::Prompt;

/// Rating used when the model never produces a usable one
const DEFAULT_POIGNANCY: u8 = 4;

pub struct LlmCognition {
    client: LlmClient,
    cache: ResponseCache,
    embedder: HashEmbedder,
    retries: usize,
}

impl LlmCognition {
    pub fn new(client: LlmClient, retries: usize) -> Self {
        Self {
            client,
            cache: ResponseCache::new(),
            embedder: HashEmbedder::default(),
            retries: retries.max(1),
        }
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Ask until an answer parses into `T` and passes `valid`
    async fn ask<T, F>(&self, key: &CallKey, prompt: &Prompt, valid: F) -> Option<T>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        if let Some(cached) = self.cache.get(key) {
            if let Ok(answer) = parse_json::<T>(&cached) {
                return Some(answer);
            }
        }

        for attempt in 1..=self.retries {
            let raw = match self.client.complete(&prompt.system, &prompt.user).await {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!("{} for {} failed (attempt {}): {}", key.operation, key.agent, attempt, e);
                    continue;
                }
            };
            match parse_json::<T>(&raw) {
                Ok(answer) if valid(&answer) => {
                    self.cache.insert(key.clone(), raw);
                    return Some(answer);
                }
                Ok(_) => tracing::debug!("{}: answer failed validation: {}", key.operation, raw),
                Err(e) => tracing::debug!("{}: {}", key.operation, e),
            }
        }

        tracing::warn!("{} for {}: no usable answer, using default", key.operation, key.agent);
        None
    }
}

/// Extract the JSON object from a model answer (handles surrounding text)
pub fn extract_json(response: &str) -> Result<&str> {
    let start = response
        .find('{')
        .ok_or_else(|| TownError::Cognition("No JSON found in response".into()))?;
    let end = response
        .rfind('}')
        .ok_or_else(|| TownError::Cognition("No closing brace found in response".into()))?;
    if end < start {
        return Err(TownError::Cognition("Malformed JSON in response".into()));
    }
    Ok(&response[start..=end])
}

fn parse_json<T: DeserializeOwned>(response: &str) -> Result<T> {
    let json = extract_json(response)?;
    serde_json::from_str(json).map_err(|e| TownError::Cognition(format!("{} - response: {}", e, response)))
}

#[derive(Deserialize)]
struct Rating {
    rating: u8,
}

#[derive(Deserialize)]
struct YesNo {
    answer: String,
}

#[derive(Deserialize)]
struct ReactAnswer {
    option: u8,
}

#[derive(Deserialize)]
struct WakeUp {
    wake_up: String,
}

#[derive(Deserialize)]
struct Plan {
    plan: Vec<DailyPlanItem>,
}

#[derive(Deserialize)]
struct PlanAndStatus {
    status: String,
    plan: Vec<DailyPlanItem>,
}

#[derive(Deserialize)]
struct Hours {
    hours: Vec<HourlyActivity>,
}

#[derive(Deserialize)]
struct Subtask {
    activity: String,
    duration: u32,
}

#[derive(Deserialize)]
struct Subtasks {
    subtasks: Vec<Subtask>,
}

impl Subtasks {
    fn into_slots(self) -> Vec<ScheduleSlot> {
        self.subtasks
            .into_iter()
            .map(|s| ScheduleSlot::new(s.activity, s.duration))
            .collect()
    }
}

#[derive(Deserialize)]
struct Answer {
    answer: String,
}

#[derive(Deserialize)]
struct Emoji {
    emoji: String,
}

#[derive(Deserialize)]
struct TripleAnswer {
    subject: String,
    predicate: String,
    object: String,
}

#[derive(Deserialize)]
struct ObjectAnswer {
    description: String,
    predicate: String,
    object: String,
}

#[derive(Deserialize)]
struct Turn {
    utterance: String,
    end: bool,
}

#[derive(Deserialize)]
struct Summary {
    summary: String,
}

#[derive(Deserialize)]
struct Questions {
    questions: Vec<String>,
}

#[derive(Deserialize)]
struct Insights {
    insights: Vec<Insight>,
}

#[derive(Deserialize)]
struct Memo {
    memo: String,
}

#[async_trait]
impl Cognition for LlmCognition {
    async fn rate_poignancy(&self, key: &CallKey, identity: &Identity, kind: MemoryKind, description: &str) -> Result<u8> {
        let prompt = prompts::rate_poignancy(identity, kind, description);
        let rating = self
            .ask::<Rating, _>(key, &prompt, |r| (1..=10).contains(&r.rating))
            .await
            .map(|r| r.rating)
            .unwrap_or(DEFAULT_POIGNANCY);
        Ok(rating)
    }

    async fn decide_to_talk(&self, key: &CallKey, context: &SocialContext) -> Result<bool> {
        let prompt = prompts::decide_to_talk(context);
        let answer = self
            .ask::<YesNo, _>(key, &prompt, |a| matches!(a.answer.trim().to_lowercase().as_str(), "yes" | "no"))
            .await;
        Ok(answer.is_some_and(|a| a.answer.trim().eq_ignore_ascii_case("yes")))
    }

    async fn decide_to_react(&self, key: &CallKey, context: &SocialContext) -> Result<ReactMode> {
        let prompt = prompts::decide_to_react(context);
        let mode = self
            .ask::<ReactAnswer, _>(key, &prompt, |a| ReactMode::from_code(a.option).is_some())
            .await
            .and_then(|a| ReactMode::from_code(a.option))
            .unwrap_or(ReactMode::DoOtherThings);
        Ok(mode)
    }

    async fn estimate_wake_up_hour(&self, key: &CallKey, identity: &Identity) -> Result<String> {
        let prompt = prompts::wake_up_hour(identity);
        let answer = self
            .ask::<WakeUp, _>(key, &prompt, |w| super::parse::parse_clock(&w.wake_up).is_some())
            .await
            .map(|w| w.wake_up)
            .unwrap_or_else(|| "06:00 AM".to_string());
        Ok(answer)
    }

    async fn create_daily_plan(&self, key: &CallKey, identity: &Identity, wake_up_hour: u32) -> Result<Vec<DailyPlanItem>> {
        let prompt = prompts::daily_plan(identity, wake_up_hour);
        let plan = self
            .ask::<Plan, _>(key, &prompt, |p| !p.plan.is_empty())
            .await
            .map(|p| p.plan)
            .unwrap_or_else(|| {
                vec![DailyPlanItem::new(
                    format!("{}:00", wake_up_hour),
                    "wake up and complete the morning routine",
                )]
            });
        Ok(plan)
    }

    async fn create_daily_plan_and_status(
        &self,
        key: &CallKey,
        identity: &Identity,
        yesterday: &[String],
        wake_up_hour: u32,
    ) -> Result<DayStatus> {
        let prompt = prompts::daily_plan_and_status(identity, yesterday, wake_up_hour);
        match self.ask::<PlanAndStatus, _>(key, &prompt, |p| !p.plan.is_empty()).await {
            Some(answer) => Ok(DayStatus {
                plan: answer.plan,
                status: answer.status,
            }),
            None => Ok(DayStatus {
                plan: self.create_daily_plan(&key.retry(1), identity, wake_up_hour).await?,
                status: identity.currently.clone(),
            }),
        }
    }

    async fn create_hourly_schedule(
        &self,
        key: &CallKey,
        identity: &Identity,
        plan: &[DailyPlanItem],
        wake_up_hour: u32,
    ) -> Result<Vec<HourlyActivity>> {
        let prompt = prompts::hourly_schedule(identity, plan, wake_up_hour);
        let hours = self
            .ask::<Hours, _>(key, &prompt, |h| h.hours.len() >= 24)
            .await
            .map(|h| h.hours)
            .unwrap_or_else(|| {
                // Sleep until wake-up, then whatever the broad plan starts with
                let day = plan
                    .first()
                    .map(|p| p.activity.clone())
                    .unwrap_or_else(|| "going about the day".to_string());
                (0..24)
                    .map(|hour| HourlyActivity {
                        hour,
                        activity: if hour < wake_up_hour || hour >= 23 { "sleeping".into() } else { day.clone() },
                    })
                    .collect()
            });
        Ok(hours)
    }

    async fn decompose_task(&self, key: &CallKey, identity: &Identity, request: &DecompositionRequest) -> Result<Vec<ScheduleSlot>> {
        let prompt = prompts::decompose(identity, request);
        let slots = self
            .ask::<Subtasks, _>(key, &prompt, |s| !s.subtasks.is_empty())
            .await
            .map(Subtasks::into_slots)
            .unwrap_or_else(|| vec![ScheduleSlot::new(request.activity.clone(), request.duration)]);
        Ok(slots)
    }

    async fn redecompose_schedule(
        &self,
        key: &CallKey,
        identity: &Identity,
        request: &RedecompositionRequest,
    ) -> Result<Vec<ScheduleSlot>> {
        let prompt = prompts::redecompose(identity, request);
        self.ask::<Subtasks, _>(key, &prompt, |s| !s.subtasks.is_empty())
            .await
            .map(Subtasks::into_slots)
            .ok_or_else(|| TownError::Cognition("no schedule for the interrupted window".into()))
    }

    async fn choose(&self, key: &CallKey, request: &ChoiceRequest) -> Result<String> {
        let prompt = prompts::choose(request);
        // Validation is left to resolve_choice, which retries with new keys
        self.ask::<Answer, _>(key, &prompt, |_| true)
            .await
            .map(|a| a.answer)
            .ok_or_else(|| TownError::Cognition("no choice".into()))
    }

    async fn action_pronunciatio(&self, key: &CallKey, description: &str) -> Result<String> {
        let prompt = prompts::pronunciatio(description);
        let emoji = self
            .ask::<Emoji, _>(key, &prompt, |e| !e.emoji.trim().is_empty())
            .await
            .map(|e| e.emoji.trim().chars().take(3).collect())
            .unwrap_or_else(|| DEFAULT_EMOJI.to_string());
        Ok(emoji)
    }

    async fn action_event_triple(&self, key: &CallKey, name: &str, description: &str) -> Result<Triple> {
        let prompt = prompts::event_triple(name, description);
        let triple = self
            .ask::<TripleAnswer, _>(key, &prompt, |t| !t.predicate.trim().is_empty() && !t.object.trim().is_empty())
            .await
            .map(|t| (t.subject, t.predicate, t.object))
            .unwrap_or_else(|| (name.to_string(), "is".to_string(), description.to_string()));
        Ok(triple)
    }

    async fn object_state(&self, key: &CallKey, name: &str, object: &str, action_description: &str) -> Result<ObjectState> {
        let short = short_name(object);
        let prompt = prompts::object_state(name, short, action_description);
        let state = self
            .ask::<ObjectAnswer, _>(key, &prompt, |o| !o.object.trim().is_empty())
            .await
            .map(|o| ObjectState {
                description: o.description,
                triple: (short.to_string(), o.predicate, o.object),
            })
            .unwrap_or_else(|| ObjectState {
                description: format!("{} is being used", short),
                triple: (short.to_string(), "is".into(), "being used".into()),
            });
        Ok(state)
    }

    async fn run_conversation_turn(&self, key: &CallKey, context: &ConversationContext) -> Result<Utterance> {
        let prompt = prompts::conversation_turn(context);
        let utterance = self
            .ask::<Turn, _>(key, &prompt, |t| !t.utterance.trim().is_empty())
            .await
            .map(|t| Utterance {
                text: t.utterance,
                ends_conversation: t.end,
            })
            .unwrap_or_else(|| Utterance {
                text: "Sorry, I have to go.".into(),
                ends_conversation: true,
            });
        Ok(utterance)
    }

    async fn summarize_conversation(&self, key: &CallKey, turns: &[ChatTurn]) -> Result<String> {
        let prompt = prompts::summarize_conversation(turns);
        let summary = self
            .ask::<Summary, _>(key, &prompt, |s| !s.summary.trim().is_empty())
            .await
            .map(|s| s.summary)
            .unwrap_or_else(|| "conversing".to_string());
        Ok(summary)
    }

    async fn summarize_relationship(&self, key: &CallKey, initiator: &str, target: &str, memories: &[String]) -> Result<String> {
        let prompt = prompts::summarize_relationship(initiator, target, memories);
        let summary = self
            .ask::<Summary, _>(key, &prompt, |s| !s.summary.trim().is_empty())
            .await
            .map(|s| s.summary)
            .unwrap_or_else(|| format!("{} knows {}", initiator, target));
        Ok(summary)
    }

    async fn reflection_points(&self, key: &CallKey, name: &str, memories: &[String], count: usize) -> Result<Vec<String>> {
        let prompt = prompts::reflection_points(name, memories, count);
        let mut questions = self
            .ask::<Questions, _>(key, &prompt, |q| !q.questions.is_empty())
            .await
            .map(|q| q.questions)
            .unwrap_or_default();
        questions.truncate(count);
        Ok(questions)
    }

    async fn evidence_and_insights(&self, key: &CallKey, name: &str, statements: &[String], count: usize) -> Result<Vec<Insight>> {
        let prompt = prompts::insights(name, statements, count);
        let mut insights = self
            .ask::<Insights, _>(key, &prompt, |i| !i.insights.is_empty())
            .await
            .map(|i| i.insights)
            .unwrap_or_default();
        insights.truncate(count);
        for insight in &mut insights {
            insight.evidence.retain(|i| *i < statements.len());
        }
        Ok(insights)
    }

    async fn memo_on_conversation(&self, key: &CallKey, name: &str, text: &str) -> Result<String> {
        let prompt = prompts::conversation_memo(name, text);
        self.ask::<Memo, _>(key, &prompt, |m| !m.memo.trim().is_empty())
            .await
            .map(|m| m.memo)
            .ok_or_else(|| TownError::Cognition("no memo".into()))
    }

    async fn planning_on_conversation(&self, key: &CallKey, name: &str, text: &str) -> Result<String> {
        let prompt = prompts::conversation_planning(name, text);
        self.ask::<Memo, _>(key, &prompt, |m| !m.memo.trim().is_empty())
            .await
            .map(|m| m.memo)
            .ok_or_else(|| TownError::Cognition("no planning note".into()))
    }

    async fn embed(&self, _key: &CallKey, text: &str) -> Result<Vec<f32>> {
        Ok(self.embedder.embed(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_with_surrounding_text() {
        let response = "Sure! Here it is: {\"rating\": 7} Hope that helps.";
        assert_eq!(extract_json(response).unwrap(), "{\"rating\": 7}");
        assert!(extract_json("no json here").is_err());
        assert!(extract_json("} backwards {").is_err());
    }

    #[test]
    fn test_parse_typed_answers() {
        let rating: Rating = parse_json("```json\n{\"rating\": 3}\n```").unwrap();
        assert_eq!(rating.rating, 3);
        let subtasks: Subtasks = parse_json(
            "{\"subtasks\": [{\"activity\": \"grind beans\", \"duration\": 10}, {\"activity\": \"brew\", \"duration\": 20}]}",
        )
        .unwrap();
        assert_eq!(subtasks.into_slots().len(), 2);
        assert!(parse_json::<Rating>("{\"score\": 3}").is_err());
    }

    #[tokio::test]
    async fn test_cached_answer_skips_the_network() {
        // The URL is never contacted because the cache already holds an answer
        let client = LlmClient::new("k".into(), "http://127.0.0.1:9/v1/chat".into(), "m".into());
        let cognition = LlmCognition::new(client, 1);
        let key = CallKey::new("Klaus", "action_pronunciatio", 0, "reading");
        cognition.cache().insert(key.clone(), "{\"emoji\": \"📖\"}".into());
        assert_eq!(cognition.action_pronunciatio(&key, "reading").await.unwrap(), "📖");
    }
}
