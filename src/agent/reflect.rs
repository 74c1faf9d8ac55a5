//! Reflect: turn accumulated experience into thoughts
//!
//! Two independent triggers:
//! - the importance counter reached zero: pick focal points from recent
//!   memories, gather evidence for each, and store the insights as
//!   THOUGHT memories linked to that evidence
//! - a conversation just closed: store a planning note and a memo about it

use crate::core::error::Result;
use crate::core::event::Event;
use crate::core::types::MemoryId;
use crate::memory::node::transcript;
use crate::memory::{Filling, MemoryKind, NewMemory};

use super::perceive::{expiration, poignancy};
use super::{recover, CycleContext};

pub async fn reflect(ctx: &mut CycleContext<'_>) -> Result<()> {
    if ctx.agent.scratch.reflection.trigger <= 0 {
        reflect_on_recent(ctx).await;
    }
    if ctx.agent.scratch.reflection.pending_chat.is_some() {
        conversation_takeaways(ctx).await;
    }
    Ok(())
}

async fn reflect_on_recent(ctx: &mut CycleContext<'_>) {
    let name = ctx.name().to_string();
    let limit = ctx.config.retrieval_limit;
    let recent: Vec<String> = ctx
        .memory
        .get_most_recent_memories(limit)
        .iter()
        .map(|m| m.description().to_string())
        .collect();

    let mut stored = 0;
    if !recent.is_empty() {
        let count = ctx.config.reflection_focal_points;
        let key = ctx.key("reflection_points", &recent);
        let points = recover(
            ctx.cognition.reflection_points(&key, &name, &recent, count).await,
            "reflection_points",
            &name,
        )
        .unwrap_or_default();

        let mut statements: Vec<(MemoryId, String)> = Vec::new();
        for point in points.iter().take(count) {
            let embedding = ctx.embed(point).await;
            let now = ctx.now();
            let params = ctx.retrieval_params();
            let cognition = ctx.cognition;
            let found = ctx.memory.retrieve_relevant_entries(
                &embedding,
                now,
                limit,
                &[MemoryKind::Event, MemoryKind::Thought],
                &params,
                |q, c| cognition.similarity(q, c),
            );
            for node in found {
                if statements.iter().all(|(id, _)| *id != node.id) {
                    statements.push((node.id, node.description().to_string()));
                }
            }
        }

        let texts: Vec<String> = statements.iter().map(|(_, s)| s.clone()).collect();
        let count = ctx.config.reflection_insights;
        let key = ctx.key("evidence_and_insights", &texts);
        let insights = recover(
            ctx.cognition.evidence_and_insights(&key, &name, &texts, count).await,
            "evidence_and_insights",
            &name,
        )
        .unwrap_or_default();

        let mut thoughts = Vec::new();
        for insight in insights.into_iter().take(count) {
            let evidence = insight
                .evidence
                .iter()
                .filter_map(|&i| statements.get(i).map(|(id, _)| *id))
                .collect();
            thoughts.push(thought(ctx, &insight.insight, Filling::Evidence(evidence)).await);
        }

        stored = thoughts.len();
        for memory in thoughts {
            ctx.memory.add(memory);
        }
    }

    let reflection = &mut ctx.agent.scratch.reflection;
    reflection.trigger = reflection.trigger_max;
    tracing::info!("{} reflected, {} new thoughts", name, stored);
    ctx.whisper(1, format!("reflected and formed {} thoughts", stored));
}

async fn conversation_takeaways(ctx: &mut CycleContext<'_>) {
    let name = ctx.name().to_string();
    let Some(partner) = ctx.agent.scratch.reflection.pending_chat.clone() else {
        return;
    };
    let Some(chat) = ctx.memory.last_conversation_with(&partner) else {
        ctx.agent.scratch.reflection.pending_chat = None;
        return;
    };
    let chat_id = chat.id;
    let text = transcript(chat.filling.turns());

    let key = ctx.key("planning_on_conversation", &text);
    let planning = recover(
        ctx.cognition.planning_on_conversation(&key, &name, &text).await,
        "planning_on_conversation",
        &name,
    );
    let key = ctx.key("memo_on_conversation", &text);
    let memo = recover(
        ctx.cognition.memo_on_conversation(&key, &name, &text).await,
        "memo_on_conversation",
        &name,
    );

    let mut thoughts = Vec::new();
    if let Some(planning) = planning {
        let text = format!("for {}'s planning: {}", name, planning);
        thoughts.push(thought(ctx, &text, Filling::Evidence(vec![chat_id])).await);
    }
    if let Some(memo) = memo {
        let text = format!("{} {}", name, memo);
        thoughts.push(thought(ctx, &text, Filling::Evidence(vec![chat_id])).await);
    }

    for memory in thoughts {
        ctx.memory.add(memory);
    }
    ctx.agent.scratch.reflection.pending_chat = None;
    tracing::debug!("{} noted takeaways from the chat with {}", name, partner);
}

/// A THOUGHT memory with the agent as subject
async fn thought(ctx: &CycleContext<'_>, text: &str, filling: Filling) -> NewMemory {
    let name = ctx.name().to_string();
    let key = ctx.key("action_event_triple", text);
    let (_, predicate, object) = recover(
        ctx.cognition.action_event_triple(&key, &name, text).await,
        "action_event_triple",
        &name,
    )
    .unwrap_or_else(|| (name.clone(), "is".to_string(), text.to_string()));
    let event = Event::new(&name, predicate, object, text);

    let rating = poignancy(ctx, MemoryKind::Thought, &event).await;
    let embedding = ctx.embed(text).await;
    NewMemory::new(MemoryKind::Thought, event, ctx.now())
        .poignancy(rating)
        .expires(expiration(ctx))
        .filling(filling)
        .embedding(embedding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cognition::ScriptedCognition;
    use crate::memory::ChatTurn;
    use crate::test_support::Fixture;

    fn observe(fixture: &mut Fixture, agent: usize, what: &str) {
        let now = fixture.clock.now();
        let event = Event::new("Klaus Mueller", "is", what, &format!("Klaus Mueller is {}", what));
        fixture.memories[agent].add(NewMemory::new(MemoryKind::Event, event, now).poignancy(0.6));
    }

    #[tokio::test]
    async fn test_nothing_happens_above_threshold() {
        let cognition = ScriptedCognition::new();
        let mut fixture = Fixture::new();
        observe(&mut fixture, 0, "reading");
        {
            let mut ctx = fixture.context(0, &cognition);
            reflect(&mut ctx).await.unwrap();
        }
        assert_eq!(cognition.calls("reflection_points"), 0);
        assert_eq!(fixture.memories[0].retrieve_by_type(MemoryKind::Thought).len(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_trigger_creates_linked_thoughts() {
        let cognition = ScriptedCognition::new();
        let mut fixture = Fixture::new();
        for what in ["reading", "writing a paper", "drinking coffee"] {
            observe(&mut fixture, 0, what);
        }
        fixture.agents[0].scratch.reflection.trigger = -3;
        {
            let mut ctx = fixture.context(0, &cognition);
            reflect(&mut ctx).await.unwrap();
        }

        let memory = &fixture.memories[0];
        let thoughts = memory.retrieve_by_type(MemoryKind::Thought);
        assert!(!thoughts.is_empty());
        for thought in &thoughts {
            assert_eq!(thought.event.subject, "Isabella Rodriguez");
            assert!(thought.expiration.is_some());
            let evidence = thought.filling.evidence();
            assert!(!evidence.is_empty());
            assert!(evidence.iter().all(|id| memory.get(*id).is_some()));
        }
        let reflection = &fixture.agents[0].scratch.reflection;
        assert_eq!(reflection.trigger, reflection.trigger_max);
    }

    #[tokio::test]
    async fn test_trigger_resets_without_memories() {
        let cognition = ScriptedCognition::new();
        let mut fixture = Fixture::new();
        fixture.agents[0].scratch.reflection.trigger = 0;
        {
            let mut ctx = fixture.context(0, &cognition);
            reflect(&mut ctx).await.unwrap();
        }
        let reflection = &fixture.agents[0].scratch.reflection;
        assert_eq!(reflection.trigger, reflection.trigger_max);
        assert_eq!(cognition.calls("reflection_points"), 0);
    }

    #[tokio::test]
    async fn test_conversation_takeaways() {
        let cognition = ScriptedCognition::new();
        let mut fixture = Fixture::new();
        let now = fixture.clock.now();
        let turns = vec![
            ChatTurn::new("Isabella Rodriguez", "Are you coming to the party?", false),
            ChatTurn::new("Klaus Mueller", "Yes, see you there.", true),
        ];
        let event = Event::new("Isabella Rodriguez", "chat with", "Klaus Mueller", "talking about the party");
        let chat = fixture.memories[0].record_conversation("Klaus Mueller", NewMemory::new(MemoryKind::Chat, event, now), turns);
        fixture.agents[0].scratch.reflection.pending_chat = Some("Klaus Mueller".into());
        {
            let mut ctx = fixture.context(0, &cognition);
            reflect(&mut ctx).await.unwrap();
        }

        let thoughts = fixture.memories[0].retrieve_by_type(MemoryKind::Thought);
        assert_eq!(thoughts.len(), 2);
        assert!(thoughts[0].description().starts_with("for Isabella Rodriguez's planning: "));
        assert_eq!(thoughts[1].description(), "Isabella Rodriguez had a conversation of 2 lines");
        assert!(thoughts.iter().all(|t| t.filling.evidence() == [chat]));
        assert!(fixture.agents[0].scratch.reflection.pending_chat.is_none());
    }
}
