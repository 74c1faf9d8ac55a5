//! Conversations: starting, taking turns, closing
//!
//! The initiator opens a record in the conversation book and speaks first.
//! The partner joins during its own cycle when it finds a conversation
//! addressed to it. Each side then speaks when the book says it is its
//! turn, one utterance per step. Whoever ends the conversation writes the
//! summary; each side closes on its own, which rewrites its schedule around
//! the realized chat and starts the re-chat cooldown.

use chrono::{Duration, NaiveDateTime};

use crate::agent::action::{Action, CHAT_EMOJI, CHAT_PREDICATE};
use crate::agent::perceive::poignancy;
use crate::agent::schedule::ScheduleSlot;
use crate::agent::{recover, Agent, CycleContext};
use crate::cognition::{ConversationContext, Utterance};
use crate::core::clock::{display_time, minutes_between, minutes_of_day};
use crate::core::error::Result;
use crate::core::event::Event;
use crate::core::types::ConversationId;
use crate::maze::address::PERSONA_TOKEN;
use crate::memory::{ChatTurn, MemoryKind, NewMemory};

use super::redecompose;

/// Memories recalled as background for one utterance
const TURN_MEMORIES: usize = 15;

/// The action both participants hold while a conversation is open
pub fn chat_action(name: &str, partner: &str, id: ConversationId, now: NaiveDateTime) -> Action {
    let description = format!("conversing with {}", partner);
    Action {
        address: format!("{} {}", PERSONA_TOKEN, partner),
        start_time: now,
        duration: 0,
        emoji: CHAT_EMOJI.to_string(),
        event: Event::new(name, CHAT_PREDICATE, partner, &description),
        description,
        object: None,
        conversation: Some(id),
    }
}

fn enter(ctx: &mut CycleContext<'_>, partner: &str, id: ConversationId) {
    let action = chat_action(ctx.name(), partner, id, ctx.now());
    let scratch = &mut ctx.agent.scratch;
    scratch.set_action(action);
    scratch.chat.chatting_with = Some(partner.to_string());
    scratch.chat.conversation = Some(id);
    scratch.chat.chatting_end_time = None;
}

/// Open a conversation with `target` and say the first line
pub async fn initiate(ctx: &mut CycleContext<'_>, target: &Agent) -> Result<()> {
    let name = ctx.name().to_string();
    let partner = target.name().to_string();
    let now = ctx.now();
    let id = ctx.conversations.start(&name, &partner, now);
    enter(ctx, &partner, id);

    tracing::info!("{} starts talking to {}", name, partner);
    ctx.whisper(1, format!("starts a conversation with {}", partner));
    speak(ctx, id).await
}

/// Join, speak or close, depending on the state of the agent's conversation
pub async fn progress(ctx: &mut CycleContext<'_>) -> Result<()> {
    let name = ctx.name().to_string();

    if ctx.agent.scratch.chat.conversation.is_none() {
        let Some(open) = ctx.conversations.open_for(&name) else {
            return Ok(());
        };
        let (id, partner) = (open.id, open.other(&name).to_string());
        enter(ctx, &partner, id);
        tracing::debug!("{} joins the conversation with {}", name, partner);
        ctx.whisper(2, format!("talking with {}", partner));
    }

    let Some(id) = ctx.agent.scratch.chat.conversation else {
        return Ok(());
    };
    let Some(conversation) = ctx.conversations.get(id) else {
        // The record is gone; let the chat action run out
        ctx.agent.scratch.chat.clear();
        return Ok(());
    };

    if conversation.has_ended() {
        return close(ctx, id).await;
    }
    if conversation.next_speaker == name {
        return speak(ctx, id).await;
    }
    Ok(())
}

/// Say one line, then close if it ended the conversation
async fn speak(ctx: &mut CycleContext<'_>, id: ConversationId) -> Result<()> {
    take_turn(ctx, id).await?;
    if ctx.conversations.get(id).is_some_and(|c| c.has_ended()) {
        close(ctx, id).await?;
    }
    Ok(())
}

/// Generate and record the next utterance
pub async fn take_turn(ctx: &mut CycleContext<'_>, id: ConversationId) -> Result<()> {
    let Some(conversation) = ctx.conversations.get(id) else {
        return Ok(());
    };
    let name = ctx.name().to_string();
    let partner = conversation.other(&name).to_string();
    let transcript = conversation.turns.clone();
    let now = ctx.now();

    let listener_activity = ctx
        .peers
        .get(&partner)
        .map(|p| p.scratch.activity_description())
        .unwrap_or_else(|| "idle".to_string());

    let shared = ctx.relevant_memories(&partner, TURN_MEMORIES).await;
    let key = ctx.key("summarize_relationship", (&partner, &shared));
    let relationship = recover(
        ctx.cognition.summarize_relationship(&key, &name, &partner, &shared).await,
        "summarize_relationship",
        &name,
    )
    .unwrap_or_default();

    let query = transcript
        .last()
        .map(|t| format!("{} {}", partner, t.utterance))
        .unwrap_or_else(|| partner.clone());
    let memories = ctx.relevant_memories(&query, TURN_MEMORIES).await;

    let context = ConversationContext {
        speaker: ctx.agent.scratch.identity.clone(),
        listener: partner.clone(),
        time: display_time(&now),
        relationship,
        listener_activity,
        transcript: transcript.clone(),
        memories,
        past_context: past_context(ctx, &partner, now),
    };
    let key = ctx.key("run_conversation_turn", &context);
    let utterance = recover(
        ctx.cognition.run_conversation_turn(&key, &context).await,
        "run_conversation_turn",
        &name,
    )
    .unwrap_or_else(|| Utterance {
        text: "Sorry, I have to go.".into(),
        ends_conversation: true,
    });

    let final_turn = utterance.ends_conversation || transcript.len() + 1 >= ctx.config.max_conversation_turns;
    let turn = ChatTurn::new(&name, &utterance.text, final_turn);

    let summary = if final_turn {
        let mut turns = transcript;
        turns.push(turn.clone());
        let key = ctx.key("summarize_conversation", &turns);
        let summary = recover(
            ctx.cognition.summarize_conversation(&key, &turns).await,
            "summarize_conversation",
            &name,
        )
        .unwrap_or_else(|| format!("conversing with {}", partner));
        Some(summary)
    } else {
        None
    };

    tracing::debug!("{} to {}: {}", name, partner, utterance.text);
    ctx.whisper(2, format!("\"{}\"", utterance.text));
    ctx.conversations.push_turn(id, turn, now, summary);
    Ok(())
}

/// Reminder of a conversation with `partner` that ended long ago
fn past_context(ctx: &CycleContext<'_>, partner: &str, now: NaiveDateTime) -> Option<String> {
    let last = ctx.memory.last_conversation_with(partner)?;
    let ended = last.ended.unwrap_or(last.created);
    if now - ended <= Duration::hours(ctx.config.past_context_hours) {
        return None;
    }
    Some(format!(
        "{} last talked to {} on {}: {}",
        ctx.name(),
        partner,
        display_time(&ended),
        last.description()
    ))
}

/// Close this agent's side of an ended conversation
///
/// The realized chat (start to end) replaces the schedule from the chat's
/// start, the transcript is stored as a CHAT memory, the partner goes into
/// the cooldown buffer and reflection is asked to take notes.
pub async fn close(ctx: &mut CycleContext<'_>, id: ConversationId) -> Result<()> {
    let Some(conversation) = ctx.conversations.get(id).cloned() else {
        ctx.agent.scratch.chat.clear();
        return Ok(());
    };
    let name = ctx.name().to_string();
    let partner = conversation.other(&name).to_string();
    let now = ctx.now();
    let ended = conversation.ended_at.unwrap_or(now);
    let summary = conversation
        .summary
        .clone()
        .unwrap_or_else(|| format!("conversing with {}", partner));
    let realized = minutes_between(&conversation.started_at, &ended).max(1);

    let event = Event::new(&name, CHAT_PREDICATE, &partner, &summary);
    let rating = if ctx.memory.active_conversation_with(&partner).is_none() {
        poignancy(ctx, MemoryKind::Chat, &event).await
    } else {
        0.0
    };
    let embedding = ctx.embed(&summary).await;

    let interrupt = if conversation.started_at.date() == ctx.clock.today() {
        minutes_of_day(&conversation.started_at)
    } else {
        0
    };
    redecompose(ctx, ScheduleSlot::new(&summary, realized), interrupt).await?;

    ctx.memory.record_conversation(
        &partner,
        NewMemory::new(MemoryKind::Chat, event, now)
            .poignancy(rating)
            .embedding(embedding),
        conversation.turns.clone(),
    );

    let cooldown = ctx.config.chat_buffer_cooldown;
    let scratch = &mut ctx.agent.scratch;
    if let Some(action) = scratch.action.as_mut().filter(|a| a.conversation == Some(id)) {
        action.duration = realized;
    }
    scratch.chat.buffer.insert(partner.clone(), cooldown);
    scratch.chat.chatting_end_time = Some(now);
    scratch.chat.conversation = None;
    scratch.reflection.pending_chat = Some(partner.clone());
    ctx.conversations.close_side(id, &name);

    tracing::info!("{} finished talking with {} ({} min): {}", name, partner, realized, summary);
    ctx.whisper(1, format!("finished talking with {}: {}", partner, summary));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::plan::reaction::talk_eligible;
    use crate::agent::schedule::{total, DaySchedule};
    use crate::cognition::ScriptedCognition;
    use crate::test_support::{action_at, Fixture};

    fn day() -> DaySchedule {
        DaySchedule::new(vec![
            ScheduleSlot::new("sleeping", 420),
            ScheduleSlot::new("working", 780),
            ScheduleSlot::new("sleeping", 240),
        ])
    }

    #[test]
    fn test_past_context_counts_from_the_end_of_the_last_chat() {
        let cognition = ScriptedCognition::new();
        let mut fixture = Fixture::new();
        fixture.at(20, 0);
        let event = || Event::new("Isabella Rodriguez", CHAT_PREDICATE, "Klaus Mueller", "talking about the party");
        let started = fixture.clock.now() - Duration::hours(11);
        let ended = fixture.clock.now() - Duration::hours(2);

        // Opened eleven hours ago, ended two hours ago
        fixture.memories[0].record_conversation(
            "Klaus Mueller",
            NewMemory::new(MemoryKind::Chat, event(), started),
            vec![ChatTurn::new("Isabella Rodriguez", "Hi Klaus", false)],
        );
        fixture.memories[0].record_conversation(
            "Klaus Mueller",
            NewMemory::new(MemoryKind::Chat, event(), ended),
            vec![
                ChatTurn::new("Isabella Rodriguez", "Hi Klaus", false),
                ChatTurn::new("Klaus Mueller", "See you tonight", true),
            ],
        );

        let ctx = fixture.context(0, &cognition);
        let now = ctx.now();
        assert!(past_context(&ctx, "Klaus Mueller", now).is_none());
        let later = past_context(&ctx, "Klaus Mueller", now + Duration::hours(7)).unwrap();
        assert!(later.starts_with("Isabella Rodriguez last talked to Klaus Mueller on"));
        assert!(later.ends_with("talking about the party"));
    }

    #[tokio::test]
    async fn test_full_conversation_between_two_agents() {
        let cognition = ScriptedCognition::new().with_chat_length(3);
        let mut fixture = Fixture::new();
        fixture.at(10, 0);
        let now = fixture.clock.now();
        for i in 0..2 {
            fixture.agents[i].scratch.schedule = day();
            let name = fixture.agents[i].name().to_string();
            fixture.agents[i].scratch.set_action(action_at(&name, "working", now, 60));
        }
        let klaus_name = fixture.agents[1].name().to_string();

        // Isabella opens and speaks
        {
            let mut ctx = fixture.context(0, &cognition);
            let klaus = ctx.peers.get(&klaus_name).unwrap();
            initiate(&mut ctx, klaus).await.unwrap();
        }
        assert!(fixture.agents[0].scratch.is_chatting());
        assert_eq!(fixture.conversations.len(), 1);

        // Klaus joins and answers; Isabella ends on the third line
        for (agent, minute) in [(1, 1), (0, 2), (1, 3)] {
            fixture.at(10, minute);
            let mut ctx = fixture.context(agent, &cognition);
            progress(&mut ctx).await.unwrap();
        }

        let isabella = &fixture.agents[0].scratch;
        let klaus = &fixture.agents[1].scratch;
        assert!(isabella.chat.in_buffer(&klaus_name));
        assert!(klaus.chat.in_buffer(isabella.name()));
        assert!(fixture.conversations.is_empty());
        assert_eq!(total(&isabella.schedule.daily), 1440);
        assert_eq!(total(&klaus.schedule.daily), 1440);
        assert!(isabella.schedule.daily.iter().any(|s| s.activity.starts_with("conversing about")));

        let chat = fixture.memories[0].last_conversation_with(&klaus_name).unwrap();
        assert_eq!(chat.filling.turns().len(), 3);
        assert!(chat.conversation_ended());
        assert_eq!(isabella.reflection.pending_chat.as_deref(), Some(klaus_name.as_str()));

        // Cooldown blocks a new conversation no matter what cognition says
        let mut a = fixture.agents[0].scratch.clone();
        let b = fixture.agents[1].scratch.clone();
        a.chat.clear();
        a.set_action(action_at(a.name(), "working", now, 60));
        assert!(!talk_eligible(&a, &b, &fixture.conversations, 10));
    }

    #[tokio::test]
    async fn test_turn_cap_ends_conversation() {
        let cognition = ScriptedCognition::new().with_chat_length(50);
        let mut fixture = Fixture::new();
        fixture.config.max_conversation_turns = 2;
        fixture.at(10, 0);
        let klaus_name = fixture.agents[1].name().to_string();
        {
            let mut ctx = fixture.context(0, &cognition);
            let klaus = ctx.peers.get(&klaus_name).unwrap();
            initiate(&mut ctx, klaus).await.unwrap();
        }
        {
            let mut ctx = fixture.context(1, &cognition);
            progress(&mut ctx).await.unwrap();
        }
        let conversation = fixture.conversations.open_for(fixture.agents[0].name()).unwrap();
        assert!(conversation.has_ended());
        assert_eq!(conversation.turns.len(), 2);
        assert!(conversation.summary.is_some());
    }
}
