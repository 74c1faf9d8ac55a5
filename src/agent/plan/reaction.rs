//! Focus selection and the reaction to it
//!
//! Of everything perceived this step the agent focuses on at most one
//! event, preferring other agents over objects. Facing another agent it may
//! start a conversation or wait for the other to finish what it is doing.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::agent::action::{Action, WAIT_EMOJI};
use crate::agent::conversation::ConversationBook;
use crate::agent::retrieve::Retrieved;
use crate::agent::schedule::ScheduleSlot;
use crate::agent::scratch::Scratch;
use crate::agent::{recover, Agent, CycleContext};
use crate::cognition::{ReactMode, SocialContext};
use crate::core::clock::{display_time, minutes_between, minutes_of_day};
use crate::core::error::Result;
use crate::core::event::Event;
use crate::maze::address::WAITING_TOKEN;

use super::{chat, redecompose};

/// Hour from which nobody starts anything social
const LATE_HOUR: u32 = 23;

/// Memories retrieved as background for a social decision
const SOCIAL_MEMORIES: usize = 10;

/// The one perceived bundle worth reacting to, if any
///
/// Bundles about the agent itself are ignored. Another agent is picked at
/// random when present; otherwise a random non-idle object event.
pub fn choose_focus<'r, R: Rng + ?Sized>(
    name: &str,
    retrieved: &'r BTreeMap<String, Retrieved>,
    rng: &mut R,
) -> Option<&'r Retrieved> {
    let others: Vec<&Retrieved> = retrieved
        .values()
        .filter(|r| r.curr_event.event.subject != name)
        .collect();

    let agents: Vec<&Retrieved> = others
        .iter()
        .copied()
        .filter(|r| r.curr_event.event.subject_is_agent())
        .collect();
    if let Some(focus) = agents.choose(rng) {
        return Some(focus);
    }

    let busy: Vec<&Retrieved> = others
        .into_iter()
        .filter(|r| !r.curr_event.event.is_idle())
        .collect();
    busy.choose(rng).copied()
}

/// Conditions shared by talking and reacting
fn socially_available(initiator: &Scratch, target: &Scratch, hour: u32) -> bool {
    initiator.action.is_some()
        && target.action.is_some()
        && !initiator.is_asleep()
        && !target.is_asleep()
        && hour != LATE_HOUR
        && !target.is_waiting()
}

/// Whether a conversation could start, before asking cognition
pub fn talk_eligible(initiator: &Scratch, target: &Scratch, book: &ConversationBook, hour: u32) -> bool {
    socially_available(initiator, target, hour)
        && !initiator.is_chatting()
        && !target.is_chatting()
        && book.open_for(target.name()).is_none()
        && book.open_for(initiator.name()).is_none()
        && !initiator.chat.in_buffer(target.name())
}

/// Whether the initiator could react to the target, before asking cognition
///
/// Close enough means the same arena or within `react_tile_distance` tiles.
pub fn react_eligible(initiator: &Scratch, target: &Scratch, hour: u32, tile_distance: usize) -> bool {
    if !socially_available(initiator, target, hour) || initiator.planned_path.is_empty() {
        return false;
    }
    let (Some(mine), Some(theirs)) = (&initiator.action, &target.action) else {
        return false;
    };
    let same_arena = match (mine.target().arena_prefix(), theirs.target().arena_prefix()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };
    same_arena || initiator.curr_tile.manhattan(&target.curr_tile) <= tile_distance
}

async fn social_context(ctx: &mut CycleContext<'_>, target: &Agent) -> SocialContext {
    let target_name = target.name().to_string();
    let memories = ctx.relevant_memories(&target_name, SOCIAL_MEMORIES).await;
    let last_chat = ctx
        .memory
        .last_conversation_with(&target_name)
        .map(|m| m.description().to_string());
    SocialContext {
        initiator: ctx.name().to_string(),
        target: target_name,
        time: display_time(&ctx.now()),
        memories,
        last_chat,
        initiator_activity: ctx.agent.scratch.activity_description(),
        target_activity: target.scratch.activity_description(),
    }
}

/// Eligibility, then the talk decision
pub async fn lets_talk(ctx: &mut CycleContext<'_>, target: &Agent) -> bool {
    if !talk_eligible(&ctx.agent.scratch, &target.scratch, ctx.conversations, ctx.clock.hour()) {
        return false;
    }
    let context = social_context(ctx, target).await;
    let key = ctx.key("decide_to_talk", &context);
    recover(ctx.cognition.decide_to_talk(&key, &context).await, "decide_to_talk", ctx.name()).unwrap_or(false)
}

/// Eligibility, then the react decision
pub async fn lets_react(ctx: &mut CycleContext<'_>, target: &Agent) -> ReactMode {
    let eligible = react_eligible(
        &ctx.agent.scratch,
        &target.scratch,
        ctx.clock.hour(),
        ctx.config.react_tile_distance,
    );
    if !eligible {
        return ReactMode::DoOtherThings;
    }
    let context = social_context(ctx, target).await;
    let key = ctx.key("decide_to_react", &context);
    recover(ctx.cognition.decide_to_react(&key, &context).await, "decide_to_react", ctx.name())
        .unwrap_or(ReactMode::DoOtherThings)
}

/// React to the focused bundle: start a conversation, wait, or carry on
pub async fn react(ctx: &mut CycleContext<'_>, focus: &Retrieved) -> Result<()> {
    let subject = &focus.curr_event.event.subject;
    let Some(target) = ctx.peers.get(subject) else {
        return Ok(());
    };

    if lets_talk(ctx, target).await {
        return chat::initiate(ctx, target).await;
    }

    if lets_react(ctx, target).await == ReactMode::Wait {
        let Some(end) = target.scratch.action.as_ref().map(Action::end_time) else {
            return Ok(());
        };
        let action = waiting_action(ctx.name(), &ctx.agent.scratch, target, ctx.now(), end);
        let inserted = ScheduleSlot::new(action.description.clone(), action.duration);
        let minute = minutes_of_day(&ctx.now());

        tracing::info!("{} waits for {}", ctx.name(), target.name());
        ctx.whisper(1, format!("waiting for {}", target.name()));
        ctx.agent.scratch.set_action(action);
        redecompose(ctx, inserted, minute).await?;
    }
    Ok(())
}

/// Stand still on the current tile until the target's action ends
pub fn waiting_action(name: &str, scratch: &Scratch, target: &Agent, now: NaiveDateTime, until: NaiveDateTime) -> Action {
    let tile = scratch.curr_tile;
    let description = format!("waiting to start {}", target.scratch.activity_description());
    let duration = minutes_between(&now, &until) + 1;
    Action {
        address: format!("{} {} {}", WAITING_TOKEN, tile.x, tile.y),
        start_time: now,
        duration,
        emoji: WAIT_EMOJI.to_string(),
        event: Event::new(name, "waiting to start", target.scratch.activity_description(), &description),
        description,
        object: None,
        conversation: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::schedule::DaySchedule;
    use crate::core::types::TileCoord;
    use crate::memory::{MemoryKind, NewMemory};
    use crate::test_support::{action_at, Fixture};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn bundle(subject: &str, description: &str, now: NaiveDateTime) -> Retrieved {
        let mut memory = crate::memory::AssociativeMemory::new();
        let event = Event::new(subject, "is", description, description);
        let node = memory.add(NewMemory::new(MemoryKind::Event, event, now)).clone();
        Retrieved {
            curr_event: node,
            events: Vec::new(),
            thoughts: Vec::new(),
        }
    }

    #[test]
    fn test_focus_prefers_agents_and_skips_self() {
        let fixture = Fixture::new();
        let now = fixture.clock.now();
        let mut retrieved = BTreeMap::new();
        retrieved.insert("me".to_string(), bundle("Isabella Rodriguez", "cooking", now));
        retrieved.insert("stove".to_string(), bundle("the Ville:cafe:kitchen:stove", "heating", now));
        retrieved.insert("klaus".to_string(), bundle("Klaus Mueller", "reading", now));
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let focus = choose_focus("Isabella Rodriguez", &retrieved, &mut rng).unwrap();
        assert_eq!(focus.curr_event.event.subject, "Klaus Mueller");

        retrieved.remove("klaus");
        let focus = choose_focus("Isabella Rodriguez", &retrieved, &mut rng).unwrap();
        assert_eq!(focus.curr_event.event.subject, "the Ville:cafe:kitchen:stove");

        retrieved.remove("stove");
        assert!(choose_focus("Isabella Rodriguez", &retrieved, &mut rng).is_none());
    }

    #[test]
    fn test_idle_objects_are_not_a_focus() {
        let fixture = Fixture::new();
        let mut retrieved = BTreeMap::new();
        retrieved.insert("bed".to_string(), bundle("the Ville:house:bedroom:bed", "idle", fixture.clock.now()));
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(choose_focus("Isabella Rodriguez", &retrieved, &mut rng).is_none());
    }

    #[test]
    fn test_talk_eligibility() {
        let mut fixture = Fixture::new();
        fixture.at(10, 0);
        let now = fixture.clock.now();
        let book = ConversationBook::new();
        let mut a = fixture.agents[0].scratch.clone();
        let mut b = fixture.agents[1].scratch.clone();
        assert!(!talk_eligible(&a, &b, &book, 10));

        a.set_action(action_at(a.name(), "brewing coffee", now, 30));
        b.set_action(action_at(b.name(), "reading", now, 30));
        assert!(talk_eligible(&a, &b, &book, 10));
        assert!(!talk_eligible(&a, &b, &book, 23));

        b.set_action(action_at(b.name(), "sleeping", now, 30));
        assert!(!talk_eligible(&a, &b, &book, 10));

        b.set_action(action_at(b.name(), "reading", now, 30));
        a.chat.buffer.insert(b.name().to_string(), 800);
        assert!(!talk_eligible(&a, &b, &book, 10));
    }

    #[test]
    fn test_react_needs_a_path_and_proximity() {
        let mut fixture = Fixture::new();
        fixture.at(10, 0);
        let now = fixture.clock.now();
        let mut a = fixture.agents[0].scratch.clone();
        let mut b = fixture.agents[1].scratch.clone();
        a.set_action(action_at(a.name(), "brewing coffee", now, 30));
        b.set_action(action_at(b.name(), "reading", now, 30));
        assert!(!react_eligible(&a, &b, 10, 2));

        a.planned_path.push_back(TileCoord::new(1, 1));
        // Both actions share the cafe arena in the fixture
        assert!(react_eligible(&a, &b, 10, 2));
    }

    #[tokio::test]
    async fn test_wait_reaction_inserts_waiting_action() {
        let cognition = crate::cognition::ScriptedCognition::new().with_react_mode(ReactMode::Wait);
        let mut fixture = Fixture::new();
        fixture.at(10, 0);
        let now = fixture.clock.now();
        fixture.agents[0].scratch.schedule = DaySchedule::new(vec![
            ScheduleSlot::new("sleeping", 420),
            ScheduleSlot::new("working", 780),
            ScheduleSlot::new("sleeping", 240),
        ]);
        let (a, b) = (fixture.agents[0].name().to_string(), fixture.agents[1].name().to_string());
        fixture.agents[0].scratch.set_action(action_at(&a, "brewing coffee", now, 30));
        fixture.agents[0].scratch.planned_path.push_back(TileCoord::new(1, 1));
        fixture.agents[1].scratch.set_action(action_at(&b, "reading", now, 20));

        let focus = bundle(&b, "reading", now);
        {
            let mut ctx = fixture.context(0, &cognition);
            react(&mut ctx, &focus).await.unwrap();
        }
        let scratch = &fixture.agents[0].scratch;
        let action = scratch.action.as_ref().unwrap();
        assert!(action.is_waiting());
        assert_eq!(action.duration, 21);
        assert_eq!(action.emoji, WAIT_EMOJI);
        assert_eq!(crate::agent::schedule::total(&scratch.schedule.daily), 1440);
        assert_eq!(cognition.calls("decide_to_talk"), 1);
    }
}
