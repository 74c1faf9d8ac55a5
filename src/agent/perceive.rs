//! Perceive: what the agent notices this step
//!
//! The agent looks at the walkable tiles within its vision radius, learns
//! their addresses, and attends to the closest events in its own arena.
//! Anything it has not recently stored becomes a new memory.

use chrono::Duration;
use ordered_float::OrderedFloat;

use crate::core::error::Result;
use crate::core::event::{bracketed, short_name, Event};
use crate::maze::AddressLevel;
use crate::memory::{MemoryKind, NewMemory, PerceivedEvent};

use super::action::CHAT_PREDICATE;
use super::{recover, CycleContext};

/// Poignancy of an idle event; never sent to cognition
pub const IDLE_POIGNANCY: f32 = 0.1;

/// Events the agent attends to, closest first, one per triple
pub fn attended_events(ctx: &CycleContext<'_>) -> Result<Vec<Event>> {
    let here = ctx.agent.scratch.curr_tile;
    let arena = ctx.maze.tile(here)?.address(AddressLevel::Arena);

    let mut seen: Vec<(OrderedFloat<f32>, Event)> = Vec::new();
    for coord in ctx.maze.get_nearby_tiles(here, ctx.config.vision_radius) {
        let tile = ctx.maze.tile(coord)?;
        if tile.address(AddressLevel::Arena) != arena {
            continue;
        }
        let distance = OrderedFloat(coord.euclidean(&here));
        seen.extend(tile.events.values().map(|e| (distance, e.clone())));
    }
    seen.sort_by_key(|(distance, _)| *distance);

    let mut attended: Vec<Event> = Vec::new();
    for (_, event) in seen {
        if attended.len() >= ctx.config.attention_bandwidth {
            break;
        }
        if attended.iter().all(|e| e.spo_summary() != event.spo_summary()) {
            attended.push(event);
        }
    }
    Ok(attended)
}

/// "subject is activity" with addresses and decomposition brackets stripped
pub fn observed_description(event: &Event) -> String {
    let subject = short_name(&event.subject);
    let activity = bracketed(&event.description).unwrap_or(&event.description);
    if activity.starts_with(subject) {
        activity.to_string()
    } else {
        format!("{} is {}", subject, activity)
    }
}

/// 0..=1 importance of a memory; idle events are 0.1 without asking
pub async fn poignancy(ctx: &CycleContext<'_>, kind: MemoryKind, event: &Event) -> f32 {
    if event.is_idle() {
        return IDLE_POIGNANCY;
    }
    let key = ctx.key("rate_poignancy", (kind, &event.description));
    let rating = ctx
        .cognition
        .rate_poignancy(&key, &ctx.agent.scratch.identity, kind, &event.description)
        .await;
    recover(rating, "rate_poignancy", ctx.name()).unwrap_or(1) as f32 / 10.0
}

/// Store every newly noticed event; returns the stored memories
pub async fn perceive(ctx: &mut CycleContext<'_>) -> Result<Vec<PerceivedEvent>> {
    let here = ctx.agent.scratch.curr_tile;
    for coord in ctx.maze.get_nearby_tiles(here, ctx.config.vision_radius) {
        ctx.agent.spatial.add(ctx.maze.tile(coord)?);
    }

    let latest = ctx.memory.latest_event_triples(ctx.config.retention);
    let mut stored = Vec::new();

    for event in attended_events(ctx)? {
        let event = event.or_idle();
        if latest.contains(&event.spo_summary()) {
            continue;
        }
        let is_own_chat = event.subject == ctx.name() && event.predicate == CHAT_PREDICATE;
        let kind = if is_own_chat { MemoryKind::Chat } else { MemoryKind::Event };
        let observed = Event {
            description: observed_description(&event),
            ..event
        };

        let poignancy = poignancy(ctx, kind, &observed).await;
        let embedding = ctx.embed(&observed.description).await;
        let now = ctx.now();
        let memory = NewMemory::new(kind, observed, now)
            .poignancy(poignancy)
            .embedding(embedding);

        let node = if is_own_chat {
            let partner = memory.event.object.clone();
            let turns = ctx
                .agent
                .scratch
                .chat
                .conversation
                .and_then(|id| ctx.conversations.get(id))
                .map(|c| c.turns.clone())
                .unwrap_or_default();
            let id = ctx.memory.record_conversation(&partner, memory, turns);
            ctx.memory.get(id).cloned()
        } else {
            Some(ctx.memory.add(memory).clone())
        };

        let reflection = &mut ctx.agent.scratch.reflection;
        reflection.trigger -= (poignancy * ctx.config.poignancy_scale).round() as i32;
        if let Some(node) = node {
            stored.push(node);
        }
    }

    if !stored.is_empty() {
        ctx.whisper(3, format!("noticed: {}", stored.iter().map(|m| m.description()).collect::<Vec<_>>().join("; ")));
    }
    Ok(stored)
}

/// Expiration for plans and thoughts
pub fn expiration(ctx: &CycleContext<'_>) -> chrono::NaiveDateTime {
    ctx.now() + Duration::days(ctx.config.memory_expiration_days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observed_description() {
        let stove = Event::new("the Ville:cafe:kitchen:stove", "is", "on", "heating up (boiling water)");
        assert_eq!(observed_description(&stove), "stove is boiling water");
        let bed = Event::idle("the Ville:house:bedroom:bed");
        assert_eq!(observed_description(&bed), "bed is idle");
        let state = Event::new("the Ville:cafe:cafe:counter", "is", "busy", "counter is busy");
        assert_eq!(observed_description(&state), "counter is busy");
    }
}
