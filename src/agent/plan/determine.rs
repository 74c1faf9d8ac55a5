//! Action determination
//!
//! When the current action has finished, the agent decomposes the coming
//! hour of its schedule if needed, picks the schedule slot covering now,
//! walks the location funnel (sector, arena, game object) over the places
//! it knows, and installs the resulting action.

use crate::agent::action::{Action, ObjectAction, DEFAULT_EMOJI};
use crate::agent::schedule::{fix_decomposition, index_at, label_subtasks, needs_decomposition, slot_start};
use crate::agent::{recover, CycleContext, Identity};
use crate::cognition::{resolve_choice, ChoiceLevel, ChoiceRequest, DecompositionRequest};
use crate::core::error::Result;
use crate::core::event::{bracketed, Event};
use crate::maze::address::{components, join, RANDOM_TOKEN};
use crate::maze::Tile;
use crate::memory::SpatialMemory;

pub async fn determine_action(ctx: &mut CycleContext<'_>) -> Result<()> {
    if ctx.agent.scratch.schedule.is_empty() {
        return Ok(());
    }
    let now_minute = ctx.clock.minutes_of_day();

    let curr_index = index_at(&ctx.agent.scratch.schedule.daily, now_minute);
    if curr_index == 0 {
        // First slot of the day: prepare both the current and the next hour
        decompose_slot(ctx, curr_index).await?;
        let next = index_at(&ctx.agent.scratch.schedule.daily, now_minute + 60);
        decompose_slot(ctx, next).await?;
    } else if ctx.clock.hour() < 23 {
        let next = index_at(&ctx.agent.scratch.schedule.daily, now_minute + 60);
        decompose_slot(ctx, next).await?;
    }

    let daily = &ctx.agent.scratch.schedule.daily;
    let index = index_at(daily, now_minute);
    let Some(slot) = daily.get(index).cloned() else {
        return Ok(());
    };
    let end_minute = slot_start(daily, index) + slot.duration;
    let duration = end_minute.saturating_sub(now_minute).max(1);

    let address = resolve_address(ctx, &slot.activity).await?;
    let action = build_action(ctx, slot.activity, address, duration).await;

    tracing::debug!("{} -> {}", ctx.name(), action.display());
    ctx.whisper(2, format!("now {}", action.display()));
    ctx.agent.scratch.set_action(action);
    Ok(())
}

/// Break one schedule slot into labelled sub-activities, if it qualifies
pub async fn decompose_slot(ctx: &mut CycleContext<'_>, index: usize) -> Result<()> {
    let daily = &ctx.agent.scratch.schedule.daily;
    let Some(slot) = daily.get(index).cloned() else {
        return Ok(());
    };
    if !needs_decomposition(&slot) || bracketed(&slot.activity).is_some() {
        return Ok(());
    }

    let surrounding: Vec<String> = [index.checked_sub(1), Some(index + 1)]
        .into_iter()
        .flatten()
        .filter_map(|i| daily.get(i))
        .map(|s| s.activity.clone())
        .collect();
    let request = DecompositionRequest {
        activity: slot.activity.clone(),
        duration: slot.duration,
        start_minute: slot_start(daily, index),
        surrounding,
    };

    let key = ctx.key("decompose_task", &request);
    let answer = ctx
        .cognition
        .decompose_task(&key, &ctx.agent.scratch.identity, &request)
        .await;
    let subtasks = recover(answer, "decompose_task", ctx.name()).unwrap_or_default();
    let subtasks = label_subtasks(&slot.activity, fix_decomposition(&slot.activity, subtasks, slot.duration));

    let daily = &mut ctx.agent.scratch.schedule.daily;
    if daily.get(index) == Some(&slot) {
        tracing::debug!("decomposed '{}' into {} sub-activities", slot.activity, subtasks.len());
        daily.splice(index..=index, subtasks);
    }
    Ok(())
}

/// The sector -> arena -> game object funnel over known places
///
/// A level with nothing known falls back to the current tile's component.
/// An arena without known objects yields `arena:<random>`.
pub async fn resolve_address(ctx: &mut CycleContext<'_>, activity: &str) -> Result<String> {
    let tile = ctx.maze.tile(ctx.agent.scratch.curr_tile)?;
    let world = tile.world.clone();
    let spatial = &ctx.agent.spatial;
    let identity = &ctx.agent.scratch.identity;
    let context = location_context(spatial, identity, tile);
    let (here_sector, here_arena) = (tile.sector.clone(), tile.arena.clone());
    let name = identity.name.clone();

    let options = spatial.sectors(&world);
    let sector_context = format!("{} Known areas: {}.", context, known(spatial.sectors_summary(&world)));
    let request = ChoiceRequest::new(ChoiceLevel::Sector, &name, activity, sector_context, options);
    let key = ctx.key(ChoiceLevel::Sector.operation(), &request);
    let sector = resolve_choice(ctx.cognition, &key, &request, 1, &mut *ctx.rng)
        .await
        .unwrap_or(here_sector.clone());

    let spatial = &ctx.agent.spatial;
    let sector_address = join(&[&world, &sector]);
    let options = spatial.arenas(&sector_address);
    let arena_context = format!("{} {} has {}.", context, sector, known(spatial.arenas_summary(&sector_address)));
    let request = ChoiceRequest::new(ChoiceLevel::Arena, &name, activity, arena_context, options);
    let key = ctx.key(ChoiceLevel::Arena.operation(), &request);
    let fallback_arena = if sector == here_sector { here_arena } else { String::new() };
    let arena = resolve_choice(ctx.cognition, &key, &request, 1, &mut *ctx.rng)
        .await
        .unwrap_or(fallback_arena);

    let spatial = &ctx.agent.spatial;
    let arena_address = join(&[&world, &sector, &arena]);
    let options = spatial.game_objects(&arena_address);
    let object_context = format!("{} {} has {}.", context, arena, known(spatial.game_objects_summary(&arena_address)));
    let request = ChoiceRequest::new(ChoiceLevel::GameObject, &name, activity, object_context, options);
    let key = ctx.key(ChoiceLevel::GameObject.operation(), &request);
    let attempts = ctx.config.choice_attempts;
    let address = match resolve_choice(ctx.cognition, &key, &request, attempts, &mut *ctx.rng).await {
        Some(object) => join(&[&world, &sector, &arena, &object]),
        None => format!("{}:{}", arena_address, RANDOM_TOKEN),
    };
    Ok(address)
}

/// Where the agent lives and stands, with the areas it knows in both sectors
fn location_context(spatial: &SpatialMemory, identity: &Identity, tile: &Tile) -> String {
    let home = components(&identity.living_area);
    let home_sector = join(&home[..home.len().min(2)]);
    let here_sector = join(&[&tile.world, &tile.sector]);
    format!(
        "{} lives in {}, which has {}. {} is currently in {}, which has {}.",
        identity.name,
        identity.living_area,
        known(spatial.arenas_summary(&home_sector)),
        identity.first_name(),
        tile.full_address(),
        known(spatial.arenas_summary(&here_sector)),
    )
}

fn known(summary: String) -> String {
    if summary.is_empty() {
        "nothing known yet".to_string()
    } else {
        summary
    }
}

/// Emoji, event triple and object state for a new action
pub async fn build_action(ctx: &CycleContext<'_>, description: String, address: String, duration: u32) -> Action {
    let name = ctx.name().to_string();

    let key = ctx.key("action_pronunciatio", &description);
    let emoji = recover(
        ctx.cognition.action_pronunciatio(&key, &description).await,
        "action_pronunciatio",
        &name,
    )
    .filter(|e| !e.trim().is_empty())
    .unwrap_or_else(|| DEFAULT_EMOJI.to_string());

    let key = ctx.key("action_event_triple", &description);
    let (_, predicate, object) = recover(
        ctx.cognition.action_event_triple(&key, &name, &description).await,
        "action_event_triple",
        &name,
    )
    .unwrap_or_else(|| (name.clone(), "is".to_string(), description.clone()));

    let object_action = if address.contains(RANDOM_TOKEN) {
        None
    } else {
        let key = ctx.key("object_state", (&address, &description));
        recover(
            ctx.cognition.object_state(&key, &name, &address, &description).await,
            "object_state",
            &name,
        )
        .map(|state| ObjectAction {
            event: Event::new(&address, state.triple.1, state.triple.2, &state.description),
            address: address.clone(),
            description: state.description,
        })
    };

    Action {
        event: Event::new(&name, predicate, object, &description),
        address,
        start_time: ctx.now(),
        duration,
        emoji,
        description,
        object: object_action,
        conversation: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::schedule::{total, DaySchedule, ScheduleSlot, MIN_SUBTASK_MINUTES};
    use crate::cognition::ScriptedCognition;
    use crate::test_support::Fixture;

    #[tokio::test]
    async fn test_first_slot_is_decomposed_to_its_duration() {
        let cognition = ScriptedCognition::new();
        let mut fixture = Fixture::new();
        fixture.agents[0].scratch.schedule = DaySchedule::new(vec![
            ScheduleSlot::new("work", 120),
            ScheduleSlot::new("sleeping", 1320),
        ]);
        {
            let mut ctx = fixture.context(0, &cognition);
            decompose_slot(&mut ctx, 0).await.unwrap();
        }
        let daily = &fixture.agents[0].scratch.schedule.daily;
        let work: Vec<&ScheduleSlot> = daily.iter().filter(|s| s.activity.starts_with("work (")).collect();
        assert!(work.len() > 1);
        assert!(work.iter().all(|s| s.duration >= MIN_SUBTASK_MINUTES));
        assert_eq!(work.iter().map(|s| s.duration).sum::<u32>(), 120);
        assert_eq!(total(daily), 1440);
    }

    #[test]
    fn test_location_context_lists_known_areas() {
        let mut fixture = Fixture::new();
        let tile = fixture.maze.tile(fixture.agents[0].scratch.curr_tile).unwrap().clone();
        let agent = &fixture.agents[0];
        let before = location_context(&agent.spatial, &agent.scratch.identity, &tile);
        assert!(before.contains("which has nothing known yet"));

        fixture.learn_surroundings(0);
        let agent = &fixture.agents[0];
        let after = location_context(&agent.spatial, &agent.scratch.identity, &tile);
        assert!(after.starts_with("Isabella Rodriguez lives in the Ville:Isabella Rodriguez's apartment:main room, which has main room."));
        assert!(after.contains("which has cafe, kitchen."));
    }

    #[tokio::test]
    async fn test_long_sleep_is_not_decomposed() {
        let cognition = ScriptedCognition::new();
        let mut fixture = Fixture::new();
        fixture.agents[0].scratch.schedule = DaySchedule::new(vec![
            ScheduleSlot::new("sleeping", 420),
            ScheduleSlot::new("work", 1020),
        ]);
        {
            let mut ctx = fixture.context(0, &cognition);
            decompose_slot(&mut ctx, 0).await.unwrap();
        }
        assert_eq!(cognition.calls("decompose_task"), 0);
    }

    #[tokio::test]
    async fn test_action_from_current_slot() {
        let cognition = ScriptedCognition::new();
        let mut fixture = Fixture::new();
        fixture.at(8, 15);
        fixture.agents[0].scratch.schedule = DaySchedule::new(vec![
            ScheduleSlot::new("sleeping", 480),
            ScheduleSlot::new("brewing coffee (grinding beans)", 60),
            ScheduleSlot::new("sleeping", 900),
        ]);
        fixture.learn_surroundings(0);
        {
            let mut ctx = fixture.context(0, &cognition);
            determine_action(&mut ctx).await.unwrap();
        }
        let action = fixture.agents[0].scratch.action.as_ref().unwrap();
        assert_eq!(action.duration, 45);
        assert_eq!(action.activity(), "grinding beans");
        assert_eq!(action.event.subject, "Isabella Rodriguez");
        assert!(fixture.maze.has_address(&action.address) || action.is_random());
    }
}
