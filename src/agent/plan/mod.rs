//! Plan: decide what the agent is doing
//!
//! Runs in a fixed order each step:
//! 1. long-term planning on the first step of a day
//! 2. conversation progress (join, speak, or close)
//! 3. a new action once the current one has finished
//! 4. focus selection and the reaction to it
//! 5. chat buffer decay and chat-state cleanup

pub mod chat;
pub mod determine;
pub mod long_term;
pub mod reaction;

use std::collections::BTreeMap;

use crate::agent::schedule::{enclosing_window, fit_after, remainder_after, splice_window, total, truncate_at, ScheduleSlot};
use crate::cognition::RedecompositionRequest;
use crate::core::error::Result;

use super::retrieve::Retrieved;
use super::{recover, CycleContext};

pub async fn plan(ctx: &mut CycleContext<'_>, retrieved: &BTreeMap<String, Retrieved>) -> Result<()> {
    if let Some(day) = long_term::day_change(&ctx.agent.scratch, ctx.clock.today()) {
        long_term::plan_day(ctx, day).await?;
    }

    chat::progress(ctx).await?;

    if ctx.agent.scratch.is_action_finished(&ctx.now()) {
        determine::determine_action(ctx).await?;
    }

    let scratch = &ctx.agent.scratch;
    if !scratch.is_chatting() && !scratch.is_waiting() {
        let focus = reaction::choose_focus(scratch.name(), retrieved, &mut *ctx.rng);
        if let Some(focus) = focus {
            reaction::react(ctx, focus).await?;
        }
    }

    ctx.agent.scratch.chat.decay_buffer();
    ctx.agent.scratch.clear_chat_if_done();
    Ok(())
}

/// Rewrite the schedule around an unplanned activity
///
/// `inserted` started at `interrupt_minute`. The enclosing window, grown to
/// cover the inserted activity, keeps its slots up to the interruption, then
/// the inserted activity at its realized length, then whatever cognition
/// fills the rest with. Only that rest is fitted to the window's original
/// total, so later index lookups stay aligned.
pub async fn redecompose(ctx: &mut CycleContext<'_>, inserted: ScheduleSlot, interrupt_minute: u32) -> Result<()> {
    let schedule = &ctx.agent.scratch.schedule;
    if schedule.is_empty() {
        return Ok(());
    }

    let window = enclosing_window(schedule, interrupt_minute, inserted.duration);
    let original: Vec<ScheduleSlot> = schedule.daily[window.start_index..window.end_index].to_vec();
    let window_total = total(&original);
    let interrupt = interrupt_minute.clamp(window.start_minute, window.end_minute);

    let mut fixed = truncate_at(&original, window.start_minute, interrupt);
    fixed.push(inserted);
    let resume = window.start_minute + total(&fixed);

    let request = RedecompositionRequest {
        original: original.clone(),
        fixed: fixed.clone(),
        remaining: window_total.saturating_sub(total(&fixed)),
        window_start_minute: window.start_minute,
    };
    let key = ctx.key("redecompose_schedule", &request);
    let answer = ctx
        .cognition
        .redecompose_schedule(&key, &ctx.agent.scratch.identity, &request)
        .await;
    let remainder = recover(answer, "redecompose_schedule", ctx.name())
        .unwrap_or_else(|| remainder_after(&original, window.start_minute, resume));

    let combined = fit_after(fixed, remainder, window_total);

    tracing::debug!(
        "{} rescheduled {}..{} around {}",
        ctx.name(),
        window.start_minute,
        window.end_minute,
        interrupt
    );
    splice_window(&mut ctx.agent.scratch.schedule.daily, &window, combined);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::schedule::{slot_start, DaySchedule, MINUTES_PER_DAY};
    use crate::cognition::ScriptedCognition;
    use crate::test_support::Fixture;

    #[tokio::test]
    async fn test_redecompose_keeps_day_total() {
        let cognition = ScriptedCognition::new();
        let mut fixture = Fixture::new();
        fixture.agents[0].scratch.schedule = DaySchedule::new(vec![
            ScheduleSlot::new("sleeping", 420),
            ScheduleSlot::new("breakfast", 60),
            ScheduleSlot::new("working", 540),
            ScheduleSlot::new("relaxing", 180),
            ScheduleSlot::new("sleeping", 240),
        ]);
        {
            let mut ctx = fixture.context(0, &cognition);
            redecompose(&mut ctx, ScheduleSlot::new("chatting with Klaus", 12), 500).await.unwrap();
        }
        let daily = &fixture.agents[0].scratch.schedule.daily;
        assert_eq!(total(daily), MINUTES_PER_DAY);
        assert!(daily.iter().any(|s| s.activity == "chatting with Klaus" && s.duration == 12));
        // Work before the interruption survives, truncated
        let working_before = daily.iter().position(|s| s.activity == "working").unwrap();
        let chat = daily.iter().position(|s| s.activity == "chatting with Klaus").unwrap();
        assert!(working_before < chat);
    }

    #[tokio::test]
    async fn test_redecompose_keeps_a_chat_longer_than_the_window() {
        let cognition = ScriptedCognition::new();
        let mut fixture = Fixture::new();
        let hours: Vec<ScheduleSlot> = (0..24).map(|h| ScheduleSlot::new(format!("hour {}", h), 60)).collect();
        fixture.agents[0].scratch.schedule = DaySchedule::new(hours);
        {
            let mut ctx = fixture.context(0, &cognition);
            redecompose(&mut ctx, ScheduleSlot::new("chatting with Klaus", 180), 600).await.unwrap();
        }

        let daily = &fixture.agents[0].scratch.schedule.daily;
        assert_eq!(total(daily), MINUTES_PER_DAY);
        let chat: Vec<u32> = daily
            .iter()
            .filter(|s| s.activity == "chatting with Klaus")
            .map(|s| s.duration)
            .collect();
        assert_eq!(chat, vec![180]);
        // The chat starts at 10:00 and the day after it lines up again
        let index = daily.iter().position(|s| s.activity == "chatting with Klaus").unwrap();
        assert_eq!(slot_start(daily, index), 600);
        assert_eq!(daily[index + 1..].iter().map(|s| s.duration).sum::<u32>(), MINUTES_PER_DAY - 780);
    }

    #[tokio::test]
    async fn test_redecompose_late_in_window_is_not_dropped() {
        let cognition = ScriptedCognition::new();
        let mut fixture = Fixture::new();
        let hours: Vec<ScheduleSlot> = (0..24).map(|h| ScheduleSlot::new(format!("hour {}", h), 60)).collect();
        fixture.agents[0].scratch.schedule = DaySchedule::new(hours);
        {
            let mut ctx = fixture.context(0, &cognition);
            // 10:55 sits at the very end of the 10:00-12:00 window
            redecompose(&mut ctx, ScheduleSlot::new("waiting for Klaus", 90), 655).await.unwrap();
        }

        let daily = &fixture.agents[0].scratch.schedule.daily;
        assert_eq!(total(daily), MINUTES_PER_DAY);
        assert!(daily.iter().any(|s| s.activity == "waiting for Klaus" && s.duration == 90));
    }
}
