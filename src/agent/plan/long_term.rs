//! Long-term planning: the day's schedule
//!
//! Runs once per simulated day. The first day bootstraps a broad plan from
//! the identity alone; later days also look back at what happened
//! yesterday and rewrite the agent's status line.

use chrono::NaiveDate;

use crate::agent::perceive::expiration;
use crate::agent::schedule::{normalize_day, DaySchedule};
use crate::agent::scratch::Scratch;
use crate::agent::{recover, CycleContext};
use crate::cognition::parse::wake_up_minutes;
use crate::cognition::DayStatus;
use crate::core::error::Result;
use crate::core::event::Event;
use crate::memory::{MemoryKind, NewMemory};

/// Poignancy of the daily plan memory
const PLAN_POIGNANCY: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayChange {
    FirstDay,
    NewDay,
}

/// Whether `today` needs a new plan
pub fn day_change(scratch: &Scratch, today: NaiveDate) -> Option<DayChange> {
    match scratch.curr_day {
        None => Some(DayChange::FirstDay),
        Some(day) if day != today => Some(DayChange::NewDay),
        Some(_) => None,
    }
}

pub async fn plan_day(ctx: &mut CycleContext<'_>, day: DayChange) -> Result<()> {
    let today = ctx.clock.today();
    let identity = ctx.agent.scratch.identity.clone();

    let key = ctx.key("estimate_wake_up_hour", &identity);
    let wake_answer = recover(
        ctx.cognition.estimate_wake_up_hour(&key, &identity).await,
        "estimate_wake_up_hour",
        ctx.name(),
    )
    .unwrap_or_default();
    let wake_minutes = wake_up_minutes(&wake_answer);
    let wake_hour = wake_minutes / 60;

    let status = match day {
        DayChange::FirstDay => {
            let key = ctx.key("create_daily_plan", (&identity, wake_hour));
            let plan = recover(
                ctx.cognition.create_daily_plan(&key, &identity, wake_hour).await,
                "create_daily_plan",
                ctx.name(),
            )
            .unwrap_or_default();
            DayStatus {
                plan,
                status: identity.currently.clone(),
            }
        }
        DayChange::NewDay => {
            let yesterday = yesterday_trace(ctx);
            let key = ctx.key("create_daily_plan_and_status", (&identity, &yesterday, wake_hour));
            recover(
                ctx.cognition
                    .create_daily_plan_and_status(&key, &identity, &yesterday, wake_hour)
                    .await,
                "create_daily_plan_and_status",
                ctx.name(),
            )
            .unwrap_or_else(|| DayStatus {
                plan: ctx.agent.scratch.daily_plan.clone(),
                status: identity.currently.clone(),
            })
        }
    };

    let key = ctx.key("create_hourly_schedule", (&identity, &status.plan, wake_hour));
    let hourly = recover(
        ctx.cognition
            .create_hourly_schedule(&key, &identity, &status.plan, wake_hour)
            .await,
        "create_hourly_schedule",
        ctx.name(),
    )
    .unwrap_or_default();
    let slots = normalize_day(&hourly);

    let date = today.format("%A %B %d").to_string();
    let plan_text = status
        .plan
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let description = format!("This is {}'s plan for {}: {}", identity.name, date, plan_text);
    let embedding = ctx.embed(&description).await;

    // Every await has resolved; commit the day
    let now = ctx.now();
    let expires = expiration(ctx);
    ctx.memory.add(
        NewMemory::new(MemoryKind::Plan, Event::new(&identity.name, "plan", &date, &description), now)
            .poignancy(PLAN_POIGNANCY)
            .expires(expires)
            .embedding(embedding),
    );

    let scratch = &mut ctx.agent.scratch;
    scratch.identity.currently = status.status;
    scratch.wake_up_minutes = wake_minutes;
    scratch.daily_plan = status.plan;
    scratch.schedule = DaySchedule::new(slots);
    scratch.curr_day = Some(today);

    tracing::info!("{} planned {} ({:?}), wakes at {}:{:02}", identity.name, date, day, wake_hour, wake_minutes % 60);
    ctx.whisper(1, format!("planned the day: {}", plan_text));
    Ok(())
}

/// What the agent did and thought most recently, for the new day's plan
fn yesterday_trace(ctx: &CycleContext<'_>) -> Vec<String> {
    let mut trace: Vec<String> = ctx
        .memory
        .retrieve_by_type(MemoryKind::Plan)
        .last()
        .map(|p| vec![p.description().to_string()])
        .unwrap_or_default();
    trace.extend(
        ctx.memory
            .get_most_recent_memories(ctx.config.retrieval_limit)
            .into_iter()
            .map(|m| m.description().to_string()),
    );
    trace
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::schedule::{total, MINUTES_PER_DAY};
    use crate::cognition::ScriptedCognition;
    use crate::test_support::Fixture;

    #[test]
    fn test_day_change_detection() {
        let fixture = Fixture::new();
        let mut scratch = fixture.agents[0].scratch.clone();
        let today = NaiveDate::from_ymd_opt(2023, 2, 13).unwrap();
        assert_eq!(day_change(&scratch, today), Some(DayChange::FirstDay));
        scratch.curr_day = Some(today);
        assert_eq!(day_change(&scratch, today), None);
        assert_eq!(day_change(&scratch, today.succ_opt().unwrap()), Some(DayChange::NewDay));
    }

    #[tokio::test]
    async fn test_first_day_schedule_covers_the_day() {
        let cognition = ScriptedCognition::new().with_wake_up("7:30 am");
        let mut fixture = Fixture::new();
        {
            let mut ctx = fixture.context(0, &cognition);
            plan_day(&mut ctx, DayChange::FirstDay).await.unwrap();
        }
        let scratch = &fixture.agents[0].scratch;
        assert_eq!(total(&scratch.schedule.daily), MINUTES_PER_DAY);
        assert_eq!(scratch.schedule.daily, scratch.schedule.hourly_org);
        assert_eq!(scratch.wake_up_minutes, 7 * 60 + 30);
        assert!(scratch.curr_day.is_some());
        let plans = fixture.memories[0].retrieve_by_type(MemoryKind::Plan);
        assert_eq!(plans.len(), 1);
        assert!(plans[0].description().starts_with("This is Isabella Rodriguez's plan for"));
        assert!(plans[0].expiration.is_some());
    }

    #[tokio::test]
    async fn test_new_day_uses_status() {
        let cognition = ScriptedCognition::new();
        let mut fixture = Fixture::new();
        {
            let mut ctx = fixture.context(0, &cognition);
            plan_day(&mut ctx, DayChange::NewDay).await.unwrap();
        }
        assert_eq!(cognition.calls("create_daily_plan_and_status"), 1);
        assert_eq!(total(&fixture.agents[0].scratch.schedule.daily), MINUTES_PER_DAY);
    }
}
