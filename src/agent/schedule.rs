//! Daily schedule arithmetic
//!
//! A schedule is an ordered list of (activity, minutes) slots. The whole day
//! sums to exactly 1440 minutes and every rewrite of a window keeps that
//! window's total, because slot lookup is done by summing durations against
//! the minutes elapsed today.

use serde::{Deserialize, Serialize};

use crate::cognition::HourlyActivity;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Shortest sub-activity a decomposition may produce
pub const MIN_SUBTASK_MINUTES: u32 = 5;

const DEFAULT_ACTIVITY: &str = "sleeping";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub activity: String,
    pub duration: u32,
}

impl ScheduleSlot {
    pub fn new(activity: impl Into<String>, duration: u32) -> Self {
        Self {
            activity: activity.into(),
            duration,
        }
    }
}

/// The canonical schedule and its undecomposed hourly reference copy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub daily: Vec<ScheduleSlot>,
    pub hourly_org: Vec<ScheduleSlot>,
}

impl DaySchedule {
    pub fn new(slots: Vec<ScheduleSlot>) -> Self {
        Self {
            hourly_org: slots.clone(),
            daily: slots,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.daily.is_empty()
    }
}

pub fn total(slots: &[ScheduleSlot]) -> u32 {
    slots.iter().map(|s| s.duration).sum()
}

/// Minute of day at which slot `index` starts
pub fn slot_start(slots: &[ScheduleSlot], index: usize) -> u32 {
    total(&slots[..index.min(slots.len())])
}

/// Index of the slot covering `minute`, clamped to the last slot
pub fn index_at(slots: &[ScheduleSlot], minute: u32) -> usize {
    let mut elapsed = 0;
    for (i, slot) in slots.iter().enumerate() {
        elapsed += slot.duration;
        if elapsed > minute {
            return i;
        }
    }
    slots.len().saturating_sub(1)
}

/// Whether a slot should be broken into sub-activities
///
/// Only slots of an hour or more qualify. Sleep is left whole unless it is a
/// short nap of at most an hour; "sleeping", "asleep" and "in bed" never
/// decompose.
pub fn needs_decomposition(slot: &ScheduleSlot) -> bool {
    if slot.duration < 60 {
        return false;
    }
    let activity = slot.activity.to_lowercase();
    if !activity.contains("sleep") && !activity.contains("bed") {
        return true;
    }
    if ["sleeping", "asleep", "in bed"].iter().any(|w| activity.contains(w)) {
        return false;
    }
    slot.duration <= 60
}

/// Correct `slots` in place so they sum to exactly `target`
///
/// A shortfall extends the last slot; an excess is taken off the end,
/// dropping slots that shrink to nothing.
pub fn force_total(slots: &mut Vec<ScheduleSlot>, target: u32) {
    slots.retain(|s| s.duration > 0);
    let sum = total(slots);

    if sum < target {
        if let Some(last) = slots.last_mut() {
            last.duration += target - sum;
        }
        return;
    }

    let mut excess = sum - target;
    while excess > 0 {
        let Some(last) = slots.last_mut() else {
            break;
        };
        if last.duration > excess {
            last.duration -= excess;
            excess = 0;
        } else {
            excess -= last.duration;
            slots.pop();
        }
    }
}

/// Turn 24 hourly activities into a merged day schedule of 1440 minutes
///
/// Missing hours repeat the previous hour's activity (or "sleeping" before
/// the first entry); consecutive equal activities are merged.
pub fn normalize_day(hourly: &[HourlyActivity]) -> Vec<ScheduleSlot> {
    let mut slots: Vec<ScheduleSlot> = Vec::new();
    let mut current = DEFAULT_ACTIVITY.to_string();

    for hour in 0..24 {
        if let Some(entry) = hourly.iter().rev().find(|h| h.hour == hour) {
            let activity = entry.activity.trim();
            if !activity.is_empty() {
                current = activity.to_string();
            }
        }
        match slots.last_mut() {
            Some(last) if last.activity == current => last.duration += 60,
            _ => slots.push(ScheduleSlot::new(current.clone(), 60)),
        }
    }

    force_total(&mut slots, MINUTES_PER_DAY);
    slots
}

/// Force decomposed sub-activities to sum to `target`, each at least 5 minutes
pub fn fix_decomposition(parent: &str, subtasks: Vec<ScheduleSlot>, target: u32) -> Vec<ScheduleSlot> {
    let subtasks: Vec<ScheduleSlot> = subtasks
        .into_iter()
        .filter(|s| !s.activity.trim().is_empty())
        .map(|s| ScheduleSlot::new(s.activity.trim(), s.duration.max(MIN_SUBTASK_MINUTES)))
        .collect();

    if subtasks.is_empty() || target < MIN_SUBTASK_MINUTES {
        let activity = subtasks.first().map(|s| s.activity.as_str()).unwrap_or(parent);
        return vec![ScheduleSlot::new(activity, target)];
    }

    let mut fixed: Vec<ScheduleSlot> = Vec::with_capacity(subtasks.len());
    let mut remaining = target;
    for task in subtasks {
        if remaining == 0 {
            break;
        }
        let duration = task.duration.min(remaining);
        remaining -= duration;
        match fixed.last_mut() {
            // A sliver too short to stand alone joins the previous task
            Some(prev) if duration < MIN_SUBTASK_MINUTES => prev.duration += duration,
            _ => fixed.push(ScheduleSlot::new(task.activity, duration)),
        }
    }
    if let Some(last) = fixed.last_mut() {
        last.duration += remaining;
    }
    fixed
}

/// `fixed` followed by `rest`, summing to exactly `target`
///
/// Only `rest` is stretched or trimmed. `fixed` is clipped only when it alone
/// runs past `target`, which happens when an interruption crosses midnight.
pub fn fit_after(mut fixed: Vec<ScheduleSlot>, mut rest: Vec<ScheduleSlot>, target: u32) -> Vec<ScheduleSlot> {
    let fixed_total = total(&fixed);
    if fixed_total >= target {
        force_total(&mut fixed, target);
        return fixed;
    }

    let room = target - fixed_total;
    force_total(&mut rest, room);
    if rest.is_empty() {
        if let Some(last) = fixed.last_mut() {
            last.duration += room;
        }
    }
    fixed.extend(rest);
    fixed
}

/// Label sub-activities as "parent (sub)"
pub fn label_subtasks(parent: &str, subtasks: Vec<ScheduleSlot>) -> Vec<ScheduleSlot> {
    subtasks
        .into_iter()
        .map(|s| ScheduleSlot::new(format!("{} ({})", parent, s.activity), s.duration))
        .collect()
}

/// Slice of the daily schedule rewritten after an interruption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start_index: usize,
    /// Exclusive
    pub end_index: usize,
    pub start_minute: u32,
    pub end_minute: u32,
}

impl Window {
    pub fn duration(&self) -> u32 {
        self.end_minute - self.start_minute
    }
}

/// The window of `daily` enclosing `minute`, sized from the hourly reference
///
/// The hourly slot covering `minute` decides the span: itself when it lasts
/// two hours or more, itself plus the next hourly slot otherwise, or two
/// hours when it is the last one. The window then grows until it also covers
/// `inserted` minutes from `minute`, capped at the end of the day.
pub fn enclosing_window(schedule: &DaySchedule, minute: u32, inserted: u32) -> Window {
    let daily = &schedule.daily;
    let org = &schedule.hourly_org;
    let day_total = total(daily);

    let org_index = index_at(org, minute);
    let org_start = (slot_start(org, org_index) / 60) * 60;
    let span = match (org.get(org_index), org.get(org_index + 1)) {
        (Some(slot), _) if slot.duration >= 120 => slot.duration,
        (Some(slot), Some(next)) => slot.duration + next.duration,
        _ => 120,
    };
    let end = (org_start + span).max(minute + inserted).min(day_total);

    let start_index = index_at(daily, org_start.min(minute));
    let mut end_index = (start_index..daily.len())
        .find(|&i| slot_start(daily, i) >= end)
        .unwrap_or(daily.len());
    if end_index <= start_index {
        end_index = (start_index + 1).min(daily.len());
    }

    Window {
        start_index,
        end_index,
        start_minute: slot_start(daily, start_index),
        end_minute: slot_start(daily, end_index),
    }
}

/// The part of `slice` (starting at `slice_start`) that lies before `minute`
pub fn truncate_at(slice: &[ScheduleSlot], slice_start: u32, minute: u32) -> Vec<ScheduleSlot> {
    let mut kept = Vec::new();
    let mut cursor = slice_start;
    for slot in slice {
        if cursor >= minute {
            break;
        }
        let duration = slot.duration.min(minute - cursor);
        kept.push(ScheduleSlot::new(slot.activity.clone(), duration));
        cursor += slot.duration;
    }
    kept
}

/// The part of `slice` (starting at `slice_start`) that lies after `minute`
pub fn remainder_after(slice: &[ScheduleSlot], slice_start: u32, minute: u32) -> Vec<ScheduleSlot> {
    let mut rest = Vec::new();
    let mut cursor = slice_start;
    for slot in slice {
        let end = cursor + slot.duration;
        if end > minute {
            let duration = end - cursor.max(minute);
            rest.push(ScheduleSlot::new(slot.activity.clone(), duration));
        }
        cursor = end;
    }
    rest
}

/// Replace the window's slots with `replacement`
pub fn splice_window(daily: &mut Vec<ScheduleSlot>, window: &Window, replacement: Vec<ScheduleSlot>) {
    let end = window.end_index.min(daily.len());
    let start = window.start_index.min(end);
    daily.splice(start..end, replacement);
}
