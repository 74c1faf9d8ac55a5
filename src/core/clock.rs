//! Simulated time
//!
//! The simulation advances in fixed steps of `seconds_per_step`. Agents
//! reason in minutes of the day, so most helpers work at minute granularity.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Clock that maps the step counter to simulated date and time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimClock {
    start: NaiveDateTime,
    step: u64,
    seconds_per_step: u32,
}

impl SimClock {
    pub fn new(start: NaiveDateTime, seconds_per_step: u32) -> Self {
        Self {
            start,
            step: 0,
            seconds_per_step,
        }
    }

    pub fn advance(&mut self) {
        self.step += 1;
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn seconds_per_step(&self) -> u32 {
        self.seconds_per_step
    }

    pub fn now(&self) -> NaiveDateTime {
        self.start + Duration::seconds(self.step as i64 * self.seconds_per_step as i64)
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    pub fn hour(&self) -> u32 {
        self.now().hour()
    }

    pub fn minutes_of_day(&self) -> u32 {
        minutes_of_day(&self.now())
    }
}

/// Minutes elapsed since midnight, seconds truncated
pub fn minutes_of_day(time: &NaiveDateTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Truncate a timestamp to whole minutes
pub fn floor_minute(time: &NaiveDateTime) -> NaiveDateTime {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(*time)
}

/// Whole minutes between two timestamps, floored at zero
pub fn minutes_between(from: &NaiveDateTime, to: &NaiveDateTime) -> u32 {
    (floor_minute(to) - floor_minute(from)).num_minutes().max(0) as u32
}

/// Hours between two timestamps as a float, floored at zero
pub fn hours_between(from: &NaiveDateTime, to: &NaiveDateTime) -> f32 {
    ((*to - *from).num_seconds().max(0) as f32) / 3600.0
}

/// Human-readable timestamp used in prompts and snapshots
pub fn display_time(time: &NaiveDateTime) -> String {
    time.format("%B %d, %Y, %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2023-02-13 23:59:40", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_clock_advances_by_step() {
        let mut clock = SimClock::new(start(), 10);
        assert_eq!(clock.step(), 0);
        clock.advance();
        assert_eq!(clock.step(), 1);
        assert_eq!(clock.now().second(), 50);
    }

    #[test]
    fn test_day_rolls_over() {
        let mut clock = SimClock::new(start(), 10);
        let first_day = clock.today();
        clock.advance();
        clock.advance();
        assert_ne!(clock.today(), first_day);
        assert_eq!(clock.minutes_of_day(), 0);
    }

    #[test]
    fn test_minutes_between_floors_seconds() {
        let a = NaiveDateTime::parse_from_str("2023-02-13 10:00:50", "%Y-%m-%d %H:%M:%S").unwrap();
        let b = NaiveDateTime::parse_from_str("2023-02-13 10:03:10", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(minutes_between(&a, &b), 3);
        assert_eq!(minutes_between(&b, &a), 0);
    }

    #[test]
    fn test_hours_between() {
        let a = NaiveDateTime::parse_from_str("2023-02-13 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let b = NaiveDateTime::parse_from_str("2023-02-13 13:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert!((hours_between(&a, &b) - 3.5).abs() < 1e-6);
    }
}
