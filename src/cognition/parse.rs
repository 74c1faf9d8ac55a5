//! Parsers for free-text cognition answers

use nom::branch::alt;
use nom::bytes::complete::tag_no_case;
use nom::character::complete::{char, digit1, space0};
use nom::combinator::{map_res, opt, value};
use nom::sequence::preceded;
use nom::{IResult, Parser};

/// Wake-up time used when the answer cannot be parsed (6:00 AM)
pub const DEFAULT_WAKE_UP_MINUTES: u32 = 6 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meridiem {
    Am,
    Pm,
}

fn number(input: &str) -> IResult<&str, u32> {
    map_res(digit1, |s: &str| s.parse::<u32>()).parse(input)
}

fn meridiem(input: &str) -> IResult<&str, Meridiem> {
    alt((
        value(Meridiem::Am, alt((tag_no_case("a.m."), tag_no_case("am")))),
        value(Meridiem::Pm, alt((tag_no_case("p.m."), tag_no_case("pm")))),
    ))
    .parse(input)
}

fn clock(input: &str) -> IResult<&str, (u32, u32, Option<Meridiem>)> {
    let (input, (hour, minute, meridiem)) = (
        number,
        opt(preceded(char(':'), number)),
        opt(preceded(space0, meridiem)),
    )
        .parse(input)?;
    Ok((input, (hour, minute.unwrap_or(0), meridiem)))
}

/// Parse the first "H[:MM] [AM|PM]" time in `text` into (hour, minute), 24h
pub fn parse_clock(text: &str) -> Option<(u32, u32)> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let (_, (hour, minute, meridiem)) = clock(&text[start..]).ok()?;

    let hour = match (meridiem, hour) {
        (Some(Meridiem::Am), 12) => 0,
        (Some(Meridiem::Pm), h) if h < 12 => h + 12,
        (_, h) => h,
    };
    (hour < 24 && minute < 60).then_some((hour, minute))
}

/// Minute of day an agent wakes up, defaulting to 6:00 AM
pub fn wake_up_minutes(answer: &str) -> u32 {
    match parse_clock(answer) {
        Some((hour, minute)) => hour * 60 + minute,
        None => {
            tracing::warn!("Unparseable wake-up time '{}', using 6:00 AM", answer);
            DEFAULT_WAKE_UP_MINUTES
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clock_formats() {
        assert_eq!(parse_clock("07:30 AM"), Some((7, 30)));
        assert_eq!(parse_clock("7 pm"), Some((19, 0)));
        assert_eq!(parse_clock("12:15 AM"), Some((0, 15)));
        assert_eq!(parse_clock("12:00 p.m."), Some((12, 0)));
        assert_eq!(parse_clock("I usually get up at 5:45am"), Some((5, 45)));
        assert_eq!(parse_clock("18:20"), Some((18, 20)));
    }

    #[test]
    fn test_parse_clock_rejects_garbage() {
        assert_eq!(parse_clock("early"), None);
        assert_eq!(parse_clock("25:00"), None);
        assert_eq!(parse_clock("7:75 am"), None);
    }

    #[test]
    fn test_wake_up_default() {
        assert_eq!(wake_up_minutes("whenever I feel like it"), DEFAULT_WAKE_UP_MINUTES);
        assert_eq!(wake_up_minutes("8:00 AM"), 480);
    }
}
