//! Action target addresses
//!
//! Besides plain hierarchical addresses, an action may target
//! `<random>` (any tile of an arena), `<waiting> x y` (a literal tile) or
//! `<persona> name` (wherever that agent currently is).

use nom::bytes::complete::tag;
use nom::character::complete::{digit1, space0, space1};
use nom::combinator::{map_res, rest};
use nom::sequence::preceded;
use nom::{IResult, Parser};
use serde::{Deserialize, Serialize};

use crate::core::types::TileCoord;

pub const RANDOM_TOKEN: &str = "<random>";
pub const WAITING_TOKEN: &str = "<waiting>";
pub const PERSONA_TOKEN: &str = "<persona>";

/// Parsed form of an action address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionAddress {
    /// A hierarchical address such as `the Ville:cafe:kitchen:stove`
    Tile(String),
    /// Any tile under the given arena address
    Random(String),
    /// Stand on this literal tile
    Waiting(TileCoord),
    /// Walk toward another agent
    Persona(String),
}

impl ActionAddress {
    pub fn parse(address: &str) -> Self {
        let address = address.trim();
        if let Ok((_, coord)) = waiting(address) {
            return ActionAddress::Waiting(coord);
        }
        if let Ok((_, name)) = persona(address) {
            return ActionAddress::Persona(name.trim().to_string());
        }
        if let Some(prefix) = address.strip_suffix(RANDOM_TOKEN) {
            return ActionAddress::Random(prefix.trim_end_matches(':').to_string());
        }
        ActionAddress::Tile(address.to_string())
    }

    pub fn render(&self) -> String {
        match self {
            ActionAddress::Tile(a) => a.clone(),
            ActionAddress::Random(prefix) => format!("{}:{}", prefix, RANDOM_TOKEN),
            ActionAddress::Waiting(c) => format!("{} {} {}", WAITING_TOKEN, c.x, c.y),
            ActionAddress::Persona(name) => format!("{} {}", PERSONA_TOKEN, name),
        }
    }

    /// Hierarchical prefix (world:sector:arena) used for same-place checks
    pub fn arena_prefix(&self) -> Option<String> {
        match self {
            ActionAddress::Tile(a) | ActionAddress::Random(a) => {
                let parts: Vec<&str> = a.split(':').collect();
                Some(parts[..parts.len().min(3)].join(":"))
            }
            _ => None,
        }
    }
}

fn number(input: &str) -> IResult<&str, usize> {
    map_res(digit1, |s: &str| s.parse::<usize>()).parse(input)
}

fn waiting(input: &str) -> IResult<&str, TileCoord> {
    let (input, (_, _, x, _, y)) = (tag(WAITING_TOKEN), space1, number, space1, number).parse(input)?;
    Ok((input, TileCoord::new(x, y)))
}

fn persona(input: &str) -> IResult<&str, &str> {
    preceded((tag(PERSONA_TOKEN), space0), rest).parse(input)
}

/// Split `a:b:c` into its components
pub fn components(address: &str) -> Vec<&str> {
    address.split(':').map(str::trim).collect()
}

/// `world:sector:arena` style join, skipping empty parts
pub fn join(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(":")
}
