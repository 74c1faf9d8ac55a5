//! Execute: turn the current action into the next tile
//!
//! A path is planned once per action and then consumed one tile per step.
//! Following another agent is the exception: that path is recomputed every
//! step, and only half of it is walked so both sides meet in the middle.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::TileCoord;
use crate::maze::address::components;
use crate::maze::ActionAddress;

use super::action::DEFAULT_EMOJI;
use super::CycleContext;

/// Outcome of one cycle: where the agent stands next and what it shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub next_tile: TileCoord,
    pub emoji: String,
    /// "description @ address"
    pub description: String,
}

impl Execution {
    /// Stand still doing nothing
    pub fn idle(tile: TileCoord) -> Self {
        Self {
            next_tile: tile,
            emoji: DEFAULT_EMOJI.to_string(),
            description: "idle".to_string(),
        }
    }
}

pub fn execute(ctx: &mut CycleContext<'_>) -> Result<Execution> {
    let here = ctx.agent.scratch.curr_tile;
    let Some(action) = ctx.agent.scratch.action.clone() else {
        return Ok(Execution::idle(here));
    };

    match action.target() {
        ActionAddress::Persona(partner) => {
            let path = ctx
                .peers
                .get(&partner)
                .map(|peer| ctx.maze.find_path(here, peer.scratch.curr_tile))
                .unwrap_or_default();
            ctx.agent.scratch.planned_path = meeting_half(&path).iter().copied().collect();
        }
        target if !ctx.agent.scratch.action_path_set => {
            let path = plan_path(ctx, &target);
            let scratch = &mut ctx.agent.scratch;
            scratch.planned_path = path.into_iter().collect();
            scratch.action_path_set = true;
        }
        _ => {}
    }

    let next_tile = ctx.agent.scratch.planned_path.pop_front().unwrap_or(here);
    Ok(Execution {
        next_tile,
        emoji: action.emoji.clone(),
        description: format!("{} @ {}", action.description, action.address),
    })
}

/// The first half of a path toward another agent; nothing when adjacent
pub fn meeting_half(path: &[TileCoord]) -> &[TileCoord] {
    if path.len() <= 1 {
        return &[];
    }
    let mid = (path.len() - 1) / 2;
    &path[..=mid]
}

/// Tiles an action address may be carried out on
///
/// An unknown tile address falls back to its closest known parent; with no
/// known parent at all the result is empty.
pub fn target_tiles(ctx: &CycleContext<'_>, target: &ActionAddress) -> Vec<TileCoord> {
    match target {
        ActionAddress::Waiting(coord) => vec![*coord],
        ActionAddress::Random(prefix) => ctx.maze.address_tiles(prefix).map(<[_]>::to_vec).unwrap_or_default(),
        ActionAddress::Tile(address) => {
            let parts = components(address);
            (1..=parts.len())
                .rev()
                .find_map(|n| ctx.maze.address_tiles(&parts[..n].join(":")))
                .map(<[_]>::to_vec)
                .unwrap_or_default()
        }
        ActionAddress::Persona(_) => Vec::new(),
    }
}

/// Shortest path to a sampled, preferably unoccupied, target tile
fn plan_path(ctx: &mut CycleContext<'_>, target: &ActionAddress) -> Vec<TileCoord> {
    let here = ctx.agent.scratch.curr_tile;
    let mut tiles = target_tiles(ctx, target);
    if tiles.is_empty() {
        tracing::debug!("{} has no tiles for {}, picking a random one", ctx.name(), target.render());
        tiles.extend(ctx.maze.get_random_tile(&mut *ctx.rng, &[]));
    }

    let samples: Vec<TileCoord> = tiles
        .choose_multiple(&mut *ctx.rng, ctx.config.path_candidate_samples)
        .copied()
        .collect();
    let name = ctx.name();
    let free: Vec<TileCoord> = samples
        .iter()
        .copied()
        .filter(|c| ctx.maze.tile(*c).map(|t| !t.occupied_by_other(name)).unwrap_or(false))
        .collect();
    let candidates = if free.is_empty() { samples } else { free };

    candidates
        .into_iter()
        .filter_map(|goal| {
            if goal == here {
                return Some(Vec::new());
            }
            let path = ctx.maze.find_path(here, goal);
            (!path.is_empty()).then_some(path)
        })
        .min_by_key(Vec::len)
        .unwrap_or_default()
}
