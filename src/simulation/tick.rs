//! Tick driver - advances the world by one step
//!
//! Agents run their cycle one after another, so a later agent sees the
//! tiles and conversation turns of the agents before it in this step.
//! The driver is the only place that writes agent events onto the maze.

use std::collections::BTreeMap;

use crate::agent::{run_cycle, Agent, CycleContext, Execution, Peers};
use crate::core::clock::display_time;
use crate::core::error::Result;
use crate::core::event::Event;
use crate::core::types::TileCoord;
use crate::maze::Maze;

use super::snapshot::{AgentSnapshot, WorldSnapshot};
use super::world::World;

/// Run every agent's cycle once, move them and advance the clock
///
/// A failing agent idles on its tile for this step; only an uninitialized
/// memory partition aborts the step.
pub async fn step(world: &mut World) -> Result<WorldSnapshot> {
    let World {
        config,
        maze,
        agents,
        store,
        conversations,
        clock,
        rng,
        cognition,
        narrator,
    } = world;

    let mut executions: BTreeMap<String, Execution> = BTreeMap::new();
    for i in 0..agents.len() {
        let (before, rest) = agents.split_at_mut(i);
        let Some((agent, after)) = rest.split_first_mut() else {
            continue;
        };
        let name = agent.name().to_string();
        let memory = store.partition_mut(&name)?;
        let from = agent.scratch.curr_tile;

        let outcome = {
            let mut ctx = CycleContext {
                agent: &mut *agent,
                memory,
                peers: Peers::new(before, after),
                maze: &*maze,
                conversations: &mut *conversations,
                cognition: cognition.as_ref(),
                config: &*config,
                clock: &*clock,
                rng: &mut *rng,
                narrator: &*narrator,
            };
            run_cycle(&mut ctx).await
        };

        let execution = match outcome {
            Ok(execution) => execution,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!("{} idles this step: {}", name, e);
                Execution::idle(from)
            }
        };
        apply(maze, agent, from, &execution)?;
        executions.insert(name, execution);
    }

    let snapshot = WorldSnapshot {
        step: clock.step(),
        time: display_time(&clock.now()),
        agents: agents
            .iter()
            .map(|agent| {
                let execution = executions
                    .get(agent.name())
                    .cloned()
                    .unwrap_or_else(|| Execution::idle(agent.scratch.curr_tile));
                AgentSnapshot::capture(agent, &execution, maze)
            })
            .collect(),
    };
    clock.advance();
    Ok(snapshot)
}

/// Move an agent and its events on the maze
fn apply(maze: &mut Maze, agent: &mut Agent, from: TileCoord, execution: &Execution) -> Result<()> {
    let name = agent.name().to_string();
    let scratch = &mut agent.scratch;
    let to = if maze.is_walkable(execution.next_tile) {
        execution.next_tile
    } else {
        from
    };

    maze.remove_event(from, &name)?;
    let event = scratch
        .action
        .as_ref()
        .map(|a| a.event.clone())
        .unwrap_or_else(|| Event::idle(&name));
    maze.add_event(to, event)?;

    let current_object = scratch.action.as_ref().and_then(|a| a.object.clone());
    if let Some(object) = &current_object {
        maze.set_object_event(&object.address, object.event.clone());
    }
    if let Some(finished) = scratch.finished_action.take() {
        if let Some(old) = finished.object {
            if current_object.as_ref().map(|o| &o.address) != Some(&old.address) {
                maze.set_object_idle(&old.address);
            }
        }
    }

    scratch.curr_tile = to;
    Ok(())
}
