//! Hamlet - a tile-based town of agents that perceive, remember, plan and converse

pub mod agent;
pub mod cognition;
pub mod core;
pub mod demo;
pub mod maze;
pub mod memory;
pub mod simulation;
