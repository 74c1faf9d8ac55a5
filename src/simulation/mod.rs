//! Simulation: the world and the step loop that drives it

pub mod persistence;
pub mod snapshot;
pub mod tick;
pub mod whisper;
pub mod world;

pub use snapshot::{AgentSnapshot, WorldSnapshot};
pub use tick::step;
pub use whisper::{Narrator, Whisper};
pub use world::{AgentSpawn, World};
