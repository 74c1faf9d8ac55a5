//! Agent memory: where things are, and what happened

pub mod associative;
pub mod node;
pub mod spatial;
pub mod store;

pub use associative::{AssociativeMemory, RetrievalParams};
pub use node::{ChatTurn, Filling, MemoryKind, NewMemory, PerceivedEvent};
pub use spatial::SpatialMemory;
pub use store::RelevanceStore;
