pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod types;

pub use clock::SimClock;
pub use config::SimulationConfig;
pub use error::{Result, TownError};
pub use event::Event;
pub use types::{ConversationId, MemoryId, TileCoord};
