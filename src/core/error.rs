use thiserror::Error;

#[derive(Error, Debug)]
pub enum TownError {
    /// Memory was queried for an agent that was never registered with the store.
    #[error("Memory partition not initialized for agent: {0}")]
    UninitializedPartition(String),

    #[error("Tile out of bounds: ({x}, {y})")]
    OutOfBounds { x: usize, y: usize },

    #[error("Cognition error: {0}")]
    Cognition(String),

    #[error("Maze load error: {0}")]
    MazeLoad(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl TownError {
    /// Errors that must stop the whole tick instead of degrading one agent.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TownError::UninitializedPartition(_))
    }
}

pub type Result<T> = std::result::Result<T, TownError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_uninitialized_partition_is_fatal() {
        assert!(TownError::UninitializedPartition("Isabella".into()).is_fatal());
        assert!(!TownError::Cognition("bad json".into()).is_fatal());
        assert!(!TownError::OutOfBounds { x: 1, y: 2 }.is_fatal());
    }

    #[test]
    fn test_error_messages() {
        let err = TownError::OutOfBounds { x: 3, y: 9 };
        assert_eq!(err.to_string(), "Tile out of bounds: (3, 9)");
    }
}
