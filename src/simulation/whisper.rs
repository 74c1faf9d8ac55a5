//! Whisper: fine-grained narration of what agents are thinking
//!
//! A broadcast channel of short messages keyed by agent and verbosity
//! level (1 = milestones, 3 = per-stage detail). Nobody has to listen.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Messages kept for slow subscribers before they start lagging
const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Whisper {
    pub agent: String,
    pub level: u8,
    pub step: u64,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Narrator {
    sender: broadcast::Sender<Whisper>,
}

impl Narrator {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Whisper> {
        self.sender.subscribe()
    }

    pub fn whisper(&self, agent: &str, level: u8, step: u64, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(agent, level, step, "{}", message);
        // No subscribers is fine
        let _ = self.sender.send(Whisper {
            agent: agent.to_string(),
            level,
            step,
            message,
        });
    }
}

impl Default for Narrator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whisper_without_subscribers() {
        let narrator = Narrator::new();
        narrator.whisper("Isabella Rodriguez", 1, 0, "planned the day");
    }

    #[tokio::test]
    async fn test_subscriber_receives_whispers() {
        let narrator = Narrator::new();
        let mut rx = narrator.subscribe();
        narrator.whisper("Klaus Mueller", 2, 7, "now reading");
        let whisper = rx.recv().await.unwrap();
        assert_eq!(whisper.agent, "Klaus Mueller");
        assert_eq!(whisper.level, 2);
        assert_eq!(whisper.step, 7);
        assert_eq!(whisper.message, "now reading");
    }
}
