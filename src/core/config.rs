//! Simulation configuration with documented constants
//!
//! All magic numbers are collected here with explanations of their purpose
//! and how they interact with each other.

use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, TownError};

/// Configuration for the simulation systems
///
/// Loaded from TOML; every field has a default so a config file only needs
/// the values it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === TIME ===
    /// Simulated seconds that pass per step
    ///
    /// At 10 seconds, one simulated day takes 8640 steps.
    pub seconds_per_step: u32,

    /// Simulated wall-clock time of step 0
    pub start_time: NaiveDateTime,

    /// Seed for every random choice the simulation makes
    pub seed: u64,

    // === PERCEPTION ===
    /// Chebyshev radius (tiles) of what an agent can see
    pub vision_radius: usize,

    /// How many events an agent attends to per step, closest first
    pub attention_bandwidth: usize,

    /// How many of the latest stored events count as "already perceived"
    ///
    /// An event whose triple appears among the most recent `retention`
    /// events is not stored again.
    pub retention: usize,

    // === RETRIEVAL ===
    /// Per-hour recency decay rate
    ///
    /// recency = (1 - decay_rate) ^ hours_since_last_accessed
    pub recency_decay_rate: f32,

    pub recency_weight: f32,
    pub importance_weight: f32,
    pub relevance_weight: f32,

    /// Candidates pre-selected by similarity before the combined re-rank
    pub retrieval_overfetch: usize,

    /// Default number of memories returned per focal point
    pub retrieval_limit: usize,

    // === REFLECTION ===
    /// Reflection counter start value
    ///
    /// Each stored memory subtracts poignancy * poignancy_scale; at zero the
    /// agent reflects and the counter resets to this value.
    pub reflection_trigger_max: i32,

    /// Number of high-level questions asked per reflection
    pub reflection_focal_points: usize,

    /// Insights derived per focal point
    pub reflection_insights: usize,

    /// Multiplier turning 0-1 poignancy into counter units
    pub poignancy_scale: f32,

    // === SOCIAL ===
    /// Steps before an agent may start talking to the same partner again
    pub chat_buffer_cooldown: u32,

    /// Utterances after which a conversation is force-ended
    pub max_conversation_turns: usize,

    /// Hours after which a past conversation is brought up as context
    pub past_context_hours: i64,

    /// Tile distance under which two agents count as close enough to react
    pub react_tile_distance: usize,

    // === MOVEMENT ===
    /// Candidate target tiles sampled when resolving an address
    pub path_candidate_samples: usize,

    // === MEMORY ===
    /// Expiration of plan and thought memories
    pub memory_expiration_days: i64,

    // === COGNITION ===
    /// Attempts for constrained game-object choices before a random fallback
    pub choice_attempts: usize,

    /// Attempts for unparseable cognition output before the default answer
    pub cognition_retries: usize,

    // === PARALLELIZATION ===
    /// Minimum candidate count before relevance scoring runs on rayon
    pub parallel_threshold: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seconds_per_step: 10,
            start_time: NaiveDateTime::parse_from_str("2023-02-13 00:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap_or_default(),
            seed: 42,

            vision_radius: 4,
            attention_bandwidth: 3,
            retention: 5,

            recency_decay_rate: 0.01,
            recency_weight: 1.0,
            importance_weight: 1.0,
            relevance_weight: 1.0,
            retrieval_overfetch: 200,
            retrieval_limit: 30,

            reflection_trigger_max: 150,
            reflection_focal_points: 3,
            reflection_insights: 5,
            poignancy_scale: 10.0,

            chat_buffer_cooldown: 800,
            max_conversation_turns: 8,
            past_context_hours: 8,
            react_tile_distance: 2,

            path_candidate_samples: 4,

            memory_expiration_days: 30,

            choice_attempts: 5,
            cognition_retries: 3,

            parallel_threshold: 1000,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate().map_err(TownError::Config)?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.seconds_per_step == 0 {
            return Err("seconds_per_step must be positive".into());
        }

        if !(0.0..1.0).contains(&self.recency_decay_rate) {
            return Err(format!(
                "recency_decay_rate ({}) must be in [0, 1)",
                self.recency_decay_rate
            ));
        }

        if self.reflection_trigger_max <= 0 {
            return Err("reflection_trigger_max must be positive".into());
        }

        // Over-fetch must cover what a single retrieval returns
        if self.retrieval_overfetch < self.retrieval_limit {
            return Err(format!(
                "retrieval_overfetch ({}) should be >= retrieval_limit ({})",
                self.retrieval_overfetch, self.retrieval_limit
            ));
        }

        if self.attention_bandwidth == 0 || self.path_candidate_samples == 0 {
            return Err("attention_bandwidth and path_candidate_samples must be positive".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            vision_radius = 6
            reflection_trigger_max = 255
            "#,
        )
        .unwrap();
        assert_eq!(config.vision_radius, 6);
        assert_eq!(config.reflection_trigger_max, 255);
        assert_eq!(config.attention_bandwidth, 3);
        assert_eq!(config.chat_buffer_cooldown, 800);
    }

    #[test]
    fn test_start_time_from_toml() {
        let config = SimulationConfig::from_toml_str(r#"start_time = "2023-02-14T07:30:00""#).unwrap();
        assert_eq!(config.start_time.to_string(), "2023-02-14 07:30:00");
    }

    #[test]
    fn test_invalid_decay_rejected() {
        let result = SimulationConfig::from_toml_str("recency_decay_rate = 1.5");
        assert!(matches!(result, Err(TownError::Config(_))));
    }
}
