//! Constrained choice
//!
//! "Pick one of these options" questions are answered through a single
//! contract: the result is always one of the offered options, verbatim, or
//! a random option once the attempts are used up. How an implementation
//! constrains its output (grammar, retry, heuristics) is its own business.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{CallKey, Cognition};

/// Which level of the location funnel a choice is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChoiceLevel {
    Sector,
    Arena,
    GameObject,
}

impl ChoiceLevel {
    pub fn operation(&self) -> &'static str {
        match self {
            ChoiceLevel::Sector => "resolve_sector",
            ChoiceLevel::Arena => "resolve_arena",
            ChoiceLevel::GameObject => "resolve_game_object",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChoiceRequest {
    pub level: ChoiceLevel,
    pub agent: String,
    /// The activity the location is for
    pub activity: String,
    /// Free-text background (home, current location, ...)
    pub context: String,
    pub options: Vec<String>,
}

impl ChoiceRequest {
    pub fn new(
        level: ChoiceLevel,
        agent: impl Into<String>,
        activity: impl Into<String>,
        context: impl Into<String>,
        options: Vec<String>,
    ) -> Self {
        Self {
            level,
            agent: agent.into(),
            activity: activity.into(),
            context: context.into(),
            options,
        }
    }

    /// The offered option matching `answer` verbatim (surrounding whitespace ignored)
    pub fn accept(&self, answer: &str) -> Option<&String> {
        let answer = answer.trim();
        self.options.iter().find(|o| o.as_str() == answer)
    }
}

/// Ask for a choice up to `attempts` times, then fall back to a random option
///
/// Returns None only when there are no options at all.
pub async fn resolve_choice<R: Rng + ?Sized>(
    cognition: &dyn Cognition,
    key: &CallKey,
    request: &ChoiceRequest,
    attempts: usize,
    rng: &mut R,
) -> Option<String> {
    if request.options.is_empty() {
        return None;
    }

    for attempt in 0..attempts.max(1) {
        match cognition.choose(&key.retry(attempt), request).await {
            Ok(answer) => {
                if let Some(option) = request.accept(&answer) {
                    return Some(option.clone());
                }
                tracing::debug!(
                    "{}: '{}' is not one of {:?} (attempt {})",
                    request.level.operation(),
                    answer,
                    request.options,
                    attempt + 1
                );
            }
            Err(e) => tracing::debug!("{} failed: {}", request.level.operation(), e),
        }
    }

    let fallback = request.options.choose(rng).cloned();
    tracing::warn!(
        "{} for {}: no valid answer, falling back to {:?}",
        request.level.operation(),
        request.agent,
        fallback
    );
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cognition::ScriptedCognition;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn request(options: &[&str]) -> ChoiceRequest {
        ChoiceRequest::new(
            ChoiceLevel::GameObject,
            "Isabella",
            "brewing coffee",
            "",
            options.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_accept_is_verbatim() {
        let req = request(&["counter", "coffee machine"]);
        assert_eq!(req.accept("  coffee machine "), Some(&"coffee machine".to_string()));
        assert_eq!(req.accept("Coffee Machine"), None);
    }

    #[tokio::test]
    async fn test_valid_answer_is_returned() {
        let cognition = ScriptedCognition::new();
        let key = CallKey::new("Isabella", "resolve_game_object", 0, "brewing coffee");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let choice = resolve_choice(&cognition, &key, &request(&["coffee machine", "bed"]), 5, &mut rng).await;
        assert_eq!(choice.as_deref(), Some("coffee machine"));
    }

    #[tokio::test]
    async fn test_invalid_answers_fall_back_to_an_option() {
        let cognition = ScriptedCognition::new().with_choice_answer("the moon");
        let key = CallKey::new("Isabella", "resolve_game_object", 0, "brewing coffee");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let req = request(&["counter", "coffee machine"]);
        let choice = resolve_choice(&cognition, &key, &req, 5, &mut rng).await.unwrap();
        assert!(req.options.contains(&choice));
        assert_eq!(cognition.calls("choose"), 5);
    }

    #[tokio::test]
    async fn test_no_options() {
        let cognition = ScriptedCognition::new();
        let key = CallKey::new("Isabella", "resolve_sector", 0, "");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(resolve_choice(&cognition, &key, &request(&[]), 1, &mut rng).await.is_none());
        assert_eq!(cognition.calls("choose"), 0);
    }
}
