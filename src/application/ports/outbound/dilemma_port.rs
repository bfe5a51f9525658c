//! Dilemma port - the vendor-agnostic AI boundary
//!
//! The engine never knows which provider answers a request; it only knows
//! this contract. Calls must complete or fail within the configured
//! timeout, and every failure degrades to the built-in scenario bank or a
//! neutral score rather than propagating.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{GrowthTraits, Stage};

/// Context handed to the generator for one decision node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DilemmaContext {
    pub age: u32,
    pub stage: Stage,
    /// Stage themes the prompt should lean on.
    pub themes: Vec<String>,
    /// Tags of dilemmas already resolved this run, oldest first.
    pub history_tags: Vec<String>,
}

/// A generated dilemma: a prompt and 2-4 options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedDilemma {
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_difficulty")]
    pub difficulty: f32,
}

fn default_difficulty() -> f32 {
    0.5
}

impl GeneratedDilemma {
    /// The contract requires between two and four options.
    pub fn is_valid(&self) -> bool {
        (2..=4).contains(&self.options.len()) && !self.prompt.is_empty()
    }

    /// The built-in default dilemma used whenever the boundary fails or
    /// times out, so play is never blocked on a vendor.
    pub fn fallback() -> Self {
        Self {
            prompt: "A friend asks you to break a rule to help them. What do you do?".to_string(),
            options: vec![
                "Refuse".to_string(),
                "Accept".to_string(),
                "Seek help".to_string(),
            ],
            tags: vec!["responsibility".to_string(), "integrity".to_string()],
            difficulty: 0.5,
        }
    }
}

/// A submitted choice sent out for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub age: u32,
    pub stage: Stage,
    pub prompt: String,
    pub options: Vec<String>,
    pub chosen_index: usize,
    pub chosen_text: String,
    pub tags: Vec<String>,
    pub difficulty: f32,
}

/// The scored outcome of a choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceScore {
    pub growth_delta: i32,
    pub match_score: f32,
    pub feedback: String,
    #[serde(default)]
    pub value_scores: GrowthTraits,
    /// Multi-voice commentary keyed by voice name. Missing voices are
    /// filled from local defaults by the episode manager.
    #[serde(default)]
    pub voices: BTreeMap<String, String>,
}

impl ChoiceScore {
    /// Neutral fallback applied when the scoring call fails or times out:
    /// no growth, no trait movement, locally-built voices only.
    pub fn neutral() -> Self {
        Self {
            growth_delta: 0,
            match_score: 0.0,
            feedback: String::new(),
            value_scores: GrowthTraits::default(),
            voices: BTreeMap::new(),
        }
    }
}

/// Context for the end-of-run life summary narrative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifeSummaryContext {
    pub age: u32,
    pub stage: Stage,
    pub traits: GrowthTraits,
    pub decisions: usize,
    pub history_tags: Vec<String>,
}

/// Errors crossing the AI boundary. Always recovered locally.
#[derive(Debug, thiserror::Error)]
pub enum DilemmaPortError {
    #[error("AI boundary call timed out")]
    Timeout,
    #[error("AI provider error: {0}")]
    Provider(String),
}

/// Unified interface to whatever answers dilemma requests.
#[async_trait]
pub trait DilemmaPort: Send + Sync {
    /// Generate a dilemma for a decision node.
    async fn generate_dilemma(
        &self,
        context: DilemmaContext,
    ) -> Result<GeneratedDilemma, DilemmaPortError>;

    /// Score a submitted choice.
    async fn score_choice(&self, request: ScoreRequest) -> Result<ChoiceScore, DilemmaPortError>;

    /// Narrative recap of the whole run. Optional richness; a provider may
    /// return an error and the caller falls back to a local summary.
    async fn life_summary(
        &self,
        context: LifeSummaryContext,
    ) -> Result<String, DilemmaPortError>;

    /// Provider name for logs and the state payload.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_count_contract() {
        let mut dilemma = GeneratedDilemma {
            prompt: "p".into(),
            options: vec!["a".into()],
            tags: vec![],
            difficulty: 0.5,
        };
        assert!(!dilemma.is_valid());
        dilemma.options.push("b".into());
        assert!(dilemma.is_valid());
        dilemma.options.extend(["c".into(), "d".into(), "e".into()]);
        assert!(!dilemma.is_valid());
    }

    #[test]
    fn test_neutral_score_moves_nothing() {
        let score = ChoiceScore::neutral();
        assert_eq!(score.growth_delta, 0);
        assert!(score.value_scores.is_zero());
    }
}
