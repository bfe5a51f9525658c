//! Dilemma episodes - one moral question per decision node
//!
//! Each episode runs a small state machine. Generation and scoring go
//! through the AI boundary asynchronously; the episode only ever holds one
//! outstanding request, and the tick loop applies completions.
//!
//! ```text
//! Pending -> AwaitingAI -> AwaitingChoice -> Resolved
//!    |            |
//!    +------------+--> Expired   (hero left the node before choosing)
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{CellPos, EngineTime, EpisodeId, GrowthTraits};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeState {
    Pending,
    AwaitingAi,
    AwaitingChoice,
    Resolved,
    Expired,
}

/// Why a choice submission was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("episode is not awaiting a choice")]
    NotAwaitingChoice,
    #[error("option index out of range")]
    InvalidOption,
    #[error("a choice was already submitted")]
    AlreadyChosen,
}

/// Scored feedback captured verbatim from the AI boundary (or its local
/// fallback) when the episode resolves.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EpisodeFeedback {
    pub growth_delta: i32,
    pub match_score: f32,
    pub feedback: String,
    #[serde(default)]
    pub value_scores: GrowthTraits,
    /// Multi-voice commentary keyed by voice name.
    #[serde(default)]
    pub voices: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DilemmaEpisode {
    pub id: EpisodeId,
    /// Decision-node cell that opened this episode.
    pub node: CellPos,
    pub state: EpisodeState,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub difficulty: f32,
    #[serde(default)]
    pub chosen: Option<usize>,
    #[serde(default)]
    pub feedback: Option<EpisodeFeedback>,
    /// Whether the content came from the local fallback bank after an AI
    /// boundary timeout or error.
    #[serde(default)]
    pub ai_fallback: bool,
    pub opened_at: EngineTime,
}

impl DilemmaEpisode {
    pub fn open(id: EpisodeId, node: CellPos, opened_at: EngineTime) -> Self {
        Self {
            id,
            node,
            state: EpisodeState::Pending,
            prompt: String::new(),
            options: Vec::new(),
            tags: Vec::new(),
            difficulty: 0.5,
            chosen: None,
            feedback: None,
            ai_fallback: false,
            opened_at,
        }
    }

    /// Pending -> AwaitingAi when the generation request goes out.
    pub fn begin_generation(&mut self) -> bool {
        if self.state == EpisodeState::Pending {
            self.state = EpisodeState::AwaitingAi;
            true
        } else {
            false
        }
    }

    /// AwaitingAi -> AwaitingChoice once content arrives. Content landing
    /// after an expiry is dropped by the caller; this guard backs that up.
    pub fn deliver(
        &mut self,
        prompt: String,
        options: Vec<String>,
        tags: Vec<String>,
        difficulty: f32,
        fallback: bool,
    ) -> bool {
        if self.state != EpisodeState::AwaitingAi {
            return false;
        }
        self.prompt = prompt;
        self.options = options;
        self.tags = tags;
        self.difficulty = difficulty;
        self.ai_fallback = fallback;
        self.state = EpisodeState::AwaitingChoice;
        true
    }

    /// Record the player's pick; scoring is still outstanding afterwards.
    pub fn choose(&mut self, option_index: usize) -> Result<(), SubmitError> {
        if self.state != EpisodeState::AwaitingChoice {
            return Err(SubmitError::NotAwaitingChoice);
        }
        if self.chosen.is_some() {
            return Err(SubmitError::AlreadyChosen);
        }
        if option_index >= self.options.len() {
            return Err(SubmitError::InvalidOption);
        }
        self.chosen = Some(option_index);
        Ok(())
    }

    /// Apply the score and finish the episode.
    pub fn resolve(&mut self, feedback: EpisodeFeedback) -> bool {
        if self.state != EpisodeState::AwaitingChoice || self.chosen.is_none() {
            return false;
        }
        self.feedback = Some(feedback);
        self.state = EpisodeState::Resolved;
        true
    }

    /// Abandon an episode the Hero walked away from before choosing.
    pub fn expire(&mut self) -> bool {
        match self.state {
            EpisodeState::Pending | EpisodeState::AwaitingAi => {
                self.state = EpisodeState::Expired;
                true
            }
            _ => false,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(
            self.state,
            EpisodeState::Pending | EpisodeState::AwaitingAi | EpisodeState::AwaitingChoice
        )
    }

    /// Whether this node is settled for the run (no re-trigger).
    pub fn is_settled(&self) -> bool {
        matches!(self.state, EpisodeState::Resolved | EpisodeState::Expired)
    }

    pub fn chosen_text(&self) -> Option<&str> {
        self.chosen
            .and_then(|idx| self.options.get(idx))
            .map(String::as_str)
    }
}
