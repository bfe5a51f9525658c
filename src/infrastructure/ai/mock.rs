//! Mock dilemma provider - the built-in, always-available AI boundary
//!
//! Serves stage-appropriate dilemmas from an embedded scenario bank and
//! scores choices with the local growth formula. Useful for offline play,
//! tests, and as the guaranteed floor under flaky vendors.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::application::ports::outbound::{
    ChoiceScore, DilemmaContext, DilemmaPort, DilemmaPortError, GeneratedDilemma,
    LifeSummaryContext, ScoreRequest,
};
use crate::domain::value_objects::{calculate_growth, Stage};

/// One entry of the embedded scenario bank.
struct Scenario {
    prompt: &'static str,
    options: &'static [&'static str],
    tags: &'static [&'static str],
    difficulty: f32,
}

fn bank_for_stage(stage: Stage) -> &'static [Scenario] {
    match stage {
        Stage::Child | Stage::Preteen => &[
            Scenario {
                prompt: "You find a classmate's lost pocket money on the playground. Nobody saw you pick it up.",
                options: &["Hand it to the teacher", "Keep it", "Ask around who lost it"],
                tags: &["integrity", "empathy"],
                difficulty: 0.4,
            },
            Scenario {
                prompt: "Your best friend broke the classroom window and asks you to stay quiet about it.",
                options: &["Stay quiet", "Tell the teacher", "Urge them to confess"],
                tags: &["honesty", "responsibility"],
                difficulty: 0.5,
            },
            Scenario {
                prompt: "A new kid eats lunch alone every day. Your friends make fun of them.",
                options: &["Sit with the new kid", "Laugh along", "Tell your friends to stop"],
                tags: &["empathy", "courage"],
                difficulty: 0.4,
            },
        ],
        Stage::Teen => &[
            Scenario {
                prompt: "Friends dare you to skip class for a concert. Everyone else is going.",
                options: &["Skip with them", "Refuse and attend class", "Suggest going after school"],
                tags: &["peer pressure", "independence"],
                difficulty: 0.6,
            },
            Scenario {
                prompt: "You witness a close friend cheating on the final exam.",
                options: &["Report it", "Confront them privately", "Pretend you saw nothing"],
                tags: &["integrity", "courage"],
                difficulty: 0.7,
            },
        ],
        Stage::YoungAdult => &[
            Scenario {
                prompt: "Your manager asks you to inflate numbers in a report to impress a client.",
                options: &["Refuse", "Comply this once", "Escalate to their superior"],
                tags: &["work ethics", "integrity"],
                difficulty: 0.7,
            },
            Scenario {
                prompt: "A colleague takes credit for your project in front of the whole team.",
                options: &["Correct them publicly", "Talk to them privately", "Let it go"],
                tags: &["courage", "relationships"],
                difficulty: 0.6,
            },
        ],
        Stage::Adult => &[
            Scenario {
                prompt: "A demanding promotion would double your travel and halve your family time.",
                options: &["Take the promotion", "Decline it", "Negotiate different terms"],
                tags: &["family duty", "responsibility"],
                difficulty: 0.6,
            },
            Scenario {
                prompt: "Your neighborhood opposes a shelter opening next door; a petition reaches your door.",
                options: &["Sign the petition", "Refuse to sign", "Organize a community meeting"],
                tags: &["community", "empathy"],
                difficulty: 0.7,
            },
        ],
        Stage::Mature => &[
            Scenario {
                prompt: "A younger colleague's bold proposal threatens the process you built your career on.",
                options: &["Back their proposal", "Defend the old process", "Mentor them through a pilot"],
                tags: &["legacy", "leadership"],
                difficulty: 0.6,
            },
        ],
        Stage::Senior => &[
            Scenario {
                prompt: "Your grandchild asks whether you regret the hardest choice of your life.",
                options: &["Tell the whole truth", "Soften the story", "Ask what they would have done"],
                tags: &["life review", "sharing wisdom"],
                difficulty: 0.5,
            },
        ],
    }
}

/// Built-in provider backed by the embedded scenario bank.
pub struct MockDilemmaProvider;

impl MockDilemmaProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockDilemmaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DilemmaPort for MockDilemmaProvider {
    async fn generate_dilemma(
        &self,
        context: DilemmaContext,
    ) -> Result<GeneratedDilemma, DilemmaPortError> {
        let bank = bank_for_stage(context.stage);
        // Rotate through the bank as the run progresses so repeat visits
        // at the same age still vary.
        let index = (context.age as usize + context.history_tags.len()) % bank.len();
        let scenario = &bank[index];
        Ok(GeneratedDilemma {
            prompt: scenario.prompt.to_string(),
            options: scenario.options.iter().map(|s| s.to_string()).collect(),
            tags: scenario.tags.iter().map(|s| s.to_string()).collect(),
            difficulty: scenario.difficulty,
        })
    }

    async fn score_choice(&self, request: ScoreRequest) -> Result<ChoiceScore, DilemmaPortError> {
        // First options lean principled in the bank; score them higher but
        // never punish a considered pick.
        let match_score = (0.9 - 0.15 * request.chosen_index as f32).max(0.4);
        let growth_delta = calculate_growth(request.difficulty, match_score, 4);
        Ok(ChoiceScore {
            growth_delta,
            match_score,
            feedback: format!(
                "Choosing \"{}\" says something about who you are becoming.",
                request.chosen_text
            ),
            value_scores: Default::default(),
            voices: BTreeMap::new(),
        })
    }

    async fn life_summary(
        &self,
        context: LifeSummaryContext,
    ) -> Result<String, DilemmaPortError> {
        let traits = context.traits;
        Ok(format!(
            "At {}, a {} with {} decisions behind them. Empathy {}, integrity {}, courage {}, \
             responsibility {}, independence {}: a life assembled one choice at a time.",
            context.age,
            context.stage.display_name().to_lowercase(),
            context.decisions,
            traits.empathy,
            traits.integrity,
            traits.courage,
            traits.responsibility,
            traits.independence,
        ))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
