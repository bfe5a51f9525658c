//! Dilemma episode manager
//!
//! Detects decision-node entry, owns the pending AI requests, and applies
//! resolutions. AI calls are fire-and-forget tasks bounded by a timeout;
//! the tick loop polls a completion channel instead of awaiting anything,
//! so a slow vendor never stalls maze mutation or charge recharge. Each
//! episode holds at most one outstanding request, and re-entering an
//! unresolved node never issues a second one.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::application::ports::outbound::{
    ChoiceScore, DilemmaContext, DilemmaPort, GeneratedDilemma, LifeSummaryContext, ScoreRequest,
};
use crate::domain::entities::{
    DilemmaEpisode, EpisodeFeedback, EpisodeRecord, EpisodeState, SubmitError,
};
use crate::domain::snapshot::GameSnapshot;
use crate::domain::value_objects::{EngineTime, EpisodeId, GrowthTraits};

/// A finished AI call, delivered through the completion channel.
#[derive(Debug)]
enum AiCompletion {
    Generated {
        episode: EpisodeId,
        dilemma: GeneratedDilemma,
        fallback: bool,
    },
    Scored {
        episode: EpisodeId,
        score: ChoiceScore,
        fallback: bool,
    },
    Summary {
        text: String,
    },
}

/// A resolved episode ready for the progression machine.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub episode_id: EpisodeId,
    pub record: EpisodeRecord,
    pub growth_delta: i32,
    pub value_delta: GrowthTraits,
}

/// What polling the completion channel produced this tick.
#[derive(Debug, Default)]
pub struct PollOutcome {
    pub resolutions: Vec<Resolution>,
    /// Episodes whose content just arrived and now await a choice.
    pub ready: Vec<EpisodeId>,
    pub life_summary: Option<String>,
}

pub struct EpisodeService {
    provider: Arc<dyn DilemmaPort>,
    timeout: Duration,
    completions_tx: mpsc::UnboundedSender<AiCompletion>,
    completions_rx: mpsc::UnboundedReceiver<AiCompletion>,
    /// Episodes with a request in flight.
    outstanding: HashSet<EpisodeId>,
}

impl EpisodeService {
    pub fn new(provider: Arc<dyn DilemmaPort>, timeout_ms: u64) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            provider,
            timeout: Duration::from_millis(timeout_ms),
            completions_tx,
            completions_rx,
            outstanding: HashSet::new(),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Open an episode if the Hero stands on a triggerable decision node.
    /// Idempotent: nodes with an open or settled episode never re-trigger.
    pub fn maybe_trigger(
        &mut self,
        snapshot: &mut GameSnapshot,
        now: EngineTime,
    ) -> Option<EpisodeId> {
        let node = snapshot.hero.position;
        if !snapshot.node_can_trigger(node) {
            return None;
        }
        let id = EpisodeId::derived(snapshot.run.seed, snapshot.run.episode_seq);
        snapshot.run.episode_seq += 1;

        let mut episode = DilemmaEpisode::open(id, node, now);
        episode.begin_generation();
        snapshot.episodes.push(episode);

        let context = DilemmaContext {
            age: snapshot.hero.age,
            stage: snapshot.hero.stage,
            themes: snapshot
                .hero
                .stage
                .themes()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            history_tags: snapshot.timeline.history_tags(),
        };
        self.spawn_generation(id, context);
        tracing::debug!(episode = %id, node = %node, "dilemma episode opened");
        Some(id)
    }

    fn spawn_generation(&mut self, episode_id: EpisodeId, context: DilemmaContext) {
        if !self.outstanding.insert(episode_id) {
            return;
        }
        let provider = Arc::clone(&self.provider);
        let tx = self.completions_tx.clone();
        let timeout = self.timeout;
        tokio::spawn(async move {
            let result = tokio::time::timeout(timeout, provider.generate_dilemma(context)).await;
            let (dilemma, fallback) = match result {
                Ok(Ok(dilemma)) if dilemma.is_valid() => (dilemma, false),
                Ok(Ok(_)) => {
                    tracing::warn!(episode = %episode_id, "provider returned an invalid dilemma, using fallback");
                    (GeneratedDilemma::fallback(), true)
                }
                Ok(Err(error)) => {
                    tracing::warn!(episode = %episode_id, %error, "dilemma generation failed, using fallback");
                    (GeneratedDilemma::fallback(), true)
                }
                Err(_) => {
                    tracing::warn!(episode = %episode_id, "dilemma generation timed out, using fallback");
                    (GeneratedDilemma::fallback(), true)
                }
            };
            let _ = tx.send(AiCompletion::Generated {
                episode: episode_id,
                dilemma,
                fallback,
            });
        });
    }

    /// Validate and record a choice, then send it out for scoring.
    pub fn submit_choice(
        &mut self,
        snapshot: &mut GameSnapshot,
        episode_id: EpisodeId,
        option_index: usize,
    ) -> Result<(), SubmitError> {
        let hero_age = snapshot.hero.age;
        let hero_stage = snapshot.hero.stage;
        let episode = snapshot
            .episode_mut(episode_id)
            .ok_or(SubmitError::NotAwaitingChoice)?;
        episode.choose(option_index)?;

        let request = ScoreRequest {
            age: hero_age,
            stage: hero_stage,
            prompt: episode.prompt.clone(),
            options: episode.options.clone(),
            chosen_index: option_index,
            chosen_text: episode.chosen_text().unwrap_or_default().to_string(),
            tags: episode.tags.clone(),
            difficulty: episode.difficulty,
        };
        self.spawn_scoring(episode_id, request);
        Ok(())
    }

    fn spawn_scoring(&mut self, episode_id: EpisodeId, request: ScoreRequest) {
        if !self.outstanding.insert(episode_id) {
            return;
        }
        let provider = Arc::clone(&self.provider);
        let tx = self.completions_tx.clone();
        let timeout = self.timeout;
        tokio::spawn(async move {
            let result = tokio::time::timeout(timeout, provider.score_choice(request)).await;
            let (score, fallback) = match result {
                Ok(Ok(score)) => (score, false),
                Ok(Err(error)) => {
                    tracing::warn!(episode = %episode_id, %error, "choice scoring failed, using neutral score");
                    (ChoiceScore::neutral(), true)
                }
                Err(_) => {
                    tracing::warn!(episode = %episode_id, "choice scoring timed out, using neutral score");
                    (ChoiceScore::neutral(), true)
                }
            };
            let _ = tx.send(AiCompletion::Scored {
                episode: episode_id,
                score,
                fallback,
            });
        });
    }

    /// Request the end-of-run narrative; the completion replaces the local
    /// fallback summary when (if) it arrives.
    pub fn spawn_life_summary(&self, context: LifeSummaryContext) {
        let provider = Arc::clone(&self.provider);
        let tx = self.completions_tx.clone();
        let timeout = self.timeout;
        tokio::spawn(async move {
            if let Ok(Ok(text)) = tokio::time::timeout(timeout, provider.life_summary(context)).await
            {
                let _ = tx.send(AiCompletion::Summary { text });
            }
        });
    }

    /// Expire open episodes whose node the Hero has left before choosing.
    /// Only pre-choice phases expire; an awaiting-choice episode stays
    /// answerable even if the Buddy throws the Hero elsewhere.
    pub fn expire_abandoned(&mut self, snapshot: &mut GameSnapshot) {
        let hero = snapshot.hero.position;
        for episode in snapshot.episodes.iter_mut() {
            if episode.node != hero
                && matches!(
                    episode.state,
                    EpisodeState::Pending | EpisodeState::AwaitingAi
                )
                && episode.expire()
            {
                tracing::debug!(episode = %episode.id, "episode expired, hero left the node");
            }
        }
    }

    /// Re-issue requests for episodes loaded mid-flight from a save.
    pub fn reissue_inflight(&mut self, snapshot: &GameSnapshot) {
        for episode in &snapshot.episodes {
            match episode.state {
                EpisodeState::AwaitingAi => {
                    let context = DilemmaContext {
                        age: snapshot.hero.age,
                        stage: snapshot.hero.stage,
                        themes: snapshot
                            .hero
                            .stage
                            .themes()
                            .iter()
                            .map(|s| s.to_string())
                            .collect(),
                        history_tags: snapshot.timeline.history_tags(),
                    };
                    self.spawn_generation(episode.id, context);
                }
                EpisodeState::AwaitingChoice => {
                    if let Some(chosen) = episode.chosen {
                        let request = ScoreRequest {
                            age: snapshot.hero.age,
                            stage: snapshot.hero.stage,
                            prompt: episode.prompt.clone(),
                            options: episode.options.clone(),
                            chosen_index: chosen,
                            chosen_text: episode.chosen_text().unwrap_or_default().to_string(),
                            tags: episode.tags.clone(),
                            difficulty: episode.difficulty,
                        };
                        self.spawn_scoring(episode.id, request);
                    }
                }
                _ => {}
            }
        }
    }

    /// Drop state for a superseded run (restart).
    pub fn reset(&mut self) {
        self.outstanding.clear();
        while self.completions_rx.try_recv().is_ok() {}
    }

    /// Drain completed AI calls and apply them to the snapshot.
    pub fn poll(&mut self, snapshot: &mut GameSnapshot, now: EngineTime) -> PollOutcome {
        let mut outcome = PollOutcome::default();
        while let Ok(completion) = self.completions_rx.try_recv() {
            match completion {
                AiCompletion::Generated {
                    episode: id,
                    dilemma,
                    fallback,
                } => {
                    self.outstanding.remove(&id);
                    if let Some(episode) = snapshot.episode_mut(id) {
                        // Content landing after an expiry is dropped.
                        if episode.deliver(
                            dilemma.prompt,
                            dilemma.options,
                            dilemma.tags,
                            dilemma.difficulty,
                            fallback,
                        ) {
                            outcome.ready.push(id);
                        }
                    }
                }
                AiCompletion::Scored {
                    episode: id,
                    score,
                    fallback,
                } => {
                    self.outstanding.remove(&id);
                    if let Some(resolution) =
                        resolve_episode(snapshot, id, score, fallback, now)
                    {
                        outcome.resolutions.push(resolution);
                    }
                }
                AiCompletion::Summary { text } => {
                    outcome.life_summary = Some(text);
                }
            }
        }
        outcome
    }
}

/// Apply a score to its episode, building the timeline record.
fn resolve_episode(
    snapshot: &mut GameSnapshot,
    id: EpisodeId,
    score: ChoiceScore,
    fallback: bool,
    now: EngineTime,
) -> Option<Resolution> {
    let age = snapshot.hero.age;
    let stage = snapshot.hero.stage;
    let episode = snapshot.episode_mut(id)?;
    let chosen_index = episode.chosen?;

    let value_delta = if score.value_scores.is_zero() {
        GrowthTraits::from_tags(score.growth_delta, &episode.tags)
    } else {
        score.value_scores
    };
    let chosen_text = episode.chosen_text().unwrap_or_default().to_string();
    let voices = normalize_voices(age, score.voices, &chosen_text, &value_delta);

    let feedback = EpisodeFeedback {
        growth_delta: score.growth_delta,
        match_score: score.match_score,
        feedback: score.feedback,
        value_scores: value_delta,
        voices: voices.clone(),
    };
    if !episode.resolve(feedback) {
        return None;
    }
    if fallback {
        episode.ai_fallback = true;
    }

    let record = EpisodeRecord {
        episode_id: id,
        node: episode.node,
        prompt: episode.prompt.clone(),
        options: episode.options.clone(),
        chosen_index,
        chosen_text,
        tags: episode.tags.clone(),
        growth_delta: score.growth_delta,
        value_delta,
        voices,
        age_at_decision: age,
        stage_at_decision: stage,
        at: now,
    };
    Some(Resolution {
        episode_id: id,
        record,
        growth_delta: score.growth_delta,
        value_delta,
    })
}

/// Fill in the age-appropriate voice trio, keeping whatever the provider
/// sent and backfilling the rest locally. Under 60 the Hero hears parents,
/// a friend, and their future self; at 60+ the trio shifts to a child, a
/// friend, and their past self.
fn normalize_voices(
    age: u32,
    provider_voices: BTreeMap<String, String>,
    chosen_text: &str,
    value_delta: &GrowthTraits,
) -> BTreeMap<String, String> {
    let summary = value_delta.summary();
    let choice = if chosen_text.is_empty() {
        "your move"
    } else {
        chosen_text
    };

    let required: [(&str, String); 3] = if age < 60 {
        [
            (
                "parents",
                format!(
                    "We see you chose {}. Hold to your principles and care for others. [{}]",
                    choice, summary
                ),
            ),
            (
                "friend",
                format!("Bold pick! We've got your back. [{}]", summary),
            ),
            (
                "future_self",
                format!(
                    "This step shapes who you become. Keep learning. [{}]",
                    summary
                ),
            ),
        ]
    } else {
        [
            (
                "child",
                format!(
                    "We see you chose {}. Your choices taught us so much. [{}]",
                    choice, summary
                ),
            ),
            (
                "friend",
                format!("After all these years, still true to yourself. [{}]", summary),
            ),
            (
                "past_self",
                format!("Look how far that first step carried us. [{}]", summary),
            ),
        ]
    };

    let mut voices = provider_voices;
    for (key, default_line) in required {
        voices
            .entry(key.to_string())
            .or_insert(default_line);
    }
    voices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::outbound::DilemmaPortError;
    use crate::domain::entities::{Buddy, Hero, Timeline};
    use crate::domain::maze::MazeTopology;
    use crate::domain::progression::{Lifecycle, Progression};
    use crate::domain::rng::GameRngState;
    use crate::domain::snapshot::RunMetadata;
    use crate::domain::value_objects::{CellPos, RunId, SkillTable};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    struct InstantProvider;

    #[async_trait]
    impl DilemmaPort for InstantProvider {
        async fn generate_dilemma(
            &self,
            _context: DilemmaContext,
        ) -> Result<GeneratedDilemma, DilemmaPortError> {
            Ok(GeneratedDilemma {
                prompt: "Someone left their wallet on a bench.".to_string(),
                options: vec!["Hand it in".to_string(), "Walk past".to_string()],
                tags: vec!["integrity".to_string()],
                difficulty: 0.6,
            })
        }

        async fn score_choice(
            &self,
            request: ScoreRequest,
        ) -> Result<ChoiceScore, DilemmaPortError> {
            Ok(ChoiceScore {
                growth_delta: if request.chosen_index == 0 { 4 } else { 1 },
                match_score: 0.9,
                feedback: "Considered choice.".to_string(),
                value_scores: GrowthTraits::default(),
                voices: BTreeMap::new(),
            })
        }

        async fn life_summary(
            &self,
            _context: LifeSummaryContext,
        ) -> Result<String, DilemmaPortError> {
            Ok("A life of steady judgment.".to_string())
        }

        fn name(&self) -> &str {
            "instant"
        }
    }

    /// Provider that never answers; the timeout fallback must kick in.
    struct StalledProvider;

    #[async_trait]
    impl DilemmaPort for StalledProvider {
        async fn generate_dilemma(
            &self,
            _context: DilemmaContext,
        ) -> Result<GeneratedDilemma, DilemmaPortError> {
            std::future::pending().await
        }

        async fn score_choice(
            &self,
            _request: ScoreRequest,
        ) -> Result<ChoiceScore, DilemmaPortError> {
            std::future::pending().await
        }

        async fn life_summary(
            &self,
            _context: LifeSummaryContext,
        ) -> Result<String, DilemmaPortError> {
            Err(DilemmaPortError::Provider("unavailable".to_string()))
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    fn snapshot(seed: u64) -> GameSnapshot {
        let table = SkillTable::default();
        let maze = MazeTopology::generate(seed, 12, 9);
        let start = maze.start();
        GameSnapshot {
            run: RunMetadata {
                run_id: RunId::derived(seed, 0),
                seed,
                started_at: DateTime::<Utc>::UNIX_EPOCH,
                tick: 0,
                now: EngineTime::ZERO,
                lifecycle: Lifecycle::Active,
                episode_seq: 0,
                trap_seq: 0,
            },
            hero: Hero::new(start, 10, &table, EngineTime::ZERO),
            buddy: Buddy::new(start, &table, EngineTime::ZERO),
            maze,
            traps: Vec::new(),
            episodes: Vec::new(),
            timeline: Timeline::new(),
            progression: Progression::new(10, 90, 1.0),
            rng_state: GameRngState::default(),
            life_summary: None,
        }
    }

    /// Put the hero on a decision node and return it.
    fn stand_on_node(snapshot: &mut GameSnapshot) -> CellPos {
        let node = snapshot
            .maze
            .decision_nodes()
            .next()
            .expect("decision node")
            .pos;
        snapshot.hero.relocate(node);
        node
    }

    async fn poll_until<F: Fn(&PollOutcome) -> bool>(
        service: &mut EpisodeService,
        snapshot: &mut GameSnapshot,
        predicate: F,
    ) -> PollOutcome {
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let outcome = service.poll(snapshot, snapshot.run.now);
            if predicate(&outcome) {
                return outcome;
            }
        }
        panic!("completion never arrived");
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_deliver_choose_resolve() {
        let mut service = EpisodeService::new(Arc::new(InstantProvider), 5_000);
        let mut s = snapshot(31);
        stand_on_node(&mut s);

        let id = service
            .maybe_trigger(&mut s, EngineTime::ZERO)
            .expect("episode should open");
        assert_eq!(s.episode(id).unwrap().state, EpisodeState::AwaitingAi);

        // Re-entry while unresolved must not open a second episode.
        assert!(service.maybe_trigger(&mut s, EngineTime::ZERO).is_none());

        let ready = poll_until(&mut service, &mut s, |o| !o.ready.is_empty()).await;
        assert_eq!(ready.ready, vec![id]);
        assert_eq!(s.episode(id).unwrap().state, EpisodeState::AwaitingChoice);
        assert!(!s.episode(id).unwrap().ai_fallback);

        service.submit_choice(&mut s, id, 0).expect("valid choice");
        let resolved =
            poll_until(&mut service, &mut s, |o| !o.resolutions.is_empty()).await;
        assert_eq!(resolved.resolutions.len(), 1);
        assert_eq!(resolved.resolutions[0].growth_delta, 4);
        assert_eq!(s.episode(id).unwrap().state, EpisodeState::Resolved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back_and_still_resolves() {
        let mut service = EpisodeService::new(Arc::new(StalledProvider), 2_000);
        let mut s = snapshot(32);
        stand_on_node(&mut s);

        let id = service.maybe_trigger(&mut s, EngineTime::ZERO).unwrap();
        let ready = poll_until(&mut service, &mut s, |o| !o.ready.is_empty()).await;
        assert_eq!(ready.ready, vec![id]);

        let episode = s.episode(id).unwrap();
        assert!(episode.ai_fallback, "fallback content expected");
        assert_eq!(episode.prompt, GeneratedDilemma::fallback().prompt);

        service.submit_choice(&mut s, id, 2).expect("valid choice");
        let resolved =
            poll_until(&mut service, &mut s, |o| !o.resolutions.is_empty()).await;
        // Neutral score: the run continues, nothing explodes.
        assert_eq!(resolved.resolutions[0].growth_delta, 0);
        assert_eq!(s.episode(id).unwrap().state, EpisodeState::Resolved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_submit_rejected() {
        let mut service = EpisodeService::new(Arc::new(InstantProvider), 5_000);
        let mut s = snapshot(33);
        stand_on_node(&mut s);
        let id = service.maybe_trigger(&mut s, EngineTime::ZERO).unwrap();
        poll_until(&mut service, &mut s, |o| !o.ready.is_empty()).await;

        service.submit_choice(&mut s, id, 1).unwrap();
        assert_eq!(
            service.submit_choice(&mut s, id, 0),
            Err(SubmitError::AlreadyChosen)
        );

        poll_until(&mut service, &mut s, |o| !o.resolutions.is_empty()).await;
        assert_eq!(
            service.submit_choice(&mut s, id, 0),
            Err(SubmitError::NotAwaitingChoice)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_leaving_node_expires_episode() {
        let mut service = EpisodeService::new(Arc::new(StalledProvider), 60_000);
        let mut s = snapshot(34);
        let node = stand_on_node(&mut s);
        let id = service.maybe_trigger(&mut s, EngineTime::ZERO).unwrap();

        // Hero walks off while generation is still in flight.
        let away = if s.maze.start() != node {
            s.maze.start()
        } else {
            CellPos::new(1, 0)
        };
        s.hero.relocate(away);
        service.expire_abandoned(&mut s);
        assert_eq!(s.episode(id).unwrap().state, EpisodeState::Expired);

        // The node is settled for this run: standing on it again does not
        // re-trigger.
        s.hero.relocate(node);
        assert!(service.maybe_trigger(&mut s, EngineTime::ZERO).is_none());
    }

    #[test]
    fn test_voice_normalization_shifts_at_sixty() {
        let young = normalize_voices(30, BTreeMap::new(), "Accept", &GrowthTraits::default());
        assert!(young.contains_key("parents"));
        assert!(young.contains_key("future_self"));

        let elder = normalize_voices(64, BTreeMap::new(), "Accept", &GrowthTraits::default());
        assert!(elder.contains_key("child"));
        assert!(elder.contains_key("past_self"));

        let mut provided = BTreeMap::new();
        provided.insert("friend".to_string(), "custom line".to_string());
        let merged = normalize_voices(30, provided, "Accept", &GrowthTraits::default());
        assert_eq!(merged.get("friend").unwrap(), "custom line");
    }
}
