//! Five-KPI evaluation harness.
//!
//! Scenarios are scored strictly one after another. The only overlapping
//! work is the consistency check, which re-runs the recommender
//! concurrently. No single scenario can abort the batch: every failing
//! scoring call degrades to that score's lowest value.

use std::sync::Arc;
use std::time::Duration;

use cadence_core::metrics::{judged_score, semantic_score, stability_score};
use cadence_core::{
    AccuracyScore, BridgeInput, ConsistencyTally, DiversityPool, EvaluationReport, ParseResult,
    PrimaryTag, ScenarioRecord, ScoreRecord, SearchVerdict, PARSING_FAILED,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::bridge::Recommender;
use crate::catalog::TrackVerifier;
use crate::config::EvaluationConfig;
use crate::judgment::StructuredJudgment;
use crate::prompts::judge_messages;
use crate::providers::LlmProvider;
use crate::retry::RetryPolicy;
use crate::usage::{UsageReport, UsageStage, UsageTracker};

/// Primary tag shown for a valid payload that carries none.
const UNKNOWN_TAG: &str = "unknown";

/// Hooks for per-scenario progress output.
pub trait ProgressReporter: Send + Sync {
    /// `position` is 1-based.
    fn scenario_started(&self, _position: usize, _total: usize, _id: &str, _scenario: &ScenarioRecord) {}

    fn scenario_finished(&self, _record: &ScoreRecord) {}
}

/// Reports nothing.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {}

/// Result of a full evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    pub report: EvaluationReport,
    pub usage: UsageReport,
}

/// Scores a recommender against a scenario set.
pub struct Evaluator {
    recommender: Arc<dyn Recommender>,
    verifier: TrackVerifier,
    judge: Option<StructuredJudgment>,
    embedder: Option<(Arc<dyn LlmProvider>, String)>,
    config: EvaluationConfig,
    retry: RetryPolicy,
    usage: Arc<UsageTracker>,
    progress: Arc<dyn ProgressReporter>,
}

impl Evaluator {
    pub fn new(
        recommender: Arc<dyn Recommender>,
        verifier: TrackVerifier,
        config: EvaluationConfig,
    ) -> Self {
        Self {
            recommender,
            verifier,
            judge: None,
            embedder: None,
            config,
            retry: RetryPolicy::default(),
            usage: Arc::new(UsageTracker::new()),
            progress: Arc::new(SilentProgress),
        }
    }

    /// Model that grades outputs against the scenario criteria.
    pub fn with_judge(mut self, judge: StructuredJudgment) -> Self {
        self.judge = Some(judge);
        self
    }

    /// Embedding backend for the semantic accuracy sub-score.
    pub fn with_embedder(mut self, provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        self.embedder = Some((provider, model.into()));
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Share a usage tracker with the rest of the process.
    pub fn with_usage(mut self, usage: Arc<UsageTracker>) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Score every scenario in order and aggregate.
    pub async fn evaluate(&self, scenarios: &[ScenarioRecord]) -> EvaluationOutcome {
        tracing::info!(
            scenarios = scenarios.len(),
            catalog = self.verifier.has_catalog(),
            "Starting evaluation"
        );

        let mut pool = DiversityPool::new();
        let mut records = Vec::with_capacity(scenarios.len());

        for (idx, scenario) in scenarios.iter().enumerate() {
            let id = scenario.label(idx);
            self.progress
                .scenario_started(idx + 1, scenarios.len(), &id, scenario);

            let record = self.score_scenario(idx, id, scenario, &mut pool).await;
            if record.is_hallucination() {
                tracing::warn!(
                    scenario = %record.id,
                    track = %record.recommended_track,
                    "Hallucination: well-formed track not found in catalog"
                );
            }
            self.progress.scenario_finished(&record);
            records.push(record);
        }

        let report = EvaluationReport::aggregate(records, &pool);
        tracing::info!(
            accuracy = report.summary.accuracy_total,
            stability = report.summary.stability,
            search_success = report.summary.search_success_rate,
            consistency = report.summary.consistency,
            diversity = report.summary.diversity,
            "Evaluation finished"
        );

        EvaluationOutcome {
            report,
            usage: self.usage.snapshot(),
        }
    }

    async fn score_scenario(
        &self,
        idx: usize,
        id: String,
        scenario: &ScenarioRecord,
        pool: &mut DiversityPool,
    ) -> ScoreRecord {
        let input = scenario.bridge_input();
        let raw = self.recommender.recommend(&input).await;
        let parsed = ParseResult::parse(&raw);
        if let ParseResult::Malformed(payload) = &parsed {
            tracing::warn!(scenario = %id, reason = ?payload.reason, "Recommender output is malformed");
        }

        let accuracy = self.accuracy(&id, scenario, &parsed).await;
        let stability = stability_score(&parsed);
        let verdict = self.verifier.verify(&parsed).await;
        if let SearchVerdict::LookupFailed { error } = &verdict {
            tracing::debug!(scenario = %id, error = %error, "Search success scored 0");
        }

        let consistency = if self.samples_consistency(idx) {
            self.consistency(&input, &parsed).await
        } else {
            1.0
        };
        pool.record(&parsed);

        let goal = input.context().goal;
        if let Some(tag) = parsed.primary_tag().and_then(PrimaryTag::parse) {
            if !tag.matches_goal(&goal) {
                tracing::info!(
                    scenario = %id,
                    goal = %goal,
                    primary_tag = %tag,
                    "Primary tag goal differs from scenario goal"
                );
            }
        }

        let primary_tag = match parsed.primary_tag() {
            Some(tag) => tag.to_string(),
            None if parsed.is_valid() => UNKNOWN_TAG.to_string(),
            None => PARSING_FAILED.to_string(),
        };

        ScoreRecord {
            id,
            context: scenario.context_label(),
            total_accuracy: ScoreRecord::weighted_total(&accuracy, &self.config.accuracy_weights()),
            accuracy,
            stability,
            search_success: verdict.score(),
            consistency,
            primary_tag,
            output_reasoning: parsed.reasoning().unwrap_or_default().to_string(),
            recommended_track: parsed.recommended_track_label(),
        }
    }

    fn samples_consistency(&self, idx: usize) -> bool {
        let stride = self.config.consistency_stride;
        stride > 0 && idx % stride == 0
    }

    async fn accuracy(&self, id: &str, scenario: &ScenarioRecord, parsed: &ParseResult) -> AccuracyScore {
        let Some(reasoning) = parsed.reasoning() else {
            return AccuracyScore::zero();
        };

        let semantic = self
            .semantic(id, &scenario.evaluation_criteria, reasoning)
            .await;
        let judged = self.judged(id, scenario, parsed).await;
        AccuracyScore { semantic, judged }
    }

    async fn semantic(&self, id: &str, criteria: &str, reasoning: &str) -> f64 {
        let Some((provider, model)) = &self.embedder else {
            return 0.0;
        };

        let inputs = vec![criteria.to_string(), reasoning.to_string()];
        let call = self.retry.run("embed", || provider.embed(&inputs, model));
        match with_deadline(self.config.call_timeout, call).await {
            Some(Ok(response)) => {
                self.usage
                    .record(UsageStage::Scoring, &response.usage, &response.model);
                match response.vectors.as_slice() {
                    [criteria, reasoning, ..] => semantic_score(criteria, reasoning),
                    _ => {
                        tracing::warn!(scenario = %id, "Embedding response is missing vectors");
                        0.0
                    }
                }
            }
            Some(Err(e)) => {
                tracing::warn!(scenario = %id, error = %e, "Embedding failed");
                0.0
            }
            None => {
                tracing::warn!(scenario = %id, timeout = ?self.config.call_timeout, "Embedding timed out");
                0.0
            }
        }
    }

    async fn judged(&self, id: &str, scenario: &ScenarioRecord, parsed: &ParseResult) -> f64 {
        let Some(judge) = &self.judge else {
            return 0.0;
        };

        let messages = judge_messages(
            &scenario.evaluation_criteria,
            &scenario.input_summary(),
            &parsed.to_display_value().to_string(),
        );
        match with_deadline(self.config.call_timeout, judge.json_object(messages)).await {
            Some(Ok(reply)) => match judged_score(&reply) {
                Some(score) => {
                    tracing::debug!(
                        scenario = %id,
                        score,
                        reason = reply.get("reason").and_then(|r| r.as_str()).unwrap_or(""),
                        "Judge scored output"
                    );
                    score
                }
                None => {
                    tracing::warn!(scenario = %id, "Judge reply has no numeric score");
                    0.0
                }
            },
            Some(Err(e)) => {
                tracing::warn!(scenario = %id, error = %e, "Judge call failed");
                0.0
            }
            None => {
                tracing::warn!(scenario = %id, timeout = ?self.config.call_timeout, "Judge call timed out");
                0.0
            }
        }
    }

    /// Tag agreement between `first` and fresh concurrent runs.
    async fn consistency(&self, input: &BridgeInput, first: &ParseResult) -> f64 {
        let reruns = (0..self.config.consistency_reruns).map(|_| self.recommender.recommend(input));
        let outputs = join_all(reruns).await;

        let mut tally = ConsistencyTally::new();
        tally.record(first);
        for raw in &outputs {
            tally.record(&ParseResult::parse(raw));
        }

        let score = tally.score();
        tracing::debug!(votes = ?tally.votes(), score, "Consistency sampled");
        score
    }
}

async fn with_deadline<F: std::future::Future>(timeout: Duration, future: F) -> Option<F::Output> {
    tokio::time::timeout(timeout, future).await.ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogError, CatalogSearch, CatalogTrack};
    use crate::providers::{
        ChatMessage, CompletionConfig, CompletionResponse, EmbeddingResponse, ProviderError,
        TokenUsage,
    };
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn payload(tag: &str, artist: &str, title: &str) -> String {
        format!(
            r#"```json
[{{"recommendation_meta": {{"reasoning": "Soft piano keeps focus.", "primary_tag": "{tag}"}},
   "track_info": {{"artist_name": "{artist}", "track_title": "{title}"}},
   "target_audio_features": {{"energy": 0.2}}}}]
```"#
        )
    }

    /// Replays scripted outputs, then repeats the last one.
    struct ScriptedRecommender {
        outputs: Mutex<VecDeque<String>>,
        last: Mutex<String>,
        calls: AtomicUsize,
    }

    impl ScriptedRecommender {
        fn new(outputs: Vec<String>) -> Arc<Self> {
            Arc::new(Self {
                outputs: Mutex::new(outputs.into()),
                last: Mutex::new(String::new()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Recommender for ScriptedRecommender {
        async fn recommend(&self, _input: &BridgeInput) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outputs.lock().pop_front() {
                Some(output) => {
                    *self.last.lock() = output.clone();
                    output
                }
                None => self.last.lock().clone(),
            }
        }
    }

    /// Judge replies with a fixed body; embeddings are fixed vectors.
    struct FakeModel {
        reply: Result<String, ()>,
        vectors: Vec<Vec<f32>>,
        stall_embeddings: bool,
    }

    impl FakeModel {
        fn new(reply: &str, vectors: Vec<Vec<f32>>) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                vectors,
                stall_embeddings: false,
            })
        }
    }

    #[async_trait]
    impl LlmProvider for FakeModel {
        async fn complete(
            &self,
            _messages: Vec<ChatMessage>,
            _config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            match &self.reply {
                Ok(reply) => Ok(CompletionResponse::text("gpt-4o", reply.clone())),
                Err(()) => Err(ProviderError::AuthError),
            }
        }

        async fn embed(
            &self,
            _inputs: &[String],
            model: &str,
        ) -> Result<EmbeddingResponse, ProviderError> {
            if self.stall_embeddings {
                std::future::pending::<()>().await;
            }
            Ok(EmbeddingResponse {
                vectors: self.vectors.clone(),
                usage: TokenUsage {
                    prompt_tokens: 12,
                    completion_tokens: 0,
                },
                model: model.to_string(),
            })
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    struct EmptyCatalog;

    #[async_trait]
    impl CatalogSearch for EmptyCatalog {
        async fn search_track(&self, _query: &str) -> Result<Option<CatalogTrack>, CatalogError> {
            Ok(None)
        }

        fn name(&self) -> &str {
            "empty"
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        started: Mutex<Vec<(usize, usize, String)>>,
        hallucinations: Mutex<Vec<String>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn scenario_started(&self, position: usize, total: usize, id: &str, _scenario: &ScenarioRecord) {
            self.started.lock().push((position, total, id.to_string()));
        }

        fn scenario_finished(&self, record: &ScoreRecord) {
            if record.is_hallucination() {
                self.hallucinations.lock().push(record.hallucination_track().to_string());
            }
        }
    }

    fn scenario(id: &str) -> ScenarioRecord {
        ScenarioRecord {
            id: Some(id.to_string()),
            location: Some("Library".into()),
            decibel: Some("Silent".into()),
            goal: Some("Focus".into()),
            user_pref: Some("None".into()),
            user_artist: None,
            evaluation_criteria: "Calm instrumental music".into(),
        }
    }

    fn evaluator(recommender: Arc<ScriptedRecommender>, model: Arc<FakeModel>) -> Evaluator {
        let judge = StructuredJudgment::new(model.clone(), CompletionConfig::new("gpt-4o"))
            .with_retry(RetryPolicy::none());
        Evaluator::new(recommender, TrackVerifier::new(None), EvaluationConfig::default())
            .with_judge(judge)
            .with_embedder(model, "text-embedding-3-small")
            .with_retry(RetryPolicy::none())
    }

    #[tokio::test]
    async fn test_well_formed_output_scores() {
        let recommender = ScriptedRecommender::new(vec![payload(
            "focus_piano_calm",
            "Yiruma",
            "River Flows in You",
        )]);
        let model = FakeModel::new(
            r#"{"score": 80, "reason": "fits"}"#,
            vec![vec![1.0, 0.0], vec![1.0, 0.0]],
        );
        let outcome = evaluator(recommender.clone(), model)
            .evaluate(&[scenario("S1")])
            .await;

        let record = &outcome.report.records[0];
        assert_eq!(record.id, "S1");
        assert_eq!(record.context, "Library-Focus");
        assert_eq!(record.stability, 1);
        assert_eq!(record.search_success, 1);
        assert!((record.accuracy.semantic - 100.0).abs() < 1e-9);
        assert!((record.accuracy.judged - 80.0).abs() < 1e-9);
        assert!((record.total_accuracy - 86.0).abs() < 1e-9);
        assert_eq!(record.consistency, 1.0);
        assert_eq!(record.primary_tag, "focus_piano_calm");
        assert_eq!(record.recommended_track, "Yiruma - River Flows in You");
        assert_eq!(record.output_reasoning, "Soft piano keeps focus.");

        // Consistency sampled at index 0: one run plus two re-runs.
        assert_eq!(recommender.calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.usage.by_stage[&UsageStage::Scoring].llm_calls, 1);
    }

    #[tokio::test]
    async fn test_malformed_output_scores_lowest() {
        let recommender = ScriptedRecommender::new(vec!["I could not decide.".to_string()]);
        let model = FakeModel::new(r#"{"score": 90}"#, vec![vec![1.0], vec![1.0]]);
        let outcome = evaluator(recommender, model)
            .evaluate(&[scenario("S1")])
            .await;

        let record = &outcome.report.records[0];
        assert_eq!(record.stability, 0);
        assert_eq!(record.search_success, 0);
        assert_eq!(record.total_accuracy, 0.0);
        assert!((record.consistency - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(record.primary_tag, PARSING_FAILED);
        assert_eq!(record.recommended_track, PARSING_FAILED);
        assert_eq!(outcome.report.summary.diversity, 100.0);
    }

    #[tokio::test]
    async fn test_consistency_only_on_stride() {
        let outputs = (0..6)
            .map(|i| payload("focus_piano_calm", "Artist", &format!("Track {i}")))
            .collect();
        let recommender = ScriptedRecommender::new(outputs);
        let model = FakeModel::new(r#"{"score": 50}"#, vec![vec![1.0], vec![1.0]]);
        let scenarios: Vec<_> = (0..2).map(|i| scenario(&i.to_string())).collect();
        let outcome = evaluator(recommender.clone(), model)
            .evaluate(&scenarios)
            .await;

        // Scenario 0 runs three times, scenario 1 once.
        assert_eq!(recommender.calls.load(Ordering::SeqCst), 4);
        assert_eq!(outcome.report.records[1].consistency, 1.0);
    }

    #[tokio::test]
    async fn test_tag_disagreement_lowers_consistency() {
        let recommender = ScriptedRecommender::new(vec![
            payload("focus_piano_calm", "A", "One"),
            payload("relax_jazz_groovy", "B", "Two"),
            "not json".to_string(),
        ]);
        let model = FakeModel::new(r#"{"score": 50}"#, vec![vec![1.0], vec![1.0]]);
        let outcome = evaluator(recommender, model)
            .evaluate(&[scenario("S1")])
            .await;
        assert!((outcome.report.records[0].consistency - 1.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_judge_failure_keeps_semantic() {
        let recommender = ScriptedRecommender::new(vec![payload("focus_piano_calm", "A", "One")]);
        let model = Arc::new(FakeModel {
            reply: Err(()),
            vectors: vec![vec![1.0, 0.0], vec![1.0, 0.0]],
            stall_embeddings: false,
        });
        let outcome = evaluator(recommender, model)
            .evaluate(&[scenario("S1")])
            .await;

        let record = &outcome.report.records[0];
        assert_eq!(record.accuracy.judged, 0.0);
        assert!((record.total_accuracy - 30.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_embedding_timeout_scores_zero() {
        let recommender = ScriptedRecommender::new(vec![payload("focus_piano_calm", "A", "One")]);
        let model = Arc::new(FakeModel {
            reply: Ok(r#"{"score": "70"}"#.to_string()),
            vectors: Vec::new(),
            stall_embeddings: true,
        });
        let outcome = evaluator(recommender, model)
            .evaluate(&[scenario("S1")])
            .await;

        let record = &outcome.report.records[0];
        assert_eq!(record.accuracy.semantic, 0.0);
        assert!((record.accuracy.judged - 70.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_hallucination_reported() {
        let recommender = ScriptedRecommender::new(vec![payload("focus_piano_calm", "Nobody", "Fake Song")]);
        let progress = Arc::new(RecordingProgress::default());
        let verifier = TrackVerifier::new(Some(Arc::new(EmptyCatalog))).with_retry(RetryPolicy::none());
        let evaluator = Evaluator::new(recommender, verifier, EvaluationConfig::default())
            .with_progress(progress.clone());

        let outcome = evaluator.evaluate(&[scenario("S9")]).await;
        let record = &outcome.report.records[0];
        assert_eq!(record.stability, 1);
        assert_eq!(record.search_success, 0);
        // No judge and no embedder configured.
        assert_eq!(record.total_accuracy, 0.0);

        assert_eq!(progress.started.lock().as_slice(), &[(1, 1, "S9".to_string())]);
        assert_eq!(progress.hallucinations.lock().as_slice(), &["Nobody - Fake Song".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_scenario_set() {
        let recommender = ScriptedRecommender::new(Vec::new());
        let model = FakeModel::new("{}", Vec::new());
        let outcome = evaluator(recommender, model).evaluate(&[]).await;
        assert!(outcome.report.records.is_empty());
        assert_eq!(outcome.report.summary.accuracy_total, 0.0);
        assert_eq!(outcome.report.summary.diversity, 0.0);
    }
}
