use futures::future::join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use refineloops_agent::{Artifact, ArtifactRequest};

use crate::{
    ConfigError, EvaluationContext, EvaluationError, Evaluator, EvaluatorResult, JudgeKind,
    KindProfile, ScoringConfig,
};

struct Registered {
    evaluator: Arc<dyn Evaluator>,
    profile: KindProfile,
}

/// Fans an artifact out to every registered evaluator and joins the results.
///
/// Each call has its own deadline. A call that times out, errors, or returns
/// a response that does not fit its kind's schema is replaced by a degraded,
/// failing result, so a round always yields exactly one result per evaluator.
pub struct EvaluatorInvoker {
    config: Arc<ScoringConfig>,
    evaluators: Vec<Registered>,
}

impl EvaluatorInvoker {
    /// Register evaluators against a validated scoring table
    pub fn new(
        config: Arc<ScoringConfig>,
        evaluators: Vec<Arc<dyn Evaluator>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        if evaluators.is_empty() {
            return Err(ConfigError::NoEvaluators);
        }

        let mut seen = BTreeSet::new();
        let mut registered = Vec::with_capacity(evaluators.len());
        for evaluator in evaluators {
            let kind = evaluator.kind();
            if !seen.insert(kind) {
                return Err(ConfigError::DuplicateEvaluator(kind));
            }
            let profile = config
                .profile(kind)
                .cloned()
                .ok_or(ConfigError::UnknownKind(kind))?;
            registered.push(Registered { evaluator, profile });
        }

        // Fixed iteration order over kinds, independent of registration order
        registered.sort_by_key(|r| r.evaluator.kind());

        Ok(Self {
            config,
            evaluators: registered,
        })
    }

    pub fn config(&self) -> &Arc<ScoringConfig> {
        &self.config
    }

    /// Registered kinds in canonical order
    pub fn kinds(&self) -> Vec<JudgeKind> {
        self.evaluators.iter().map(|r| r.evaluator.kind()).collect()
    }

    /// Evaluate `artifact` with every registered evaluator concurrently.
    ///
    /// Returns once every call has finished or timed out, in kind order.
    pub async fn evaluate_all(
        &self,
        artifact: &Artifact,
        request: &ArtifactRequest,
        iteration: usize,
    ) -> Vec<EvaluatorResult> {
        debug!(
            evaluators = self.evaluators.len(),
            iteration, "Dispatching evaluators"
        );

        let calls = self
            .evaluators
            .iter()
            .map(|registered| self.evaluate_one(registered, artifact, request, iteration));

        join_all(calls).await
    }

    async fn evaluate_one(
        &self,
        registered: &Registered,
        artifact: &Artifact,
        request: &ArtifactRequest,
        iteration: usize,
    ) -> EvaluatorResult {
        let kind = registered.evaluator.kind();
        let profile = &registered.profile;
        let max_critical = self.config.max_critical_issues;
        let timeout = self.config.evaluator_timeout;

        let context = EvaluationContext {
            request,
            criteria: &profile.criteria,
            iteration,
        };

        let call = registered.evaluator.evaluate(artifact, &context);
        let outcome = match tokio::time::timeout(timeout, call).await {
            Ok(Ok(response)) => response
                .into_result(kind, profile, max_critical)
                .map_err(EvaluationError::from),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(EvaluationError::Timeout(timeout)),
        };

        match outcome {
            Ok(result) => {
                debug!(
                    kind = %kind,
                    score = result.overall_score(),
                    passed = result.passed(),
                    critical_issues = result.critical_issues().len(),
                    "Evaluator result"
                );
                result
            }
            Err(e) => {
                warn!(kind = %kind, error = %e, "Evaluation unavailable, degrading result");
                EvaluatorResult::unavailable(kind, profile.threshold, max_critical)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CriterionScore, EvaluatorResponse, UNAVAILABLE_ISSUE};
    use async_trait::async_trait;
    use std::time::Duration;

    struct Fixed {
        kind: JudgeKind,
        delay: Duration,
        response: Result<EvaluatorResponse, String>,
    }

    #[async_trait]
    impl Evaluator for Fixed {
        fn kind(&self) -> JudgeKind {
            self.kind
        }

        async fn evaluate(
            &self,
            _artifact: &Artifact,
            _context: &EvaluationContext<'_>,
        ) -> Result<EvaluatorResponse, EvaluationError> {
            tokio::time::sleep(self.delay).await;
            self.response
                .clone()
                .map_err(EvaluationError::Unavailable)
        }
    }

    fn scored(kind: JudgeKind, score: f64) -> Arc<dyn Evaluator> {
        Arc::new(Fixed {
            kind,
            delay: Duration::from_millis(10),
            response: Ok(full_response(kind, score)),
        })
    }

    fn full_response(kind: JudgeKind, score: f64) -> EvaluatorResponse {
        let config = ScoringConfig::canonical();
        let criteria = config
            .profile(kind)
            .unwrap()
            .criteria
            .iter()
            .map(|name| (name.clone(), CriterionScore::new(score, "ok")))
            .collect();
        EvaluatorResponse {
            criteria,
            critical_issues: vec![],
        }
    }

    fn invoker(evaluators: Vec<Arc<dyn Evaluator>>) -> EvaluatorInvoker {
        let config = ScoringConfig::canonical().with_evaluator_timeout(Duration::from_secs(1));
        EvaluatorInvoker::new(Arc::new(config), evaluators).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_come_back_in_kind_order() {
        let invoker = invoker(vec![
            scored(JudgeKind::Usability, 8.0),
            scored(JudgeKind::Aesthetic, 9.0),
        ]);
        let request = ArtifactRequest::new("fox");

        let results = invoker
            .evaluate_all(&Artifact::new(1, "<svg/>"), &request, 1)
            .await;

        let kinds: Vec<JudgeKind> = results.iter().map(|r| r.kind()).collect();
        assert_eq!(kinds, vec![JudgeKind::Aesthetic, JudgeKind::Usability]);
        assert!(results.iter().all(|r| r.passed()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_degrades_only_the_slow_evaluator() {
        let slow: Arc<dyn Evaluator> = Arc::new(Fixed {
            kind: JudgeKind::Technical,
            delay: Duration::from_secs(30),
            response: Ok(full_response(JudgeKind::Technical, 9.0)),
        });
        let invoker = invoker(vec![scored(JudgeKind::Aesthetic, 8.0), slow]);
        let request = ArtifactRequest::new("fox");

        let results = invoker
            .evaluate_all(&Artifact::new(1, "<svg/>"), &request, 1)
            .await;

        assert_eq!(results.len(), 2);
        assert!(results[0].passed());
        assert!(!results[0].is_degraded());

        let technical = &results[1];
        assert_eq!(technical.kind(), JudgeKind::Technical);
        assert!(technical.is_degraded());
        assert_eq!(technical.overall_score(), 0.0);
        assert_eq!(technical.critical_issues(), &[UNAVAILABLE_ISSUE.to_string()]);
        assert!(!technical.passed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_and_schema_mismatch_are_degraded() {
        let failing: Arc<dyn Evaluator> = Arc::new(Fixed {
            kind: JudgeKind::BrandFit,
            delay: Duration::ZERO,
            response: Err("connection refused".into()),
        });
        let incomplete: Arc<dyn Evaluator> = Arc::new(Fixed {
            kind: JudgeKind::Technical,
            delay: Duration::ZERO,
            response: Ok(EvaluatorResponse::default()),
        });
        let invoker = invoker(vec![failing, incomplete]);
        let request = ArtifactRequest::new("fox");

        let results = invoker
            .evaluate_all(&Artifact::new(1, "<svg/>"), &request, 1)
            .await;

        assert!(results.iter().all(|r| r.is_degraded() && !r.passed()));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let config = ScoringConfig::empty().with_kind(
            JudgeKind::Aesthetic,
            KindProfile::new(1.0, 7.0, &["visual_balance"]),
        );
        let result = EvaluatorInvoker::new(
            Arc::new(config),
            vec![scored(JudgeKind::Technical, 5.0)],
        );
        assert!(matches!(
            result,
            Err(ConfigError::UnknownKind(JudgeKind::Technical))
        ));
    }

    #[test]
    fn test_duplicate_evaluator_rejected() {
        let result = EvaluatorInvoker::new(
            Arc::new(ScoringConfig::canonical()),
            vec![
                scored(JudgeKind::Aesthetic, 5.0),
                scored(JudgeKind::Aesthetic, 6.0),
            ],
        );
        assert!(matches!(
            result,
            Err(ConfigError::DuplicateEvaluator(JudgeKind::Aesthetic))
        ));
    }

    #[test]
    fn test_empty_registry_rejected() {
        let result = EvaluatorInvoker::new(Arc::new(ScoringConfig::canonical()), vec![]);
        assert!(matches!(result, Err(ConfigError::NoEvaluators)));
    }
}
