use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use refineloops_agent::{ArtifactRequest, Producer};
use refineloops_judge::{ConfigError, EvaluatorInvoker};
use refineloops_logging::{LogEvent, Logger};

use crate::{
    Aggregator, EngineConfig, RefinementError, RefinementOutcome, RefinementSession,
    RefinementState, RoundDecision, RoundRecord,
};

/// Drives the produce → evaluate → decide loop for one request at a time.
///
/// `run` owns its session; dropping the returned future cancels any in-flight
/// producer or evaluator call and discards the session.
pub struct RefinementController {
    producer: Arc<dyn Producer>,
    invoker: EvaluatorInvoker,
    aggregator: Aggregator,
    config: EngineConfig,
    logger: Arc<Logger>,
}

impl RefinementController {
    pub fn new(
        producer: Arc<dyn Producer>,
        invoker: EvaluatorInvoker,
        config: EngineConfig,
        logger: Arc<Logger>,
    ) -> Result<Self, RefinementError> {
        config.validate()?;

        if !Arc::ptr_eq(invoker.config(), &config.scoring) && **invoker.config() != *config.scoring
        {
            return Err(ConfigError::Invalid(
                "evaluator invoker and engine were built with different scoring tables".into(),
            )
            .into());
        }

        let aggregator = Aggregator::new(config.scoring.clone());
        Ok(Self {
            producer,
            invoker,
            aggregator,
            config,
            logger,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Refine until the artifact passes or the configured budget runs out
    pub async fn run(&self, request: ArtifactRequest) -> Result<RefinementOutcome, RefinementError> {
        self.run_with_max_iterations(request, self.config.max_iterations)
            .await
    }

    /// Same as [`run`](Self::run) with a per-request iteration budget
    pub async fn run_with_max_iterations(
        &self,
        request: ArtifactRequest,
        max_iterations: usize,
    ) -> Result<RefinementOutcome, RefinementError> {
        if max_iterations == 0 {
            return Err(ConfigError::Invalid("max_iterations must be at least 1".into()).into());
        }

        let mut session = RefinementSession::new(request, max_iterations);

        self.logger.log(&LogEvent::RefinementStarted {
            session_id: session.id().to_string(),
            brief: session.request().brief.clone(),
            producer: self.producer.name().to_string(),
            evaluators: self
                .invoker
                .kinds()
                .iter()
                .map(|k| k.to_string())
                .collect(),
            max_iterations,
        });

        loop {
            session.transition(RefinementState::Producing)?;
            let iteration = session.iteration();

            self.logger.log(&LogEvent::ProducerStarted {
                iteration,
                feedback_items: session.feedback().map_or(0, |f| f.len()),
            });

            let produce_started = Instant::now();
            let produced = self
                .producer
                .produce(session.request(), session.feedback(), iteration)
                .await;

            let artifact = match produced {
                Ok(artifact) => artifact,
                Err(source) => {
                    warn!(iteration, error = %source, "Producer failed, aborting session");
                    self.logger.log(&LogEvent::ErrorEncountered {
                        iteration,
                        error: source.to_string(),
                    });
                    session.transition(RefinementState::Complete)?;
                    return Err(RefinementError::Producer {
                        iteration,
                        source,
                        history: session.into_history(),
                    });
                }
            };

            self.logger.log(&LogEvent::ProducerCompleted {
                iteration,
                artifact_chars: artifact.content.chars().count(),
                duration_secs: produce_started.elapsed().as_secs_f64(),
            });
            debug!(iteration, preview = %artifact.preview(80), "Artifact produced");

            session.transition(RefinementState::Evaluating)?;
            self.logger.log(&LogEvent::EvaluationStarted {
                iteration,
                evaluators: self.invoker.kinds().len(),
            });

            let evaluate_started = Instant::now();
            let results = self
                .invoker
                .evaluate_all(&artifact, session.request(), iteration)
                .await;

            for result in &results {
                self.logger.log(&LogEvent::EvaluatorScored {
                    iteration,
                    kind: result.kind().to_string(),
                    score: result.overall_score(),
                    passed: result.passed(),
                    degraded: result.is_degraded(),
                    critical_issues: result.critical_issues().len(),
                });
            }

            session.transition(RefinementState::Deciding)?;
            let verdict = self.aggregator.aggregate(&results);

            self.logger.log(&LogEvent::VerdictReached {
                iteration,
                overall_score: verdict.overall_score(),
                passed: verdict.passed(),
                failed_kinds: verdict
                    .failed_kinds()
                    .iter()
                    .map(|k| k.to_string())
                    .collect(),
                critical_issues: verdict.critical_issues().len(),
                suggestions: verdict.prioritized_suggestions().len(),
                duration_secs: evaluate_started.elapsed().as_secs_f64(),
            });

            let decision = session.decide(&verdict);
            let suggestions = verdict.prioritized_suggestions().to_vec();
            let record = RoundRecord {
                iteration,
                artifact,
                verdict,
            };

            if session.record_round(record.clone()) {
                self.logger.log(&LogEvent::BestAttemptUpdated {
                    iteration,
                    overall_score: record.verdict.overall_score(),
                });
            }

            match decision {
                RoundDecision::Accept => {
                    session.transition(RefinementState::Complete)?;
                    let duration = session.total_duration();
                    self.logger.log(&LogEvent::RefinementPassed {
                        iterations: iteration,
                        overall_score: record.verdict.overall_score(),
                        duration_secs: duration.as_secs_f64(),
                    });
                    return Ok(RefinementOutcome::passed_with(
                        iteration,
                        record,
                        session.into_history(),
                        duration,
                    ));
                }
                RoundDecision::Exhausted => {
                    session.transition(RefinementState::Complete)?;
                    let duration = session.total_duration();
                    let best = session.best_attempt().cloned().unwrap_or(record);
                    self.logger.log(&LogEvent::BudgetExhausted {
                        iterations: iteration,
                        best_iteration: best.iteration,
                        best_score: best.verdict.overall_score(),
                        duration_secs: duration.as_secs_f64(),
                    });
                    return Ok(RefinementOutcome::best_effort_with(
                        iteration,
                        best,
                        session.into_history(),
                        duration,
                    ));
                }
                RoundDecision::Refine => {
                    session.transition(RefinementState::Refining)?;
                    info!(
                        iteration,
                        next = iteration + 1,
                        suggestions = suggestions.len(),
                        "Refining with prioritized suggestions"
                    );
                    session.advance(suggestions);
                }
            }
        }
    }
}
