use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

use refineloops_agent::{Artifact, ArtifactRequest};

use crate::{ConsensusVerdict, RefinementError};

/// States of one refinement session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinementState {
    Idle,
    Producing,
    Evaluating,
    Deciding,
    Refining,
    Complete,
}

impl RefinementState {
    pub fn can_transition_to(self, next: RefinementState) -> bool {
        use RefinementState::*;
        matches!(
            (self, next),
            (Idle, Producing)
                | (Producing, Evaluating)
                // producer failure aborts the session
                | (Producing, Complete)
                | (Evaluating, Deciding)
                | (Deciding, Refining)
                | (Deciding, Complete)
                | (Refining, Producing)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == RefinementState::Complete
    }
}

/// What to do after a round has been judged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundDecision {
    /// The verdict passed: stop with this artifact
    Accept,
    /// Budget used up without a pass: stop with the best attempt
    Exhausted,
    /// Produce another version using this round's suggestions
    Refine,
}

/// One produce-evaluate-decide cycle
#[derive(Debug, Clone, Serialize)]
pub struct RoundRecord {
    pub iteration: usize,
    pub artifact: Artifact,
    pub verdict: ConsensusVerdict,
}

/// State owned by a single in-flight refinement request
#[derive(Debug)]
pub struct RefinementSession {
    id: Uuid,
    request: ArtifactRequest,
    /// Current round, 1-based
    iteration: usize,
    max_iterations: usize,
    state: RefinementState,
    history: Vec<RoundRecord>,
    best: Option<usize>,
    /// Prioritized suggestions from the previous round
    feedback: Option<Vec<String>>,
    started_at: Instant,
}

impl RefinementSession {
    pub fn new(request: ArtifactRequest, max_iterations: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            iteration: 1,
            max_iterations,
            state: RefinementState::Idle,
            history: Vec::new(),
            best: None,
            feedback: None,
            started_at: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn request(&self) -> &ArtifactRequest {
        &self.request
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn state(&self) -> RefinementState {
        self.state
    }

    pub fn history(&self) -> &[RoundRecord] {
        &self.history
    }

    pub fn feedback(&self) -> Option<&[String]> {
        self.feedback.as_deref()
    }

    /// Highest-scoring round so far; ties keep the earliest
    pub fn best_attempt(&self) -> Option<&RoundRecord> {
        self.best.and_then(|i| self.history.get(i))
    }

    pub fn total_duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn transition(&mut self, next: RefinementState) -> Result<(), RefinementError> {
        if !self.state.can_transition_to(next) {
            return Err(RefinementError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(session = %self.id, from = ?self.state, to = ?next, "State transition");
        self.state = next;
        Ok(())
    }

    /// Decide how to continue after `verdict`
    pub fn decide(&self, verdict: &ConsensusVerdict) -> RoundDecision {
        if verdict.passed() {
            RoundDecision::Accept
        } else if self.iteration >= self.max_iterations {
            RoundDecision::Exhausted
        } else {
            RoundDecision::Refine
        }
    }

    /// Append a judged round. Returns true when it became the best attempt.
    pub fn record_round(&mut self, record: RoundRecord) -> bool {
        let score = record.verdict.overall_score();
        self.history.push(record);

        let is_best = match self.best_attempt() {
            Some(best) => score > best.verdict.overall_score(),
            None => true,
        };
        if is_best {
            self.best = Some(self.history.len() - 1);
        }
        is_best
    }

    /// Move to the next round, carrying `suggestions` forward as feedback
    pub fn advance(&mut self, suggestions: Vec<String>) {
        self.iteration += 1;
        self.feedback = Some(suggestions);
    }

    pub fn into_history(self) -> Vec<RoundRecord> {
        self.history
    }
}
