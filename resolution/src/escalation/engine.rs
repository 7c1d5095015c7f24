//! Escalation Engine. Drives tiers and the oracle until a match or the budget ends.
//!
//! Consumes tier output and oracle verdicts to move a [`ResolutionState`]
//! through its phases. The engine suspends only at the tier call and the
//! oracle call; everything between them is deterministic.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn, Instrument, Span};
use uuid::Uuid;

use super::phase::{PhaseMachine, ResolutionPhase, TransitionRecord};
use super::state::{IterationRecord, ResolutionState, Transition};
use crate::error::ResolveError;
use crate::oracle::JudgmentOracle;
use crate::search::SearchTier;

pub const DEFAULT_MAX_STEPS: usize = 3;
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Limits for one resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Tier rounds before giving up; at most the number of tiers.
    pub max_steps: usize,
    /// Cap handed to pattern-driven tiers.
    pub max_results: usize,
    /// Ask the oracle to rewrite the task before the first round.
    pub refine_task: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            max_results: DEFAULT_MAX_RESULTS,
            refine_task: false,
        }
    }
}

/// Terminal result of a resolution that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ResolutionOutcome {
    Satisfied { target_path: PathBuf },
    /// No tier produced a confirmed match. Not an error.
    Exhausted { last_pattern: String },
}

/// Everything a resolution produced, for the caller and for reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub run_id: Uuid,
    /// Task as judged (after refinement, if enabled).
    pub task: String,
    pub outcome: ResolutionOutcome,
    pub iterations: Vec<IterationRecord>,
    pub transitions: Vec<TransitionRecord>,
}

impl Resolution {
    pub fn target_path(&self) -> Option<&Path> {
        match &self.outcome {
            ResolutionOutcome::Satisfied { target_path } => Some(target_path),
            ResolutionOutcome::Exhausted { .. } => None,
        }
    }

    pub fn is_satisfied(&self) -> bool {
        matches!(self.outcome, ResolutionOutcome::Satisfied { .. })
    }
}

/// The escalation ladder: ordered tiers, one oracle, fixed limits.
pub struct Resolver {
    tiers: Vec<Arc<dyn SearchTier>>,
    oracle: Arc<dyn JudgmentOracle>,
    config: ResolverConfig,
}

impl Resolver {
    /// Build a resolver, rejecting limits the tiers cannot honour.
    pub fn new(
        tiers: Vec<Arc<dyn SearchTier>>,
        oracle: Arc<dyn JudgmentOracle>,
        config: ResolverConfig,
    ) -> Result<Self, ResolveError> {
        if config.max_steps == 0 {
            return Err(ResolveError::Config("max_steps must be at least 1".into()));
        }
        if config.max_steps > tiers.len() {
            return Err(ResolveError::Config(format!(
                "max_steps {} exceeds the {} configured tiers",
                config.max_steps,
                tiers.len()
            )));
        }
        if config.max_results == 0 {
            return Err(ResolveError::Config("max_results must be at least 1".into()));
        }
        Ok(Self {
            tiers,
            oracle,
            config,
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn tier_names(&self) -> Vec<&str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    /// Resolve `task` to a path, or report that no tier found it.
    pub async fn resolve(&self, task: &str) -> Result<Resolution, ResolveError> {
        let run_id = Uuid::new_v4();
        let span = resolve_span(&run_id);
        let started = Instant::now();

        let result = self.run(run_id, task).instrument(span.clone()).await;

        span.record("duration_ms", started.elapsed().as_millis() as u64);
        match &result {
            Ok(r) => {
                span.record("satisfied", r.is_satisfied());
                span.record("steps", r.iterations.len());
            }
            Err(e) => warn!(%run_id, error = %e, "Resolution failed"),
        }
        result
    }

    async fn run(&self, run_id: Uuid, task: &str) -> Result<Resolution, ResolveError> {
        let mut phases = PhaseMachine::new();

        let task = if self.config.refine_task {
            match self.oracle.refine_task(task).await {
                Ok(refined) => {
                    info!(original = %task, refined = %refined, "Task refined");
                    refined
                }
                Err(e) => return Err(fail(&mut phases, 0, e.into())),
            }
        } else {
            task.to_string()
        };

        let mut state = ResolutionState::new(task);
        let mut iterations = Vec::new();
        info!(task = %state.task, max_steps = self.config.max_steps, "Resolution starting");

        let outcome = loop {
            let step = state.step;
            let tier = &self.tiers[step];
            let round_started = Instant::now();

            phases.advance(ResolutionPhase::TierSearch, step, Some(tier.name()))?;
            let candidates = match tier.search(&state.pattern, self.config.max_results).await {
                Ok(c) => c,
                Err(source) => {
                    let err = ResolveError::Tier {
                        step,
                        tier: tier.name().to_string(),
                        source,
                    };
                    return Err(fail(&mut phases, step, err));
                }
            };
            info!(
                step,
                tier = %tier.name(),
                pattern = %state.pattern,
                candidates = candidates.len(),
                "Tier searched"
            );
            debug!(?candidates, "Candidates");
            state.replace_candidates(candidates);

            phases.advance(ResolutionPhase::Judge, step, None)?;
            let verdict = match self.oracle.judge(&state.task, &state.candidates).await {
                Ok(v) => v,
                Err(e) => return Err(fail(&mut phases, step, e.into())),
            };
            debug!(?verdict, "Verdict received");

            let pattern_used = state.pattern.clone();
            let transition = match state.apply_verdict(verdict, self.config.max_steps) {
                Ok(t) => t,
                Err(e) => return Err(fail(&mut phases, step, e.into())),
            };
            debug!(state = %state.summary(), "Verdict applied");

            iterations.push(IterationRecord {
                step,
                tier: tier.name().to_string(),
                pattern: pattern_used,
                candidate_count: state.candidates.len(),
                satisfied: state.satisfied,
                next_pattern: state.pattern.clone(),
                timestamp: Utc::now(),
                elapsed_ms: round_started.elapsed().as_millis() as u64,
            });

            match transition {
                Transition::Continue { next_step } => {
                    info!(next_step, pattern = %state.pattern, "Escalating to next tier");
                }
                Transition::Satisfied { target_path } => {
                    phases.advance(ResolutionPhase::Satisfied, step, None)?;
                    info!(step, target = %target_path.display(), "Match confirmed");
                    break ResolutionOutcome::Satisfied { target_path };
                }
                Transition::Exhausted => {
                    phases.advance(
                        ResolutionPhase::Exhausted,
                        state.step,
                        Some("step budget spent"),
                    )?;
                    warn!(steps = state.step, "No match found");
                    break ResolutionOutcome::Exhausted {
                        last_pattern: state.pattern.clone(),
                    };
                }
            }
        };

        Ok(Resolution {
            run_id,
            task: state.task,
            outcome,
            iterations,
            transitions: phases.into_transitions(),
        })
    }
}

/// Move to `Failed` and hand the error back for propagation.
fn fail(phases: &mut PhaseMachine, step: usize, err: ResolveError) -> ResolveError {
    let reason = err.to_string();
    if let Err(illegal) = phases.advance(ResolutionPhase::Failed, step, Some(&reason)) {
        debug!(%illegal, "Failure raised from a terminal phase");
    }
    err
}

/// Root span for one resolution; outcome fields are recorded on exit.
fn resolve_span(run_id: &Uuid) -> Span {
    tracing::info_span!(
        "resolve",
        run_id = %run_id,
        satisfied = tracing::field::Empty,
        steps = tracing::field::Empty,
        duration_ms = tracing::field::Empty,
    )
}
