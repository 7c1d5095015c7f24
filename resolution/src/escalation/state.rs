//! What one `resolve` call knows between tier calls.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OracleError;
use crate::oracle::JudgmentVerdict;
use crate::search::SearchItem;

/// What the engine should do after a verdict has been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Search the next tier with the refined pattern.
    Continue { next_step: usize },
    /// The oracle confirmed `target_path`.
    Satisfied { target_path: PathBuf },
    /// Budget spent without a match.
    Exhausted,
}

/// Record of one tier → oracle round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Tier index searched in this round.
    pub step: usize,
    pub tier: String,
    /// Pattern handed to the tier.
    pub pattern: String,
    pub candidate_count: usize,
    pub satisfied: bool,
    /// Pattern the oracle proposed for the next round.
    pub next_pattern: String,
    pub timestamp: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Mutable state of a single resolution.
///
/// Owned by the engine's call stack; candidates are replaced, not
/// accumulated, every round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionState {
    pub task: String,
    /// Current search expression; empty before the first verdict.
    pub pattern: String,
    /// Index of the tier to search next. Never decreases.
    pub step: usize,
    /// Output of the most recent tier.
    pub candidates: Vec<SearchItem>,
    pub satisfied: bool,
    /// Set only together with `satisfied`.
    pub target_path: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
}

impl ResolutionState {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            pattern: String::new(),
            step: 0,
            candidates: Vec::new(),
            satisfied: false,
            target_path: None,
            started_at: Utc::now(),
        }
    }

    /// Install the latest tier output, discarding the previous round's.
    pub fn replace_candidates(&mut self, candidates: Vec<SearchItem>) {
        self.candidates = candidates;
    }

    /// Apply a verdict and decide the next transition.
    ///
    /// Invalid verdicts leave the state untouched.
    pub fn apply_verdict(
        &mut self,
        verdict: JudgmentVerdict,
        max_steps: usize,
    ) -> Result<Transition, OracleError> {
        verdict.validate()?;

        if verdict.satisfied {
            let target_path = PathBuf::from(verdict.target_path);
            self.satisfied = true;
            self.target_path = Some(target_path.clone());
            return Ok(Transition::Satisfied { target_path });
        }

        self.pattern = verdict.pattern;
        self.step += 1;
        if self.step >= max_steps {
            Ok(Transition::Exhausted)
        } else {
            Ok(Transition::Continue {
                next_step: self.step,
            })
        }
    }

    /// One-line summary for logging.
    pub fn summary(&self) -> String {
        format!(
            "step={} pattern={:?} candidates={} satisfied={}",
            self.step,
            self.pattern,
            self.candidates.len(),
            self.satisfied,
        )
    }
}
