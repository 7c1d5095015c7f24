//! Resolution phases and their legal transition guards.
//!
//! Every resolution starts at `Init` and ends at `Satisfied`, `Exhausted`
//! or `Failed`. The engine calls [`PhaseMachine::advance`] for each move; an
//! illegal move is a bug in the engine and is reported, never ignored.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// The set of resolution phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPhase {
    /// State created, no tier consulted yet.
    Init,
    /// Waiting on the current tier's candidates.
    TierSearch,
    /// Waiting on the oracle's verdict.
    Judge,
    /// The oracle confirmed a path. Terminal.
    Satisfied,
    /// Step budget spent without a match. Terminal.
    Exhausted,
    /// A tier or the oracle failed. Terminal.
    Failed,
}

impl ResolutionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Satisfied | Self::Exhausted | Self::Failed)
    }
}

impl fmt::Display for ResolutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "Init"),
            Self::TierSearch => write!(f, "TierSearch"),
            Self::Judge => write!(f, "Judge"),
            Self::Satisfied => write!(f, "Satisfied"),
            Self::Exhausted => write!(f, "Exhausted"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Legal edges of the phase graph:
/// ```text
/// Init       → TierSearch
/// TierSearch → Judge
/// Judge      → TierSearch | Satisfied | Exhausted
/// any non-terminal → Failed
/// ```
fn is_legal_transition(from: ResolutionPhase, to: ResolutionPhase) -> bool {
    use ResolutionPhase::*;

    if to == Failed && !from.is_terminal() {
        return true;
    }

    matches!(
        (from, to),
        (Init, TierSearch)
            | (TierSearch, Judge)
            | (Judge, TierSearch)
            | (Judge, Satisfied)
            | (Judge, Exhausted)
    )
}

/// A single recorded phase transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: ResolutionPhase,
    pub to: ResolutionPhase,
    /// Tier index at the time of the transition.
    pub step: usize,
    /// Milliseconds since the machine was created.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: ResolutionPhase,
    pub to: ResolutionPhase,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Illegal phase transition: {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// Tracks the current phase and logs every transition.
#[derive(Debug)]
pub struct PhaseMachine {
    current: ResolutionPhase,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self {
            current: ResolutionPhase::Init,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> ResolutionPhase {
        self.current
    }

    /// Move to `to`, recording the edge, or refuse if the edge is illegal.
    pub fn advance(
        &mut self,
        to: ResolutionPhase,
        step: usize,
        reason: Option<&str>,
    ) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        let record = TransitionRecord {
            from: self.current,
            to,
            step,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        };

        tracing::debug!(from = %self.current, to = %to, step, "Phase transition");
        self.transitions.push(record);
        self.current = to;
        Ok(())
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    pub fn into_transitions(self) -> Vec<TransitionRecord> {
        self.transitions
    }

    /// Phase sequence walked so far, starting with `Init`.
    pub fn phase_path(&self) -> Vec<ResolutionPhase> {
        let mut path = vec![ResolutionPhase::Init];
        path.extend(self.transitions.iter().map(|t| t.to));
        path
    }
}
