//! Bounded search-tier ladder judged by an oracle.
//!
//! ```text
//! Init
//!   │
//!   ▼
//! TierSearch(step) ──► Judge(step)
//!   ▲                    │
//!   │  not satisfied,    ├─ satisfied ─────────────► Satisfied
//!   │  step+1 < max      │
//!   └────────────────────┤
//!                        └─ step+1 == max ─────────► Exhausted
//!
//! tier or oracle error from any live phase ────────► Failed
//! ```
//!
//! Each round replaces the candidate list; only the task, the oracle's
//! latest pattern and the step counter carry over.

pub mod engine;
pub mod phase;
pub mod state;

pub use engine::{
    Resolution, ResolutionOutcome, Resolver, ResolverConfig, DEFAULT_MAX_RESULTS,
    DEFAULT_MAX_STEPS,
};
pub use phase::{IllegalTransition, PhaseMachine, ResolutionPhase, TransitionRecord};
pub use state::{IterationRecord, ResolutionState, Transition};
