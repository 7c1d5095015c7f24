//! Error taxonomy for decoding and resolution.
//!
//! | Error          | Scope                 | Retriable by caller |
//! |----------------|-----------------------|---------------------|
//! | `DecodeError`  | one `decode` call     | no                  |
//! | `TierError`    | one `resolve` call    | timeouts only       |
//! | `OracleError`  | one `resolve` call    | transport only      |
//!
//! Nothing in this crate retries internally. Exhausting the step budget is not
//! an error; see [`crate::escalation::ResolutionOutcome::Exhausted`].

use thiserror::Error;

use crate::escalation::phase::IllegalTransition;

/// Malformed or out-of-range layout blob.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A read at `offset` of `len` bytes would pass the end of the blob.
    #[error("blob truncated: need {len} bytes at offset {offset}, blob is {blob_len} bytes")]
    Truncated {
        offset: usize,
        len: usize,
        blob_len: usize,
    },

    /// The item count cannot be satisfied by the bytes available.
    #[error("item count {count} inconsistent with a {blob_len}-byte blob")]
    InconsistentCount { count: u32, blob_len: usize },

    /// A name record declared a length that is not a positive UTF-16 run.
    #[error("name record {index} has invalid length field {length}")]
    InvalidNameLength { index: usize, length: u32 },

    /// A name record held bytes that are not valid UTF-16LE.
    #[error("name record {index} is not valid UTF-16")]
    InvalidName { index: usize },

    /// A position record points at an icon that does not exist.
    #[error("position record references icon {reference}, only {count} icons decoded")]
    DanglingReference { reference: u16, count: usize },

    /// Two position records point at the same icon.
    #[error("icon {reference} has more than one position record")]
    DuplicatePosition { reference: u16 },
}

/// A search tier failed to produce results.
#[derive(Debug, Error)]
pub enum TierError {
    /// The blocking search task panicked or was cancelled.
    #[error("search task failed: {0}")]
    Join(String),

    /// The file index was not built within the configured budget.
    #[error("search timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// The judgment oracle returned unusable data or could not be reached.
#[derive(Debug, Error)]
pub enum OracleError {
    /// Network failure, timeout, or non-success status from the backend.
    #[error("oracle unreachable: {0}")]
    Unreachable(String),

    /// The response body did not deserialize into a complete verdict.
    #[error("malformed verdict: {0}")]
    Malformed(String),

    /// `satisfied = true` arrived without a target path.
    #[error("verdict claims a match but carries an empty target path")]
    EmptyTargetPath,
}

/// Failure of a whole `resolve` call.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("tier {step} ({tier}) failed: {source}")]
    Tier {
        step: usize,
        tier: String,
        #[source]
        source: TierError,
    },

    /// The resolver was constructed with an unusable configuration.
    #[error("invalid resolver configuration: {0}")]
    Config(String),

    /// The engine attempted a phase move its own graph forbids.
    #[error("{0}")]
    Phase(#[from] IllegalTransition),
}

impl ResolveError {
    /// Whether a fresh attempt at the whole resolution could plausibly succeed.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Oracle(OracleError::Unreachable(_)) => true,
            Self::Tier {
                source: TierError::Timeout { .. },
                ..
            } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_classification() {
        assert!(ResolveError::Oracle(OracleError::Unreachable("refused".into())).is_retriable());
        assert!(!ResolveError::Oracle(OracleError::EmptyTargetPath).is_retriable());
        assert!(!ResolveError::Oracle(OracleError::Malformed("x".into())).is_retriable());
        assert!(ResolveError::Tier {
            step: 1,
            tier: "indexed".into(),
            source: TierError::Timeout { timeout_ms: 30_000 },
        }
        .is_retriable());
        assert!(!ResolveError::Config("max_steps".into()).is_retriable());
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::Truncated {
            offset: 28,
            len: 12,
            blob_len: 30,
        };
        assert_eq!(
            err.to_string(),
            "blob truncated: need 12 bytes at offset 28, blob is 30 bytes"
        );
    }
}
