//! Search tiers, the interchangeable candidate providers of the escalation ladder.
//!
//! ```text
//! tier 0  DesktopSnapshotTier   decoded desktop icons, fixed at construction
//! tier 1  IndexedSearchTier     regex over an index of files under search roots
//! tier 2  OsSearchTier          launches the OS search UI, returns nothing
//! ```

pub mod fallback;
pub mod indexed;
pub mod snapshot;

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TierError;

pub use fallback::OsSearchTier;
pub use indexed::{FileIndex, IndexedSearchTier, SearchKind};
pub use snapshot::DesktopSnapshotTier;

/// A candidate produced by a search tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchItem {
    pub name: String,
    pub path: PathBuf,
}

impl SearchItem {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for SearchItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.path.display())
    }
}

/// One rung of the escalation ladder.
#[async_trait]
pub trait SearchTier: Send + Sync {
    /// Short label for logs and reports.
    fn name(&self) -> &str;

    /// Produce at most `max_results` candidates for `pattern`.
    ///
    /// Tiers that do not search by pattern ignore it.
    async fn search(&self, pattern: &str, max_results: usize)
        -> Result<Vec<SearchItem>, TierError>;
}
