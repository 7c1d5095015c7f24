//! Builds the three-tier search ladder from configuration.

use std::sync::Arc;

use anyhow::Result;
use resolution::{IndexedSearchTier, OsSearchTier, SearchTier};
use tracing::info;

use crate::config::AgentConfig;
use crate::desktop;

/// File-index tier configured from the `search` section.
pub fn indexed_tier(config: &AgentConfig) -> IndexedSearchTier {
    IndexedSearchTier::new(config.search_roots())
        .with_kind(config.search.kind)
        .with_max_depth(config.search.max_depth)
        .with_timeout(config.search_timeout())
}

/// Tiers in escalation order: desktop snapshot, file index, OS search.
pub fn build_ladder(config: &AgentConfig) -> Result<Vec<Arc<dyn SearchTier>>> {
    let snapshot = desktop::snapshot_tier(config)?;
    let indexed = indexed_tier(config);
    let fallback = OsSearchTier::new(&config.fallback.command);

    info!(
        desktop_items = snapshot.items().len(),
        roots = ?indexed.roots(),
        kind = %config.search.kind,
        fallback = fallback.is_enabled(),
        "Search ladder ready"
    );

    Ok(vec![Arc::new(snapshot), Arc::new(indexed), Arc::new(fallback)])
}
