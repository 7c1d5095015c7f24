//! Tier 0: the desktop as it was when the resolver started.

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use super::{SearchItem, SearchTier};
use crate::error::{DecodeError, TierError};
use crate::layout::{decode, DesktopIcon};

/// Fixed snapshot of the desktop's icons, decoded once.
///
/// Ignores both the pattern and the result cap: the oracle always sees the
/// whole desktop at this tier.
#[derive(Debug, Clone)]
pub struct DesktopSnapshotTier {
    items: Vec<SearchItem>,
}

impl DesktopSnapshotTier {
    /// Decode `blob` and resolve each icon name against `desktop_dir`.
    pub fn from_blob(blob: &[u8], desktop_dir: &Path) -> Result<Self, DecodeError> {
        let icons = decode(blob, false)?;
        info!(icons = icons.len(), dir = %desktop_dir.display(), "Desktop snapshot decoded");
        Ok(Self::from_icons(&icons, desktop_dir))
    }

    pub fn from_icons(icons: &[DesktopIcon], desktop_dir: &Path) -> Self {
        let items = icons
            .iter()
            .map(|icon| SearchItem::new(icon.name.clone(), desktop_dir.join(&icon.name)))
            .collect();
        Self { items }
    }

    /// A snapshot with no icons, for hosts without a layout blob.
    pub fn empty() -> Self {
        Self { items: Vec::new() }
    }

    pub fn items(&self) -> &[SearchItem] {
        &self.items
    }
}

#[async_trait]
impl SearchTier for DesktopSnapshotTier {
    fn name(&self) -> &str {
        "desktop"
    }

    async fn search(
        &self,
        _pattern: &str,
        _max_results: usize,
    ) -> Result<Vec<SearchItem>, TierError> {
        Ok(self.items.clone())
    }
}
