//! Desktop layout loading: blob file → snapshot tier, or → icon table.

use std::path::Path;

use anyhow::{Context, Result};
use resolution::{decode, DesktopIcon, DesktopSnapshotTier, GridPosition, IconGeometry};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::AgentConfig;

/// Read the layout blob once.
pub fn load_blob(path: &Path) -> Result<Vec<u8>> {
    let blob = std::fs::read(path)
        .with_context(|| format!("Failed to read layout blob {}", path.display()))?;
    info!(path = %path.display(), bytes = blob.len(), "Loaded layout blob");
    Ok(blob)
}

/// Tier 0 for `config`.
///
/// Without a configured blob the snapshot is empty. A configured blob that
/// cannot be read or decoded is an error.
pub fn snapshot_tier(config: &AgentConfig) -> Result<DesktopSnapshotTier> {
    let Some(blob_path) = &config.desktop.blob_path else {
        warn!("No layout blob configured; desktop tier will be empty");
        return Ok(DesktopSnapshotTier::empty());
    };
    let blob = load_blob(blob_path)?;
    let tier = DesktopSnapshotTier::from_blob(&blob, &config.desktop_dir())
        .with_context(|| format!("Failed to decode layout blob {}", blob_path.display()))?;
    Ok(tier)
}

/// One row of the `layout` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IconPlacement {
    pub name: String,
    pub origin_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<GridPosition>,
    /// Pixel centre of the icon's cell, for click automation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pixel: Option<(i64, i64)>,
}

pub fn placements(icons: &[DesktopIcon], geometry: &IconGeometry) -> Vec<IconPlacement> {
    icons
        .iter()
        .map(|icon| IconPlacement {
            name: icon.name.clone(),
            origin_index: icon.origin_index,
            grid: icon.grid_position,
            pixel: icon.grid_position.map(|g| geometry.pixel_for(g)),
        })
        .collect()
}

/// Decode the configured blob into placements.
pub fn layout(config: &AgentConfig, with_positions: bool) -> Result<Vec<IconPlacement>> {
    let blob_path = config
        .desktop
        .blob_path
        .as_deref()
        .context("No layout blob configured (set desktop.blob_path or LOCATE_LAYOUT_BLOB)")?;
    let blob = load_blob(blob_path)?;
    let icons = decode(&blob, with_positions)
        .with_context(|| format!("Failed to decode layout blob {}", blob_path.display()))?;
    Ok(placements(&icons, &config.geometry()))
}
