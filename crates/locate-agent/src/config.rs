use anyhow::{bail, Context, Result};
use resolution::escalation::DEFAULT_MAX_STEPS;
use resolution::search::indexed::DEFAULT_TIMEOUT_SECS;
use resolution::{IconGeometry, ResolverConfig, SearchKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Highest `max_steps` the three-tier ladder can honour.
pub const MAX_STEPS_LIMIT: usize = 3;

/// OpenAI-compatible chat-completions endpoint used as the judge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSection {
    /// Base URL, without the trailing `/chat/completions`.
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
}

impl Default for OracleSection {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/v1".into(),
            model: "gpt-4o-mini".into(),
            api_key: None,
            timeout_secs: 120,
            temperature: 0.0,
        }
    }
}

/// Where the desktop lives and how its icons are laid out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesktopSection {
    /// Raw layout blob exported from the shell. No snapshot without it.
    pub blob_path: Option<PathBuf>,
    /// Directory icon names are resolved against (None = platform desktop).
    pub desktop_dir: Option<PathBuf>,
    pub cell_width: u32,
    pub cell_height: u32,
    pub vertical_gap: u32,
}

impl Default for DesktopSection {
    fn default() -> Self {
        let geometry = IconGeometry::default();
        Self {
            blob_path: None,
            desktop_dir: None,
            cell_width: geometry.cell_width,
            cell_height: geometry.cell_height,
            vertical_gap: geometry.vertical_gap,
        }
    }
}

/// Tier 1 file index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    /// Roots to index (empty = the user's home directory).
    pub roots: Vec<PathBuf>,
    pub max_results: usize,
    pub max_depth: Option<usize>,
    pub kind: SearchKind,
    pub timeout_secs: u64,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            max_results: resolution::escalation::DEFAULT_MAX_RESULTS,
            max_depth: None,
            kind: SearchKind::Regex,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Tier 2 OS search launcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackSection {
    /// Shell-words command with a `{query}` placeholder; empty disables it.
    pub command: String,
}

impl Default for FallbackSection {
    fn default() -> Self {
        Self {
            command: default_fallback_command().into(),
        }
    }
}

#[cfg(windows)]
fn default_fallback_command() -> &'static str {
    r#"explorer.exe "search-ms:query={query}&crumb=location:Desktop""#
}

#[cfg(not(windows))]
fn default_fallback_command() -> &'static str {
    ""
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSection {
    pub max_steps: usize,
    pub refine_task: bool,
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            refine_task: false,
        }
    }
}

/// Top-level agent configuration.
///
/// Precedence, lowest first: built-in defaults, TOML file, `LOCATE_*`
/// environment variables, CLI flags (applied by the caller).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub oracle: OracleSection,
    pub desktop: DesktopSection,
    pub search: SearchSection,
    pub fallback: FallbackSection,
    pub resolver: ResolverSection,
}

impl AgentConfig {
    /// Load from an optional TOML file and the process environment.
    ///
    /// Not validated yet; call [`AgentConfig::validate`] after CLI overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override fields from `LOCATE_*` variables resolved through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("LOCATE_ORACLE_URL") {
            self.oracle.url = url;
        }
        if let Some(model) = lookup("LOCATE_ORACLE_MODEL") {
            self.oracle.model = model;
        }
        if let Some(key) = lookup("LOCATE_ORACLE_API_KEY") {
            self.oracle.api_key = Some(key);
        }
        if let Some(blob) = lookup("LOCATE_LAYOUT_BLOB") {
            self.desktop.blob_path = Some(PathBuf::from(blob));
        }
        if let Some(dir) = lookup("LOCATE_DESKTOP_DIR") {
            self.desktop.desktop_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn validate(&self) -> Result<()> {
        let steps = self.resolver.max_steps;
        if !(1..=MAX_STEPS_LIMIT).contains(&steps) {
            bail!("resolver.max_steps must be between 1 and {MAX_STEPS_LIMIT}, got {steps}");
        }
        if self.oracle.url.trim().is_empty() {
            bail!("oracle.url must not be empty");
        }
        if self.oracle.model.trim().is_empty() {
            bail!("oracle.model must not be empty");
        }
        if self.oracle.timeout_secs == 0 || self.search.timeout_secs == 0 {
            bail!("timeouts must be at least one second");
        }
        if self.search.max_results == 0 {
            bail!("search.max_results must be at least 1");
        }
        let d = &self.desktop;
        if d.cell_width == 0 || d.cell_height == 0 {
            bail!(
                "desktop cell size must be positive, got {}x{}",
                d.cell_width,
                d.cell_height
            );
        }
        Ok(())
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            max_steps: self.resolver.max_steps,
            max_results: self.search.max_results,
            refine_task: self.resolver.refine_task,
        }
    }

    pub fn geometry(&self) -> IconGeometry {
        IconGeometry {
            cell_width: self.desktop.cell_width,
            cell_height: self.desktop.cell_height,
            vertical_gap: self.desktop.vertical_gap,
        }
    }

    /// Configured desktop directory, else the platform's, else `~/Desktop`.
    pub fn desktop_dir(&self) -> PathBuf {
        self.desktop
            .desktop_dir
            .clone()
            .or_else(dirs::desktop_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join("Desktop")))
            .unwrap_or_else(|| PathBuf::from("Desktop"))
    }

    /// Configured index roots, else the home directory.
    pub fn search_roots(&self) -> Vec<PathBuf> {
        if !self.search.roots.is_empty() {
            return self.search.roots.clone();
        }
        dirs::home_dir().into_iter().collect()
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search.timeout_secs)
    }
}
