//! Tier 2 hands the query to the operating system's own search UI.
//!
//! Fire-and-forget: the launched process is reaped by a detached task and
//! nothing it finds flows back, so this tier always returns an empty
//! candidate list.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{SearchItem, SearchTier};
use crate::error::TierError;

/// Placeholder replaced by the search pattern in each template word.
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// Launches a configured OS search command.
#[derive(Debug, Clone, Default)]
pub struct OsSearchTier {
    argv: Vec<String>,
}

impl OsSearchTier {
    /// Parse a shell-words command template such as
    /// `explorer.exe "search-ms:query={query}"`.
    ///
    /// An empty or unparsable template yields a tier that launches nothing.
    pub fn new(template: &str) -> Self {
        match shlex::split(template) {
            Some(argv) => Self { argv },
            None => {
                warn!(%template, "Unbalanced quoting in OS search command, fallback disabled");
                Self::default()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.argv.is_empty()
    }

    /// The command line for `query`, placeholder substituted.
    pub fn render_argv(&self, query: &str) -> Vec<String> {
        self.argv
            .iter()
            .map(|word| word.replace(QUERY_PLACEHOLDER, query))
            .collect()
    }

    fn launch(&self, query: &str) {
        let argv = self.render_argv(query);
        let Some((program, args)) = argv.split_first() else {
            debug!("No OS search command configured");
            return;
        };

        let spawned = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                warn!(%program, error = %e, "OS search launch failed");
                return;
            }
        };
        info!(%program, pid = child.id(), %query, "OS search launched");

        let program = program.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => debug!(%program, %status, "OS search exited"),
                Err(e) => warn!(%program, error = %e, "Failed to reap OS search"),
            }
        });
    }
}

#[async_trait]
impl SearchTier for OsSearchTier {
    fn name(&self) -> &str {
        "os-search"
    }

    async fn search(
        &self,
        pattern: &str,
        _max_results: usize,
    ) -> Result<Vec<SearchItem>, TierError> {
        self.launch(pattern);
        Ok(Vec::new())
    }
}
