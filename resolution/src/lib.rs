//! Resolution Library
//!
//! Turns a loose request ("open the project-2 report") into one concrete path:
//! - Decodes the desktop icon layout blob into named, positioned icons
//! - Searches a ladder of tiers: desktop snapshot, indexed file search, OS search
//! - Lets a judgment oracle confirm a candidate or propose a broader pattern
//!
//! # Example
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use resolution::{JudgmentOracle, Resolver, ResolverConfig, SearchTier};
//! # async fn run(tiers: Vec<Arc<dyn SearchTier>>, oracle: Arc<dyn JudgmentOracle>)
//! #     -> Result<(), resolution::ResolveError> {
//! let resolver = Resolver::new(tiers, oracle, ResolverConfig::default())?;
//! let resolution = resolver.resolve("open the project-2 report").await?;
//! match resolution.target_path() {
//!     Some(path) => println!("{}", path.display()),
//!     None => eprintln!("no match found"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod escalation;
pub mod layout;
pub mod oracle;
pub mod search;

pub use error::{DecodeError, OracleError, ResolveError, TierError};
pub use escalation::{
    Resolution, ResolutionOutcome, ResolutionPhase, ResolutionState, Resolver, ResolverConfig,
};
pub use layout::{build_mapping, decode, to_pixel, DesktopIcon, GridPosition, IconGeometry};
pub use oracle::{JudgmentOracle, JudgmentVerdict};
pub use search::{
    DesktopSnapshotTier, IndexedSearchTier, OsSearchTier, SearchItem, SearchKind, SearchTier,
};
