//! locate-agent: turns a spoken-style request into a file path.
//!
//! Wires the `resolution` engine to its host: TOML/env configuration, the
//! layout blob on disk, an HTTP judgment oracle and the three search tiers.

pub mod config;
pub mod desktop;
pub mod ladder;
pub mod oracle_client;
pub mod prompts;
pub mod telemetry;

pub use config::AgentConfig;
pub use oracle_client::HttpOracle;
