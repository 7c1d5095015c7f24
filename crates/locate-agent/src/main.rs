use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use locate_agent::config::AgentConfig;
use locate_agent::oracle_client::HttpOracle;
use locate_agent::{desktop, ladder, telemetry};
use resolution::{ResolutionOutcome, Resolver, SearchKind, SearchTier};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a request to a path and print it
    Resolve {
        /// The request, e.g. "open the project-2 report"
        #[arg(required = true, num_args = 1..)]
        task: Vec<String>,

        /// Tier rounds before giving up (1-3)
        #[arg(long)]
        max_steps: Option<usize>,

        /// Let the oracle clean up the request first
        #[arg(long, default_value_t = false)]
        refine: bool,

        /// Write the resolution report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Print the desktop icons decoded from the layout blob
    Layout {
        /// Skip the position region
        #[arg(long, default_value_t = false)]
        no_positions: bool,
    },

    /// Run the file-index tier alone
    Search {
        /// Regular expression (or extension list with --kind extension)
        pattern: String,

        #[arg(long)]
        kind: Option<SearchKind>,

        #[arg(long)]
        max_results: Option<usize>,
    },
}

const EXIT_NOT_FOUND: u8 = 1;
const EXIT_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = AgentConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Resolve {
            task,
            max_steps,
            refine,
            report,
        } => {
            if let Some(steps) = max_steps {
                config.resolver.max_steps = steps;
            }
            config.resolver.refine_task |= refine;
            config.validate()?;
            resolve(&config, &task.join(" "), report).await
        }
        Command::Layout { no_positions } => {
            config.validate()?;
            let rows = desktop::layout(&config, !no_positions)?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Search {
            pattern,
            kind,
            max_results,
        } => {
            if let Some(kind) = kind {
                config.search.kind = kind;
            }
            if let Some(n) = max_results {
                config.search.max_results = n;
            }
            config.validate()?;
            let tier = ladder::indexed_tier(&config);
            let items = tier
                .search(&pattern, config.search.max_results)
                .await
                .context("File index search failed")?;
            for item in &items {
                println!("{}", item.path.display());
            }
            Ok(if items.is_empty() {
                ExitCode::from(EXIT_NOT_FOUND)
            } else {
                ExitCode::SUCCESS
            })
        }
    }
}

async fn resolve(config: &AgentConfig, task: &str, report: Option<PathBuf>) -> Result<ExitCode> {
    let tiers = ladder::build_ladder(config)?;
    let oracle = Arc::new(HttpOracle::new(&config.oracle)?);
    info!(
        oracle = %oracle.endpoint(),
        model = %config.oracle.model,
        max_steps = config.resolver.max_steps,
        "locate-agent starting"
    );

    let resolver = Resolver::new(tiers, oracle, config.resolver_config())?;
    let resolution = match resolver.resolve(task).await {
        Ok(r) => r,
        Err(e) if e.is_retriable() => {
            return Err(e).context("Resolution failed (transient, retry may succeed)")
        }
        Err(e) => return Err(e).context("Resolution failed"),
    };

    if let Some(path) = report {
        if let Err(e) = telemetry::write_report(&resolution, &path) {
            warn!("{e:#}");
        }
    }

    match &resolution.outcome {
        ResolutionOutcome::Satisfied { target_path } => {
            println!("{}", target_path.display());
            Ok(ExitCode::SUCCESS)
        }
        ResolutionOutcome::Exhausted { .. } => {
            eprintln!("no match found");
            Ok(ExitCode::from(EXIT_NOT_FOUND))
        }
    }
}
