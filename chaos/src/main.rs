//! Main entry point for the chaos harness binary

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use chaos::{services, HarnessConfig, RunOutcome};
use shared::{actor_info, logging, Actor, LogLevel};

/// Kill and restart fleet instances at random while a load generator runs
#[derive(Parser, Debug)]
#[command(name = "chaos")]
#[command(about = "Chaos test: random instance kills under load, with guaranteed teardown")]
struct Args {
    /// JSON configuration file overlaid on the built-in defaults
    #[arg(long, env = "CHAOS_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CHAOS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Number of chaos rounds
    #[arg(long, env = "CHAOS_ROUNDS")]
    rounds: Option<u32>,

    /// Seed for victim selection (random when omitted)
    #[arg(long, env = "CHAOS_SEED")]
    seed: Option<u64>,

    /// Directory for per-port instance logs
    #[arg(long, env = "CHAOS_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Total requests issued by the load generator
    #[arg(long, env = "CHAOS_REQUESTS")]
    requests: Option<u64>,

    /// Load generator concurrency
    #[arg(long, env = "CHAOS_CONCURRENCY")]
    concurrency: Option<u32>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn resolve_config(&self) -> anyhow::Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::from_json_file(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => HarnessConfig::default(),
        };

        if let Some(level) = &self.log_level {
            config.log_level = level.parse::<LogLevel>()?;
        }
        if let Some(rounds) = self.rounds {
            config.chaos.rounds = rounds;
        }
        if self.seed.is_some() {
            config.chaos.seed = self.seed;
        }
        if let Some(dir) = &self.log_dir {
            config.instances.log_dir = dir.clone();
        }
        if let Some(requests) = self.requests {
            config.load.requests = requests;
        }
        if let Some(concurrency) = self.concurrency {
            config.load.concurrency = concurrency;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    let args = Args::parse();
    let config = args.resolve_config()?;

    if args.print_config {
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }

    logging::init_tracing_with_level(config.log_level)?;

    let coordinator = services::real_coordinator(config);
    actor_info!(Actor::Coordinator, "Run id {}", coordinator.run_id());

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            logging::log_error(Actor::Coordinator, "Ctrl+C handler unavailable", &e);
            std::future::pending::<()>().await;
        }
    };

    let report = coordinator.run(interrupt).await?;
    if report.outcome == RunOutcome::Interrupted {
        actor_info!(Actor::Coordinator, "Run interrupted, cleanup complete");
    }
    Ok(())
}
