use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use qfleet_core::{LocalOracle, RandomOracle, SessionSnapshot};
use qfleet_host::config::{HostConfig, OracleConfig, API_KEY_ENV};
use qfleet_host::game::{run_demo, run_interactive};
use qfleet_host::remote_oracle::OracleServer;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Grid-guessing game with collapsing dual-location pieces", long_about = None)]
struct CommandArgs {
    /// JSON config file (game settings and oracle backend)
    #[clap(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Debug, Clone, Default, clap::Args)]
struct OracleArg {
    /// Use a remote oracle at this address instead of the configured one
    #[clap(long)]
    remote: Option<String>,
    /// API key for the remote oracle (defaults to $QFLEET_API_KEY)
    #[clap(long)]
    api_key: Option<String>,
    /// Seed for the local oracle
    #[clap(long)]
    oracle_seed: Option<u64>,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Place a fleet and defend it against the system's shots
    Play {
        #[clap(flatten)]
        oracle: OracleArg,
        /// Write the final session snapshot to this file
        #[clap(long)]
        save: Option<PathBuf>,
    },
    /// Random fleet, automatic shots until the session ends
    Demo {
        #[clap(flatten)]
        oracle: OracleArg,
        #[clap(long, default_value_t = 0)]
        seed: u64,
        #[clap(long)]
        save: Option<PathBuf>,
    },
    /// Serve collapse draws to remote clients
    ServeOracle {
        #[clap(long, default_value = "127.0.0.1:7878")]
        listen: String,
        #[clap(long)]
        api_key: Option<String>,
        #[clap(long)]
        seed: Option<u64>,
        /// Artificial delay before each answer
        #[clap(long, default_value_t = 0)]
        latency_ms: u64,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn oracle_config(base: &OracleConfig, arg: &OracleArg) -> OracleConfig {
    match (&arg.remote, arg.oracle_seed) {
        (Some(address), _) => OracleConfig::remote(address.clone(), arg.api_key.clone().unwrap_or_default()),
        (None, Some(seed)) => OracleConfig::Local { seed: Some(seed) },
        (None, None) => match (base, &arg.api_key) {
            (OracleConfig::Remote { address, timeout_secs, .. }, Some(key)) => {
                OracleConfig::Remote { address: address.clone(), api_key: key.clone(), timeout_secs: *timeout_secs }
            }
            _ => base.clone(),
        },
    }
}

fn save_snapshot(path: &Path, snapshot: &SessionSnapshot) -> anyhow::Result<()> {
    let digest = snapshot.commit().context("hashing snapshot")?;
    let json = serde_json::json!({ "commit": hex::encode(digest), "snapshot": snapshot });
    std::fs::write(path, serde_json::to_string_pretty(&json)?).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), commit = %hex::encode(digest), "snapshot saved");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = CommandArgs::parse();
    let config = HostConfig::load_or_default(args.config.as_deref())?;

    match args.mode.unwrap_or(Mode::Play { oracle: OracleArg::default(), save: None }) {
        Mode::Play { oracle, save } => {
            let oracle = oracle_config(&config.oracle, &oracle).build()?;
            let snapshot = run_interactive(&config.game, oracle)?;
            if let Some(path) = save {
                save_snapshot(&path, &snapshot)?;
            }
        }
        Mode::Demo { oracle, seed, save } => {
            let oracle = oracle_config(&config.oracle, &oracle).build()?;
            let snapshot = run_demo(&config.game, oracle, seed)?;
            if let Some(path) = save {
                save_snapshot(&path, &snapshot)?;
            }
        }
        Mode::ServeOracle { listen, api_key, seed, latency_ms } => {
            let key = api_key
                .or_else(|| std::env::var(API_KEY_ENV).ok())
                .with_context(|| format!("serve-oracle needs --api-key or {API_KEY_ENV}"))?;
            let oracle: Arc<dyn RandomOracle> = match seed {
                Some(seed) => Arc::new(LocalOracle::seeded(seed)),
                None => Arc::new(LocalOracle::from_entropy()),
            };
            OracleServer::bind(&listen, key.into_bytes(), oracle)?
                .with_latency(Duration::from_millis(latency_ms))
                .serve()?;
        }
    }
    Ok(())
}
