//! `nse`: a CLI wrapper around the engine, standing in for the host
//! scanner binary that would otherwise embed it (`spec.md` §1).

mod demo_host_api;
mod fixture;
mod tracing_init;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use demo_host_api::DemoHostApi;
use nse_config::ScanConfig;

#[derive(Parser)]
#[command(name = "nse", about = "Network Scripting Engine demo runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scan against a demo host fixture using a scan config.
    Scan {
        /// Path to the scan config TOML file.
        #[arg(short, long)]
        config: PathBuf,
        /// Path to the demo hosts/ports fixture TOML file.
        #[arg(short = 'H', long)]
        hosts: PathBuf,
        /// Extra rules beyond those listed in the config file.
        #[arg(short, long)]
        rule: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            config,
            hosts,
            rule,
        } => {
            let config_path = config
                .canonicalize()
                .with_context(|| format!("config path '{}'", config.display()))?;
            let mut scan_config = ScanConfig::load(&config_path)
                .map_err(|e| anyhow::anyhow!("loading scan config: {e}"))?;

            tracing_init::init_tracing(scan_config.verbosity, scan_config.debugging)?;

            let base_dir = config_path
                .parent()
                .expect("config path must have a parent directory");
            if scan_config.script_dbpath.is_relative() {
                scan_config.script_dbpath = base_dir.join(&scan_config.script_dbpath);
            }
            let script_dir = base_dir.join("scripts");

            let hosts = fixture::load_hosts(&hosts)
                .with_context(|| format!("loading host fixture '{}'", hosts.display()))?;

            let mut rules = scan_config.rules.clone();
            rules.extend(rule);

            let api = DemoHostApi::new(scan_config, script_dir);

            nse_runtime::run_scan(&rules, &hosts, &api)
                .await
                .map_err(|e| anyhow::anyhow!("scan failed: {e}"))?;
        }
    }

    Ok(())
}
