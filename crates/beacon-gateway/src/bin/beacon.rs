//! Beacon binary
//!
//! Runs the Notifier and/or the Observer agent.
//!
//! # Usage
//! ```bash
//! beacon [--config beacon.json] [--role observer|notifier|both] [--verbose]
//! ```

use anyhow::Context;
use beacon_gateway::{runtime, BeaconConfig, RoleSelection};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Beacon - new-member alerts relayed to one recipient
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file; environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Which agents to run
    #[arg(long, value_enum, default_value_t = RoleSelection::Both)]
    role: RoleSelection,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    dotenvy::dotenv().ok();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(args.verbose)
        .init();

    let config = match &args.config {
        Some(path) => BeaconConfig::from_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => BeaconConfig::default(),
    }
    .apply_env()?;
    config.validate(args.role).context("invalid configuration")?;

    print_banner(&config, args.role);

    runtime::run(config, args.role)
        .await
        .context("failed to start")?;
    Ok(())
}

fn print_banner(config: &BeaconConfig, role: RoleSelection) {
    println!();
    println!("╔═══════════════════════════════════════════════════════════════╗");
    println!("║                                                               ║");
    println!("║              🔔  BEACON — NEW MEMBER ALERTS  🔔               ║");
    println!("║                                                               ║");
    println!("╚═══════════════════════════════════════════════════════════════╝");
    println!();
    println!("🔗 HTTP Endpoints");
    if role.runs_notifier() {
        println!("   ├─ {}  http://{}:{}", config.notifier.label, config.host, config.notifier.port);
        println!("   │   ├─ GET  /                    — Agent status");
        println!("   │   ├─ GET  /health              — Health check");
        println!("   │   └─ POST /send-notification   — Relay endpoint");
    }
    if role.runs_observer() {
        println!("   └─ {}  http://{}:{}", config.observer.label, config.host, config.observer.port);
        println!("       ├─ GET  /                    — Agent status");
        println!("       └─ GET  /health              — Health check");
        println!();
        println!("📡 Relay target: {}", config.relay_url);
    }
    println!();
    println!("─────────────────────────────────────────────────────────────────");
    println!("Press Ctrl+C to stop");
    println!();
}
