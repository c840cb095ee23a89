//! Stream relay server
//!
//! Run with: cargo run -p relay-server -- --config relay.toml
//!
//! Examples:
//!   cargo run -p relay-server -- --write-default-config
//!   cargo run -p relay-server -- --actor Mira@mines/deep --actor Alice@overworld --seed 7

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use dispatcher::{default_config_toml, ConfigStore, Dispatcher};
use relay_server::{console, start, ServerError, SimulatedWorld};

/// Stream relay server
#[derive(Parser, Debug)]
#[command(name = "stream-relay")]
#[command(about = "Turns stream notifications into in-game world commands")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "relay.toml")]
    config: PathBuf,

    /// Seed for random target selection
    #[arg(long)]
    seed: Option<u64>,

    /// Online actor for the simulated world, as NAME@WORLD (repeatable)
    #[arg(long = "actor", value_name = "NAME@WORLD", value_parser = parse_actor)]
    actors: Vec<(String, String)>,

    /// Write the default configuration to --config and exit
    #[arg(long)]
    write_default_config: bool,
}

fn parse_actor(value: &str) -> Result<(String, String), String> {
    match value.split_once('@') {
        Some((name, world)) if !name.is_empty() && !world.is_empty() => {
            Ok((name.to_string(), world.to_string()))
        }
        _ => Err(format!("expected NAME@WORLD, got {:?}", value)),
    }
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    if args.write_default_config {
        if args.config.exists() {
            eprintln!("{} already exists; not overwriting", args.config.display());
            return Ok(());
        }
        std::fs::write(&args.config, default_config_toml())?;
        println!("Wrote default configuration to {}", args.config.display());
        return Ok(());
    }

    let store = if args.config.exists() {
        ConfigStore::load(&args.config)?
    } else {
        tracing::warn!(
            path = %args.config.display(),
            "configuration file not found; using defaults"
        );
        ConfigStore::with_defaults_at(&args.config)
    };
    let store = Arc::new(store);
    let config = store.snapshot();

    let mut world = SimulatedWorld::new();
    if args.actors.is_empty() {
        if let Some(streamer) = &config.target.streamer_username {
            world.join(streamer.clone(), format!("{}spawn", config.spawn.mines_world_prefix));
        }
    }
    for (name, world_name) in &args.actors {
        world.join(name.clone(), world_name.clone());
    }

    let dispatcher = match args.seed {
        Some(seed) => Dispatcher::seeded(seed),
        None => Dispatcher::default(),
    };

    println!("Stream Relay");
    println!("============");
    println!("Config: {}", args.config.display());
    println!("Target mode: {}", config.target.mode);
    println!();

    let relay = start(Arc::clone(&store), world, dispatcher).await?;
    println!("Listening on http://{}", relay.addr());
    println!("POST /event, POST /eventsub, GET /health");
    println!("Type `help` for console commands.");

    // Detached; it ends with stdin or the process
    console::spawn_stdin(relay.queue(), Arc::clone(&store))?;

    tokio::signal::ctrl_c().await?;
    println!();

    let world = relay.shutdown().await?;
    println!("Hostiles spawned: {}", world.hostiles().len());
    println!("Broadcasts sent: {}", world.broadcasts().len());
    Ok(())
}
