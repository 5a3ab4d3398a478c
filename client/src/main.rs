use clap::Parser;
use log::{info, warn};
use maze_client::collision::CollisionResolver;
use maze_client::network::Client;
use maze_client::wander::{wander, WanderConfig};
use maze_shared::{SyncMode, DEFAULT_CHUNK_SIZE, GRID_UNIT, PLAYER_RADIUS, PLAYER_SPEED};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:5555")]
    server: String,

    /// Identity to join with; random when omitted
    #[arg(short, long)]
    identity: Option<String>,

    /// Sync mode the server was started with
    #[arg(short, long, default_value_t = SyncMode::Pull)]
    mode: SyncMode,

    /// Number of movement ticks before leaving
    #[arg(long, default_value = "1000")]
    steps: u64,

    /// Milliseconds between movement ticks
    #[arg(long, default_value = "16")]
    interval: u64,

    /// Chunk edge cut from broadcast snapshots
    #[arg(short, long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Movement per tick in world units
    #[arg(long, default_value_t = PLAYER_SPEED)]
    speed: f32,

    /// Seed for the walk; random when omitted
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let identity = args
        .identity
        .unwrap_or_else(|| format!("wanderer-{:04x}", rand::random::<u16>()));

    info!("Starting client {} in {} mode", identity, args.mode);
    info!("Connecting to: {}", args.server);

    let config = WanderConfig {
        mode: args.mode,
        steps: args.steps,
        step_interval: Duration::from_millis(args.interval.max(1)),
        chunk_size: args.chunk_size,
        speed: args.speed,
        resolver: CollisionResolver::new(PLAYER_RADIUS, GRID_UNIT),
        seed: args.seed,
    };

    let mut client = Client::connect(args.server.as_str()).await?;

    tokio::select! {
        result = wander(&mut client, &identity, &config) => {
            let stats = result?;
            info!(
                "Walked from {} to {} visiting {} cells",
                stats.spawn, stats.final_cell, stats.cells_visited
            );
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, leaving the maze");
        }
    }

    Ok(())
}
