use clap::Parser;
use log::{error, info};
use maze_server::generation::{generate, GenerationConfig};
use maze_server::network::{Server, ServerConfig, DEFAULT_OUTBOUND_CAPACITY};
use maze_server::noise_field::NoiseParams;
use maze_shared::{SyncMode, DEFAULT_CHUNK_SIZE, DEFAULT_PORT};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Synchronization policy: pull (chunk replies) or broadcast (snapshots)
    #[arg(short, long, default_value_t = SyncMode::Pull)]
    mode: SyncMode,

    /// Maze width in cells
    #[arg(long, default_value = "200")]
    width: usize,

    /// Maze height in cells
    #[arg(long, default_value = "200")]
    height: usize,

    /// Edge length of chunk replies in cells
    #[arg(short, long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Master generation seed; random when omitted
    #[arg(short, long)]
    seed: Option<u64>,

    /// Noise scale (cells per noise unit)
    #[arg(long, default_value = "10.0")]
    scale: f64,

    /// Noise octaves
    #[arg(long, default_value = "2")]
    octaves: u32,

    /// Amplitude falloff per octave
    #[arg(long, default_value = "0.5")]
    persistence: f64,

    /// Frequency growth per octave
    #[arg(long, default_value = "2.0")]
    lacunarity: f64,

    /// Region mask threshold on the normalized noise
    #[arg(long, default_value = "0.5")]
    threshold: f64,

    /// Disconnect clients silent for this many seconds (0 disables)
    #[arg(long, default_value = "0")]
    idle_timeout: u64,

    /// Frames queued per client before it is dropped as unresponsive
    #[arg(long, default_value_t = DEFAULT_OUTBOUND_CAPACITY)]
    outbound_capacity: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let generation = GenerationConfig {
        width: args.width,
        height: args.height,
        noise: NoiseParams {
            scale: args.scale,
            octaves: args.octaves,
            persistence: args.persistence,
            lacunarity: args.lacunarity,
            ..NoiseParams::default()
        },
        threshold: args.threshold,
        seed: args.seed,
    };

    // Fails before binding if no usable maze came out
    let generated = generate(&generation)?;
    info!("Maze ready, replay with --seed {}", generated.seed);

    let config = ServerConfig {
        mode: args.mode,
        chunk_size: args.chunk_size,
        idle_timeout: (args.idle_timeout > 0).then(|| Duration::from_secs(args.idle_timeout)),
        outbound_capacity: args.outbound_capacity,
    };

    let address = format!("{}:{}", args.host, args.port);
    let server = Server::bind(&address, generated.maze, config).await?;

    server
        .run_until(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl+C, shutting down gracefully..."),
                Err(e) => {
                    error!("Unable to listen for Ctrl+C: {}", e);
                    std::future::pending::<()>().await
                }
            }
        })
        .await?;

    Ok(())
}
