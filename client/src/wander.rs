//! Headless random walk through the maze
//!
//! The wanderer keeps heading in one of eight directions until a wall stops
//! it, then picks a new one. Movement is checked locally against the held
//! chunk; the server only ever hears about cell changes.

use crate::collision::CollisionResolver;
use crate::game::ClientGameState;
use crate::network::Client;
use log::{debug, info};
use maze_shared::{CellPos, ProtocolError, SyncMode, DEFAULT_CHUNK_SIZE, PLAYER_SPEED};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

const DIRECTIONS: [(f32, f32); 8] = [
    (1.0, 0.0),
    (-1.0, 0.0),
    (0.0, 1.0),
    (0.0, -1.0),
    (1.0, 1.0),
    (1.0, -1.0),
    (-1.0, 1.0),
    (-1.0, -1.0),
];

#[derive(Debug, Clone)]
pub struct WanderConfig {
    pub mode: SyncMode,
    pub steps: u64,
    pub step_interval: Duration,
    /// Chunk edge cut locally from broadcast snapshots
    pub chunk_size: usize,
    pub speed: f32,
    pub resolver: CollisionResolver,
    pub seed: Option<u64>,
}

impl Default for WanderConfig {
    fn default() -> Self {
        Self {
            mode: SyncMode::Pull,
            steps: 1000,
            step_interval: Duration::from_millis(16),
            chunk_size: DEFAULT_CHUNK_SIZE,
            speed: PLAYER_SPEED,
            resolver: CollisionResolver::default(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WanderStats {
    pub spawn: CellPos,
    pub final_cell: CellPos,
    pub accepted: u64,
    pub blocked: u64,
    pub cells_visited: u64,
}

/// Joins as `identity` and walks for `config.steps` ticks.
pub async fn wander(
    client: &mut Client,
    identity: &str,
    config: &WanderConfig,
) -> Result<WanderStats, ProtocolError> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let spawn = client.request_spawn(identity).await?;
    let mut state = ClientGameState::new(identity, spawn, config.resolver, config.chunk_size);

    match config.mode {
        SyncMode::Pull => {
            let chunk = client.request_chunk_at(spawn).await?;
            state.apply_chunk(chunk);
        }
        SyncMode::Broadcast => {
            // Joining triggers a snapshot to everyone, us included
            let (positions, maze) = client.next_snapshot().await?;
            state.apply_snapshot(positions, maze);
        }
    }

    let mut stats = WanderStats {
        spawn,
        final_cell: spawn,
        accepted: 0,
        blocked: 0,
        cells_visited: 1,
    };

    let mut ticker = interval(config.step_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut heading = DIRECTIONS[rng.gen_range(0..DIRECTIONS.len())];

    for _ in 0..config.steps {
        ticker.tick().await;

        let previous = state.cell();
        if !state.try_move(heading.0 * config.speed, heading.1 * config.speed) {
            stats.blocked += 1;
            heading = DIRECTIONS[rng.gen_range(0..DIRECTIONS.len())];
            continue;
        }
        stats.accepted += 1;

        let cell = state.cell();
        if cell == previous {
            continue;
        }
        stats.cells_visited += 1;
        debug!("{} entered {}", identity, cell);

        match config.mode {
            SyncMode::Pull => {
                let chunk = client.request_chunk_at(cell).await?;
                state.apply_chunk(chunk);
            }
            SyncMode::Broadcast => {
                client.send_position(cell).await?;
                // Snapshots from other players may arrive first
                loop {
                    let (positions, maze) = client.next_snapshot().await?;
                    let confirmed = positions.get(identity) == Some(&cell);
                    state.apply_snapshot(positions, maze);
                    if confirmed {
                        break;
                    }
                }
            }
        }
    }

    stats.final_cell = state.cell();
    info!(
        "{} finished at {}: {} moves, {} blocked, {} cell changes",
        identity, stats.final_cell, stats.accepted, stats.blocked, stats.cells_visited
    );
    Ok(stats)
}
