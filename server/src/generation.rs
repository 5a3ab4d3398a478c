//! One-shot maze generation pipeline and spawn assignment
//!
//! NoiseField -> RegionMap -> MazeBuilder runs once, synchronously, before
//! the server accepts connections. A single master seed feeds the noise
//! permutation and the random stream used for region styles and wall draws,
//! so pinning the seed reproduces the exact maze.

use crate::maze_builder::MazeBuilder;
use crate::noise_field::{NoiseField, NoiseParams};
use crate::regions::{RegionMap, DEFAULT_THRESHOLD};
use log::{info, warn};
use maze_shared::{CellPos, Maze, MazeError};
use rand::distributions::WeightedError;
use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;

/// Random attempts before spawn selection falls back to a full scan.
const MAX_SPAWN_ATTEMPTS: usize = 4096;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("maze dimensions must be non-zero, got {width}x{height}")]
    EmptyMaze { width: usize, height: usize },
    #[error("invalid noise parameters: {0}")]
    InvalidNoise(String),
    #[error("invalid wall distribution: {0}")]
    InvalidDistribution(#[from] WeightedError),
    #[error(transparent)]
    Maze(#[from] MazeError),
    #[error("generated maze has no walkable cell")]
    NoWalkableCell,
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub width: usize,
    pub height: usize,
    /// `noise.seed` is replaced by a value derived from the master seed.
    pub noise: NoiseParams,
    pub threshold: f64,
    /// Master seed; `None` draws a fresh one.
    pub seed: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            width: 200,
            height: 200,
            noise: NoiseParams::default(),
            threshold: DEFAULT_THRESHOLD,
            seed: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedMaze {
    pub maze: Maze,
    pub seed: u64,
    pub region_count: usize,
}

pub fn generate(config: &GenerationConfig) -> Result<GeneratedMaze, GenerationError> {
    if config.width == 0 || config.height == 0 {
        return Err(GenerationError::EmptyMaze {
            width: config.width,
            height: config.height,
        });
    }

    let seed = config.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);

    let noise = NoiseParams {
        seed: noise_seed(seed),
        ..config.noise.clone()
    };
    let field = NoiseField::generate(config.width, config.height, &noise)?;
    let regions = RegionMap::partition(&field, config.threshold, &mut rng);
    let maze = MazeBuilder::new()?.build(&regions, &mut rng)?;

    let open = maze.open_cell_count();
    if open == 0 {
        return Err(GenerationError::NoWalkableCell);
    }

    info!(
        "Generated {}x{} maze (seed {}): {} regions, {:.1}% open cells",
        maze.width(),
        maze.height(),
        seed,
        regions.region_count(),
        100.0 * open as f64 / (maze.width() * maze.height()) as f64
    );

    Ok(GeneratedMaze {
        maze,
        seed,
        region_count: regions.region_count(),
    })
}

/// Folds the 64-bit master seed into the 32-bit noise seed.
fn noise_seed(seed: u64) -> u32 {
    (seed ^ (seed >> 32)) as u32
}

/// Picks a uniformly random open cell.
///
/// Random attempts are tried first; if they all land on walls the open cells
/// are enumerated and one is chosen directly. Returns `None` only for a maze
/// with no open cell at all.
pub fn random_spawn<R: Rng + ?Sized>(maze: &Maze, rng: &mut R) -> Option<CellPos> {
    if maze.width() == 0 || maze.height() == 0 {
        return None;
    }

    for _ in 0..MAX_SPAWN_ATTEMPTS {
        let pos = CellPos::new(
            rng.gen_range(0..maze.width()) as i32,
            rng.gen_range(0..maze.height()) as i32,
        );
        if maze.is_open(pos) {
            return Some(pos);
        }
    }

    warn!("Spawn probing exhausted, scanning for open cells");
    (0..maze.height())
        .flat_map(|y| (0..maze.width()).map(move |x| CellPos::new(x as i32, y as i32)))
        .filter(|pos| maze.is_open(*pos))
        .choose(rng)
}
