//! Per-cell wall sampling from region styles
//!
//! Every cell draws its wall type independently from the categorical
//! distribution of its region's style. No path between open cells is
//! guaranteed, so a maze may contain unreachable pockets.

use crate::generation::GenerationError;
use crate::regions::{RegionMap, RegionStyle};
use maze_shared::{Maze, WallType};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Probabilities over `WallType::ALL` order:
/// None, Horizontal, Vertical, DiagForward, DiagBackward.
pub fn wall_distribution(style: RegionStyle) -> [f64; 5] {
    match style {
        RegionStyle::Normal => [0.2, 0.2, 0.2, 0.2, 0.2],
        RegionStyle::Dense => [0.0, 0.25, 0.25, 0.25, 0.25],
        RegionStyle::Wide => [0.5, 0.25, 0.25, 0.0, 0.0],
        RegionStyle::Long => [0.1, 0.9, 0.0, 0.0, 0.0],
        RegionStyle::Open => [1.0, 0.0, 0.0, 0.0, 0.0],
        RegionStyle::ExtraWide => [0.7, 0.15, 0.15, 0.0, 0.0],
    }
}

pub struct MazeBuilder {
    /// Indexed by `RegionStyle as usize`.
    samplers: Vec<WeightedIndex<f64>>,
}

impl MazeBuilder {
    pub fn new() -> Result<Self, GenerationError> {
        let samplers = RegionStyle::ALL
            .iter()
            .map(|style| WeightedIndex::new(wall_distribution(*style)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { samplers })
    }

    pub fn sample_wall<R: Rng + ?Sized>(&self, style: RegionStyle, rng: &mut R) -> WallType {
        WallType::ALL[self.samplers[style as usize].sample(rng)]
    }

    /// Draws one wall per cell, row-major.
    pub fn build<R: Rng + ?Sized>(
        &self,
        regions: &RegionMap,
        rng: &mut R,
    ) -> Result<Maze, GenerationError> {
        let width = regions.width();
        let height = regions.height();

        let mut cells = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                cells.push(self.sample_wall(regions.style_at(x, y), rng));
            }
        }

        Ok(Maze::from_cells(width, height, cells)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn frequencies(builder: &MazeBuilder, style: RegionStyle, samples: usize) -> [f64; 5] {
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = [0usize; 5];
        for _ in 0..samples {
            let wall = builder.sample_wall(style, &mut rng);
            let index = WallType::ALL.iter().position(|w| *w == wall).unwrap();
            counts[index] += 1;
        }
        counts.map(|c| c as f64 / samples as f64)
    }

    #[test]
    fn test_distributions_sum_to_one() {
        for style in RegionStyle::ALL {
            let total: f64 = wall_distribution(style).iter().sum();
            assert_approx_eq!(total, 1.0, 1e-12);
        }
    }

    #[test]
    fn test_normal_style_converges_to_uniform() {
        let builder = MazeBuilder::new().unwrap();
        let observed = frequencies(&builder, RegionStyle::Normal, 100_000);
        for freq in observed {
            assert_approx_eq!(freq, 0.2, 0.01);
        }
    }

    #[test]
    fn test_every_style_matches_its_distribution() {
        let builder = MazeBuilder::new().unwrap();
        for style in RegionStyle::ALL {
            let expected = wall_distribution(style);
            let observed = frequencies(&builder, style, 50_000);
            for (e, o) in expected.iter().zip(observed.iter()) {
                assert_approx_eq!(*e, *o, 0.015);
                if *e == 0.0 {
                    assert_eq!(*o, 0.0, "{:?} produced an impossible wall", style);
                }
            }
        }
    }

    #[test]
    fn test_open_region_has_no_walls() {
        let builder = MazeBuilder::new().unwrap();
        let regions = RegionMap::uniform(40, 40, RegionStyle::Open);
        let mut rng = StdRng::seed_from_u64(5);
        let maze = builder.build(&regions, &mut rng).unwrap();

        assert_eq!(maze.open_cell_count(), 40 * 40);
    }

    #[test]
    fn test_dense_region_has_no_open_cells() {
        let builder = MazeBuilder::new().unwrap();
        let regions = RegionMap::uniform(30, 30, RegionStyle::Dense);
        let mut rng = StdRng::seed_from_u64(6);
        let maze = builder.build(&regions, &mut rng).unwrap();

        assert_eq!(maze.open_cell_count(), 0);
    }

    #[test]
    fn test_build_keeps_dimensions() {
        let builder = MazeBuilder::new().unwrap();
        let regions = RegionMap::uniform(7, 3, RegionStyle::Normal);
        let mut rng = StdRng::seed_from_u64(8);
        let maze = builder.build(&regions, &mut rng).unwrap();

        assert_eq!(maze.width(), 7);
        assert_eq!(maze.height(), 3);
    }
}
