//! Immutable maze grid and chunk extraction
//!
//! A [`Maze`] is built once and never mutated afterwards: it exposes no
//! `&mut self` methods and its cell storage is private, so sharing it behind
//! an `Arc` across connection handlers needs no locking. A [`Chunk`] is an
//! owned copy of a clamped rectangular window of the maze.

use crate::{CellPos, WallType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MazeError {
    #[error("maze dimensions {width}x{height} expect {expected} cells, got {actual}")]
    CellCountMismatch {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },
    #[error("maze dimensions {width}x{height} overflow the cell count")]
    DimensionsTooLarge { width: usize, height: usize },
}

/// Wire form of a maze, validated on the way in.
#[derive(Deserialize)]
struct RawMaze {
    width: usize,
    height: usize,
    cells: Vec<WallType>,
}

impl TryFrom<RawMaze> for Maze {
    type Error = MazeError;

    fn try_from(raw: RawMaze) -> Result<Self, Self::Error> {
        Maze::from_cells(raw.width, raw.height, raw.cells)
    }
}

/// Row-major grid of wall types with fixed dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMaze")]
pub struct Maze {
    width: usize,
    height: usize,
    cells: Vec<WallType>,
}

impl Maze {
    pub fn from_cells(width: usize, height: usize, cells: Vec<WallType>) -> Result<Self, MazeError> {
        let expected = width
            .checked_mul(height)
            .ok_or(MazeError::DimensionsTooLarge { width, height })?;
        if cells.len() != expected {
            return Err(MazeError::CellCountMismatch {
                width,
                height,
                expected,
                actual: cells.len(),
            });
        }

        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// A maze where every cell holds the same wall type.
    pub fn filled(width: usize, height: usize, wall: WallType) -> Self {
        Self {
            width,
            height,
            cells: vec![wall; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn contains(&self, pos: CellPos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < self.width && (pos.y as usize) < self.height
    }

    /// Returns the cell at `pos`, or `None` outside the grid.
    pub fn get(&self, pos: CellPos) -> Option<WallType> {
        if !self.contains(pos) {
            return None;
        }
        self.cells
            .get(pos.y as usize * self.width + pos.x as usize)
            .copied()
    }

    pub fn is_open(&self, pos: CellPos) -> bool {
        self.get(pos).is_some_and(WallType::is_open)
    }

    /// Row `y`; callers keep `y < height`.
    fn row(&self, y: usize) -> &[WallType] {
        &self.cells[y * self.width..(y + 1) * self.width]
    }

    pub fn open_cell_count(&self) -> usize {
        self.cells.iter().filter(|wall| wall.is_open()).count()
    }

    /// Copies the window `[center - size/2, center + size/2)` on each axis,
    /// clamped independently to the maze bounds.
    ///
    /// Centers outside the maze never fail: the window is clamped, and a
    /// window that falls entirely outside the grid yields an empty chunk
    /// whose origin sits on the nearest edge.
    pub fn extract_chunk(&self, center: CellPos, chunk_size: usize) -> Chunk {
        let half = (chunk_size / 2) as i64;
        let (min_x, max_x) = clamp_span(center.x as i64, half, self.width);
        let (min_y, max_y) = clamp_span(center.y as i64, half, self.height);

        let rows = if min_x == max_x {
            Vec::new()
        } else {
            (min_y..max_y)
                .map(|y| self.row(y)[min_x..max_x].to_vec())
                .collect()
        };

        Chunk {
            origin: CellPos::new(min_x as i32, min_y as i32),
            rows,
        }
    }
}

fn clamp_span(center: i64, half: i64, dimension: usize) -> (usize, usize) {
    let limit = dimension as i64;
    let min = (center - half).clamp(0, limit);
    let max = (center + half).clamp(0, limit);
    (min as usize, max as usize)
}

/// Owned rectangular copy of part of a maze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Maze coordinate of `rows[0][0]`.
    pub origin: CellPos,
    pub rows: Vec<Vec<WallType>>,
}

impl Chunk {
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// True when `pos` (maze coordinates) lies inside this chunk.
    pub fn contains(&self, pos: CellPos) -> bool {
        let dx = pos.x - self.origin.x;
        let dy = pos.y - self.origin.y;
        dx >= 0 && dy >= 0 && (dx as usize) < self.width() && (dy as usize) < self.height()
    }

    /// Iterates every cell with its maze coordinate.
    pub fn cells(&self) -> impl Iterator<Item = (CellPos, WallType)> + '_ {
        self.rows.iter().enumerate().flat_map(move |(dy, row)| {
            row.iter().enumerate().map(move |(dx, wall)| {
                (
                    CellPos::new(self.origin.x + dx as i32, self.origin.y + dy as i32),
                    *wall,
                )
            })
        })
    }
}
