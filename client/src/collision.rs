//! Point-versus-wall collision against a held maze chunk
//!
//! Positions live in world units: cell `(x, y)` covers
//! `[x*G, (x+1)*G) x [y*G, (y+1)*G)` where `G` is the grid unit. Each wall
//! type is a line segment inside its cell, and a point is blocked when it
//! comes closer than the player radius to that line within the cell's span.

use maze_shared::{CellPos, Chunk, WallType, GRID_UNIT, PLAYER_RADIUS};

/// Continuous client-side position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPos {
    pub x: f32,
    pub y: f32,
}

impl WorldPos {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Center of a maze cell.
    pub fn cell_center(cell: CellPos, grid_unit: f32) -> Self {
        Self {
            x: (cell.x as f32 + 0.5) * grid_unit,
            y: (cell.y as f32 + 0.5) * grid_unit,
        }
    }

    /// Cell containing this position.
    pub fn cell(&self, grid_unit: f32) -> CellPos {
        CellPos::new(
            (self.x / grid_unit).floor() as i32,
            (self.y / grid_unit).floor() as i32,
        )
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResolver {
    pub radius: f32,
    pub grid_unit: f32,
}

impl Default for CollisionResolver {
    fn default() -> Self {
        Self {
            radius: PLAYER_RADIUS,
            grid_unit: GRID_UNIT,
        }
    }
}

impl CollisionResolver {
    pub fn new(radius: f32, grid_unit: f32) -> Self {
        Self { radius, grid_unit }
    }

    /// True when any wall in `chunk` blocks `candidate`.
    ///
    /// This is the `canMoveTo` check with blocked-positive polarity: true
    /// means the move is rejected. Checks every cell of the chunk and stops
    /// at the first hit.
    pub fn is_blocked(&self, candidate: WorldPos, chunk: &Chunk) -> bool {
        chunk
            .cells()
            .any(|(cell, wall)| self.wall_blocks(wall, cell, candidate))
    }

    /// Inverse of [`is_blocked`](Self::is_blocked).
    pub fn can_move_to(&self, candidate: WorldPos, chunk: &Chunk) -> bool {
        !self.is_blocked(candidate, chunk)
    }

    /// Classifies `point` against the wall occupying `cell`.
    pub fn wall_blocks(&self, wall: WallType, cell: CellPos, point: WorldPos) -> bool {
        if wall == WallType::None {
            return false;
        }

        let g = self.grid_unit;
        let r = self.radius;
        let dx = point.x - cell.x as f32 * g;
        let dy = point.y - cell.y as f32 * g;

        // Cheap reject: further than the radius from the cell's box
        if dx < -r || dy < -r || dx > g + r || dy > g + r {
            return false;
        }

        let within_x = (0.0..=g).contains(&dx);
        let within_y = (0.0..=g).contains(&dy);

        match wall {
            WallType::None => false,
            WallType::Horizontal => within_x && (dy - g / 2.0).abs() < r,
            WallType::Vertical => within_y && (dx - g / 2.0).abs() < r,
            WallType::DiagForward => within_x && (dx - dy).abs() < r,
            WallType::DiagBackward => within_x && (dx + dy - g).abs() < r,
        }
    }
}
