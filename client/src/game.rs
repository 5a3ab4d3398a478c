use crate::collision::{CollisionResolver, WorldPos};
use log::debug;
use maze_shared::{CellPos, Chunk, Maze};
use std::collections::HashMap;

/// What the client knows about the world: its own continuous position, the
/// chunk it collides against, and the last reported positions of others.
#[derive(Debug, Clone)]
pub struct ClientGameState {
    pub identity: String,
    pub position: WorldPos,
    pub chunk: Option<Chunk>,
    pub others: HashMap<String, CellPos>,

    /// Full maze from the latest snapshot (broadcast mode only)
    maze: Option<Maze>,
    resolver: CollisionResolver,
    chunk_size: usize,
}

impl ClientGameState {
    /// Starts at the center of the spawn cell with no chunk held.
    pub fn new(identity: &str, spawn: CellPos, resolver: CollisionResolver, chunk_size: usize) -> Self {
        Self {
            identity: identity.to_string(),
            position: WorldPos::cell_center(spawn, resolver.grid_unit),
            chunk: None,
            others: HashMap::new(),
            maze: None,
            resolver,
            chunk_size,
        }
    }

    /// Cell reported to the server for the current position.
    pub fn cell(&self) -> CellPos {
        self.position.cell(self.resolver.grid_unit)
    }

    pub fn maze(&self) -> Option<&Maze> {
        self.maze.as_ref()
    }

    pub fn apply_chunk(&mut self, chunk: Chunk) {
        debug!(
            "Chunk {}x{} at {} received",
            chunk.width(),
            chunk.height(),
            chunk.origin
        );
        self.chunk = Some(chunk);
    }

    /// Takes a broadcast snapshot. The collision chunk is cut locally from the
    /// snapshot maze around the current cell.
    pub fn apply_snapshot(&mut self, mut positions: HashMap<String, CellPos>, maze: Maze) {
        positions.remove(&self.identity);
        self.others = positions;
        self.chunk = Some(maze.extract_chunk(self.cell(), self.chunk_size));
        self.maze = Some(maze);
    }

    pub fn remove_player(&mut self, identity: &str) {
        self.others.remove(identity);
    }

    /// Moves by `(dx, dy)` if the target is free in the held chunk.
    ///
    /// Returns false and stays put when blocked, when no chunk is held yet, or
    /// when the target cell is outside the chunk (which also keeps the player
    /// inside the maze). With a snapshot maze available the chunk follows the
    /// player.
    pub fn try_move(&mut self, dx: f32, dy: f32) -> bool {
        let Some(chunk) = &self.chunk else {
            return false;
        };

        let candidate = self.position.offset(dx, dy);
        if !chunk.contains(candidate.cell(self.resolver.grid_unit))
            || self.resolver.is_blocked(candidate, chunk)
        {
            return false;
        }

        let previous = self.cell();
        self.position = candidate;

        if let Some(maze) = &self.maze {
            let cell = self.cell();
            if cell != previous {
                self.chunk = Some(maze.extract_chunk(cell, self.chunk_size));
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use maze_shared::{WallType, GRID_UNIT, PLAYER_SPEED};

    fn open_maze(width: usize, height: usize) -> Maze {
        Maze::filled(width, height, WallType::None)
    }

    #[test]
    fn test_starts_at_spawn_center() {
        let state = ClientGameState::new("me", CellPos::new(4, 9), CollisionResolver::default(), 25);
        assert_approx_eq!(state.position.x, 4.5 * GRID_UNIT);
        assert_approx_eq!(state.position.y, 9.5 * GRID_UNIT);
        assert_eq!(state.cell(), CellPos::new(4, 9));
    }

    #[test]
    fn test_no_movement_without_chunk() {
        let mut state = ClientGameState::new("me", CellPos::new(1, 1), CollisionResolver::default(), 25);
        assert!(!state.try_move(PLAYER_SPEED, 0.0));
        assert_eq!(state.cell(), CellPos::new(1, 1));
    }

    #[test]
    fn test_free_move_updates_position() {
        let maze = open_maze(10, 10);
        let mut state = ClientGameState::new("me", CellPos::new(5, 5), CollisionResolver::default(), 25);
        state.apply_chunk(maze.extract_chunk(CellPos::new(5, 5), 25));

        for _ in 0..8 {
            assert!(state.try_move(PLAYER_SPEED, 0.0));
        }
        assert_eq!(state.cell(), CellPos::new(6, 5));
    }

    #[test]
    fn test_blocked_move_keeps_position() {
        let mut cells = vec![WallType::None; 9];
        cells[5] = WallType::Vertical; // (2, 1)
        let maze = Maze::from_cells(3, 3, cells).unwrap();

        let mut state = ClientGameState::new("me", CellPos::new(1, 1), CollisionResolver::default(), 25);
        state.apply_chunk(maze.extract_chunk(CellPos::new(1, 1), 25));

        let mut accepted = 0;
        while state.try_move(PLAYER_SPEED, 0.0) {
            accepted += 1;
            assert!(accepted < 100, "walked through a vertical wall");
        }

        let wall_x = 2.5 * GRID_UNIT;
        assert!(wall_x - state.position.x >= state.resolver.radius);
        assert_eq!(state.cell().y, 1);
    }

    #[test]
    fn test_maze_edge_stops_movement() {
        let maze = open_maze(3, 3);
        let mut state = ClientGameState::new("me", CellPos::new(0, 1), CollisionResolver::default(), 25);
        state.apply_chunk(maze.extract_chunk(CellPos::new(0, 1), 25));

        let mut accepted = 0;
        while state.try_move(-PLAYER_SPEED, 0.0) {
            accepted += 1;
        }
        assert_eq!(accepted, 4);
        assert_eq!(state.cell(), CellPos::new(0, 1));
        assert!(state.position.x >= 0.0);
    }

    #[test]
    fn test_snapshot_drops_own_entry_and_cuts_chunk() {
        let maze = open_maze(60, 60);
        let mut state = ClientGameState::new("me", CellPos::new(30, 30), CollisionResolver::default(), 10);

        let positions = HashMap::from([
            ("me".to_string(), CellPos::new(30, 30)),
            ("other".to_string(), CellPos::new(2, 3)),
        ]);
        state.apply_snapshot(positions, maze.clone());

        assert_eq!(state.others.len(), 1);
        assert_eq!(state.others.get("other"), Some(&CellPos::new(2, 3)));
        assert_eq!(state.chunk, Some(maze.extract_chunk(CellPos::new(30, 30), 10)));
    }

    #[test]
    fn test_snapshot_chunk_follows_player() {
        let maze = open_maze(60, 60);
        let mut state = ClientGameState::new("me", CellPos::new(30, 30), CollisionResolver::default(), 10);
        state.apply_snapshot(HashMap::new(), maze.clone());

        while state.cell() == CellPos::new(30, 30) {
            assert!(state.try_move(PLAYER_SPEED, 0.0));
        }
        assert_eq!(state.chunk, Some(maze.extract_chunk(CellPos::new(31, 30), 10)));
    }

    #[test]
    fn test_remove_player() {
        let mut state = ClientGameState::new("me", CellPos::new(0, 0), CollisionResolver::default(), 10);
        state.others.insert("gone".to_string(), CellPos::new(1, 1));
        state.remove_player("gone");
        assert!(state.others.is_empty());
    }
}
