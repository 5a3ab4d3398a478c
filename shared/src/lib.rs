use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub mod framing;
pub mod maze;

pub use framing::{
    encode_frame, read_client_packet, read_packet, write_frame, write_packet, ProtocolError,
    MAX_FRAME_LEN,
};
pub use maze::{Chunk, Maze, MazeError};

/// World units per maze cell on the client side.
pub const GRID_UNIT: f32 = 16.0;
pub const PLAYER_RADIUS: f32 = 5.0;
pub const PLAYER_SPEED: f32 = 2.0;
pub const DEFAULT_CHUNK_SIZE: usize = 25;
pub const DEFAULT_PORT: u16 = 5555;

/// Shape of the obstacle occupying a single maze cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WallType {
    None,
    Horizontal,
    Vertical,
    DiagForward,
    DiagBackward,
}

impl WallType {
    /// All variants in wire order.
    pub const ALL: [WallType; 5] = [
        WallType::None,
        WallType::Horizontal,
        WallType::Vertical,
        WallType::DiagForward,
        WallType::DiagBackward,
    ];

    pub fn is_open(self) -> bool {
        self == WallType::None
    }
}

/// Integer cell coordinate in maze space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellPos {
    pub x: i32,
    pub y: i32,
}

impl CellPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for CellPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// How the server propagates state after a position update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Reply with the chunk around the sender's own position.
    #[default]
    Pull,
    /// Push every known position plus the full maze to every client.
    Broadcast,
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pull" | "chunk" => Ok(SyncMode::Pull),
            "broadcast" | "push" => Ok(SyncMode::Broadcast),
            other => Err(format!(
                "unknown sync mode '{}', expected 'pull' or 'broadcast'",
                other
            )),
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Pull => write!(f, "pull"),
            SyncMode::Broadcast => write!(f, "broadcast"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Connect {
        identity: String,
    },
    Position {
        position: CellPos,
    },
    PositionMap {
        positions: HashMap<String, CellPos>,
    },

    Spawned {
        position: CellPos,
    },
    Chunk {
        chunk: Chunk,
    },
    Snapshot {
        positions: HashMap<String, CellPos>,
        maze: Maze,
    },
    PlayerLeft {
        identity: String,
    },
    Disconnected {
        reason: String,
    },
}

impl Packet {
    /// Wire tags of the variants a client may send: `Connect`, `Position`
    /// and `PositionMap`.
    pub const CLIENT_TAGS: std::ops::RangeInclusive<u32> = 0..=2;

    /// Short variant name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Packet::Connect { .. } => "Connect",
            Packet::Position { .. } => "Position",
            Packet::PositionMap { .. } => "PositionMap",
            Packet::Spawned { .. } => "Spawned",
            Packet::Chunk { .. } => "Chunk",
            Packet::Snapshot { .. } => "Snapshot",
            Packet::PlayerLeft { .. } => "PlayerLeft",
            Packet::Disconnected { .. } => "Disconnected",
        }
    }
}
