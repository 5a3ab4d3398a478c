use log::{debug, info, warn};
use maze_shared::{read_packet, write_packet, CellPos, Chunk, Maze, Packet, ProtocolError};
use std::collections::HashMap;
use tokio::net::{TcpStream, ToSocketAddrs};

/// Everything a broadcast-mode server pushes at a client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Snapshot {
        positions: HashMap<String, CellPos>,
        maze: Maze,
    },
    PlayerLeft {
        identity: String,
    },
}

/// One framed TCP connection to the maze server.
pub struct Client {
    stream: TcpStream,
    identity: Option<String>,
}

impl Client {
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ProtocolError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        info!("Connected to {}", stream.peer_addr()?);

        Ok(Self {
            stream,
            identity: None,
        })
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Performs the handshake and returns the assigned spawn cell.
    pub async fn request_spawn(&mut self, identity: &str) -> Result<CellPos, ProtocolError> {
        self.send(&Packet::Connect {
            identity: identity.to_string(),
        })
        .await?;

        match self.receive().await? {
            Packet::Spawned { position } => {
                info!("Spawned as {} at {}", identity, position);
                self.identity = Some(identity.to_string());
                Ok(position)
            }
            Packet::Disconnected { reason } => Err(ProtocolError::Rejected(reason)),
            other => Err(ProtocolError::UnexpectedPacket(other.kind())),
        }
    }

    /// Reports `position` and waits for the chunk reply (pull mode).
    pub async fn request_chunk_at(&mut self, position: CellPos) -> Result<Chunk, ProtocolError> {
        self.send(&Packet::Position { position }).await?;

        match self.receive().await? {
            Packet::Chunk { chunk } => Ok(chunk),
            Packet::Disconnected { reason } => Err(ProtocolError::Rejected(reason)),
            other => Err(ProtocolError::UnexpectedPacket(other.kind())),
        }
    }

    /// Reports a position without waiting for anything.
    ///
    /// After the handshake the update goes out as a one-entry position map
    /// keyed by this client's identity.
    pub async fn send_position(&mut self, position: CellPos) -> Result<(), ProtocolError> {
        let packet = match &self.identity {
            Some(identity) => Packet::PositionMap {
                positions: HashMap::from([(identity.clone(), position)]),
            },
            None => Packet::Position { position },
        };
        self.send(&packet).await
    }

    /// Waits for the next pushed event. A server-side `Disconnected` becomes
    /// [`ProtocolError::Rejected`].
    pub async fn next_event(&mut self) -> Result<ServerEvent, ProtocolError> {
        match self.receive().await? {
            Packet::Snapshot { positions, maze } => Ok(ServerEvent::Snapshot { positions, maze }),
            Packet::PlayerLeft { identity } => Ok(ServerEvent::PlayerLeft { identity }),
            Packet::Disconnected { reason } => Err(ProtocolError::Rejected(reason)),
            other => Err(ProtocolError::UnexpectedPacket(other.kind())),
        }
    }

    /// Waits for the next snapshot, skipping departure notices.
    pub async fn next_snapshot(&mut self) -> Result<(HashMap<String, CellPos>, Maze), ProtocolError> {
        loop {
            match self.next_event().await? {
                ServerEvent::Snapshot { positions, maze } => return Ok((positions, maze)),
                ServerEvent::PlayerLeft { identity } => debug!("{} left", identity),
            }
        }
    }

    pub async fn send(&mut self, packet: &Packet) -> Result<(), ProtocolError> {
        write_packet(&mut self.stream, packet).await
    }

    pub async fn receive(&mut self) -> Result<Packet, ProtocolError> {
        let packet = read_packet(&mut self.stream).await?;
        if let Packet::Disconnected { reason } = &packet {
            warn!("Disconnected: {}", reason);
        }
        Ok(packet)
    }
}
