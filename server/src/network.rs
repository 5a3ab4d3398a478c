//! Server network layer: TCP accept loop and per-connection handlers

use crate::generation::random_spawn;
use crate::session_registry::{Frame, Outbound, PlayerId, SessionRegistry};
use log::{debug, error, info, warn};
use maze_shared::{
    encode_frame, read_client_packet, write_frame, CellPos, Maze, Packet, ProtocolError, SyncMode,
    DEFAULT_CHUNK_SIZE,
};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;

pub const MAX_IDENTITY_LEN: usize = 64;

/// Default number of frames queued for one client before it counts as
/// unresponsive.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub mode: SyncMode,
    pub chunk_size: usize,
    /// Close connections that stay silent this long. `None` waits forever.
    pub idle_timeout: Option<Duration>,
    /// Frames a client may have queued; a full queue drops the client.
    pub outbound_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            mode: SyncMode::Pull,
            chunk_size: DEFAULT_CHUNK_SIZE,
            idle_timeout: None,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }
}

/// Lifecycle of one client connection
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConnectionState {
    AwaitingIdentity,
    Active { identity: PlayerId },
    /// Carries the identity to clean up, if one was registered.
    Closed { identity: Option<PlayerId> },
}

/// State every connection handler reads
struct ServerContext {
    maze: Arc<Maze>,
    registry: Arc<SessionRegistry>,
    config: ServerConfig,
}

/// Maze sync server owning the immutable maze and the session registry
pub struct Server {
    listener: TcpListener,
    context: Arc<ServerContext>,
}

impl Server {
    pub async fn bind(addr: &str, maze: Maze, config: ServerConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(
            "Server listening on {} ({} mode, chunk size {})",
            listener.local_addr()?,
            config.mode,
            config.chunk_size
        );

        Ok(Server {
            listener,
            context: Arc::new(ServerContext {
                maze: Arc::new(maze),
                registry: Arc::new(SessionRegistry::new()),
                config,
            }),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.context.registry)
    }

    pub fn maze(&self) -> Arc<Maze> {
        Arc::clone(&self.context.maze)
    }

    /// Accepts connections until the process is stopped.
    pub async fn run(self) -> io::Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` completes. Handlers already
    /// running are left to finish on their own.
    pub async fn run_until<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Server started successfully");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let context = Arc::clone(&self.context);
                            tokio::spawn(async move {
                                handle_connection(stream, peer, context).await;
                            });
                        }
                        Err(e) => {
                            error!("Error accepting connection: {}", e);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                    }
                },

                _ = &mut shutdown => {
                    info!("Server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, context: Arc<ServerContext>) {
    info!("Connection from {}", peer);
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Could not disable Nagle for {}: {}", peer, e);
    }

    let (mut reader, writer) = stream.into_split();
    let (outbound, outbound_rx) = mpsc::channel(context.config.outbound_capacity.max(1));
    tokio::spawn(run_writer(writer, outbound_rx, peer));

    let mut state = ConnectionState::AwaitingIdentity;
    loop {
        state = match state {
            ConnectionState::AwaitingIdentity => {
                match next_packet(&mut reader, context.config.idle_timeout).await {
                    Ok(Packet::Connect { identity }) => {
                        handshake(&context, identity, &outbound, peer).await
                    }
                    Ok(other) => {
                        warn!("Expected Connect from {}, got {}", peer, other.kind());
                        ConnectionState::Closed { identity: None }
                    }
                    Err(e) => {
                        log_read_error(peer, None, &e);
                        ConnectionState::Closed { identity: None }
                    }
                }
            }

            ConnectionState::Active { identity } => {
                match next_packet(&mut reader, context.config.idle_timeout).await {
                    Ok(packet) => handle_update(&context, identity, packet, &outbound).await,
                    Err(e) => {
                        log_read_error(peer, Some(identity.as_str()), &e);
                        ConnectionState::Closed {
                            identity: Some(identity),
                        }
                    }
                }
            }

            ConnectionState::Closed { identity } => {
                if let Some(identity) = identity {
                    close_session(&context, &identity).await;
                }
                break;
            }
        };
    }

    info!("Connection from {} closed", peer);
}

async fn next_packet(
    reader: &mut OwnedReadHalf,
    idle_timeout: Option<Duration>,
) -> Result<Packet, ProtocolError> {
    match idle_timeout {
        Some(limit) => match timeout(limit, read_client_packet(reader)).await {
            Ok(result) => result,
            Err(_) => Err(ProtocolError::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("no message for {:?}", limit),
            ))),
        },
        None => read_client_packet(reader).await,
    }
}

fn log_read_error(peer: SocketAddr, identity: Option<&str>, e: &ProtocolError) {
    let who = identity.unwrap_or("<unidentified>");
    match e {
        ProtocolError::ConnectionClosed => info!("Peer {} ({}) closed the connection", peer, who),
        ProtocolError::Codec(_)
        | ProtocolError::FrameTooLarge(_)
        | ProtocolError::NotFromClient(_) => {
            warn!("Malformed message from {} ({}): {}", peer, who, e)
        }
        _ => warn!("Read error from {} ({}): {}", peer, who, e),
    }
}

/// Drains the outbound queue into the socket until every sender is gone or
/// a write fails.
async fn run_writer(
    mut writer: OwnedWriteHalf,
    mut outbound_rx: mpsc::Receiver<Frame>,
    peer: SocketAddr,
) {
    while let Some(frame) = outbound_rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &frame).await {
            warn!("Failed to send to {}: {}", peer, e);
            break;
        }
    }
}

/// Hands a frame to a client's writer without waiting. False when the
/// writer is gone or the client has fallen too far behind.
fn try_deliver(outbound: &Outbound, frame: Frame) -> bool {
    outbound.try_send(frame).is_ok()
}

fn queue(outbound: &Outbound, packet: &Packet) -> bool {
    match encode_frame(packet) {
        Ok(frame) => try_deliver(outbound, Arc::new(frame)),
        Err(e) => {
            error!("Failed to encode {} packet: {}", packet.kind(), e);
            false
        }
    }
}

fn validate_identity(identity: &str) -> Result<(), &'static str> {
    if identity.trim().is_empty() {
        return Err("identity must not be empty");
    }
    if identity.len() > MAX_IDENTITY_LEN {
        return Err("identity is too long");
    }
    if identity.chars().any(char::is_control) {
        return Err("identity must be printable");
    }
    Ok(())
}

async fn handshake(
    context: &ServerContext,
    identity: String,
    outbound: &Outbound,
    peer: SocketAddr,
) -> ConnectionState {
    if let Err(reason) = validate_identity(&identity) {
        warn!("Rejecting {}: {}", peer, reason);
        queue(
            outbound,
            &Packet::Disconnected {
                reason: reason.to_string(),
            },
        );
        return ConnectionState::Closed { identity: None };
    }

    let spawn = {
        let mut rng = rand::thread_rng();
        random_spawn(&context.maze, &mut rng)
    };
    let Some(spawn) = spawn else {
        error!("No walkable cell available for {}", identity);
        queue(
            outbound,
            &Packet::Disconnected {
                reason: "no walkable cell".to_string(),
            },
        );
        return ConnectionState::Closed { identity: None };
    };

    if let Err(e) = context
        .registry
        .register(&identity, spawn, outbound.clone())
        .await
    {
        warn!("Rejecting {}: {}", peer, e);
        queue(
            outbound,
            &Packet::Disconnected {
                reason: e.to_string(),
            },
        );
        return ConnectionState::Closed { identity: None };
    }

    info!("Player {} connected from {}, spawned at {}", identity, peer, spawn);
    if !queue(outbound, &Packet::Spawned { position: spawn }) {
        return ConnectionState::Closed {
            identity: Some(identity),
        };
    }

    if context.config.mode == SyncMode::Broadcast {
        broadcast_snapshot(context).await;
    }

    ConnectionState::Active { identity }
}

/// Picks the sender's own entry out of an update; entries naming other
/// players are ignored.
fn own_position(identity: &str, packet: Packet) -> Result<Option<CellPos>, Packet> {
    match packet {
        Packet::Position { position } => Ok(Some(position)),
        Packet::PositionMap { mut positions } => {
            let own = positions.remove(identity);
            if !positions.is_empty() {
                warn!(
                    "Player {} tried to move {} other players, ignored",
                    identity,
                    positions.len()
                );
            }
            Ok(own)
        }
        other => Err(other),
    }
}

async fn handle_update(
    context: &ServerContext,
    identity: PlayerId,
    packet: Packet,
    outbound: &Outbound,
) -> ConnectionState {
    let position = match own_position(&identity, packet) {
        Ok(Some(position)) => {
            if !context.registry.set(&identity, position).await {
                return evicted(identity);
            }
            debug!("Player {} moved to {}", identity, position);
            position
        }
        Ok(None) => match context.registry.get(&identity).await {
            Some(position) => position,
            None => return evicted(identity),
        },
        Err(unexpected) => {
            warn!(
                "Unexpected {} packet from player {}",
                unexpected.kind(),
                identity
            );
            return ConnectionState::Closed {
                identity: Some(identity),
            };
        }
    };

    match context.config.mode {
        SyncMode::Pull => {
            let chunk = context
                .maze
                .extract_chunk(position, context.config.chunk_size);
            if !queue(outbound, &Packet::Chunk { chunk }) {
                return ConnectionState::Closed {
                    identity: Some(identity),
                };
            }
        }
        SyncMode::Broadcast => broadcast_snapshot(context).await,
    }

    ConnectionState::Active { identity }
}

/// The session was removed from the registry by someone else, which has
/// already announced the departure.
fn evicted(identity: PlayerId) -> ConnectionState {
    info!("Player {} was dropped from the registry, closing", identity);
    ConnectionState::Closed { identity: None }
}

/// Sends one encoded frame to every recipient. Players whose writer is gone
/// or whose queue is full are removed, and the remaining players are told
/// about each removal.
async fn broadcast(context: &ServerContext, frame: Frame, recipients: Vec<(PlayerId, Outbound)>) {
    let mut dropped = deliver(context, &frame, recipients).await;

    while let Some(identity) = dropped.pop() {
        let departure = Packet::PlayerLeft { identity };
        match encode_frame(&departure) {
            Ok(frame) => {
                let (_, recipients) = context.registry.broadcast_view().await;
                dropped.extend(deliver(context, &Arc::new(frame), recipients).await);
            }
            Err(e) => error!("Failed to encode {} packet: {}", departure.kind(), e),
        }
    }
}

/// Returns the players this call removed.
async fn deliver(
    context: &ServerContext,
    frame: &Frame,
    recipients: Vec<(PlayerId, Outbound)>,
) -> Vec<PlayerId> {
    let mut dropped = Vec::new();
    for (identity, outbound) in recipients {
        if try_deliver(&outbound, Arc::clone(frame)) {
            continue;
        }
        if context.registry.remove(&identity).await {
            warn!("Player {} unreachable or too far behind, removing", identity);
            dropped.push(identity);
        }
    }
    dropped
}

async fn broadcast_snapshot(context: &ServerContext) {
    let (positions, recipients) = context.registry.broadcast_view().await;
    let packet = Packet::Snapshot {
        positions,
        maze: (*context.maze).clone(),
    };

    match encode_frame(&packet) {
        Ok(frame) => broadcast(context, Arc::new(frame), recipients).await,
        Err(e) => error!("Failed to encode snapshot: {}", e),
    }
}

async fn close_session(context: &ServerContext, identity: &str) {
    // Already dropped and announced by a broadcast
    if !context.registry.remove(identity).await {
        return;
    }
    info!("Player {} disconnected", identity);

    if context.config.mode != SyncMode::Broadcast {
        return;
    }

    let (_, recipients) = context.registry.broadcast_view().await;
    let departure = Packet::PlayerLeft {
        identity: identity.to_string(),
    };
    match encode_frame(&departure) {
        Ok(frame) => broadcast(context, Arc::new(frame), recipients).await,
        Err(e) => error!("Failed to encode departure of {}: {}", identity, e),
    }
    broadcast_snapshot(context).await;
}
