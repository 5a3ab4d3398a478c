//! # Maze Server Library
//!
//! This library provides the authoritative server for the shared procedural
//! maze. It generates the maze once at startup, tracks where every connected
//! player is, and answers position updates with either the local chunk or a
//! full snapshot of every player.
//!
//! ## Core Responsibilities
//!
//! ### Procedural Generation
//! A single synchronous pass turns coherent noise into the maze:
//! - Perlin octaves sampled over every cell and min-max normalized
//! - The normalized field thresholded and split into 4-connected regions
//! - Each region given a wall-density style
//! - Each cell drawing its wall type from its region's distribution
//!
//! ### Session Management
//! Handles the lifecycle of every client connection:
//! - Identity handshake and spawn assignment on an open cell
//! - Position tracking in a single lock-guarded registry
//! - Cleanup on disconnect, read error, malformed payload or idle timeout
//!
//! ### State Synchronization
//! Two policies, chosen per deployment:
//! - **Pull**: each update is answered with the chunk around the sender
//! - **Broadcast**: each update pushes every position plus the maze to
//!   every connected client
//!
//! ## Architecture Design
//!
//! ### Task Per Connection
//! Every accepted TCP stream gets a reader task running the connection state
//! machine and a writer task draining an outbound frame queue. A slow client
//! only stalls its own tasks.
//!
//! ### Immutable Maze
//! The maze is built before the listener binds and is then shared behind an
//! `Arc`. It has no mutating methods, so handlers read it without locking.
//!
//! ### Framed Protocol
//! Messages are length-prefixed bincode frames (see `maze_shared::framing`),
//! so snapshots of any size arrive whole.
//!
//! ## Module Organization
//!
//! - `noise_field`: normalized fractal Perlin field
//! - `regions`: connected-component labelling and region styles
//! - `maze_builder`: per-style wall distributions
//! - `generation`: seeded pipeline and spawn selection
//! - `session_registry`: identity to position map behind one mutex
//! - `network`: accept loop, handshake and update handling
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use maze_server::generation::{generate, GenerationConfig};
//! use maze_server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Generation errors abort before anything is listening
//!     let generated = generate(&GenerationConfig::default())?;
//!
//!     let server = Server::bind("127.0.0.1:5555", generated.maze, ServerConfig::default()).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod generation;
pub mod maze_builder;
pub mod network;
pub mod noise_field;
pub mod regions;
pub mod session_registry;
