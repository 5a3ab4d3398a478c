//! # Maze Client Library
//!
//! Client-side half of the shared maze. A client joins with an identity,
//! receives a spawn cell, and then moves through the world in continuous
//! coordinates while the server only tracks which cell it occupies.
//!
//! ## Architecture Overview
//!
//! ### Local Collision
//! Walls are resolved entirely on the client. Each cell's wall is a line
//! segment, and a candidate position is rejected when the player's radius
//! would overlap any wall in the chunk currently held. The server never
//! validates movement.
//!
//! ### Chunked World View
//! Clients never need the whole maze:
//! - In **pull** mode every reported cell change is answered with the chunk
//!   around it
//! - In **broadcast** mode the full maze arrives with every snapshot and the
//!   client cuts its own chunk from it
//!
//! ## Module Organization
//!
//! ### Collision Module (`collision`)
//! World-space positions and the point-versus-wall test for every wall type.
//!
//! ### Game Module (`game`)
//! The client's own position, held chunk and the last known cells of other
//! players.
//!
//! ### Network Module (`network`)
//! Framed TCP connection, handshake and request helpers for both sync modes.
//!
//! ### Wander Module (`wander`)
//! A headless random walker used by the `maze-client` binary and by load
//! tests.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use maze_client::network::Client;
//! use maze_client::wander::{wander, WanderConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::connect("127.0.0.1:5555").await?;
//!     let stats = wander(&mut client, "walker-1", &WanderConfig::default()).await?;
//!     println!("ended at {}", stats.final_cell);
//!     Ok(())
//! }
//! ```

pub mod collision;
pub mod game;
pub mod network;
pub mod wander;
