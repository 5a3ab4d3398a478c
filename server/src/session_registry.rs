//! Connected-player bookkeeping for the sync server
//!
//! This module owns the only mutable state shared between connection
//! handlers:
//! - Identity to last-known position for every active session
//! - The outbound frame queue of each session, used for broadcasts
//!
//! All access goes through one mutex inside [`SessionRegistry`]; the map
//! itself is never handed out. Callers receive copies (positions) or cloned
//! channel handles, so a broadcast iterates a snapshot and can drop dead
//! sessions without mutating the collection it walks.

use log::info;
use maze_shared::CellPos;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

/// Opaque identity token supplied by the client at handshake.
pub type PlayerId = String;

/// An encoded frame, shared between every recipient of a broadcast.
pub type Frame = Arc<Vec<u8>>;

/// Bounded queue feeding one client's socket writer.
pub type Outbound = mpsc::Sender<Frame>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("identity '{0}' is already connected")]
    DuplicateIdentity(PlayerId),
}

/// A connected player and the queue feeding their socket writer
#[derive(Debug)]
struct Session {
    position: CellPos,
    outbound: Outbound,
    connected_at: Instant,
}

/// Process-wide player registry guarded by a single lock
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<PlayerId, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session for `id`.
    ///
    /// Fails without touching the existing entry if the identity is already
    /// connected.
    pub async fn register(
        &self,
        id: &str,
        position: CellPos,
        outbound: Outbound,
    ) -> Result<(), RegistryError> {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(id) {
            return Err(RegistryError::DuplicateIdentity(id.to_string()));
        }

        sessions.insert(
            id.to_string(),
            Session {
                position,
                outbound,
                connected_at: Instant::now(),
            },
        );
        info!("Player {} registered at {}", id, position);
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Option<CellPos> {
        self.sessions.lock().await.get(id).map(|s| s.position)
    }

    /// Updates the position of a registered player. Returns false for
    /// unknown identities.
    pub async fn set(&self, id: &str, position: CellPos) -> bool {
        match self.sessions.lock().await.get_mut(id) {
            Some(session) => {
                session.position = position;
                true
            }
            None => false,
        }
    }

    /// Removes a player. Returns true if an entry was present.
    pub async fn remove(&self, id: &str) -> bool {
        match self.sessions.lock().await.remove(id) {
            Some(session) => {
                info!(
                    "Player {} removed after {:.1}s",
                    id,
                    session.connected_at.elapsed().as_secs_f32()
                );
                true
            }
            None => false,
        }
    }

    /// Copy of every known position.
    pub async fn snapshot(&self) -> HashMap<PlayerId, CellPos> {
        self.sessions
            .lock()
            .await
            .iter()
            .map(|(id, s)| (id.clone(), s.position))
            .collect()
    }

    /// Positions and outbound handles captured under the same lock, so the
    /// recipients of a broadcast match the positions it reports.
    pub async fn broadcast_view(&self) -> (HashMap<PlayerId, CellPos>, Vec<(PlayerId, Outbound)>) {
        let sessions = self.sessions.lock().await;
        let positions = sessions
            .iter()
            .map(|(id, s)| (id.clone(), s.position))
            .collect();
        let recipients = sessions
            .iter()
            .map(|(id, s)| (id.clone(), s.outbound.clone()))
            .collect();
        (positions, recipients)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
