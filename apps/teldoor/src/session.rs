// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Per-connection session state and the session registry.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! Per-connection session state and the session registry.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use teldoor_core::prompt;

/// Opaque identity of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(pub u64);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Per-connection mutable shell state.
///
/// The working directory is stored root-relative; an empty path means
/// the served root itself. Sessions never share state, so one client's
/// navigation cannot disturb another's.
#[derive(Debug, Clone)]
pub struct Session {
    peer: SocketAddr,
    nick: Option<String>,
    cwd: PathBuf,
}

impl Session {
    /// Create a fresh session rooted at the served root.
    #[must_use]
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            peer,
            nick: None,
            cwd: PathBuf::new(),
        }
    }

    /// Peer address the connection was accepted from.
    #[must_use]
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Identity shown in the prompt: the nickname when set, the peer
    /// address string otherwise.
    #[must_use]
    pub fn identity(&self) -> String {
        match &self.nick {
            Some(nick) => nick.clone(),
            None => self.peer.to_string(),
        }
    }

    /// Set the display name used by this session's prompt.
    pub fn set_nick(&mut self, nick: impl Into<String>) {
        self.nick = Some(nick.into());
    }

    /// Root-relative working directory.
    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Replace the working directory with a new root-relative path.
    pub fn set_cwd(&mut self, cwd: PathBuf) {
        self.cwd = cwd;
    }

    /// Render the prompt for this session.
    #[must_use]
    pub fn prompt(&self) -> String {
        prompt::render_prompt(&self.identity(), &prompt::virtual_path(&self.cwd))
    }
}

/// Registry of live sessions keyed by connection identity.
///
/// Inserted on accept and removed on close by the reactor; looked up by
/// the dispatcher for the connection currently being processed.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<ConnId, Session>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the session for a newly accepted connection.
    pub fn insert(&mut self, id: ConnId, session: Session) {
        self.sessions.insert(id, session);
    }

    /// Remove a closed connection's session.
    pub fn remove(&mut self, id: ConnId) -> Option<Session> {
        self.sessions.remove(&id)
    }

    /// Borrow the session for a connection.
    #[must_use]
    pub fn get(&self, id: ConnId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Mutably borrow the session for a connection.
    pub fn get_mut(&mut self, id: ConnId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().expect("socket addr")
    }

    #[test]
    fn identity_defaults_to_peer_address() {
        let session = Session::new(addr(4100));
        assert_eq!(session.identity(), "127.0.0.1:4100");
    }

    #[test]
    fn nickname_overrides_identity() {
        let mut session = Session::new(addr(4100));
        session.set_nick("operator");
        assert_eq!(session.identity(), "operator");
        assert_eq!(session.prompt(), "operator:~$ ");
    }

    #[test]
    fn prompt_tracks_working_directory() {
        let mut session = Session::new(addr(4100));
        session.set_cwd(PathBuf::from("logs/archive"));
        assert_eq!(session.prompt(), "127.0.0.1:4100:~/logs/archive$ ");
    }

    #[test]
    fn sessions_are_isolated_per_connection() {
        let mut registry = SessionRegistry::new();
        registry.insert(ConnId(1), Session::new(addr(4100)));
        registry.insert(ConnId(2), Session::new(addr(4200)));
        registry
            .get_mut(ConnId(1))
            .expect("session one")
            .set_nick("alice");
        registry
            .get_mut(ConnId(1))
            .expect("session one")
            .set_cwd(PathBuf::from("a"));
        let other = registry.get(ConnId(2)).expect("session two");
        assert_eq!(other.identity(), "127.0.0.1:4200");
        assert_eq!(other.cwd(), Path::new(""));
        assert_eq!(registry.len(), 2);
        registry.remove(ConnId(1));
        assert_eq!(registry.len(), 1);
    }
}
