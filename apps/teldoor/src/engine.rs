// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Connection-callback facade bundling sessions, dispatch, and the gateway.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! Connection-callback facade bundling sessions, dispatch, and the gateway.

use std::io;
use std::net::SocketAddr;

use log::{debug, info};

use crate::dispatch::{Dispatcher, Flow, ReplySink};
use crate::gateway::FsGateway;
use crate::session::{ConnId, Session, SessionRegistry};

const GREETING: &str = "Hello user!";
const GREETING_HINT: &str = "Enter --help for support info";

/// Connection-callback facade over the shell's command logic.
///
/// The reactor is one driver of these callbacks; a transport hosted on
/// an external event framework can be another, translating its own
/// connect/line/disconnect notifications into the same calls instead of
/// re-implementing command handling.
#[derive(Debug)]
pub struct ShellEngine {
    registry: SessionRegistry,
    dispatcher: Dispatcher,
}

impl ShellEngine {
    /// Create an engine over the supplied gateway.
    #[must_use]
    pub fn new(gateway: FsGateway, chunk_bytes: usize) -> Self {
        Self {
            registry: SessionRegistry::new(),
            dispatcher: Dispatcher::new(gateway, chunk_bytes),
        }
    }

    /// Register a new connection and emit the greeting plus the first
    /// prompt.
    pub fn on_connect(
        &mut self,
        id: ConnId,
        peer: SocketAddr,
        sink: &mut dyn ReplySink,
    ) -> io::Result<()> {
        info!("client accepted: {peer}");
        self.registry.insert(id, Session::new(peer));
        sink.line(GREETING)?;
        sink.line(GREETING_HINT)?;
        self.send_prompt(id, sink)
    }

    /// Dispatch one complete framed line for `id`.
    pub fn on_line(
        &mut self,
        id: ConnId,
        line: &str,
        sink: &mut dyn ReplySink,
    ) -> io::Result<Flow> {
        let Some(session) = self.registry.get_mut(id) else {
            debug!("{id} has no session; closing");
            return Ok(Flow::Close);
        };
        self.dispatcher.dispatch(session, line, sink)
    }

    /// Emit the prompt for `id`.
    pub fn send_prompt(&self, id: ConnId, sink: &mut dyn ReplySink) -> io::Result<()> {
        if let Some(session) = self.registry.get(id) {
            sink.chunk(session.prompt().as_bytes())?;
        }
        Ok(())
    }

    /// Drop the session for a closed connection.
    pub fn on_disconnect(&mut self, id: ConnId) {
        if self.registry.remove(id).is_some() {
            debug!("{id} session removed");
        }
    }

    /// Borrow the live-session registry.
    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSink {
        bytes: Vec<u8>,
    }

    impl RecordingSink {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.bytes).into_owned()
        }

        fn reset(&mut self) {
            self.bytes.clear();
        }
    }

    impl ReplySink for RecordingSink {
        fn line(&mut self, text: &str) -> io::Result<()> {
            self.bytes.extend_from_slice(text.as_bytes());
            self.bytes.push(b'\n');
            Ok(())
        }

        fn chunk(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.bytes.extend_from_slice(bytes);
            Ok(())
        }
    }

    fn engine() -> (TempDir, ShellEngine) {
        let dir = TempDir::new().expect("temp root");
        let gateway = FsGateway::new(dir.path()).expect("gateway");
        (dir, ShellEngine::new(gateway, 512))
    }

    #[test]
    fn connect_greets_and_prompts() {
        let (_dir, mut engine) = engine();
        let mut sink = RecordingSink::default();
        engine
            .on_connect(ConnId(1), "127.0.0.1:4100".parse().unwrap(), &mut sink)
            .unwrap();
        assert_eq!(
            sink.text(),
            "Hello user!\nEnter --help for support info\n127.0.0.1:4100:~$ "
        );
        assert_eq!(engine.sessions().len(), 1);
    }

    #[test]
    fn nick_on_one_connection_leaves_others_untouched() {
        let (_dir, mut engine) = engine();
        let mut sink = RecordingSink::default();
        engine
            .on_connect(ConnId(1), "127.0.0.1:4100".parse().unwrap(), &mut sink)
            .unwrap();
        engine
            .on_connect(ConnId(2), "127.0.0.1:4200".parse().unwrap(), &mut sink)
            .unwrap();
        engine.on_line(ConnId(1), "nick alice", &mut sink).unwrap();

        sink.reset();
        engine.send_prompt(ConnId(1), &mut sink).unwrap();
        assert_eq!(sink.text(), "alice:~$ ");
        sink.reset();
        engine.send_prompt(ConnId(2), &mut sink).unwrap();
        assert_eq!(sink.text(), "127.0.0.1:4200:~$ ");
    }

    #[test]
    fn working_directories_are_isolated() {
        let (_dir, mut engine) = engine();
        let mut sink = RecordingSink::default();
        engine
            .on_connect(ConnId(1), "127.0.0.1:4100".parse().unwrap(), &mut sink)
            .unwrap();
        engine
            .on_connect(ConnId(2), "127.0.0.1:4200".parse().unwrap(), &mut sink)
            .unwrap();
        engine.on_line(ConnId(1), "mkdir shared", &mut sink).unwrap();
        engine.on_line(ConnId(1), "cd shared", &mut sink).unwrap();
        assert_eq!(
            engine.sessions().get(ConnId(1)).unwrap().cwd(),
            Path::new("shared")
        );
        assert_eq!(
            engine.sessions().get(ConnId(2)).unwrap().cwd(),
            Path::new("")
        );
    }

    #[test]
    fn disconnect_destroys_the_session() {
        let (_dir, mut engine) = engine();
        let mut sink = RecordingSink::default();
        engine
            .on_connect(ConnId(1), "127.0.0.1:4100".parse().unwrap(), &mut sink)
            .unwrap();
        engine.on_disconnect(ConnId(1));
        assert!(engine.sessions().is_empty());
        assert_eq!(
            engine.on_line(ConnId(1), "ls", &mut sink).unwrap(),
            Flow::Close
        );
    }
}
