// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Single-threaded readiness loop multiplexing every client connection.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! Single-threaded readiness loop multiplexing every client connection.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};
use teldoor_core::LineFramer;

use crate::config::DoorConfig;
use crate::dispatch::{Flow, ReplySink};
use crate::engine::ShellEngine;
use crate::gateway::FsGateway;
use crate::session::ConnId;

/// Sleep between poll cycles while no connection shows activity.
const IDLE_POLL: Duration = Duration::from_millis(10);
/// Back-off while a response write reports `WouldBlock`.
const WRITE_RETRY: Duration = Duration::from_millis(5);

/// One registered connection tracked by the reactor.
struct Connection {
    id: ConnId,
    stream: TcpStream,
    peer: SocketAddr,
    framer: LineFramer,
    closing: bool,
}

/// Reply sink writing straight back to the connection's socket.
struct StreamSink<'a> {
    stream: &'a TcpStream,
}

impl ReplySink for StreamSink<'_> {
    fn line(&mut self, text: &str) -> io::Result<()> {
        self.chunk(text.as_bytes())?;
        self.chunk(b"\n")
    }

    fn chunk(&mut self, bytes: &[u8]) -> io::Result<()> {
        write_all_nonblocking(self.stream, bytes)
    }
}

/// Drain a full buffer into a non-blocking socket, backing off briefly
/// on `WouldBlock` so responses are never truncated.
fn write_all_nonblocking(mut stream: &TcpStream, mut bytes: &[u8]) -> io::Result<()> {
    while !bytes.is_empty() {
        match stream.write(bytes) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(written) => bytes = &bytes[written..],
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => thread::sleep(WRITE_RETRY),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}

/// Single-threaded readiness loop owning the listener, every connection,
/// and all session state.
///
/// Each cycle drains pending accepts, then polls every registered
/// connection for readable bytes; `WouldBlock` is a no-op and an idle
/// cycle sleeps briefly. Gateway calls run inline, so one slow command
/// stalls other connections for its duration — the accepted trade-off
/// of the single-threaded design.
pub struct Reactor {
    listener: TcpListener,
    engine: ShellEngine,
    connections: Vec<Connection>,
    chunk_bytes: usize,
    next_conn: u64,
}

impl Reactor {
    /// Bind the listener and prepare an empty connection table.
    pub fn bind(config: &DoorConfig, gateway: FsGateway) -> io::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", config.port))?;
        listener.set_nonblocking(true)?;
        info!(
            "teldoor listening on {} (root {})",
            listener.local_addr()?,
            gateway.root().display()
        );
        Ok(Self {
            listener,
            engine: ShellEngine::new(gateway, config.chunk_bytes),
            connections: Vec::new(),
            chunk_bytes: config.chunk_bytes,
            next_conn: 1,
        })
    }

    /// Port the listener is bound to.
    pub fn local_port(&self) -> io::Result<u16> {
        Ok(self.listener.local_addr()?.port())
    }

    /// Run the loop until `running` is cleared.
    pub fn run(mut self, running: &AtomicBool) {
        let mut buf = vec![0u8; self.chunk_bytes.max(1)];
        while running.load(Ordering::Relaxed) {
            let mut activity = self.poll_accept();
            activity |= self.poll_connections(&mut buf);
            self.reap_closed();
            if !activity {
                thread::sleep(IDLE_POLL);
            }
        }
        debug!("reactor loop stopped");
    }

    fn poll_accept(&mut self) -> bool {
        let mut activity = false;
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    activity = true;
                    if let Err(err) = self.register(stream, peer) {
                        warn!("failed to register {peer}: {err}");
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) => {
                    error!("accept error: {err}");
                    break;
                }
            }
        }
        activity
    }

    fn register(&mut self, stream: TcpStream, peer: SocketAddr) -> io::Result<()> {
        stream.set_nonblocking(true)?;
        let id = ConnId(self.next_conn);
        self.next_conn += 1;
        let mut sink = StreamSink { stream: &stream };
        if let Err(err) = self.engine.on_connect(id, peer, &mut sink) {
            self.engine.on_disconnect(id);
            return Err(err);
        }
        self.connections.push(Connection {
            id,
            stream,
            peer,
            framer: LineFramer::new(),
            closing: false,
        });
        Ok(())
    }

    fn poll_connections(&mut self, buf: &mut [u8]) -> bool {
        let mut activity = false;
        for idx in 0..self.connections.len() {
            match self.service_connection(idx, buf) {
                Ok(read_any) => activity |= read_any,
                Err(err) => {
                    let conn = &mut self.connections[idx];
                    if !is_disconnect(&err) {
                        warn!("connection {} failed: {err}", conn.peer);
                    }
                    conn.closing = true;
                    activity = true;
                }
            }
        }
        activity
    }

    /// Read one bounded chunk from a connection and feed it through the
    /// framer; each completed line is dispatched in order, followed by
    /// exactly one prompt when at least one line was processed.
    fn service_connection(&mut self, idx: usize, buf: &mut [u8]) -> io::Result<bool> {
        let Self {
            engine,
            connections,
            ..
        } = self;
        let conn = &mut connections[idx];
        if conn.closing {
            return Ok(false);
        }

        let read = match (&conn.stream).read(buf) {
            Ok(0) => {
                debug!("peer {} reached EOF", conn.peer);
                conn.closing = true;
                return Ok(true);
            }
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(false),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => return Ok(false),
            Err(err) if is_disconnect(&err) => {
                debug!("peer {} dropped the connection", conn.peer);
                conn.closing = true;
                return Ok(true);
            }
            Err(err) => return Err(err),
        };

        let mut sink = StreamSink {
            stream: &conn.stream,
        };
        let mut lines_seen = 0usize;
        for &byte in &buf[..read] {
            match conn.framer.push_byte(byte) {
                Ok(Some(line)) => {
                    lines_seen += 1;
                    match engine.on_line(conn.id, &line, &mut sink)? {
                        Flow::Continue => {}
                        Flow::Close => {
                            conn.closing = true;
                            return Ok(true);
                        }
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    lines_seen += 1;
                    warn!("connection {}: {err}", conn.peer);
                    sink.line("Operation failed")?;
                }
            }
        }
        if lines_seen > 0 {
            engine.send_prompt(conn.id, &mut sink)?;
        }
        Ok(true)
    }

    fn reap_closed(&mut self) {
        let Self {
            engine,
            connections,
            ..
        } = self;
        connections.retain(|conn| {
            if conn.closing {
                engine.on_disconnect(conn.id);
                info!("connection closed: {}", conn.peer);
                false
            } else {
                true
            }
        });
    }
}

/// Handle to a reactor running on its own thread.
pub struct DoorServer {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    port: u16,
}

impl DoorServer {
    /// Bind and start the reactor on a dedicated thread.
    pub fn start(config: &DoorConfig, gateway: FsGateway) -> io::Result<Self> {
        let reactor = Reactor::bind(config, gateway)?;
        let port = reactor.local_port()?;
        let running = Arc::new(AtomicBool::new(true));
        let running_loop = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name(format!("teldoor-{port}"))
            .spawn(move || reactor.run(&running_loop))?;
        Ok(Self {
            running,
            handle: Some(handle),
            port,
        })
    }

    /// Port the server accepts connections on.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Signal the reactor to stop and wait for its thread to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("reactor thread panicked");
            }
        }
    }

    /// Block the calling thread until the reactor exits.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("reactor thread panicked");
            }
        }
    }
}

impl Drop for DoorServer {
    fn drop(&mut self) {
        self.stop();
    }
}
