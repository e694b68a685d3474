// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Command dispatcher mapping parsed verbs onto session and gateway operations.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! Command dispatcher mapping parsed verbs onto session and gateway operations.

use std::io;
use std::path::PathBuf;

use log::{info, warn};
use teldoor_core::{Command, ParseError, ShellVerb, HELP_LINES};

use crate::gateway::{FsError, FsGateway};
use crate::session::Session;

/// Sink for replies produced while handling one connection's input.
///
/// Implementations write straight to the transport; an `Err` from
/// either method means the peer is gone and in-flight output (including
/// a chunked `cat` stream) must stop.
pub trait ReplySink {
    /// Write one newline-terminated text line.
    fn line(&mut self, text: &str) -> io::Result<()>;

    /// Write a raw chunk of bytes with no terminator.
    fn chunk(&mut self, bytes: &[u8]) -> io::Result<()>;
}

/// Whether the connection stays open after a dispatched line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep serving the connection.
    Continue,
    /// Close the connection; the session is destroyed.
    Close,
}

const ROOT_NOTIFICATION: &str = "You are already in the root directory";
const ALREADY_EXISTS: &str = "File already exists";
const NOT_FOUND: &str = "File not found";
const GENERIC_FAILURE: &str = "Operation failed";

/// Executes parsed commands against one session and the filesystem
/// gateway, writing every client-visible outcome through a [`ReplySink`].
#[derive(Debug)]
pub struct Dispatcher {
    gateway: FsGateway,
    chunk_bytes: usize,
}

impl Dispatcher {
    /// Create a dispatcher over the supplied gateway.
    #[must_use]
    pub fn new(gateway: FsGateway, chunk_bytes: usize) -> Self {
        Self {
            gateway,
            chunk_bytes,
        }
    }

    /// Execute one framed line for `session`.
    ///
    /// Empty lines and unrecognised verbs produce no output; every
    /// other outcome, including unclassified I/O failures, is reported
    /// to the client. Only transport errors propagate.
    pub fn dispatch(
        &self,
        session: &mut Session,
        line: &str,
        sink: &mut dyn ReplySink,
    ) -> io::Result<Flow> {
        let command = match Command::parse_line(line) {
            Ok(command) => command,
            Err(ParseError::EmptyLine | ParseError::UnknownVerb) => return Ok(Flow::Continue),
            Err(ParseError::MissingArgument(_)) => {
                let usage = line
                    .split_whitespace()
                    .next()
                    .and_then(ShellVerb::from_token)
                    .map(ShellVerb::usage);
                if let Some(usage) = usage {
                    sink.line(&format!("usage: {usage}"))?;
                }
                return Ok(Flow::Continue);
            }
            Err(err @ ParseError::LineTooLong) => {
                warn!("client {}: {err}", session.peer());
                sink.line(GENERIC_FAILURE)?;
                return Ok(Flow::Continue);
            }
        };

        match command {
            Command::Help => {
                for help_line in HELP_LINES {
                    sink.line(help_line)?;
                }
            }
            Command::Ls => self.handle_ls(session, sink)?,
            Command::Touch { name } => self.handle_touch(session, &name, sink)?,
            Command::Mkdir { name } => self.handle_mkdir(session, &name, sink)?,
            Command::Cd { target } => self.handle_cd(session, &target, sink)?,
            Command::Rm { name } => self.handle_rm(session, &name, sink)?,
            Command::Copy { src, dst } => self.handle_copy(session, &src, &dst, sink)?,
            Command::Cat { name } => self.handle_cat(session, &name, sink)?,
            Command::Nick { name } => {
                info!("client {} changed nickname to {name}", session.peer());
                session.set_nick(name);
            }
            Command::Exit => {
                info!("client logged out: {}", session.peer());
                return Ok(Flow::Close);
            }
        }
        Ok(Flow::Continue)
    }

    fn handle_ls(&self, session: &Session, sink: &mut dyn ReplySink) -> io::Result<()> {
        match self.gateway.list(session.cwd()) {
            Ok(names) => sink.line(&names.join(" ")),
            Err(err) => self.report(err, "", sink),
        }
    }

    fn handle_touch(
        &self,
        session: &Session,
        name: &str,
        sink: &mut dyn ReplySink,
    ) -> io::Result<()> {
        match self.gateway.create_file(&session.cwd().join(name)) {
            Ok(()) => sink.line("OK"),
            Err(err) => self.report(err, name, sink),
        }
    }

    fn handle_mkdir(
        &self,
        session: &Session,
        name: &str,
        sink: &mut dyn ReplySink,
    ) -> io::Result<()> {
        match self.gateway.create_dir(&session.cwd().join(name)) {
            Ok(()) => sink.line("OK"),
            Err(err) => self.report(err, name, sink),
        }
    }

    fn handle_cd(
        &self,
        session: &mut Session,
        target: &str,
        sink: &mut dyn ReplySink,
    ) -> io::Result<()> {
        if target == "." {
            return Ok(());
        }
        if target == "~" {
            session.set_cwd(PathBuf::new());
            return Ok(());
        }
        let requested = session.cwd().join(target);
        match self.gateway.normalize(&requested) {
            Ok(normalized) => match self.gateway.is_directory(&normalized) {
                Ok(true) => session.set_cwd(normalized),
                Ok(false) => {
                    sink.line(&format!("Directory {target} doesn't exist"))?;
                    sink.line("")?;
                }
                Err(err) => self.report(err, target, sink)?,
            },
            Err(FsError::OutsideRoot) => {
                sink.line(ROOT_NOTIFICATION)?;
                sink.line("")?;
            }
            Err(err) => self.report(err, target, sink)?,
        }
        Ok(())
    }

    fn handle_rm(&self, session: &Session, name: &str, sink: &mut dyn ReplySink) -> io::Result<()> {
        match self.gateway.remove(&session.cwd().join(name)) {
            Ok(()) => sink.line("OK"),
            Err(err) => self.report(err, name, sink),
        }
    }

    fn handle_copy(
        &self,
        session: &Session,
        src: &str,
        dst: &str,
        sink: &mut dyn ReplySink,
    ) -> io::Result<()> {
        let from = session.cwd().join(src);
        let to = session.cwd().join(dst);
        match self.gateway.copy(&from, &to) {
            Ok(()) => sink.line("OK"),
            Err(err) => self.report(err, src, sink),
        }
    }

    fn handle_cat(
        &self,
        session: &Session,
        name: &str,
        sink: &mut dyn ReplySink,
    ) -> io::Result<()> {
        let reader = match self
            .gateway
            .open_stream(&session.cwd().join(name), self.chunk_bytes)
        {
            Ok(reader) => reader,
            Err(err) => return self.report(err, name, sink),
        };
        for chunk in reader {
            match chunk {
                Ok(bytes) => sink.chunk(&bytes)?,
                Err(err) => return self.report(err, name, sink),
            }
        }
        sink.line("")
    }

    /// Map a gateway error onto its client-visible reply.
    fn report(&self, err: FsError, name: &str, sink: &mut dyn ReplySink) -> io::Result<()> {
        match err {
            FsError::AlreadyExists => sink.line(ALREADY_EXISTS),
            FsError::NotFound => sink.line(NOT_FOUND),
            FsError::DirectoryNotEmpty => sink.line(&format!("Directory {name} not empty")),
            FsError::IsDirectory => sink.line(&format!("{name} is directory")),
            FsError::OutsideRoot => {
                sink.line(ROOT_NOTIFICATION)?;
                sink.line("")
            }
            FsError::Io(err) => {
                warn!("unclassified I/O failure: {err}");
                sink.line(GENERIC_FAILURE)
            }
        }
    }
}
