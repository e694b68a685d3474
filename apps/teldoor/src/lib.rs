// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Teldoor remote file-shell server library.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Teldoor: a minimal remote file shell served over plain TCP.
//!
//! One reactor thread owns a non-blocking listener and every client
//! connection; line-framed commands are dispatched against
//! per-connection sessions operating on a filesystem subtree beneath a
//! fixed root. The command logic lives behind the [`ShellEngine`]
//! callback seam so transports other than the built-in reactor can
//! drive it without duplicating handlers.

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod gateway;
pub mod reactor;
pub mod session;

pub use config::DoorConfig;
pub use dispatch::{Dispatcher, Flow, ReplySink};
pub use engine::ShellEngine;
pub use gateway::{FsError, FsGateway};
pub use reactor::DoorServer;
pub use session::{ConnId, Session, SessionRegistry};
