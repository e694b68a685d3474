// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Shared help text for the teldoor shell.
// Author: Lukas Bower

//! Shared help text for the teldoor shell.

/// Help lines emitted for `--help`, one per command, in wire order.
pub const HELP_LINES: &[&str] = &[
    "\tls - view all files and directories",
    "\tmkdir [dirname] - create directory",
    "\tnick [nickname] - change nickname",
    "\ttouch [filename] - create file",
    "\tcd [path] - move on catalog",
    "\trm [filename | dirname] - delete file or directory (empty)",
    "\tcopy [src] [target] - copy file or directory",
    "\tcat [filename] - read file",
];
