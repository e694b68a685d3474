// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Prompt rendering for teldoor shell sessions.
// Author: Lukas Bower

//! Prompt rendering for teldoor shell sessions.

use std::path::Path;

/// Compose the interactive prompt shown after every processed input.
#[must_use]
pub fn render_prompt(identity: &str, virtual_path: &str) -> String {
    format!("{identity}:{virtual_path}$ ")
}

/// Render a root-relative working path as a `~`-rooted virtual path.
///
/// The served root itself renders as `~`; deeper directories append
/// `/`-joined components regardless of the host separator.
#[must_use]
pub fn virtual_path(cwd: &Path) -> String {
    let mut rendered = String::from("~");
    for component in cwd.components() {
        rendered.push('/');
        rendered.push_str(&component.as_os_str().to_string_lossy());
    }
    rendered
}
