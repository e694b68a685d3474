// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Server configuration loaded from TOML with CLI overrides.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! Server configuration loaded from TOML with CLI overrides.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default TCP port the reactor listens on.
pub const DEFAULT_PORT: u16 = 5678;
/// Default directory served as the shell root.
pub const DEFAULT_ROOT: &str = "server";
/// Default chunk size for socket reads and `cat` streaming. A tuning
/// constant, not a protocol guarantee.
pub const DEFAULT_CHUNK_BYTES: usize = 512;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DoorConfig {
    /// TCP port to listen on; 0 picks an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory served as the shell root.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Read and stream chunk size in bytes.
    #[serde(default = "default_chunk_bytes")]
    pub chunk_bytes: usize,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_root() -> PathBuf {
    PathBuf::from(DEFAULT_ROOT)
}

fn default_chunk_bytes() -> usize {
    DEFAULT_CHUNK_BYTES
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            root: default_root(),
            chunk_bytes: default_chunk_bytes(),
        }
    }
}

impl DoorConfig {
    /// Load configuration from a TOML file, rebasing a relative root
    /// against the file's directory.
    pub fn load(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        let mut cfg: DoorConfig =
            toml::from_str(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        cfg.rebase_root(path);
        Ok(cfg)
    }

    fn rebase_root(&mut self, path: &Path) {
        if self.root.is_absolute() {
            return;
        }
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        self.root = base.join(&self.root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_the_wire_contract() {
        let cfg = DoorConfig::default();
        assert_eq!(cfg.port, 5678);
        assert_eq!(cfg.root, PathBuf::from("server"));
        assert_eq!(cfg.chunk_bytes, 512);
    }

    #[test]
    fn load_applies_partial_overrides() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("teldoor.toml");
        let mut file = fs::File::create(&path).expect("create config");
        writeln!(file, "port = 7000").expect("write config");
        let cfg = DoorConfig::load(&path).expect("load config");
        assert_eq!(cfg.port, 7000);
        assert_eq!(cfg.chunk_bytes, 512);
        assert_eq!(cfg.root, dir.path().join("server"));
    }

    #[test]
    fn load_keeps_absolute_roots() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("teldoor.toml");
        fs::write(&path, "root = \"/srv/files\"\n").expect("write config");
        let cfg = DoorConfig::load(&path).expect("load config");
        assert_eq!(cfg.root, PathBuf::from("/srv/files"));
    }

    #[test]
    fn load_rejects_malformed_toml() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("teldoor.toml");
        fs::write(&path, "port = \"not a number\"\n").expect("write config");
        let err = DoorConfig::load(&path).expect_err("invalid config");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
