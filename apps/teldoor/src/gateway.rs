// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Filesystem gateway scoped beneath the served root directory.
// Author: Lukas Bower
#![forbid(unsafe_code)]

//! Filesystem gateway scoped beneath the served root directory.

use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

/// Errors surfaced by the filesystem gateway.
#[derive(Debug, Error)]
pub enum FsError {
    /// The target entry already exists.
    #[error("target already exists")]
    AlreadyExists,
    /// The target entry does not exist.
    #[error("target not found")]
    NotFound,
    /// A directory removal was refused because it still has entries.
    #[error("directory not empty")]
    DirectoryNotEmpty,
    /// A streaming read was asked of a directory.
    #[error("target is a directory")]
    IsDirectory,
    /// Resolution would leave the served root.
    #[error("path escapes the served root")]
    OutsideRoot,
    /// Any other I/O failure (permissions, device errors).
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn classify(err: io::Error) -> FsError {
    match err.kind() {
        io::ErrorKind::NotFound => FsError::NotFound,
        io::ErrorKind::AlreadyExists => FsError::AlreadyExists,
        _ => FsError::Io(err),
    }
}

/// Filesystem gateway fixed to one absolute root directory.
///
/// Every operation takes a root-relative path; resolution folds `.` and
/// `..` lexically and refuses anything that would land above the root,
/// so no caller can escape the served subtree.
#[derive(Debug, Clone)]
pub struct FsGateway {
    root: PathBuf,
}

impl FsGateway {
    /// Create a gateway over `root`, creating the directory if absent.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let root = root.canonicalize()?;
        Ok(Self { root })
    }

    /// The absolute root every session path resolves beneath.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fold `.`/`..` components of a root-relative path, refusing any
    /// path that resolves above the root or carries an absolute prefix.
    pub fn normalize(&self, relative: &Path) -> Result<PathBuf, FsError> {
        let mut folded = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if !folded.pop() {
                        return Err(FsError::OutsideRoot);
                    }
                }
                Component::Normal(name) => folded.push(name),
                Component::RootDir | Component::Prefix(_) => {
                    return Err(FsError::OutsideRoot);
                }
            }
        }
        Ok(folded)
    }

    /// Resolve a root-relative path to its absolute location under the
    /// root.
    pub fn resolve(&self, relative: &Path) -> Result<PathBuf, FsError> {
        Ok(self.root.join(self.normalize(relative)?))
    }

    /// List entry names under a directory, sorted for stable output.
    pub fn list(&self, dir: &Path) -> Result<Vec<String>, FsError> {
        let path = self.resolve(dir)?;
        let mut names = Vec::new();
        for entry in fs::read_dir(&path).map_err(classify)? {
            let entry = entry.map_err(classify)?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    /// Create an empty file, failing when the entry already exists.
    pub fn create_file(&self, file: &Path) -> Result<(), FsError> {
        let path = self.resolve(file)?;
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(classify)?;
        Ok(())
    }

    /// Create a directory, failing when the entry already exists.
    pub fn create_dir(&self, dir: &Path) -> Result<(), FsError> {
        let path = self.resolve(dir)?;
        fs::create_dir(&path).map_err(classify)
    }

    /// Delete a file or empty directory.
    pub fn remove(&self, target: &Path) -> Result<(), FsError> {
        let path = self.resolve(target)?;
        if !path.exists() {
            return Err(FsError::NotFound);
        }
        if path.is_dir() {
            if fs::read_dir(&path).map_err(classify)?.next().is_some() {
                return Err(FsError::DirectoryNotEmpty);
            }
            fs::remove_dir(&path).map_err(classify)
        } else {
            fs::remove_file(&path).map_err(classify)
        }
    }

    /// Report whether the target entry exists.
    pub fn exists(&self, target: &Path) -> Result<bool, FsError> {
        Ok(self.resolve(target)?.exists())
    }

    /// Report whether the target entry is a directory.
    pub fn is_directory(&self, target: &Path) -> Result<bool, FsError> {
        Ok(self.resolve(target)?.is_dir())
    }

    /// Copy a file, or recursively copy a directory tree.
    ///
    /// Directory copies walk depth-first: destination subdirectories
    /// that already exist are skipped, while a destination file that
    /// already exists aborts the remaining walk.
    pub fn copy(&self, src: &Path, dst: &Path) -> Result<(), FsError> {
        let from = self.resolve(src)?;
        let to = self.resolve(dst)?;
        if !from.exists() {
            return Err(FsError::NotFound);
        }
        if from.is_dir() {
            copy_tree(&from, &to)
        } else {
            copy_entry(&from, &to)
        }
    }

    /// Open a file for chunked streaming reads.
    pub fn open_stream(&self, file: &Path, chunk_bytes: usize) -> Result<ChunkReader, FsError> {
        let path = self.resolve(file)?;
        if path.is_dir() {
            return Err(FsError::IsDirectory);
        }
        if !path.exists() {
            return Err(FsError::NotFound);
        }
        let file = fs::File::open(&path).map_err(classify)?;
        Ok(ChunkReader {
            file,
            chunk_bytes,
            done: false,
        })
    }
}

fn copy_tree(from: &Path, to: &Path) -> Result<(), FsError> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|err| FsError::Io(err.into()))?;
        let rel = match entry.path().strip_prefix(from) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let target = to.join(rel);
        if entry.file_type().is_dir() {
            if !target.exists() {
                fs::create_dir_all(&target).map_err(classify)?;
            }
        } else {
            copy_entry(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn copy_entry(from: &Path, to: &Path) -> Result<(), FsError> {
    if to.exists() {
        return Err(FsError::AlreadyExists);
    }
    fs::copy(from, to).map_err(classify)?;
    Ok(())
}

/// Lazy, finite, non-restartable sequence of byte chunks from one file.
#[derive(Debug)]
pub struct ChunkReader {
    file: fs::File,
    chunk_bytes: usize,
    done: bool,
}

impl Iterator for ChunkReader {
    type Item = Result<Vec<u8>, FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut chunk = vec![0u8; self.chunk_bytes.max(1)];
        loop {
            match self.file.read(&mut chunk) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(read) => {
                    chunk.truncate(read);
                    return Some(Ok(chunk));
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    self.done = true;
                    return Some(Err(FsError::Io(err)));
                }
            }
        }
    }
}
